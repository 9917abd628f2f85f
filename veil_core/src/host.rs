//! Host simulation surface.
//!
//! The components here belong to the host game: the visibility core reads and
//! mutates them but never owns them. [`PlayerHost`] and [`RenderHost`] are the
//! capability seams the registry and the fade driver depend on; they are
//! implemented for exclusive [`World`] access (commands, unload) and for the
//! [`PlayerRender`] system param (per-tick systems).

use bevy::{ecs::system::SystemParam, prelude::*};
use veil_runtime::TeamSide;

use crate::error::VeilError;

/// A connected player. The controller entity is the identity the core tracks.
#[derive(Component, Debug, Clone)]
pub struct PlayerController {
    pub user_id: u32,
    pub name: String,
    pub side: Option<TeamSide>,
    pub pawn: Option<Entity>,
}

/// The body a controller currently drives.
#[derive(Component, Debug, Clone, Copy)]
pub struct PlayerPawn {
    pub controller: Entity,
}

/// Items (weapons, equipment) carried by a pawn.
#[derive(Component, Debug, Clone, Default)]
pub struct HeldItems(pub Vec<Entity>);

/// Render tint of a model entity; alpha carries the opacity.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl RenderColor {
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

impl Default for RenderColor {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Radar/spotting state of a pawn.
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct SpottedState {
    pub spotted: bool,
    pub spotted_by_mask: [u32; 2],
}

impl SpottedState {
    pub fn clear(&mut self) {
        self.spotted = false;
        self.spotted_by_mask = [0; 2];
    }
}

/// Simulation clock in seconds, advanced by the host before each tick.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct ServerClock {
    pub now: f32,
}

impl ServerClock {
    pub fn new(now: f32) -> Self {
        Self { now }
    }

    /// Move the clock forward; it never runs backwards.
    pub fn advance(&mut self, seconds: f32) {
        self.now += seconds.max(0.0);
    }
}

/// HTML text the host prints in the centre of a player's screen.
#[derive(Event, Debug, Clone)]
pub struct CenterHtmlMessage {
    pub recipient: Entity,
    pub html: String,
}

/// Read access to players, pawns and their items.
pub trait PlayerHost {
    /// Pawn of `player` when both the controller and its pawn are alive.
    fn pawn_of(&self, player: Entity) -> Option<Entity>;

    fn side_of(&self, player: Entity) -> Option<TeamSide>;

    fn held_items(&self, pawn: Entity) -> Vec<Entity>;

    fn is_valid(&self, player: Entity) -> bool {
        self.pawn_of(player).is_some()
    }
}

/// Render-side effects the visibility core applies to managed players.
pub trait RenderHost: PlayerHost {
    /// Set the alpha of a single model entity.
    fn set_alpha(&mut self, target: Entity, alpha: u8) -> Result<(), VeilError>;

    /// Mark the player's pawn as not spotted by anyone.
    fn clear_spotted(&mut self, player: Entity) -> Result<(), VeilError>;

    /// Apply `alpha` to the player's pawn and every item it holds.
    ///
    /// Items that cannot be rendered are skipped; only a missing pawn fails.
    fn apply_opacity(&mut self, player: Entity, alpha: u8) -> Result<(), VeilError> {
        let pawn = self
            .pawn_of(player)
            .ok_or(VeilError::InvalidEntity(player))?;
        self.set_alpha(pawn, alpha)?;
        for item in self.held_items(pawn) {
            if let Err(err) = self.set_alpha(item, alpha) {
                tracing::trace!(
                    target: "veil::host",
                    ?item,
                    error = %err,
                    "host.item_alpha_skipped"
                );
            }
        }
        Ok(())
    }
}

impl PlayerHost for World {
    fn pawn_of(&self, player: Entity) -> Option<Entity> {
        let pawn = self.get::<PlayerController>(player)?.pawn?;
        self.get::<PlayerPawn>(pawn).map(|_| pawn)
    }

    fn side_of(&self, player: Entity) -> Option<TeamSide> {
        self.get::<PlayerController>(player)?.side
    }

    fn held_items(&self, pawn: Entity) -> Vec<Entity> {
        self.get::<HeldItems>(pawn)
            .map(|items| items.0.clone())
            .unwrap_or_default()
    }
}

impl RenderHost for World {
    fn set_alpha(&mut self, target: Entity, alpha: u8) -> Result<(), VeilError> {
        let mut color = self
            .get_mut::<RenderColor>(target)
            .ok_or(VeilError::InvalidEntity(target))?;
        if color.a != alpha {
            color.a = alpha;
        }
        Ok(())
    }

    fn clear_spotted(&mut self, player: Entity) -> Result<(), VeilError> {
        let pawn = self
            .pawn_of(player)
            .ok_or(VeilError::InvalidEntity(player))?;
        if let Some(mut spotted) = self.get_mut::<SpottedState>(pawn) {
            spotted.clear();
        }
        Ok(())
    }
}

/// Read-only player lookups for systems.
#[derive(SystemParam)]
pub struct Players<'w, 's> {
    controllers: Query<'w, 's, &'static PlayerController>,
    pawns: Query<'w, 's, (&'static PlayerPawn, Option<&'static HeldItems>)>,
}

impl PlayerHost for Players<'_, '_> {
    fn pawn_of(&self, player: Entity) -> Option<Entity> {
        let pawn = self.controllers.get(player).ok()?.pawn?;
        self.pawns.get(pawn).ok().map(|_| pawn)
    }

    fn side_of(&self, player: Entity) -> Option<TeamSide> {
        self.controllers.get(player).ok()?.side
    }

    fn held_items(&self, pawn: Entity) -> Vec<Entity> {
        self.pawns
            .get(pawn)
            .ok()
            .and_then(|(_, items)| items.map(|items| items.0.clone()))
            .unwrap_or_default()
    }
}

/// Player lookups plus the render mutators the fade driver needs.
#[derive(SystemParam)]
pub struct PlayerRender<'w, 's> {
    players: Players<'w, 's>,
    colors: Query<'w, 's, &'static mut RenderColor>,
    spotted: Query<'w, 's, &'static mut SpottedState>,
}

impl PlayerHost for PlayerRender<'_, '_> {
    fn pawn_of(&self, player: Entity) -> Option<Entity> {
        self.players.pawn_of(player)
    }

    fn side_of(&self, player: Entity) -> Option<TeamSide> {
        self.players.side_of(player)
    }

    fn held_items(&self, pawn: Entity) -> Vec<Entity> {
        self.players.held_items(pawn)
    }
}

impl RenderHost for PlayerRender<'_, '_> {
    fn set_alpha(&mut self, target: Entity, alpha: u8) -> Result<(), VeilError> {
        let mut color = self
            .colors
            .get_mut(target)
            .map_err(|_| VeilError::InvalidEntity(target))?;
        if color.a != alpha {
            color.a = alpha;
        }
        Ok(())
    }

    fn clear_spotted(&mut self, player: Entity) -> Result<(), VeilError> {
        let pawn = self
            .pawn_of(player)
            .ok_or(VeilError::InvalidEntity(player))?;
        if let Ok(mut spotted) = self.spotted.get_mut(pawn) {
            spotted.clear();
        }
        Ok(())
    }
}
