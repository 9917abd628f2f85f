//! Replication filter.
//!
//! The host fills a [`TransmitFrame`] with the entities each receiver is about
//! to be told about. Players that are fully invisible this tick, together
//! with everything they hold, are removed from the frames of receivers on the
//! opposing side. Teammates and side-less observers are never filtered.

use std::collections::HashSet;

use bevy::prelude::*;
use veil_runtime::TeamSide;

use crate::{
    fade::{effective_alpha, DormantVisibility},
    host::{PlayerHost, Players, ServerClock},
    metrics::VeilMetrics,
    registry::VisibilityRegistry,
    veil_config::VeilConfigHandle,
};

/// Entities one receiver will be sent this tick.
#[derive(Debug, Clone)]
pub struct TransmitInfo {
    pub receiver: Entity,
    pub entities: HashSet<Entity>,
}

/// Outgoing replication pass, refilled by the host every tick.
#[derive(Resource, Debug, Clone, Default)]
pub struct TransmitFrame {
    pub infos: Vec<TransmitInfo>,
}

impl TransmitFrame {
    pub fn push(&mut self, receiver: Entity, entities: impl IntoIterator<Item = Entity>) {
        self.infos.push(TransmitInfo {
            receiver,
            entities: entities.into_iter().collect(),
        });
    }

    pub fn for_receiver(&self, receiver: Entity) -> Option<&HashSet<Entity>> {
        self.infos
            .iter()
            .find(|info| info.receiver == receiver)
            .map(|info| &info.entities)
    }

    pub fn clear(&mut self) {
        self.infos.clear();
    }
}

/// Entities withheld from each side's receivers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HideSets {
    pub from_terrorists: HashSet<Entity>,
    pub from_counter_terrorists: HashSet<Entity>,
}

impl HideSets {
    pub fn is_empty(&self) -> bool {
        self.from_terrorists.is_empty() && self.from_counter_terrorists.is_empty()
    }

    pub fn hidden_from(&self, side: TeamSide) -> &HashSet<Entity> {
        match side {
            TeamSide::Terrorist => &self.from_terrorists,
            TeamSide::CounterTerrorist => &self.from_counter_terrorists,
        }
    }

    fn hidden_from_mut(&mut self, side: TeamSide) -> &mut HashSet<Entity> {
        match side {
            TeamSide::Terrorist => &mut self.from_terrorists,
            TeamSide::CounterTerrorist => &mut self.from_counter_terrorists,
        }
    }
}

/// Collect the pawns and items of every fully invisible managed player.
///
/// Alpha is computed exactly as the fade driver does for the same `now`, so a
/// player is withheld if and only if it is rendered fully transparent.
pub fn build_hide_sets<H: PlayerHost>(
    registry: &VisibilityRegistry,
    host: &H,
    now: f32,
    dormant: DormantVisibility,
) -> HideSets {
    let mut sets = HideSets::default();
    for (player, window) in registry.iter() {
        let Some(pawn) = host.pawn_of(player) else {
            continue;
        };
        if effective_alpha(now, window, dormant) > 0 {
            continue;
        }
        let Some(side) = host.side_of(player) else {
            continue;
        };
        let hidden = sets.hidden_from_mut(side.opposing());
        hidden.insert(pawn);
        hidden.extend(host.held_items(pawn));
    }
    sets
}

/// Strip hidden entities from each receiver's frame; returns how many were removed.
pub fn apply_hide_sets<H: PlayerHost>(
    sets: &HideSets,
    frame: &mut TransmitFrame,
    host: &H,
) -> usize {
    let mut withheld = 0;
    for info in frame.infos.iter_mut() {
        if !host.is_valid(info.receiver) {
            continue;
        }
        let Some(side) = host.side_of(info.receiver) else {
            continue;
        };
        for entity in sets.hidden_from(side) {
            if info.entities.remove(entity) {
                withheld += 1;
            }
        }
    }
    withheld
}

pub fn filter_transmissions(
    clock: Res<ServerClock>,
    config: Res<VeilConfigHandle>,
    registry: Res<VisibilityRegistry>,
    players: Players,
    mut frame: ResMut<TransmitFrame>,
    mut metrics: ResMut<VeilMetrics>,
) {
    metrics.hidden_from_terrorists = 0;
    metrics.hidden_from_counter_terrorists = 0;
    if registry.is_empty() || frame.infos.is_empty() {
        return;
    }

    let sets = build_hide_sets(
        &registry,
        &players,
        clock.now,
        config.0.dormant_visibility,
    );
    if sets.is_empty() {
        return;
    }

    let withheld = apply_hide_sets(&sets, &mut frame, &players);
    metrics.hidden_from_terrorists = sets.from_terrorists.len();
    metrics.hidden_from_counter_terrorists = sets.from_counter_terrorists.len();
    metrics.withheld_total += withheld as u64;

    tracing::trace!(
        target: "veil::transmit",
        receivers = frame.infos.len(),
        hidden_from_t = sets.from_terrorists.len(),
        hidden_from_ct = sets.from_counter_terrorists.len(),
        withheld,
        "transmit.filtered"
    );
}
