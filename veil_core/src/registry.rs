//! Authoritative table of players under invisibility management.
//!
//! Slots are addressed by the entity's index. Each occupied slot keeps the
//! full generational handle, so a lookup for a recycled index with a newer
//! generation never matches a player that has already been destroyed.

use bevy::prelude::*;

use crate::{
    fade::{FadeWindow, FULL_OPACITY},
    host::{PlayerHost, RenderHost},
};

/// Result of toggling a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    MadeInvisible,
    MadeVisible,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    handle: Entity,
    window: FadeWindow,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct VisibilityRegistry {
    slots: Vec<Option<Slot>>,
    len: usize,
}

impl VisibilityRegistry {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, player: Entity) -> bool {
        self.slot(player).is_some()
    }

    /// Current fade window of a managed player.
    pub fn window(&self, player: Entity) -> Option<FadeWindow> {
        self.slot(player).map(|slot| slot.window)
    }

    /// Managed players with their windows, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, FadeWindow)> + '_ {
        self.slots
            .iter()
            .flatten()
            .map(|slot| (slot.handle, slot.window))
    }

    pub fn players(&self) -> Vec<Entity> {
        self.iter().map(|(player, _)| player).collect()
    }

    /// Start managing `player` (dormant window) or stop managing it and
    /// restore full opacity.
    pub fn toggle<H: RenderHost>(&mut self, player: Entity, host: &mut H) -> ToggleOutcome {
        if self.remove(player).is_some() {
            restore(host, player);
            tracing::info!(
                target: "veil::registry",
                ?player,
                managed = self.len,
                "registry.toggled=visible"
            );
            ToggleOutcome::MadeVisible
        } else {
            self.insert(player, FadeWindow::DORMANT);
            tracing::info!(
                target: "veil::registry",
                ?player,
                managed = self.len,
                "registry.toggled=invisible"
            );
            ToggleOutcome::MadeInvisible
        }
    }

    /// Reveal a managed player at `now` and fade back out over `duration`.
    ///
    /// Overwrites any window in progress. Returns `false` when the player is
    /// not managed or no longer valid.
    pub fn trigger<H: PlayerHost>(
        &mut self,
        player: Entity,
        now: f32,
        duration: f32,
        host: &H,
    ) -> bool {
        if !host.is_valid(player) {
            return false;
        }
        let Some(slot) = self.slot_mut(player) else {
            return false;
        };
        slot.window = FadeWindow::starting_at(now, duration);
        tracing::debug!(
            target: "veil::registry",
            ?player,
            start = slot.window.start,
            end = slot.window.end,
            "registry.triggered"
        );
        true
    }

    /// Drop every player the host no longer considers valid.
    ///
    /// Restoration is attempted first; failures are expected for players
    /// whose pawn is already gone and are ignored.
    pub fn purge_invalid<H: RenderHost>(&mut self, host: &mut H) -> Vec<Entity> {
        let invalid: Vec<Entity> = self
            .iter()
            .map(|(player, _)| player)
            .filter(|player| !host.is_valid(*player))
            .collect();
        for player in &invalid {
            restore(host, *player);
            self.remove(*player);
        }
        if !invalid.is_empty() {
            tracing::debug!(
                target: "veil::registry",
                purged = invalid.len(),
                managed = self.len,
                "registry.purged"
            );
        }
        invalid
    }

    /// Restore every managed player to full opacity and empty the table.
    pub fn clear_all<H: RenderHost>(&mut self, host: &mut H) -> usize {
        let players = self.players();
        for player in &players {
            restore(host, *player);
        }
        self.slots.clear();
        self.len = 0;
        tracing::info!(
            target: "veil::registry",
            restored = players.len(),
            "registry.cleared"
        );
        players.len()
    }

    pub(crate) fn remove(&mut self, player: Entity) -> Option<FadeWindow> {
        let index = player.index() as usize;
        let entry = self.slots.get_mut(index)?;
        match entry {
            Some(slot) if slot.handle == player => {
                let window = slot.window;
                *entry = None;
                self.len -= 1;
                Some(window)
            }
            _ => None,
        }
    }

    fn insert(&mut self, player: Entity, window: FadeWindow) {
        let index = player.index() as usize;
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        let previous = self.slots[index].replace(Slot {
            handle: player,
            window,
        });
        match previous {
            Some(stale) => tracing::debug!(
                target: "veil::registry",
                stale = ?stale.handle,
                ?player,
                "registry.slot_recycled"
            ),
            None => self.len += 1,
        }
    }

    fn slot(&self, player: Entity) -> Option<&Slot> {
        self.slots
            .get(player.index() as usize)?
            .as_ref()
            .filter(|slot| slot.handle == player)
    }

    fn slot_mut(&mut self, player: Entity) -> Option<&mut Slot> {
        self.slots
            .get_mut(player.index() as usize)?
            .as_mut()
            .filter(|slot| slot.handle == player)
    }
}

fn restore<H: RenderHost>(host: &mut H, player: Entity) {
    if let Err(err) = host.apply_opacity(player, FULL_OPACITY as u8) {
        tracing::debug!(
            target: "veil::registry",
            ?player,
            error = %err,
            "registry.restore_skipped"
        );
    }
}

#[cfg(test)]
mod tests {
    use veil_runtime::TeamSide;

    use super::*;
    use crate::host::testing::FakeHost;

    #[test]
    fn toggle_twice_restores_visibility() {
        let mut host = FakeHost::default();
        let player = host.spawn(Some(TeamSide::Terrorist), 2);
        let mut registry = VisibilityRegistry::default();

        assert_eq!(
            registry.toggle(player, &mut host),
            ToggleOutcome::MadeInvisible
        );
        assert_eq!(registry.window(player), Some(FadeWindow::DORMANT));
        host.apply_opacity(player, 0).unwrap();

        assert_eq!(
            registry.toggle(player, &mut host),
            ToggleOutcome::MadeVisible
        );
        assert!(registry.is_empty());
        assert!(!registry.contains(player));
        assert_eq!(host.alpha_of(host.pawn(player)), 255);
        for item in host.items(player) {
            assert_eq!(host.alpha_of(item), 255);
        }
    }

    #[test]
    fn trigger_requires_registration_and_validity() {
        let mut host = FakeHost::default();
        let managed = host.spawn(Some(TeamSide::Terrorist), 0);
        let unmanaged = host.spawn(Some(TeamSide::Terrorist), 0);
        let mut registry = VisibilityRegistry::default();
        registry.toggle(managed, &mut host);

        assert!(!registry.trigger(unmanaged, 1.0, 0.5, &host));
        assert!(!registry.contains(unmanaged));

        assert!(registry.trigger(managed, 1.0, 0.5, &host));
        assert_eq!(
            registry.window(managed),
            Some(FadeWindow {
                start: 1.0,
                end: 1.5
            })
        );

        host.disconnect(managed);
        assert!(!registry.trigger(managed, 2.0, 1.0, &host));
        assert_eq!(registry.window(managed).unwrap().start, 1.0);
    }

    #[test]
    fn later_trigger_overwrites_window() {
        let mut host = FakeHost::default();
        let player = host.spawn(Some(TeamSide::CounterTerrorist), 0);
        let mut registry = VisibilityRegistry::default();
        registry.toggle(player, &mut host);

        registry.trigger(player, 0.0, 1.5, &host);
        registry.trigger(player, 1.0, 0.5, &host);

        assert_eq!(
            registry.window(player),
            Some(FadeWindow {
                start: 1.0,
                end: 1.5
            })
        );
    }

    #[test]
    fn purge_removes_only_invalid_players() {
        let mut host = FakeHost::default();
        let stays = host.spawn(Some(TeamSide::Terrorist), 1);
        let leaves = host.spawn(Some(TeamSide::CounterTerrorist), 1);
        let mut registry = VisibilityRegistry::default();
        registry.toggle(stays, &mut host);
        registry.toggle(leaves, &mut host);

        host.disconnect(leaves);
        let purged = registry.purge_invalid(&mut host);

        assert_eq!(purged, vec![leaves]);
        assert!(registry.contains(stays));
        assert!(!registry.contains(leaves));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clear_all_restores_every_player() {
        let mut host = FakeHost::default();
        let a = host.spawn(Some(TeamSide::Terrorist), 1);
        let b = host.spawn(Some(TeamSide::CounterTerrorist), 2);
        let gone = host.spawn(Some(TeamSide::CounterTerrorist), 0);
        let mut registry = VisibilityRegistry::default();
        for player in [a, b, gone] {
            registry.toggle(player, &mut host);
            host.apply_opacity(player, 0).unwrap();
        }
        host.disconnect(gone);

        assert_eq!(registry.clear_all(&mut host), 3);
        assert!(registry.is_empty());
        assert_eq!(host.alpha_of(host.pawn(a)), 255);
        assert_eq!(host.alpha_of(host.pawn(b)), 255);
        for item in host.items(b) {
            assert_eq!(host.alpha_of(item), 255);
        }
    }

    #[test]
    fn recycled_slot_does_not_alias_old_handle() {
        let mut host = FakeHost::default();
        let mut registry = VisibilityRegistry::default();
        let old = Entity::from_raw(7);
        let recycled = Entity::from_bits(old.to_bits() + (1u64 << 32));
        assert_eq!(old.index(), recycled.index());
        assert_ne!(old, recycled);

        registry.toggle(old, &mut host);
        assert!(registry.contains(old));
        assert!(!registry.contains(recycled));

        registry.toggle(recycled, &mut host);
        assert!(registry.contains(recycled));
        assert!(!registry.contains(old));
        assert_eq!(registry.len(), 1);
    }
}
