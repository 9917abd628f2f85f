//! Reveal trigger routing.
//!
//! Every attention-drawing action maps to a single re-fade duration. The most
//! recent action always wins: its window replaces whatever was in progress.

use bevy::prelude::*;
use serde::Deserialize;
use veil_runtime::RevealAction;

use crate::{
    host::{PlayerHost, Players, ServerClock},
    metrics::VeilMetrics,
    registry::VisibilityRegistry,
    veil_config::VeilConfigHandle,
};

/// A game action performed by `actor` this tick.
#[derive(Event, Debug, Clone, Copy)]
pub struct RevealEvent {
    pub actor: Entity,
    pub action: RevealAction,
}

impl RevealEvent {
    pub fn new(actor: Entity, action: RevealAction) -> Self {
        Self { actor, action }
    }
}

/// Seconds each action keeps a player visible before it has fully faded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RevealDurations {
    /// Multiplier applied to the sound event's own duration.
    pub sound_multiplier: f32,
    pub bullet_impact: f32,
    pub begin_plant: f32,
    pub begin_defuse: f32,
    pub reload: f32,
    pub hurt: f32,
}

impl Default for RevealDurations {
    fn default() -> Self {
        Self {
            sound_multiplier: 2.0,
            bullet_impact: 0.5,
            begin_plant: 1.0,
            begin_defuse: 1.0,
            reload: 1.5,
            hurt: 0.5,
        }
    }
}

impl RevealDurations {
    pub fn seconds_for(&self, action: RevealAction) -> f32 {
        match action {
            RevealAction::Sound { duration } => self.sound_multiplier * duration,
            RevealAction::BulletImpact => self.bullet_impact,
            RevealAction::BeginPlant => self.begin_plant,
            RevealAction::BeginDefuse => self.begin_defuse,
            RevealAction::Reload => self.reload,
            RevealAction::Hurt => self.hurt,
        }
    }
}

/// Apply one reveal to the registry. Unmanaged or invalid actors are ignored.
pub fn dispatch_reveal<H: PlayerHost>(
    registry: &mut VisibilityRegistry,
    host: &H,
    now: f32,
    durations: &RevealDurations,
    event: &RevealEvent,
) -> bool {
    let duration = durations.seconds_for(event.action);
    let revealed = registry.trigger(event.actor, now, duration, host);
    if revealed {
        tracing::debug!(
            target: "veil::reveal",
            actor = ?event.actor,
            action = event.action.label(),
            duration,
            "reveal.applied"
        );
    }
    revealed
}

pub fn apply_reveal_events(
    clock: Res<ServerClock>,
    config: Res<VeilConfigHandle>,
    mut registry: ResMut<VisibilityRegistry>,
    players: Players,
    mut events: EventReader<RevealEvent>,
    mut metrics: ResMut<VeilMetrics>,
) {
    let durations = &config.0.reveal;
    for event in events.read() {
        if dispatch_reveal(&mut registry, &players, clock.now, durations, event) {
            metrics.reveals_total += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use veil_runtime::TeamSide;

    use super::*;
    use crate::{fade::FadeWindow, host::testing::FakeHost};

    #[test]
    fn duration_table_matches_defaults() {
        let table = RevealDurations::default();
        assert_eq!(table.seconds_for(RevealAction::Sound { duration: 1.0 }), 2.0);
        assert_eq!(table.seconds_for(RevealAction::Sound { duration: 0.25 }), 0.5);
        assert_eq!(table.seconds_for(RevealAction::BulletImpact), 0.5);
        assert_eq!(table.seconds_for(RevealAction::BeginPlant), 1.0);
        assert_eq!(table.seconds_for(RevealAction::BeginDefuse), 1.0);
        assert_eq!(table.seconds_for(RevealAction::Reload), 1.5);
        assert_eq!(table.seconds_for(RevealAction::Hurt), 0.5);
    }

    #[test]
    fn reload_then_hurt_keeps_last_window() {
        let mut host = FakeHost::default();
        let player = host.spawn(Some(TeamSide::Terrorist), 0);
        let mut registry = VisibilityRegistry::default();
        registry.toggle(player, &mut host);
        let table = RevealDurations::default();

        assert!(dispatch_reveal(
            &mut registry,
            &host,
            0.0,
            &table,
            &RevealEvent::new(player, RevealAction::Reload)
        ));
        assert_eq!(
            registry.window(player),
            Some(FadeWindow {
                start: 0.0,
                end: 1.5
            })
        );

        dispatch_reveal(
            &mut registry,
            &host,
            1.0,
            &table,
            &RevealEvent::new(player, RevealAction::Hurt),
        );
        assert_eq!(
            registry.window(player),
            Some(FadeWindow {
                start: 1.0,
                end: 1.5
            })
        );
    }

    #[test]
    fn unbounded_sound_fades_instantly() {
        let mut host = FakeHost::default();
        let player = host.spawn(Some(TeamSide::CounterTerrorist), 0);
        let mut registry = VisibilityRegistry::default();
        registry.toggle(player, &mut host);

        assert!(dispatch_reveal(
            &mut registry,
            &host,
            4.0,
            &RevealDurations::default(),
            &RevealEvent::new(player, RevealAction::Sound { duration: f32::INFINITY })
        ));
        assert_eq!(
            registry.window(player),
            Some(FadeWindow {
                start: 4.0,
                end: 4.0
            })
        );
    }

    #[test]
    fn unmanaged_actor_is_ignored() {
        let mut host = FakeHost::default();
        let player = host.spawn(Some(TeamSide::Terrorist), 0);
        let mut registry = VisibilityRegistry::default();

        assert!(!dispatch_reveal(
            &mut registry,
            &host,
            0.0,
            &RevealDurations::default(),
            &RevealEvent::new(player, RevealAction::BulletImpact)
        ));
        assert!(registry.is_empty());
    }
}
