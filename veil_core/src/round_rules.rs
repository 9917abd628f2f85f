//! Map-scoped round rules.
//!
//! The rules entity belongs to the current map, so the cached handle is
//! dropped whenever a map starts and re-resolved lazily on a later tick. A
//! map without rules is tolerated.

use bevy::prelude::*;

use crate::{error::VeilError, host::ServerClock};

/// Host game rules that carry the round-restart timer.
#[derive(Component, Debug, Clone, Default)]
pub struct RoundRules {
    pub restart_round_time: f32,
    pub game_restart: bool,
}

/// Sent by the host when a new map has loaded.
#[derive(Event, Debug, Clone)]
pub struct MapStarted {
    pub name: String,
}

#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct RoundRulesCache {
    rules: Option<Entity>,
    initialized: bool,
}

impl RoundRulesCache {
    pub fn rules(&self) -> Option<Entity> {
        self.rules
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn reset(&mut self) {
        self.rules = None;
        self.initialized = false;
    }
}

pub fn reset_on_map_start(
    mut events: EventReader<MapStarted>,
    mut cache: ResMut<RoundRulesCache>,
) {
    for event in events.read() {
        cache.reset();
        tracing::info!(target: "veil::round_rules", map = %event.name, "map.started");
    }
}

/// Keep the round-restart flag in step with the restart timer.
pub fn sync_round_rules(
    clock: Res<ServerClock>,
    mut cache: ResMut<RoundRulesCache>,
    mut rules: Query<(Entity, &mut RoundRules)>,
) {
    if !cache.initialized {
        let Some((entity, _)) = rules.iter().next() else {
            tracing::trace!(
                target: "veil::round_rules",
                error = %VeilError::MissingHostState("round_rules"),
                "round_rules.unresolved"
            );
            return;
        };
        cache.rules = Some(entity);
        cache.initialized = true;
        tracing::debug!(target: "veil::round_rules", ?entity, "round_rules.resolved");
    }

    let Some(entity) = cache.rules else {
        return;
    };
    match rules.get_mut(entity) {
        Ok((_, mut round)) => {
            let restart = round.restart_round_time < clock.now;
            if round.game_restart != restart {
                round.game_restart = restart;
            }
        }
        Err(_) => {
            tracing::trace!(
                target: "veil::round_rules",
                ?entity,
                error = %VeilError::MissingHostState("round_rules"),
                "round_rules.lost"
            );
            cache.reset();
        }
    }
}
