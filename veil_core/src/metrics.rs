use bevy::prelude::*;

/// Counters describing the invisibility mechanic, refreshed every tick.
#[derive(Resource, Default, Debug, Clone)]
pub struct VeilMetrics {
    pub managed: usize,
    pub fully_hidden: usize,
    pub hidden_from_terrorists: usize,
    pub hidden_from_counter_terrorists: usize,
    pub purged_total: u64,
    pub reveals_total: u64,
    pub withheld_total: u64,
}
