//! Invisibility core for a team-based shooter server.
//!
//! Admins toggle players into a managed invisible state. Managed players fade
//! from fully visible to fully transparent after each attention-drawing
//! action, and while fully transparent they are withheld from the replication
//! frames of the opposing side. Everything runs inside [`VeilPlugin`], one
//! pass per [`App::update`].

pub mod command;
pub mod error;
pub mod fade;
pub mod fade_driver;
pub mod host;
pub mod metrics;
pub mod registry;
pub mod reveal;
pub mod round_rules;
pub mod transmit;
pub mod veil_config;

use bevy::{app::AppExit, prelude::*};

pub use command::{
    dispatch_command, resolve_targets, run_invis_command, toggle_selected, AdminFlags,
    ToggleSummary,
};
pub use error::VeilError;
pub use fade::{alpha, effective_alpha, opacity, DormantVisibility, FadeWindow};
pub use fade_driver::{sweep_fades, ProgressBar, SweepReport};
pub use host::{
    CenterHtmlMessage, HeldItems, PlayerController, PlayerHost, PlayerPawn, PlayerRender, Players,
    RenderColor, RenderHost, ServerClock, SpottedState,
};
pub use metrics::VeilMetrics;
pub use registry::{ToggleOutcome, VisibilityRegistry};
pub use reveal::{dispatch_reveal, RevealDurations, RevealEvent};
pub use round_rules::{MapStarted, RoundRules, RoundRulesCache};
pub use transmit::{build_hide_sets, apply_hide_sets, HideSets, TransmitFrame, TransmitInfo};
pub use veil_config::{
    load_veil_config_from_env, ProgressBarConfig, VeilConfig, VeilConfigError, VeilConfigHandle,
    VeilConfigMetadata,
};
pub use veil_runtime::{RevealAction, TargetSelector, TeamSide};

/// Stages of one tick, run in declaration order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VeilSet {
    /// Map-start reset and round-rules sync.
    Housekeeping,
    /// Drain reveal events into the registry.
    Reveal,
    /// Recompute and render every managed player's opacity.
    Fade,
    /// Strip fully invisible players from opposing receivers.
    Transmit,
}

/// Installs the registry, events and per-tick systems.
///
/// A [`VeilConfigHandle`] inserted before the plugin is kept; otherwise the
/// configuration is loaded from `VEIL_CONFIG_PATH` or the builtin copy.
#[derive(Debug, Default)]
pub struct VeilPlugin;

impl Plugin for VeilPlugin {
    fn build(&self, app: &mut App) {
        if !app.world.contains_resource::<VeilConfigHandle>() {
            let (config, metadata) = load_veil_config_from_env();
            app.insert_resource(VeilConfigHandle::new(config))
                .insert_resource(metadata);
        }

        app.init_resource::<VeilConfigMetadata>()
            .init_resource::<VisibilityRegistry>()
            .init_resource::<TransmitFrame>()
            .init_resource::<VeilMetrics>()
            .init_resource::<RoundRulesCache>()
            .init_resource::<ServerClock>()
            .add_event::<RevealEvent>()
            .add_event::<CenterHtmlMessage>()
            .add_event::<MapStarted>()
            .configure_sets(
                Update,
                (
                    VeilSet::Housekeeping,
                    VeilSet::Reveal,
                    VeilSet::Fade,
                    VeilSet::Transmit,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    (round_rules::reset_on_map_start, round_rules::sync_round_rules)
                        .chain()
                        .in_set(VeilSet::Housekeeping),
                    reveal::apply_reveal_events.in_set(VeilSet::Reveal),
                    fade_driver::drive_fades.in_set(VeilSet::Fade),
                    transmit::filter_transmissions.in_set(VeilSet::Transmit),
                ),
            )
            .add_systems(Last, restore_on_exit);
    }
}

fn restore_on_exit(
    mut exits: EventReader<AppExit>,
    mut registry: ResMut<VisibilityRegistry>,
    mut host: PlayerRender,
) {
    if exits.read().last().is_none() || registry.is_empty() {
        return;
    }
    let restored = registry.clear_all(&mut host);
    tracing::info!(target: "veil::plugin", restored, "veil.exit_restored");
}

/// Restore every managed player to full opacity and empty the registry.
///
/// Restoration continues past players that can no longer be rendered.
/// Returns how many players were under management.
pub fn unload(world: &mut World) -> usize {
    let Some(mut registry) = world.remove_resource::<VisibilityRegistry>() else {
        return 0;
    };
    let restored = registry.clear_all(world);
    world.insert_resource(registry);
    tracing::info!(target: "veil::plugin", restored, "veil.unloaded");
    restored
}

/// Construct a Bevy [`App`] with the invisibility pipeline installed.
pub fn build_headless_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins).add_plugins(VeilPlugin);
    app
}

/// Advance the clock by `seconds` and run one tick.
pub fn run_tick(app: &mut App, seconds: f32) {
    app.world.resource_mut::<ServerClock>().advance(seconds);
    app.update();
}
