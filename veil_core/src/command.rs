//! Admin toggle command (`css_invis` / `css_invisible`).

use bevy::prelude::*;
use bitflags::bitflags;
use veil_runtime::{parse_invis_target, TargetSelector, TeamSide};

use crate::{
    error::VeilError,
    host::{PlayerController, PlayerHost},
    registry::{ToggleOutcome, VisibilityRegistry},
    veil_config::{VeilConfig, VeilConfigHandle},
};

bitflags! {
    /// Admin permissions held by a player controller.
    #[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AdminFlags: u32 {
        const GENERIC = 1 << 0;
        const KICK = 1 << 1;
        const BAN = 1 << 2;
        const SLAY = 1 << 3;
        const CHANGEMAP = 1 << 4;
        const CHEATS = 1 << 5;
        const CONFIG = 1 << 6;
        const ROOT = 1 << 31;
    }
}

impl AdminFlags {
    /// Flag named by a permission string such as `@css/generic`.
    pub fn from_permission(permission: &str) -> Option<Self> {
        let name = permission.trim().strip_prefix("@css/")?;
        match name.to_ascii_lowercase().as_str() {
            "generic" => Some(Self::GENERIC),
            "kick" => Some(Self::KICK),
            "ban" => Some(Self::BAN),
            "slay" => Some(Self::SLAY),
            "changemap" => Some(Self::CHANGEMAP),
            "cheats" => Some(Self::CHEATS),
            "config" => Some(Self::CONFIG),
            "root" => Some(Self::ROOT),
            _ => None,
        }
    }

    /// Root implies every other flag.
    pub fn grants(self, required: AdminFlags) -> bool {
        self.contains(Self::ROOT) || self.contains(required)
    }
}

/// How many players one command invocation toggled each way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToggleSummary {
    pub made_invisible: usize,
    pub made_visible: usize,
}

impl ToggleSummary {
    fn record(&mut self, outcome: ToggleOutcome) {
        match outcome {
            ToggleOutcome::MadeInvisible => self.made_invisible += 1,
            ToggleOutcome::MadeVisible => self.made_visible += 1,
        }
    }

    /// Reply shown to the issuer.
    pub fn feedback(&self) -> String {
        let mut parts = Vec::new();
        if self.made_invisible > 0 {
            parts.push(format!(
                "made {} player(s) invisible",
                self.made_invisible
            ));
        }
        if self.made_visible > 0 {
            parts.push(format!("made {} player(s) visible", self.made_visible));
        }
        format!("Successfully {}.", parts.join(" and "))
    }
}

struct Candidate {
    entity: Entity,
    user_id: u32,
    name: String,
}

/// Resolve `selector` against every currently valid player.
///
/// Results are ordered by user id. Nothing is mutated.
pub fn resolve_targets(
    world: &mut World,
    selector: &TargetSelector,
) -> Result<Vec<Entity>, VeilError> {
    let mut query = world.query::<(Entity, &PlayerController)>();
    let world: &World = world;
    let mut candidates: Vec<(Candidate, Option<TeamSide>)> = query
        .iter(world)
        .filter(|(entity, _)| world.is_valid(*entity))
        .map(|(entity, controller)| {
            (
                Candidate {
                    entity,
                    user_id: controller.user_id,
                    name: controller.name.clone(),
                },
                controller.side,
            )
        })
        .collect();
    candidates.sort_by_key(|(candidate, _)| candidate.user_id);

    let (label, matched): (String, Vec<Candidate>) = match selector {
        TargetSelector::All => (
            "@all".to_string(),
            candidates.into_iter().map(|(c, _)| c).collect(),
        ),
        TargetSelector::Side(side) => (
            format!("@{side}"),
            candidates
                .into_iter()
                .filter(|(_, candidate_side)| *candidate_side == Some(*side))
                .map(|(c, _)| c)
                .collect(),
        ),
        TargetSelector::Pattern(pattern) => {
            let user_id = selector.user_id();
            let needle = pattern.to_lowercase();
            let found: Vec<Candidate> = candidates
                .into_iter()
                .map(|(c, _)| c)
                .filter(|c| Some(c.user_id) == user_id || c.name.to_lowercase().contains(&needle))
                .collect();
            (pattern.clone(), narrow_pattern_matches(pattern, &needle, found)?)
        }
    };

    if matched.is_empty() {
        return Err(VeilError::TargetNotFound(label));
    }
    Ok(matched.into_iter().map(|c| c.entity).collect())
}

/// `needle` is the pattern folded the same way names are folded for matching.
fn narrow_pattern_matches(
    pattern: &str,
    needle: &str,
    found: Vec<Candidate>,
) -> Result<Vec<Candidate>, VeilError> {
    if found.len() <= 1 {
        return Ok(found);
    }
    let mut exact: Vec<Candidate> = found
        .into_iter()
        .filter(|c| c.name.to_lowercase() == needle)
        .collect();
    if exact.len() == 1 {
        return Ok(exact.split_off(0));
    }
    Err(VeilError::AmbiguousTarget(pattern.to_string()))
}

fn check_permission(world: &World, issuer: Option<Entity>) -> Result<(), VeilError> {
    let Some(issuer) = issuer else {
        return Ok(());
    };
    let permission = world
        .get_resource::<VeilConfigHandle>()
        .map(|handle| handle.0.command_permission.clone())
        .unwrap_or_else(|| "@css/generic".to_string());
    let required = AdminFlags::from_permission(&permission).unwrap_or_else(|| {
        tracing::warn!(
            target: "veil::command",
            permission = %permission,
            "command.unknown_permission"
        );
        AdminFlags::ROOT
    });
    let held = world.get::<AdminFlags>(issuer).copied().unwrap_or_default();
    if held.grants(required) {
        Ok(())
    } else {
        Err(VeilError::PermissionDenied)
    }
}

/// Run the toggle command for `issuer` (`None` is the server console).
///
/// Each resolved player is toggled independently. Errors leave the registry
/// untouched; their `Display` text is the reply for the issuer.
pub fn run_invis_command(
    world: &mut World,
    issuer: Option<Entity>,
    args: &[&str],
) -> Result<ToggleSummary, VeilError> {
    check_permission(world, issuer)?;
    let selector = parse_invis_target(args)?;
    toggle_selected(world, issuer, &selector)
}

/// Toggle every player matched by an already parsed `selector`. The caller
/// is responsible for checking the issuer's permission.
pub fn toggle_selected(
    world: &mut World,
    issuer: Option<Entity>,
    selector: &TargetSelector,
) -> Result<ToggleSummary, VeilError> {
    let targets = resolve_targets(world, selector)?;

    let mut summary = ToggleSummary::default();
    world.init_resource::<VisibilityRegistry>();
    world.resource_scope(|world, mut registry: Mut<VisibilityRegistry>| {
        for player in &targets {
            summary.record(registry.toggle(*player, world));
        }
    });

    tracing::info!(
        target: "veil::command",
        ?issuer,
        ?selector,
        made_invisible = summary.made_invisible,
        made_visible = summary.made_visible,
        "command.invis"
    );
    Ok(summary)
}

/// Route a console or chat command. Returns `None` when `command` is not one
/// of the configured toggle aliases.
pub fn dispatch_command(
    world: &mut World,
    issuer: Option<Entity>,
    command: &str,
    args: &[&str],
) -> Option<Result<ToggleSummary, VeilError>> {
    let is_alias = match world.get_resource::<VeilConfigHandle>() {
        Some(handle) => handle.0.is_command_alias(command),
        None => VeilConfig::default().is_command_alias(command),
    };
    is_alias.then(|| run_invis_command(world, issuer, args))
}
