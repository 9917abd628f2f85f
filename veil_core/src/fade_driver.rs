//! Per-tick fade driver.
//!
//! Once per tick every managed player gets its alpha recomputed from its fade
//! window and rendered onto its pawn and held items. Fully invisible players
//! are also dropped from the radar, and each player sees a progress bar of how
//! visible they currently are.

use bevy::prelude::*;

use crate::{
    fade::{effective_alpha, DormantVisibility},
    host::{CenterHtmlMessage, PlayerRender, RenderHost, ServerClock},
    metrics::VeilMetrics,
    registry::VisibilityRegistry,
    veil_config::{ProgressBarConfig, VeilConfigHandle},
};

/// Outcome of one sweep over the registry.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Players rendered this tick with the alpha applied.
    pub rendered: Vec<(Entity, u8)>,
    /// Players dropped because the host no longer considers them valid.
    pub purged: Vec<Entity>,
    pub fully_hidden: usize,
}

/// Advance every managed player's opacity for `now`.
///
/// Each player is processed in isolation: a render failure for one player is
/// logged and does not stop the sweep.
pub fn sweep_fades<H: RenderHost>(
    registry: &mut VisibilityRegistry,
    host: &mut H,
    now: f32,
    dormant: DormantVisibility,
) -> SweepReport {
    let mut report = SweepReport::default();

    for (player, window) in registry.iter() {
        if !host.is_valid(player) {
            report.purged.push(player);
            continue;
        }

        let alpha = effective_alpha(now, window, dormant);
        if alpha == 0 {
            report.fully_hidden += 1;
            if let Err(err) = host.clear_spotted(player) {
                tracing::warn!(
                    target: "veil::fade",
                    ?player,
                    error = %err,
                    "fade.clear_spotted_failed"
                );
            }
        }

        if let Err(err) = host.apply_opacity(player, alpha) {
            tracing::warn!(
                target: "veil::fade",
                ?player,
                alpha,
                error = %err,
                "fade.render_failed"
            );
            continue;
        }
        report.rendered.push((player, alpha));
    }

    for player in &report.purged {
        registry.remove(*player);
        tracing::debug!(target: "veil::fade", ?player, "fade.purged");
    }

    report
}

/// Left neutral, visible and right neutral cell counts of the HUD bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBar {
    pub left: usize,
    pub visible: usize,
    pub right: usize,
}

impl ProgressBar {
    pub fn from_alpha(alpha: u8, width: usize) -> Self {
        let visible = alpha as usize * width / 255;
        let left = (width - visible) / 2;
        let right = width - visible - left;
        Self {
            left,
            visible,
            right,
        }
    }

    pub fn to_html(&self, style: &ProgressBarConfig) -> String {
        let mut html = String::new();
        for (color, cells) in [
            (&style.neutral_color, self.left),
            (&style.visible_color, self.visible),
            (&style.neutral_color, self.right),
        ] {
            html.push_str("<font color='");
            html.push_str(color);
            html.push_str("'>");
            html.push_str(&style.glyph.repeat(cells));
            html.push_str("</font>");
        }
        html
    }
}

pub fn drive_fades(
    clock: Res<ServerClock>,
    config: Res<VeilConfigHandle>,
    mut registry: ResMut<VisibilityRegistry>,
    mut host: PlayerRender,
    mut messages: EventWriter<CenterHtmlMessage>,
    mut metrics: ResMut<VeilMetrics>,
) {
    if registry.is_empty() {
        metrics.managed = 0;
        metrics.fully_hidden = 0;
        return;
    }

    let cfg = config.0.as_ref();
    let report = sweep_fades(&mut registry, &mut host, clock.now, cfg.dormant_visibility);

    if cfg.progress_bar.enabled {
        for (player, alpha) in &report.rendered {
            let bar = ProgressBar::from_alpha(*alpha, cfg.progress_bar.width);
            messages.send(CenterHtmlMessage {
                recipient: *player,
                html: bar.to_html(&cfg.progress_bar),
            });
        }
    }

    metrics.managed = registry.len();
    metrics.fully_hidden = report.fully_hidden;
    metrics.purged_total += report.purged.len() as u64;

    tracing::trace!(
        target: "veil::fade",
        now = clock.now,
        rendered = report.rendered.len(),
        purged = report.purged.len(),
        fully_hidden = report.fully_hidden,
        "fade.swept"
    );
}
