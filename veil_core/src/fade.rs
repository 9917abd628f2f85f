//! Fade timing model.
//!
//! A [`FadeWindow`] records when a reveal started and when the player is fully
//! invisible again. Opacity is never stored: it is recomputed from the window
//! and the current clock every time it is needed, so the fade driver and the
//! transmission filter always agree for the same tick.

use serde::Deserialize;

/// Opacity of a fully visible entity.
pub const FULL_OPACITY: f32 = 255.0;

/// Reveal interval in absolute server-clock seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeWindow {
    pub start: f32,
    pub end: f32,
}

impl FadeWindow {
    /// No countdown armed; the player has not been revealed since the toggle.
    pub const DORMANT: Self = Self {
        start: -1.0,
        end: -1.0,
    };

    /// Window that reveals at `now` and fades out over `duration` seconds.
    ///
    /// Negative and non-finite durations collapse to an instant fade.
    pub fn starting_at(now: f32, duration: f32) -> Self {
        let duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        Self {
            start: now,
            end: now + duration,
        }
    }

    pub fn is_dormant(&self) -> bool {
        *self == Self::DORMANT
    }

    /// Whether `now` falls inside the fading interval `[start, end)`.
    pub fn is_fading(&self, now: f32) -> bool {
        !self.is_dormant() && now >= self.start && now < self.end
    }

    pub fn opacity(&self, now: f32) -> f32 {
        opacity(now, *self)
    }

    pub fn alpha(&self, now: f32) -> u8 {
        alpha(now, *self)
    }
}

impl Default for FadeWindow {
    fn default() -> Self {
        Self::DORMANT
    }
}

/// What a dormant (never revealed) window renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DormantVisibility {
    /// Fully visible until the first reveal action starts a fade.
    Visible,
    /// Fully invisible as soon as the player is toggled on.
    #[default]
    Hidden,
}

/// Opacity in `[0, 255]` for `window` at `now`.
pub fn opacity(now: f32, window: FadeWindow) -> f32 {
    if window.is_dormant() {
        return FULL_OPACITY;
    }
    if !window.is_fading(now) {
        return 0.0;
    }
    remap(now, window.start, window.end, FULL_OPACITY, 0.0)
}

/// Opacity as a render alpha byte.
pub fn alpha(now: f32, window: FadeWindow) -> u8 {
    opacity(now, window).clamp(0.0, FULL_OPACITY) as u8
}

/// Alpha the driver renders, applying the dormant policy to unrevealed windows.
pub fn effective_alpha(now: f32, window: FadeWindow, dormant: DormantVisibility) -> u8 {
    match (window.is_dormant(), dormant) {
        (true, DormantVisibility::Hidden) => 0,
        _ => alpha(now, window),
    }
}

fn remap(value: f32, from_min: f32, from_max: f32, to_min: f32, to_max: f32) -> f32 {
    let normalized = (value - from_min) / (from_max - from_min);
    to_min + normalized * (to_max - to_min)
}
