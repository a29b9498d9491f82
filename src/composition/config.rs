use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::model::TransitionKind;

/// Output aspect ratio. Dimensions are derived from [`CompositionConfig::short_edge_px`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatio {
    /// 16:9.
    #[default]
    Landscape,
    /// 9:16.
    Portrait,
    /// 1:1.
    Square,
}

impl AspectRatio {
    /// Output canvas for a given short edge, with both sides rounded to even pixel counts.
    pub fn canvas(self, short_edge_px: u32) -> Canvas {
        let short = round_even(short_edge_px);
        let long = round_even(((u64::from(short) * 16 + 4) / 9) as u32);
        match self {
            Self::Landscape => Canvas {
                width: long,
                height: short,
            },
            Self::Portrait => Canvas {
                width: short,
                height: long,
            },
            Self::Square => Canvas {
                width: short,
                height: short,
            },
        }
    }
}

fn round_even(v: u32) -> u32 {
    let v = v.max(2);
    if v.is_multiple_of(2) { v } else { v + 1 }
}

/// How segment boundaries are blended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Straight alpha cross-dissolve.
    #[default]
    Fade,
    /// Outgoing slides left while incoming slides in from the right.
    Slide,
    /// Outgoing shrinks and fades while incoming grows in.
    Zoom,
    /// Hard swap at the boundary.
    Cut,
    /// Fixed per-segment choice cycling through fade, slide, zoom, cut.
    Random,
}

impl TransitionPolicy {
    /// Resolve the policy for the boundary after segment `index`.
    ///
    /// `Random` is resolved from the index alone, so the same timeline always yields the same
    /// choices.
    pub fn resolve(self, index: usize) -> TransitionKind {
        match self {
            Self::Fade => TransitionKind::Fade,
            Self::Slide => TransitionKind::Slide,
            Self::Zoom => TransitionKind::Zoom,
            Self::Cut => TransitionKind::Cut,
            Self::Random => TransitionKind::CYCLE[index % TransitionKind::CYCLE.len()],
        }
    }
}

/// Caption presentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionMode {
    /// Captions are not drawn.
    Hidden,
    /// Whole caption text in one color.
    #[default]
    Full,
    /// Whole caption with the currently spoken word highlighted.
    Highlight,
}

/// Immutable per-session composition settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Output aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Length of the short canvas edge in pixels.
    pub short_edge_px: u32,
    /// Output frames per second.
    pub fps: u32,
    /// Total output duration in seconds.
    pub total_duration_sec: f64,
    /// Default transition at segment boundaries.
    pub transition: TransitionPolicy,
    /// Fade in from the background at the start.
    pub include_intro_fade: bool,
    /// Fade out to the background at the end.
    pub include_outro_fade: bool,
    /// Caption presentation.
    pub caption_mode: CaptionMode,
    /// Opaque background color (straight RGBA8, alpha must be 255).
    pub background_rgba: [u8; 4],
    /// Trailing fraction of each segment used as its transition window.
    pub transition_fraction: f64,
    /// Length of the intro/outro fade envelope in seconds.
    pub fade_sec: f64,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Landscape,
            short_edge_px: 720,
            fps: 30,
            total_duration_sec: 10.0,
            transition: TransitionPolicy::Fade,
            include_intro_fade: false,
            include_outro_fade: false,
            caption_mode: CaptionMode::Full,
            background_rgba: [0, 0, 0, 255],
            transition_fraction: 0.2,
            fade_sec: 1.0,
        }
    }
}

impl CompositionConfig {
    /// Validate value ranges.
    pub fn validate(&self) -> ReelResult<()> {
        if self.fps == 0 {
            return Err(ReelError::validation("fps must be > 0"));
        }
        if !self.total_duration_sec.is_finite() || self.total_duration_sec <= 0.0 {
            return Err(ReelError::validation(
                "total_duration_sec must be finite and > 0",
            ));
        }
        if self.short_edge_px < 2 || self.short_edge_px > 4096 {
            return Err(ReelError::validation(
                "short_edge_px must be within [2, 4096]",
            ));
        }
        if self.background_rgba[3] != 255 {
            return Err(ReelError::validation("background_rgba must be opaque"));
        }
        if !self.transition_fraction.is_finite()
            || self.transition_fraction <= 0.0
            || self.transition_fraction >= 1.0
        {
            return Err(ReelError::validation(
                "transition_fraction must be within (0, 1)",
            ));
        }
        if !self.fade_sec.is_finite() || self.fade_sec < 0.0 {
            return Err(ReelError::validation("fade_sec must be finite and >= 0"));
        }
        Ok(())
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.aspect_ratio.canvas(self.short_edge_px)
    }

    /// Output frame rate.
    pub fn frame_rate(&self) -> ReelResult<Fps> {
        Fps::new(self.fps, 1)
    }

    /// Number of ticks a full session produces.
    pub fn total_ticks(&self) -> ReelResult<u64> {
        Ok(self.frame_rate()?.frames_to_cover_secs(self.total_duration_sec))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/config.rs"]
mod tests;
