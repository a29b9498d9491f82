use crate::composition::config::{CaptionMode, TransitionPolicy};
use kurbo::Vec2;

/// Reference to an external media source, resolved by an [`crate::AssetResolver`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRef {
    /// Still image (PNG, JPEG, ...).
    Image {
        /// Resolver-specific source string (relative path by default).
        source: String,
    },
    /// Video file; requires the `media-ffmpeg` feature to decode.
    Video {
        /// Resolver-specific source string (relative path by default).
        source: String,
    },
    /// Audio file; requires the `media-ffmpeg` feature unless the resolver decodes it.
    Audio {
        /// Resolver-specific source string (relative path by default).
        source: String,
    },
}

impl SourceRef {
    /// Image reference.
    pub fn image(source: impl Into<String>) -> Self {
        Self::Image {
            source: source.into(),
        }
    }

    /// Video reference.
    pub fn video(source: impl Into<String>) -> Self {
        Self::Video {
            source: source.into(),
        }
    }

    /// Audio reference.
    pub fn audio(source: impl Into<String>) -> Self {
        Self::Audio {
            source: source.into(),
        }
    }

    /// The resolver-specific source string.
    pub fn source(&self) -> &str {
        match self {
            Self::Image { source } | Self::Video { source } | Self::Audio { source } => source,
        }
    }

    /// Whether this reference can be drawn as a segment.
    pub fn is_visual(&self) -> bool {
        matches!(self, Self::Image { .. } | Self::Video { .. })
    }
}

/// Resolved transition at one segment boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// `(1 - t) * A + t * B`.
    Fade,
    /// A moves by `-t * W`, B by `(1 - t) * W`.
    Slide,
    /// A shrinks while fading out, B grows in while fading in.
    Zoom,
    /// A until `t == 1`, then B.
    Cut,
}

impl TransitionKind {
    /// Order used when resolving [`TransitionPolicy::Random`].
    pub const CYCLE: [TransitionKind; 4] = [Self::Fade, Self::Slide, Self::Zoom, Self::Cut];
}

/// Per-segment motion parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EffectParams {
    /// Extra zoom reached at the end of the segment (`0.08` = 8% larger).
    pub ken_burns_zoom: f64,
    /// Pan reached at the end of the segment, as a fraction of canvas width/height.
    pub pan: Vec2,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            ken_burns_zoom: 0.08,
            pan: Vec2::ZERO,
        }
    }
}

impl EffectParams {
    /// No motion; the default for video segments.
    pub fn still() -> Self {
        Self {
            ken_burns_zoom: 0.0,
            pan: Vec2::ZERO,
        }
    }
}

/// A contiguous `[start_sec, end_sec)` range of the output assigned to one source.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimelineSegment {
    /// Stable identifier.
    pub id: String,
    /// Source drawn during this segment.
    pub source: SourceRef,
    /// Inclusive start time.
    pub start_sec: f64,
    /// Exclusive end time.
    pub end_sec: f64,
    /// Transition blending this segment in (the previous segment's `transition_out`).
    pub transition_in: Option<TransitionKind>,
    /// Transition blending the next segment in; `None` for the last segment.
    pub transition_out: Option<TransitionKind>,
    /// Ken Burns parameters.
    #[serde(default)]
    pub effect: EffectParams,
}

impl TimelineSegment {
    /// Local duration in seconds.
    pub fn duration_sec(&self) -> f64 {
        self.end_sec - self.start_sec
    }

    /// Return `true` when `t` is inside `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        self.start_sec <= t && t < self.end_sec
    }
}

/// Upstream per-word timestamps for one caption.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WordTiming {
    /// Word start in output time.
    pub start_sec: f64,
    /// Word end in output time.
    pub end_sec: f64,
}

/// Timed caption text.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaptionEvent {
    /// Stable identifier.
    #[serde(default)]
    pub id: String,
    /// Inclusive start.
    pub start_sec: f64,
    /// Inclusive end.
    pub end_sec: f64,
    /// Caption text; words are split on whitespace.
    pub text: String,
    /// Display-mode hint overriding the composition default.
    #[serde(default)]
    pub mode: Option<CaptionMode>,
    /// Optional per-word timings aligned with the whitespace-split words.
    #[serde(default)]
    pub words: Option<Vec<WordTiming>>,
}

impl CaptionEvent {
    /// Caption with no hints.
    pub fn new(start_sec: f64, end_sec: f64, text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            start_sec,
            end_sec,
            text: text.into(),
            mode: None,
            words: None,
        }
    }
}

/// One entry of the timeline input delivered by the content-analysis collaborator.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimelineEntry {
    /// Optional identifier; defaults to `seg-<index>`.
    #[serde(default)]
    pub id: Option<String>,
    /// Source drawn for this entry.
    pub source: SourceRef,
    /// Relative duration weight (seconds are a natural unit but only ratios matter).
    #[serde(default)]
    pub duration_hint: Option<f64>,
    /// Transition into the next entry, overriding the composition policy.
    #[serde(default)]
    pub transition: Option<TransitionPolicy>,
    /// Ken Burns parameters; defaults depend on the source kind.
    #[serde(default)]
    pub effect: Option<EffectParams>,
}

impl TimelineEntry {
    /// Entry with no hints.
    pub fn new(source: SourceRef) -> Self {
        Self {
            id: None,
            source,
            duration_hint: None,
            transition: None,
            effect: None,
        }
    }
}

/// Ordered timeline input plus optional captions.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimelineInput {
    /// Ordered entries.
    pub entries: Vec<TimelineEntry>,
    /// Caption events, any order.
    #[serde(default)]
    pub captions: Vec<CaptionEvent>,
}
