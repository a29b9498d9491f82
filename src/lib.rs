//! reelcast turns a timeline of stills (or a source video), timed captions and up to two audio
//! sources into one synchronized audio/video container.
//!
//! The public API is session-oriented:
//!
//! - Build a [`Composition`] from a [`CompositionConfig`] and a [`TimelineInput`]
//! - Acquire an [`ExportSession`] with [`Composition::start_export`]
//! - Drive it into an [`EncodeSink`] ([`FfmpegSink`] or [`InMemorySink`])
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Asset resolution, decoding and media probing.
pub mod assets;
/// Audio tracks and the per-tick mixer.
pub mod audio;
/// Composition configuration and project files.
pub mod composition;
/// Pixel compositing and segment transitions.
pub mod effects;
/// Encode sinks and codec negotiation.
pub mod encode;
/// Caption selection and drawing.
pub mod overlay;
/// Frame composition.
pub mod render;
/// Export sessions and the tick scheduler.
pub mod session;
/// Timeline model and lookup.
pub mod timeline;

pub use crate::foundation::clock::{Clock, ManualClock, SystemClock};
pub use crate::foundation::core::{Canvas, Fps, FrameIndex};
pub use crate::foundation::error::{FailureReason, ReelError, ReelResult};
pub use crate::foundation::retry::RetryPolicy;

pub use crate::assets::resolve::{AssetResolver, FsResolver};
pub use crate::audio::source::{AudioTrack, AudioTrackKind};
pub use crate::composition::config::{
    AspectRatio, CaptionMode, CompositionConfig, TransitionPolicy,
};
pub use crate::composition::project::ProjectDef;
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::negotiate::{CodecCandidate, EncoderProbe, FfmpegEncoderProbe};
pub use crate::encode::sink::{AudioFormat, EncodeSink, EncodedOutput, InMemorySink, SinkConfig};
pub use crate::render::frame::RenderFrame;
pub use crate::session::export::{
    Composition, CompositionBuilder, ExportOpts, ExportOutcome, ExportSession, StillFrame,
};
pub use crate::session::scheduler::{CancelToken, SessionState};
pub use crate::session::warning::ExportWarning;
pub use crate::timeline::build::Timeline;
pub use kurbo::Vec2;

pub use crate::timeline::model::{
    CaptionEvent, EffectParams, SourceRef, TimelineEntry, TimelineInput, TimelineSegment,
    TransitionKind, WordTiming,
};
