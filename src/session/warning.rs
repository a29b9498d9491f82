use crate::audio::source::AudioTrackKind;

/// Non-fatal problem surfaced alongside a successful export.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ExportWarning {
    /// A segment's asset failed to load; the segment renders as background.
    #[error("segment {segment}: asset '{source_ref}' failed to load: {reason}")]
    AssetLoadFailure {
        /// Index of the affected segment.
        segment: usize,
        /// Source reference that failed.
        source_ref: String,
        /// Underlying reason.
        reason: String,
    },

    /// An audio source was omitted from the mix.
    #[error("{track} audio '{source_ref}' unavailable: {reason}")]
    AudioSourceUnavailable {
        /// Which track was dropped.
        track: AudioTrackKind,
        /// Source reference that failed.
        source_ref: String,
        /// Underlying reason.
        reason: String,
    },

    /// Captions were skipped because no font could be loaded.
    #[error("captions skipped: {reason}")]
    CaptionsSkipped {
        /// Underlying reason.
        reason: String,
    },
}
