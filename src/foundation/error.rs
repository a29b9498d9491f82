/// Convenience result type used across reelcast.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// `AssetLoadFailure` and `AudioSourceUnavailable` are recoverable: the export session downgrades
/// them to warnings and keeps going. Every other kind ends the session.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid user-provided configuration or timeline data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while rendering or encoding a frame.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// One asset could not be resolved or decoded.
    #[error("asset load failure for '{source_ref}': {reason}")]
    AssetLoadFailure {
        /// Source reference that failed.
        source_ref: String,
        /// Underlying reason.
        reason: String,
    },

    /// An audio source could not be acquired.
    #[error("audio source '{source_ref}' unavailable: {reason}")]
    AudioSourceUnavailable {
        /// Source reference that failed.
        source_ref: String,
        /// Underlying reason.
        reason: String,
    },

    /// Required assets were still pending when the priming deadline elapsed.
    #[error("asset load timed out after {waited_ms}ms with {pending} required asset(s) pending")]
    AssetLoadTimeout {
        /// Time spent waiting.
        waited_ms: u64,
        /// Required assets still outstanding.
        pending: usize,
    },

    /// No candidate (codec, container) pair is supported by the runtime.
    #[error("no supported encoder among candidates: {}", tried.join(", "))]
    EncoderUnsupported {
        /// Candidate labels in the order they were tried.
        tried: Vec<String>,
    },

    /// The encode sink was finalized without a single frame.
    #[error("no frames captured")]
    NoFramesCaptured,

    /// Another export is already active on this composition.
    #[error("an export session is already active for this composition")]
    SessionBusy,

    /// The session was cancelled by the caller.
    #[error("export cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`ReelError::AssetLoadFailure`] value.
    pub fn asset_load(source_ref: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::AssetLoadFailure {
            source_ref: source_ref.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`ReelError::AudioSourceUnavailable`] value.
    pub fn audio_unavailable(
        source_ref: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::AudioSourceUnavailable {
            source_ref: source_ref.into(),
            reason: reason.to_string(),
        }
    }

    /// Return `true` for kinds the session recovers from.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AssetLoadFailure { .. } | Self::AudioSourceUnavailable { .. }
        )
    }

    /// Return `true` when retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Other(_) | Self::Evaluation(_) | Self::AssetLoadFailure { .. }
        )
    }

    /// Classify a fatal error for [`crate::SessionState::Failed`].
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            Self::AssetLoadTimeout { .. } => FailureReason::AssetLoadTimeout,
            Self::EncoderUnsupported { .. } => FailureReason::EncoderUnsupported,
            Self::NoFramesCaptured => FailureReason::NoFramesCaptured,
            Self::SessionBusy => FailureReason::SessionBusy,
            Self::Cancelled => FailureReason::Cancelled,
            Self::Validation(_) => FailureReason::Invalid,
            _ => FailureReason::Pipeline,
        }
    }
}

/// Fatal outcome classes recorded by the scheduler state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// Required assets did not become ready in time.
    AssetLoadTimeout,
    /// No encoder candidate was accepted.
    EncoderUnsupported,
    /// Nothing was rendered before finalization.
    NoFramesCaptured,
    /// Rejected because another export is active.
    SessionBusy,
    /// Cancelled cooperatively by the caller.
    Cancelled,
    /// Invalid configuration discovered at runtime.
    Invalid,
    /// Any other render, IO or encoder error.
    Pipeline,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
