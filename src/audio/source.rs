use serde::{Deserialize, Serialize};

/// Role of an audio source in the mix. A composition holds at most one track per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioTrackKind {
    /// Synthesized or generated background music.
    Soundtrack,
    /// Native audio of the source media.
    OriginalMedia,
}

impl AudioTrackKind {
    /// Fixed gain applied to this kind. There is no ducking.
    pub fn gain(self) -> f32 {
        match self {
            Self::Soundtrack => 0.25,
            Self::OriginalMedia => 1.0,
        }
    }

    /// Short label used in logs and warnings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Soundtrack => "soundtrack",
            Self::OriginalMedia => "original_media",
        }
    }
}

impl std::fmt::Display for AudioTrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One audio input: a resolver source string plus its timeline offset.
///
/// The gain is fixed by [`AudioTrackKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Role of the track.
    pub kind: AudioTrackKind,
    /// Source reference handed to [`crate::AssetResolver::decode_audio`].
    pub source: String,
    /// Timeline time at which the source's first sample plays.
    #[serde(default)]
    pub offset_sec: f64,
}

impl AudioTrack {
    /// Soundtrack at the fixed low gain, starting at zero.
    pub fn soundtrack(source: impl Into<String>) -> Self {
        Self::of_kind(AudioTrackKind::Soundtrack, source)
    }

    /// Original media audio at unity gain, starting at zero.
    pub fn original_media(source: impl Into<String>) -> Self {
        Self::of_kind(AudioTrackKind::OriginalMedia, source)
    }

    pub(crate) fn of_kind(kind: AudioTrackKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            offset_sec: 0.0,
        }
    }

    /// Linear gain, fixed per kind.
    pub fn gain(&self) -> f32 {
        self.kind.gain()
    }

    /// Same track delayed by `offset_sec` (negative values skip into the source).
    pub fn with_offset(mut self, offset_sec: f64) -> Self {
        self.offset_sec = offset_sec;
        self
    }
}
