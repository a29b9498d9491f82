use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::audio::source::{AudioTrack, AudioTrackKind};
use crate::composition::config::CompositionConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::session::export::Composition;
use crate::timeline::model::TimelineInput;

/// Audio reference inside a project file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioSourceDef {
    /// Resolver source string.
    pub source: String,
    /// Timeline time of the first sample.
    #[serde(default)]
    pub offset_sec: f64,
}

impl AudioSourceDef {
    fn track(&self, kind: AudioTrackKind) -> AudioTrack {
        AudioTrack::of_kind(kind, self.source.clone()).with_offset(self.offset_sec)
    }
}

/// JSON project: config, timeline input, optional audio and caption font.
///
/// ```json
/// {
///   "config": { "fps": 30, "total_duration_sec": 15.0 },
///   "timeline": { "entries": [ { "source": { "kind": "image", "source": "a.png" } } ] },
///   "soundtrack": { "source": "music.wav" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProjectDef {
    /// Composition settings.
    #[serde(default)]
    pub config: CompositionConfig,
    /// Entries and captions.
    pub timeline: TimelineInput,
    /// Background music.
    #[serde(default)]
    pub soundtrack: Option<AudioSourceDef>,
    /// Native audio of the source media.
    #[serde(default)]
    pub original_audio: Option<AudioSourceDef>,
    /// Font used for captions.
    #[serde(default)]
    pub caption_font: Option<String>,
}

impl ProjectDef {
    /// Parse a project from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        serde_json::from_reader(r).map_err(|e| ReelError::serde(format!("parse project JSON: {e}")))
    }

    /// Parse a project from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open project JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Validate and build the composition.
    pub fn into_composition(self) -> ReelResult<Composition> {
        let mut b = Composition::builder(self.config, self.timeline);
        if let Some(s) = &self.soundtrack {
            b = b.soundtrack(s.track(AudioTrackKind::Soundtrack));
        }
        if let Some(s) = &self.original_audio {
            b = b.original_audio(s.track(AudioTrackKind::OriginalMedia));
        }
        if let Some(font) = self.caption_font {
            b = b.caption_font(font);
        }
        b.build()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/project.rs"]
mod tests;
