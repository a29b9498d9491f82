use std::collections::BTreeSet;

use crate::foundation::error::{ReelError, ReelResult};

/// One (video codec, audio codec, container) combination the sink can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodecCandidate {
    /// Human-readable label used in errors and logs.
    pub label: &'static str,
    /// `ffmpeg` video encoder name.
    pub video_encoder: &'static str,
    /// `ffmpeg` audio encoder name.
    pub audio_encoder: &'static str,
    /// `ffmpeg` muxer name.
    pub muxer: &'static str,
    /// MIME type of the container.
    pub mime: &'static str,
    /// File extension of the container.
    pub extension: &'static str,
}

/// Candidates in preference order.
pub const CANDIDATES: [CodecCandidate; 4] = [
    CodecCandidate {
        label: "h264+aac/mp4",
        video_encoder: "libx264",
        audio_encoder: "aac",
        muxer: "mp4",
        mime: "video/mp4",
        extension: "mp4",
    },
    CodecCandidate {
        label: "vp9+opus/webm",
        video_encoder: "libvpx-vp9",
        audio_encoder: "libopus",
        muxer: "webm",
        mime: "video/webm",
        extension: "webm",
    },
    CodecCandidate {
        label: "vp8+vorbis/webm",
        video_encoder: "libvpx",
        audio_encoder: "libvorbis",
        muxer: "webm",
        mime: "video/webm",
        extension: "webm",
    },
    CodecCandidate {
        label: "mpeg4+aac/mp4",
        video_encoder: "mpeg4",
        audio_encoder: "aac",
        muxer: "mp4",
        mime: "video/mp4",
        extension: "mp4",
    },
];

/// Reports which encoders the runtime provides.
pub trait EncoderProbe: Send + Sync {
    /// Names of available encoders.
    fn available_encoders(&self) -> ReelResult<BTreeSet<String>>;
}

/// Asks the system `ffmpeg` (`ffmpeg -hide_banner -encoders`).
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegEncoderProbe;

impl EncoderProbe for FfmpegEncoderProbe {
    fn available_encoders(&self) -> ReelResult<BTreeSet<String>> {
        let out = std::process::Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .output()
            .map_err(|e| ReelError::evaluation(format!("failed to run ffmpeg -encoders: {e}")))?;
        if !out.status.success() {
            return Err(ReelError::evaluation(format!(
                "ffmpeg -encoders failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(parse_encoder_list(&String::from_utf8_lossy(&out.stdout)))
    }
}

/// Fixed encoder set.
#[derive(Clone, Debug, Default)]
pub struct StaticEncoderProbe(pub BTreeSet<String>);

impl StaticEncoderProbe {
    /// Probe reporting exactly `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }
}

impl EncoderProbe for StaticEncoderProbe {
    fn available_encoders(&self) -> ReelResult<BTreeSet<String>> {
        Ok(self.0.clone())
    }
}

/// Parse the table printed by `ffmpeg -encoders`.
///
/// Rows after the `------` separator look like ` V....D libx264   description`.
pub fn parse_encoder_list(stdout: &str) -> BTreeSet<String> {
    stdout
        .lines()
        .skip_while(|l| !l.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            let kind = flags.chars().next()?;
            (flags.len() == 6 && matches!(kind, 'V' | 'A' | 'S')).then(|| name.to_owned())
        })
        .collect()
}

/// First candidate whose encoders are all available. The audio encoder only matters when
/// `with_audio` is set.
pub fn negotiate(probe: &dyn EncoderProbe, with_audio: bool) -> ReelResult<CodecCandidate> {
    let tried = || CANDIDATES.iter().map(|c| c.label.to_owned()).collect();
    let available = match probe.available_encoders() {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!(error = %e, "encoder probe failed");
            return Err(ReelError::EncoderUnsupported { tried: tried() });
        }
    };

    for c in &CANDIDATES {
        let video_ok = available.contains(c.video_encoder);
        let audio_ok = !with_audio || available.contains(c.audio_encoder);
        if video_ok && audio_ok {
            tracing::debug!(candidate = c.label, "encoder negotiated");
            return Ok(*c);
        }
        tracing::debug!(candidate = c.label, video_ok, audio_ok, "encoder candidate rejected");
    }
    Err(ReelError::EncoderUnsupported { tried: tried() })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/negotiate.rs"]
mod tests;
