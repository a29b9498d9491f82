use std::path::{Path, PathBuf};

use crate::assets::decode::PreparedImage;
use crate::audio::mix::MIX_CHANNELS;
use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};

/// Sample rate of the mix bus.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Video stream facts needed to place, pace and end a video segment.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoSourceInfo {
    /// Local path the source was probed from.
    pub source_path: PathBuf,
    /// Coded width.
    pub width: u32,
    /// Coded height.
    pub height: u32,
    /// Native frame rate, when the container reports one.
    pub frame_rate: Option<Fps>,
    /// Container duration, `0.0` when unknown.
    pub duration_sec: f64,
    /// Whether the container also carries audio for the mix.
    pub has_audio: bool,
}

impl VideoSourceInfo {
    /// Map a segment-local timeline offset to a source time.
    ///
    /// Returns `None` once the offset reaches the probed duration, which is the end of the
    /// source's stream. Sources with an unknown (zero) duration never end.
    pub fn source_time_sec(&self, local_sec: f64) -> Option<f64> {
        let t = local_sec.max(0.0);
        if self.duration_sec > 0.0 && t >= self.duration_sec {
            return None;
        }
        Some(t)
    }

    /// Source time of the last decodable frame, held once the stream has ended.
    pub fn last_frame_sec(&self) -> f64 {
        let frame = self.frame_rate.map_or(0.0, Fps::frame_duration_secs);
        (self.duration_sec - frame).max(0.0)
    }

    /// Byte length of one RGBA8 frame.
    pub fn frame_len(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

/// Decoded PCM audio.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Channel count of `interleaved_f32`.
    pub channels: u16,
    /// Interleaved samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.interleaved_f32.len() / usize::from(self.channels)
        }
    }

    /// Interpret raw little-endian `f32` bytes as mix-bus PCM.
    ///
    /// Fails unless the bytes hold a whole number of [`MIX_CHANNELS`] frames.
    pub fn from_mix_f32le(bytes: &[u8], sample_rate: u32) -> ReelResult<Self> {
        let frame_bytes = 4 * usize::from(MIX_CHANNELS);
        if !bytes.len().is_multiple_of(frame_bytes) {
            return Err(ReelError::evaluation(format!(
                "decoded audio is {} bytes, not a whole number of {MIX_CHANNELS}-channel frames",
                bytes.len()
            )));
        }
        Ok(Self {
            sample_rate,
            channels: MIX_CHANNELS,
            interleaved_f32: bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        })
    }
}

/// Build [`VideoSourceInfo`] from `ffprobe -print_format json -show_streams -show_format` output.
pub fn parse_probe_json(source_path: &Path, json: &[u8]) -> ReelResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct Stream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct Format {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct Probe {
        #[serde(default)]
        streams: Vec<Stream>,
        format: Option<Format>,
    }

    let probe: Probe = serde_json::from_slice(json)
        .map_err(|e| ReelError::serde(format!("ffprobe output: {e}")))?;
    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            ReelError::evaluation(format!("'{}' has no video stream", source_path.display()))
        })?;
    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(ReelError::evaluation(format!(
                "'{}' reports no usable video dimensions",
                source_path.display()
            )));
        }
    };

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        frame_rate: video.r_frame_rate.as_deref().and_then(parse_rate),
        duration_sec: probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0),
        has_audio: probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")),
    })
}

// ffprobe reports "0/0" for streams without a fixed rate.
fn parse_rate(s: &str) -> Option<Fps> {
    let (num, den) = s.split_once('/')?;
    let num = num.trim().parse::<u32>().ok()?;
    let den = den.trim().parse::<u32>().ok()?;
    if num == 0 {
        return None;
    }
    Fps::new(num, den).ok()
}

#[cfg(feature = "media-ffmpeg")]
fn run_tool(cmd: &mut std::process::Command, what: &str) -> ReelResult<Vec<u8>> {
    use anyhow::Context as _;

    let out = cmd.output().with_context(|| format!("spawn {what}"))?;
    if !out.status.success() {
        return Err(ReelError::evaluation(format!(
            "{what} exited with {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(out.stdout)
}

#[cfg(not(feature = "media-ffmpeg"))]
fn media_disabled<T>() -> ReelResult<T> {
    Err(ReelError::evaluation(
        "video and audio sources require the 'media-ffmpeg' feature",
    ))
}

/// Probe dimensions, frame rate, duration and audio presence of a video file with `ffprobe`.
#[cfg(feature = "media-ffmpeg")]
pub fn probe_video(source_path: &Path) -> ReelResult<VideoSourceInfo> {
    let json = run_tool(
        std::process::Command::new("ffprobe")
            .args(["-v", "error", "-print_format", "json"])
            .args(["-show_streams", "-show_format"])
            .arg(source_path),
        "ffprobe",
    )?;
    parse_probe_json(source_path, &json)
}

/// Always fails: built without the `media-ffmpeg` feature.
#[cfg(not(feature = "media-ffmpeg"))]
pub fn probe_video(_source_path: &Path) -> ReelResult<VideoSourceInfo> {
    media_disabled()
}

/// Decode the frame shown at `source_time_sec` as a premultiplied image.
#[cfg(feature = "media-ffmpeg")]
pub fn decode_video_frame(
    info: &VideoSourceInfo,
    source_time_sec: f64,
) -> ReelResult<PreparedImage> {
    let rgba = run_tool(
        std::process::Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{source_time_sec:.6}"), "-i"])
            .arg(&info.source_path)
            .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"]),
        "ffmpeg frame decode",
    )?;
    if rgba.len() != info.frame_len() {
        return Err(ReelError::evaluation(format!(
            "frame at {source_time_sec:.3}s of '{}' is {} bytes, expected {}",
            info.source_path.display(),
            rgba.len(),
            info.frame_len()
        )));
    }
    Ok(PreparedImage::from_straight_rgba8(
        info.width,
        info.height,
        rgba,
    ))
}

/// Always fails: built without the `media-ffmpeg` feature.
#[cfg(not(feature = "media-ffmpeg"))]
pub fn decode_video_frame(
    _info: &VideoSourceInfo,
    _source_time_sec: f64,
) -> ReelResult<PreparedImage> {
    media_disabled()
}

/// Decode the audio of any media file to mix-bus PCM at `sample_rate`.
#[cfg(feature = "media-ffmpeg")]
pub fn decode_audio(path: &Path, sample_rate: u32) -> ReelResult<AudioPcm> {
    let bytes = run_tool(
        std::process::Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-vn", "-f", "f32le", "-acodec", "pcm_f32le"])
            .args(["-ac", &MIX_CHANNELS.to_string()])
            .args(["-ar", &sample_rate.to_string(), "pipe:1"]),
        "ffmpeg audio decode",
    )?;
    AudioPcm::from_mix_f32le(&bytes, sample_rate)
}

/// Always fails: built without the `media-ffmpeg` feature.
#[cfg(not(feature = "media-ffmpeg"))]
pub fn decode_audio(_path: &Path, _sample_rate: u32) -> ReelResult<AudioPcm> {
    media_disabled()
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
