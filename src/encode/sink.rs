use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::frame::RenderFrame;

/// PCM layout of the audio pushed through [`EncodeSink::push_audio`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

/// Configuration provided to an [`EncodeSink`] before the first frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Present when audio will be pushed.
    pub audio: Option<AudioFormat>,
}

/// Finished container, owned by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedOutput {
    /// Container bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime: String,
    /// File extension without the dot.
    pub extension: String,
    /// Media duration derived from the frame count.
    pub duration_sec: f64,
    /// Frames written.
    pub frames: u64,
}

/// Consumes frames and audio in timeline order and produces one container.
///
/// Ordering contract: `begin` once, then `push_frame` with strictly increasing indices (each
/// optionally followed by `push_audio` for the same tick), then `finalize` once. `finalize` is
/// also called on failure paths, in which case its result is discarded.
pub trait EncodeSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &RenderFrame) -> ReelResult<()>;
    /// Push interleaved samples following the last pushed frame.
    fn push_audio(&mut self, samples: &[f32]) -> ReelResult<()>;
    /// Flush and return the container. Fails with [`ReelError::NoFramesCaptured`] when nothing
    /// was pushed.
    fn finalize(&mut self) -> ReelResult<EncodedOutput>;
}

/// Sink that keeps everything in memory, for tests and debugging.
///
/// Its "container" is the little-endian concatenation of the per-frame xxh3 digests.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    keep_frames: bool,
    frames: Vec<(FrameIndex, RenderFrame)>,
    digests: Vec<u64>,
    audio: Vec<f32>,
    last_idx: Option<FrameIndex>,
    finalized: bool,
}

impl InMemorySink {
    /// Sink that keeps frames, digests and audio.
    pub fn new() -> Self {
        Self {
            keep_frames: true,
            ..Self::default()
        }
    }

    /// Sink that keeps only digests and audio.
    pub fn digests_only() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Retained frames in push order.
    pub fn frames(&self) -> &[(FrameIndex, RenderFrame)] {
        &self.frames
    }

    /// xxh3 digest of every pushed frame.
    pub fn digests(&self) -> &[u64] {
        &self.digests
    }

    /// Pushed audio samples.
    pub fn audio(&self) -> &[f32] {
        &self.audio
    }

    /// Whether `finalize` has run.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl EncodeSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.digests.clear();
        self.audio.clear();
        self.last_idx = None;
        self.finalized = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RenderFrame) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::evaluation("in-memory sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(ReelError::evaluation(
                "in-memory sink received out-of-order frame index",
            ));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ReelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        self.last_idx = Some(idx);
        self.digests.push(frame.digest());
        if self.keep_frames {
            self.frames.push((idx, frame.clone()));
        }
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) -> ReelResult<()> {
        self.audio.extend_from_slice(samples);
        Ok(())
    }

    fn finalize(&mut self) -> ReelResult<EncodedOutput> {
        self.finalized = true;
        let frames = self.digests.len() as u64;
        if frames == 0 {
            return Err(ReelError::NoFramesCaptured);
        }
        let fps = self
            .cfg
            .as_ref()
            .map(|c| c.fps)
            .ok_or_else(|| ReelError::evaluation("in-memory sink not started"))?;
        Ok(EncodedOutput {
            bytes: self.digests.iter().flat_map(|d| d.to_le_bytes()).collect(),
            mime: "application/octet-stream".to_owned(),
            extension: "bin".to_owned(),
            duration_sec: frames as f64 * fps.frame_duration_secs(),
            frames,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
