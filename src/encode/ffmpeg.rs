use std::fs::File;
use std::io::{BufWriter, Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context as _;

use crate::encode::negotiate::{CodecCandidate, EncoderProbe, FfmpegEncoderProbe, negotiate};
use crate::encode::sink::{EncodeSink, EncodedOutput, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::retry::RetryPolicy;
use crate::render::frame::RenderFrame;

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Also write the finished container here, with the extension of the negotiated container
    /// (see [`container_path`]).
    pub out_path: Option<PathBuf>,
    /// Directory for intermediate files.
    pub temp_dir: PathBuf,
    /// Retry schedule for spawning `ffmpeg`.
    pub retry: RetryPolicy,
}

impl Default for FfmpegSinkOpts {
    fn default() -> Self {
        Self {
            out_path: None,
            temp_dir: std::env::temp_dir(),
            retry: RetryPolicy::default(),
        }
    }
}

impl FfmpegSinkOpts {
    /// Options that also write the container to `out_path`.
    pub fn with_out_path(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: Some(out_path.into()),
            ..Self::default()
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to stdin.
///
/// Video is encoded into an intermediate file while frames arrive. Audio samples are spooled to
/// a raw `f32le` file and muxed in a second `ffmpeg` pass at finalize. Intermediate files are
/// removed whether or not finalization succeeds.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    probe: Arc<dyn EncoderProbe>,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    video_tmp: TempFileGuard,
    audio_tmp: TempFileGuard,
    mux_tmp: TempFileGuard,
    audio_out: Option<BufWriter<File>>,
    audio_samples: u64,

    candidate: Option<CodecCandidate>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    frames: u64,
}

impl FfmpegSink {
    /// Sink that negotiates codecs against the system `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self::with_probe(opts, Arc::new(FfmpegEncoderProbe))
    }

    /// Sink that negotiates codecs against `probe`.
    pub fn with_probe(opts: FfmpegSinkOpts, probe: Arc<dyn EncoderProbe>) -> Self {
        Self {
            opts,
            probe,
            child: None,
            stdin: None,
            stderr_drain: None,
            video_tmp: TempFileGuard::default(),
            audio_tmp: TempFileGuard::default(),
            mux_tmp: TempFileGuard::default(),
            audio_out: None,
            audio_samples: 0,
            candidate: None,
            cfg: None,
            last_idx: None,
            frames: 0,
        }
    }

    /// Candidate chosen in `begin`.
    pub fn candidate(&self) -> Option<&CodecCandidate> {
        self.candidate.as_ref()
    }

    fn spawn_video_encoder(&mut self, cfg: &SinkConfig, c: &CodecCandidate) -> ReelResult<()> {
        let video_path = temp_path(&self.opts.temp_dir, "video", c.extension);
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        // Frames arrive opaque, so straight `rgba` is accurate.
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0", "-an", "-c:v", c.video_encoder, "-pix_fmt", "yuv420p"]);
        push_container_args(&mut cmd, c);
        cmd.arg(&video_path);

        let mut child = self.opts.retry.run("spawn ffmpeg", |_| {
            cmd.spawn().map_err(|e| {
                ReelError::evaluation(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })
        })?;
        self.video_tmp = TempFileGuard::new(video_path);

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::evaluation("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::evaluation("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        Ok(())
    }

    fn open_audio_spool(&mut self) -> ReelResult<()> {
        let path = temp_path(&self.opts.temp_dir, "audio", "f32le");
        let file = File::create(&path)
            .with_context(|| format!("create audio spool '{}'", path.display()))?;
        self.audio_tmp = TempFileGuard::new(path);
        self.audio_out = Some(BufWriter::new(file));
        self.audio_samples = 0;
        Ok(())
    }

    /// Close stdin and wait for the video pass. With zero frames the child is killed instead.
    fn wait_video(&mut self) -> ReelResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ReelError::evaluation("ffmpeg sink not started"))?;
        if self.frames == 0 {
            let _ = child.kill();
            let _ = child.wait();
            self.stderr_drain = None;
            return Err(ReelError::NoFramesCaptured);
        }

        let status = child.wait().map_err(|e| {
            ReelError::evaluation(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ReelError::evaluation("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ReelError::evaluation(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ReelError::evaluation(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn mux_audio(&mut self, cfg: &SinkConfig, c: &CodecCandidate) -> ReelResult<PathBuf> {
        let (Some(video), Some(audio), Some(fmt)) =
            (self.video_tmp.path(), self.audio_tmp.path(), cfg.audio)
        else {
            return Err(ReelError::evaluation("ffmpeg sink has no audio to mux"));
        };
        let out = temp_path(&self.opts.temp_dir, "mux", c.extension);

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-loglevel", "error", "-i"])
            .arg(video)
            .args([
                "-f",
                "f32le",
                "-ar",
                &fmt.sample_rate.to_string(),
                "-ac",
                &fmt.channels.to_string(),
                "-i",
            ])
            .arg(audio)
            .args([
                "-map",
                "0:v:0",
                "-map",
                "1:a:0",
                "-c:v",
                "copy",
                "-c:a",
                c.audio_encoder,
                "-shortest",
            ]);
        push_container_args(&mut cmd, c);
        cmd.arg(&out);

        let output = self.opts.retry.run("spawn ffmpeg mux", |_| {
            cmd.output()
                .map_err(|e| ReelError::evaluation(format!("failed to run ffmpeg mux: {e}")))
        })?;
        self.mux_tmp = TempFileGuard::new(out.clone());
        if !output.status.success() {
            return Err(ReelError::evaluation(format!(
                "ffmpeg mux exited with status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(out)
    }

    fn finish(&mut self) -> ReelResult<EncodedOutput> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| ReelError::evaluation("ffmpeg sink not started"))?;
        let candidate = self
            .candidate
            .ok_or_else(|| ReelError::evaluation("ffmpeg sink has no negotiated codec"))?;
        self.wait_video()?;

        let has_audio = match self.audio_out.take() {
            Some(mut w) => {
                w.flush().context("flush audio spool")?;
                self.audio_samples > 0
            }
            None => false,
        };
        let container = if has_audio {
            self.mux_audio(&cfg, &candidate)?
        } else {
            self.video_tmp
                .path()
                .map(Path::to_path_buf)
                .ok_or_else(|| ReelError::evaluation("ffmpeg sink lost its video file"))?
        };

        let bytes = std::fs::read(&container)
            .with_context(|| format!("read encoded container '{}'", container.display()))?;
        if let Some(requested) = &self.opts.out_path {
            let out = container_path(requested, candidate.extension);
            if out != *requested {
                tracing::warn!(
                    requested = %requested.display(),
                    written = %out.display(),
                    codec = candidate.label,
                    "output extension changed to match the negotiated container"
                );
            }
            ensure_parent_dir(&out)?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("write output '{}'", out.display()))?;
        }
        tracing::info!(
            codec = candidate.label,
            frames = self.frames,
            bytes = bytes.len(),
            with_audio = has_audio,
            "ffmpeg encode finished"
        );

        Ok(EncodedOutput {
            bytes,
            mime: candidate.mime.to_owned(),
            extension: candidate.extension.to_owned(),
            duration_sec: self.frames as f64 * cfg.fps.frame_duration_secs(),
            frames: self.frames,
        })
    }

    fn release(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.stderr_drain = None;
        self.audio_out = None;
        self.video_tmp = TempFileGuard::default();
        self.audio_tmp = TempFileGuard::default();
        self.mux_tmp = TempFileGuard::default();
    }
}

impl EncodeSink for FfmpegSink {
    #[tracing::instrument(
        skip_all,
        fields(width = cfg.width, height = cfg.height, audio = cfg.audio.is_some())
    )]
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(ReelError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ReelError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(ReelError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }
        if let Some(audio) = cfg.audio
            && (audio.sample_rate == 0 || audio.channels == 0)
        {
            return Err(ReelError::validation(
                "audio sample_rate and channels must be non-zero when audio is enabled",
            ));
        }

        self.release();
        let candidate = negotiate(self.probe.as_ref(), cfg.audio.is_some())?;
        self.spawn_video_encoder(&cfg, &candidate)?;
        if cfg.audio.is_some() {
            self.open_audio_spool()?;
        }
        tracing::debug!(
            codec = candidate.label,
            width = cfg.width,
            height = cfg.height,
            "ffmpeg sink started"
        );

        self.candidate = Some(candidate);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RenderFrame) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::evaluation("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(ReelError::evaluation(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ReelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != (cfg.width as usize) * (cfg.height as usize) * 4 {
            return Err(ReelError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ReelError::evaluation("ffmpeg sink is already finalized"));
        };
        stdin.write_all(&frame.data).map_err(|e| {
            ReelError::evaluation(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames += 1;
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) -> ReelResult<()> {
        let Some(out) = self.audio_out.as_mut() else {
            return Err(ReelError::evaluation("ffmpeg sink was started without audio"));
        };
        for s in samples {
            out.write_all(&s.to_le_bytes())
                .context("write audio spool")?;
        }
        self.audio_samples += samples.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> ReelResult<EncodedOutput> {
        let result = self.finish();
        self.release();
        result
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.release();
    }
}

/// Removes the file at its path when dropped.
#[derive(Debug, Default)]
pub(crate) struct TempFileGuard(Option<PathBuf>);

impl TempFileGuard {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(Some(path))
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        self.0.as_deref()
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn temp_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("reelcast-{}-{n}-{stem}.{ext}", std::process::id()))
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` before `-i` sets the input framerate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn push_container_args(cmd: &mut Command, c: &CodecCandidate) {
    if c.muxer == "mp4" {
        cmd.args(["-movflags", "+faststart"]);
    }
    cmd.args(["-f", c.muxer]);
}

/// Where a container with `extension` is written when `requested` was asked for.
///
/// The requested extension is kept when it already matches (ignoring case), otherwise it is
/// replaced so the file is named after what it contains.
pub fn container_path(requested: &Path, extension: &str) -> PathBuf {
    let matches = requested
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension));
    if matches {
        requested.to_path_buf()
    } else {
        requested.with_extension(extension)
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
