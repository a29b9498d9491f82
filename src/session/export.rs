use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::assets::loader::AssetLoader;
use crate::assets::resolve::AssetResolver;
use crate::audio::mix::{AudioMixer, MIX_CHANNELS};
use crate::audio::source::{AudioTrack, AudioTrackKind};
use crate::composition::config::{CaptionMode, CompositionConfig};
use crate::encode::sink::{AudioFormat, EncodeSink, EncodedOutput, SinkConfig};
use crate::foundation::clock::{Clock, SystemClock};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::retry::RetryPolicy;
use crate::render::compositor::FrameCompositor;
use crate::render::frame::RenderFrame;
use crate::session::scheduler::{CancelToken, Scheduler, SessionState, TickWork};
use crate::session::warning::ExportWarning;
use crate::timeline::build::Timeline;
use crate::timeline::model::{TimelineInput, TransitionKind};

/// Default wait for required assets before giving up.
pub const DEFAULT_PRIMING_TIMEOUT: Duration = Duration::from_secs(10);

struct CompositionInner {
    config: CompositionConfig,
    timeline: Arc<Timeline>,
    fps: Fps,
    total_ticks: u64,
    audio: Vec<AudioTrack>,
    caption_font: Option<String>,
    busy: AtomicBool,
}

/// A validated composition: config, timeline and audio/font references.
///
/// Clones share one instance, and at most one export can be active per instance at a time.
#[derive(Clone)]
pub struct Composition {
    inner: Arc<CompositionInner>,
}

impl std::fmt::Debug for Composition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composition")
            .field("config", &self.inner.config)
            .field("segments", &self.inner.timeline.segments().len())
            .field("audio", &self.inner.audio)
            .field("caption_font", &self.inner.caption_font)
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Builder for a [`Composition`] with audio tracks and a caption font.
#[derive(Clone, Debug)]
pub struct CompositionBuilder {
    config: CompositionConfig,
    input: TimelineInput,
    audio: Vec<AudioTrack>,
    caption_font: Option<String>,
}

impl CompositionBuilder {
    /// Add or replace the soundtrack. The track plays at the soundtrack's fixed gain.
    pub fn soundtrack(self, mut track: AudioTrack) -> Self {
        track.kind = AudioTrackKind::Soundtrack;
        self.track(track)
    }

    /// Add or replace the original media audio.
    pub fn original_audio(self, mut track: AudioTrack) -> Self {
        track.kind = AudioTrackKind::OriginalMedia;
        self.track(track)
    }

    /// Add an audio track, replacing any track of the same kind.
    pub fn track(mut self, track: AudioTrack) -> Self {
        self.audio.retain(|t| t.kind != track.kind);
        self.audio.push(track);
        self
    }

    /// Font source used to draw captions.
    pub fn caption_font(mut self, source: impl Into<String>) -> Self {
        self.caption_font = Some(source.into());
        self
    }

    /// Validate and build the timeline.
    pub fn build(self) -> ReelResult<Composition> {
        let timeline = Timeline::build(&self.input, &self.config)?;
        for track in &self.audio {
            if !track.offset_sec.is_finite() {
                return Err(ReelError::validation(format!(
                    "{} track must have a finite offset",
                    track.kind
                )));
            }
        }
        let fps = self.config.frame_rate()?;
        let total_ticks = self.config.total_ticks()?;
        Ok(Composition {
            inner: Arc::new(CompositionInner {
                config: self.config,
                timeline: Arc::new(timeline),
                fps,
                total_ticks,
                audio: self.audio,
                caption_font: self.caption_font,
                busy: AtomicBool::new(false),
            }),
        })
    }
}

/// Collaborators and knobs for one export.
#[derive(Clone)]
pub struct ExportOpts {
    /// Resolves segment, font and audio sources.
    pub resolver: Arc<dyn AssetResolver>,
    /// Pacing clock. [`crate::ManualClock`] renders as fast as possible.
    pub clock: Arc<dyn Clock>,
    /// Wait for required assets before failing with [`ReelError::AssetLoadTimeout`].
    pub priming_timeout: Duration,
    /// Retry schedule for asset resolution.
    pub retry: RetryPolicy,
    /// Cooperative cancellation.
    pub cancel: CancelToken,
}

impl ExportOpts {
    /// Real-time export with default timeout and retry.
    pub fn new(resolver: Arc<dyn AssetResolver>) -> Self {
        Self {
            resolver,
            clock: Arc::new(SystemClock::new()),
            priming_timeout: DEFAULT_PRIMING_TIMEOUT,
            retry: RetryPolicy::default(),
            cancel: CancelToken::new(),
        }
    }
}

/// Result of a completed export.
#[derive(Clone, Debug)]
pub struct ExportOutcome {
    /// Finished container.
    pub output: EncodedOutput,
    /// Ticks delivered to the sink.
    pub ticks: u64,
    /// Resolved outgoing transition of every segment.
    pub transitions: Vec<Option<TransitionKind>>,
    /// Recoverable problems, in the order they were raised.
    pub warnings: Vec<ExportWarning>,
    /// Always [`SessionState::Complete`].
    pub final_state: SessionState,
}

/// A single frame rendered outside of an export.
#[derive(Clone, Debug)]
pub struct StillFrame {
    /// The frame.
    pub frame: RenderFrame,
    /// Warnings raised while loading and drawing it.
    pub warnings: Vec<ExportWarning>,
}

impl Composition {
    /// Validate `config` and build the timeline from `input`.
    pub fn new(config: CompositionConfig, input: TimelineInput) -> ReelResult<Self> {
        Self::builder(config, input).build()
    }

    /// Start a builder for a composition with audio or captions.
    pub fn builder(config: CompositionConfig, input: TimelineInput) -> CompositionBuilder {
        CompositionBuilder {
            config,
            input,
            audio: Vec::new(),
            caption_font: None,
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &CompositionConfig {
        &self.inner.config
    }

    /// Built timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.inner.timeline
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.inner.config.canvas()
    }

    /// Output frame rate.
    pub fn fps(&self) -> Fps {
        self.inner.fps
    }

    /// Ticks a full export produces.
    pub fn total_ticks(&self) -> u64 {
        self.inner.total_ticks
    }

    /// Audio tracks, at most one per kind.
    pub fn audio_tracks(&self) -> &[AudioTrack] {
        &self.inner.audio
    }

    /// Whether an export currently holds the lease.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Acquire the session lease and start decoding assets.
    ///
    /// Fails with [`ReelError::SessionBusy`] while another export of this instance (or a clone of
    /// it) is alive; nothing is started in that case.
    pub fn start_export(&self, opts: ExportOpts) -> ReelResult<ExportSession> {
        let lease = SessionLease::acquire(&self.inner)?;
        let loader = AssetLoader::spawn(
            Arc::clone(&opts.resolver),
            &opts.retry,
            &self.inner.timeline,
            self.inner.caption_font.as_deref(),
            &self.inner.audio,
        )?;
        let scheduler = Scheduler::new(
            self.inner.fps,
            self.inner.total_ticks,
            Arc::clone(&opts.clock),
            opts.cancel.clone(),
        );
        tracing::debug!(ticks = self.inner.total_ticks, "export session started");
        Ok(ExportSession {
            composition: self.clone(),
            _lease: lease,
            loader: Some(loader),
            scheduler,
            priming_timeout: opts.priming_timeout,
        })
    }

    /// Load assets and render the frame at `t` without encoding. Does not take the lease.
    pub fn render_frame_at(&self, opts: &ExportOpts, t: f64) -> ReelResult<StillFrame> {
        let total = self.inner.timeline.total_duration_sec();
        if !t.is_finite() || t < 0.0 || t >= total {
            return Err(ReelError::validation(format!(
                "frame time {t} must be within [0, {total})"
            )));
        }
        let loader = AssetLoader::spawn(
            Arc::clone(&opts.resolver),
            &opts.retry,
            &self.inner.timeline,
            self.inner.caption_font.as_deref(),
            &[],
        )?;
        let assets = loader.await_ready(opts.priming_timeout)?;
        let mut warnings = assets.warnings;
        let mut compositor = FrameCompositor::new(
            &self.inner.config,
            Arc::clone(&self.inner.timeline),
            assets.segments,
            assets.caption_font.as_deref().map(Vec::as_slice),
        )?;
        let frame = compositor.render(t)?;
        warnings.extend(compositor.take_warnings());
        warnings.extend(self.missing_font_warning());
        Ok(StillFrame { frame, warnings })
    }

    fn missing_font_warning(&self) -> Option<ExportWarning> {
        let wants_captions = self.inner.config.caption_mode != CaptionMode::Hidden
            && !self.inner.timeline.captions().is_empty();
        (wants_captions && self.inner.caption_font.is_none()).then(|| {
            tracing::warn!("captions present but no caption font configured");
            ExportWarning::CaptionsSkipped {
                reason: "no caption font configured".to_owned(),
            }
        })
    }
}

struct SessionLease {
    inner: Arc<CompositionInner>,
}

impl SessionLease {
    fn acquire(inner: &Arc<CompositionInner>) -> ReelResult<Self> {
        inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ReelError::SessionBusy)?;
        Ok(Self {
            inner: Arc::clone(inner),
        })
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.inner.busy.store(false, Ordering::Release);
    }
}

/// One export of a [`Composition`]. Holds the lease until dropped.
pub struct ExportSession {
    composition: Composition,
    _lease: SessionLease,
    loader: Option<AssetLoader>,
    scheduler: Scheduler,
    priming_timeout: Duration,
}

impl std::fmt::Debug for ExportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportSession")
            .field("state", &self.scheduler.state())
            .field("ticks", &self.scheduler.ticks())
            .finish()
    }
}

struct ExportTick<'a> {
    compositor: &'a mut FrameCompositor,
    mixer: Option<&'a AudioMixer>,
    sink: &'a mut dyn EncodeSink,
}

impl TickWork for ExportTick<'_> {
    fn end_of_stream(&self, t: f64) -> bool {
        self.compositor.end_of_stream(t)
    }

    fn tick(&mut self, idx: FrameIndex, t: f64) -> ReelResult<()> {
        let frame = self.compositor.render(t)?;
        self.sink.push_frame(idx, &frame)?;
        if let Some(mixer) = self.mixer {
            self.sink.push_audio(&mixer.mix_tick(idx))?;
        }
        Ok(())
    }
}

impl ExportSession {
    /// Current scheduler state.
    pub fn state(&self) -> SessionState {
        self.scheduler.state()
    }

    /// Every state entered so far.
    pub fn state_history(&self) -> &[SessionState] {
        self.scheduler.history()
    }

    /// Ticks delivered so far.
    pub fn ticks(&self) -> u64 {
        self.scheduler.ticks()
    }

    /// The composition being exported.
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Prime, run every tick into `sink` and drain.
    ///
    /// The sink is finalized on every path that got past `Idle`. On failure its result is
    /// discarded and the session error is returned.
    #[tracing::instrument(skip_all, fields(total_ticks = self.scheduler.total_ticks()))]
    pub fn run(&mut self, sink: &mut dyn EncodeSink) -> ReelResult<ExportOutcome> {
        self.scheduler.advance(SessionState::Priming)?;
        let mut warnings = Vec::new();
        let result = self.prime_and_run(sink, &mut warnings);

        self.scheduler.advance(SessionState::Draining)?;
        let finalized = sink.finalize();
        let result = match result {
            Ok(ticks) => finalized.map(|output| (ticks, output)),
            Err(e) => {
                if let Err(discarded) = finalized {
                    tracing::debug!(error = %discarded, "finalize result discarded");
                }
                Err(e)
            }
        };
        self.scheduler.conclude(&result)?;

        match result {
            Ok((ticks, output)) => {
                tracing::info!(
                    ticks,
                    frames = output.frames,
                    warnings = warnings.len(),
                    "export complete"
                );
                Ok(ExportOutcome {
                    output,
                    ticks,
                    transitions: self.composition.timeline().transition_choices(),
                    warnings,
                    final_state: self.scheduler.state(),
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, state = ?self.scheduler.state(), "export failed");
                Err(e)
            }
        }
    }

    fn prime_and_run(
        &mut self,
        sink: &mut dyn EncodeSink,
        warnings: &mut Vec<ExportWarning>,
    ) -> ReelResult<u64> {
        let inner = Arc::clone(&self.composition.inner);
        let loader = self
            .loader
            .take()
            .ok_or_else(|| ReelError::evaluation("export session already ran"))?;
        let assets = loader.await_ready(self.priming_timeout)?;
        warnings.extend(assets.warnings);

        let mut compositor = FrameCompositor::new(
            &inner.config,
            Arc::clone(&inner.timeline),
            assets.segments,
            assets.caption_font.as_deref().map(Vec::as_slice),
        )?;
        warnings.extend(compositor.take_warnings());
        warnings.extend(self.composition.missing_font_warning());

        let mut mixer = AudioMixer::new(inner.fps);
        for (track, pcm) in assets.audio {
            mixer.add_source(&track, pcm);
        }
        let audio = mixer.has_sources().then(|| AudioFormat {
            sample_rate: mixer.sample_rate(),
            channels: MIX_CHANNELS,
        });

        let canvas = compositor.canvas();
        sink.begin(SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: inner.fps,
            audio,
        })?;
        self.scheduler.advance(SessionState::Running)?;

        let mut work = ExportTick {
            compositor: &mut compositor,
            mixer: audio.is_some().then_some(&mixer),
            sink,
        };
        let ticks = self.scheduler.run_ticks(&mut work);
        warnings.extend(compositor.take_warnings());
        ticks
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/export.rs"]
mod tests;
