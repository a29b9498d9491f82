use super::*;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::assets::media::AudioPcm;
use crate::encode::sink::InMemorySink;
use crate::foundation::clock::ManualClock;
use crate::foundation::error::FailureReason;
use crate::timeline::model::{CaptionEvent, SourceRef, TimelineEntry};

#[derive(Default)]
struct MapResolver {
    files: HashMap<String, Vec<u8>>,
    audio: HashMap<String, AudioPcm>,
    delay: HashMap<String, Duration>,
}

impl MapResolver {
    fn with_png(mut self, name: &str, rgba: [u8; 4]) -> Self {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba(rgba));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        self.files.insert(name.to_owned(), out.into_inner());
        self
    }

    fn with_tone(mut self, name: &str, value: f32) -> Self {
        self.audio.insert(
            name.to_owned(),
            AudioPcm {
                sample_rate: 48_000,
                channels: 2,
                interleaved_f32: vec![value; 48_000 * 2 * 4],
            },
        );
        self
    }

    fn slow(mut self, name: &str, d: Duration) -> Self {
        self.delay.insert(name.to_owned(), d);
        self
    }
}

impl AssetResolver for MapResolver {
    fn read_bytes(&self, source: &str) -> ReelResult<Vec<u8>> {
        if let Some(d) = self.delay.get(source) {
            std::thread::sleep(*d);
        }
        self.files
            .get(source)
            .cloned()
            .ok_or_else(|| ReelError::validation(format!("missing '{source}'")))
    }

    fn local_path(&self, source: &str) -> ReelResult<PathBuf> {
        Ok(PathBuf::from(source))
    }

    fn decode_audio(&self, source: &str, _sample_rate: u32) -> ReelResult<AudioPcm> {
        self.audio
            .get(source)
            .cloned()
            .ok_or_else(|| ReelError::validation(format!("no audio '{source}'")))
    }
}

fn small_config() -> CompositionConfig {
    CompositionConfig {
        short_edge_px: 16,
        fps: 10,
        total_duration_sec: 2.0,
        ..CompositionConfig::default()
    }
}

fn input(sources: &[&str]) -> TimelineInput {
    TimelineInput {
        entries: sources
            .iter()
            .map(|s| TimelineEntry::new(SourceRef::image(*s)))
            .collect(),
        captions: Vec::new(),
    }
}

fn opts(resolver: MapResolver) -> ExportOpts {
    ExportOpts {
        clock: Arc::new(ManualClock::new()),
        retry: RetryPolicy::no_retry(),
        ..ExportOpts::new(Arc::new(resolver))
    }
}

fn two_images() -> MapResolver {
    MapResolver::default()
        .with_png("a.png", [255, 0, 0, 255])
        .with_png("b.png", [0, 0, 255, 255])
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = CompositionConfig {
        fps: 0,
        ..small_config()
    };
    assert!(matches!(
        Composition::new(cfg, input(&["a.png"])).unwrap_err(),
        ReelError::Validation(_)
    ));
}

#[test]
fn exports_every_tick_and_completes() {
    let comp = Composition::new(small_config(), input(&["a.png", "b.png"])).unwrap();
    assert_eq!(comp.total_ticks(), 20);
    let mut session = comp.start_export(opts(two_images())).unwrap();
    let mut sink = InMemorySink::new();
    let outcome = session.run(&mut sink).unwrap();

    assert_eq!(outcome.ticks, 20);
    assert_eq!(outcome.output.frames, 20);
    assert_eq!(outcome.final_state, SessionState::Complete);
    assert_eq!(outcome.transitions, vec![Some(TransitionKind::Fade), None]);
    assert!(outcome.warnings.is_empty());
    assert!((outcome.output.duration_sec - 2.0).abs() < 1e-9);

    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height), (28, 16));
    assert!(cfg.audio.is_none());
    assert_eq!(sink.frames()[0].1.pixel(14, 8), Some([255, 0, 0, 255]));
    assert_eq!(sink.frames()[19].1.pixel(14, 8), Some([0, 0, 255, 255]));
    assert_eq!(
        session.state_history(),
        &[
            SessionState::Idle,
            SessionState::Priming,
            SessionState::Running,
            SessionState::Draining,
            SessionState::Complete,
        ]
    );
}

#[test]
fn second_export_is_busy_until_the_first_is_dropped() {
    let comp = Composition::new(small_config(), input(&["a.png"])).unwrap();
    let first = comp.start_export(opts(two_images())).unwrap();
    assert!(comp.is_busy());

    let clone = comp.clone();
    let err = clone.start_export(opts(two_images())).unwrap_err();
    assert!(matches!(err, ReelError::SessionBusy));
    assert_eq!(first.state(), SessionState::Idle);

    drop(first);
    assert!(!comp.is_busy());
    assert!(clone.start_export(opts(two_images())).is_ok());
}

#[test]
fn separate_instances_do_not_share_the_lease() {
    let a = Composition::new(small_config(), input(&["a.png"])).unwrap();
    let b = Composition::new(small_config(), input(&["a.png"])).unwrap();
    let _s = a.start_export(opts(two_images())).unwrap();
    assert!(b.start_export(opts(two_images())).is_ok());
}

#[test]
fn a_session_runs_once() {
    let comp = Composition::new(small_config(), input(&["a.png"])).unwrap();
    let mut session = comp.start_export(opts(two_images())).unwrap();
    session.run(&mut InMemorySink::digests_only()).unwrap();
    assert!(session.run(&mut InMemorySink::digests_only()).is_err());
    assert_eq!(session.state(), SessionState::Complete);
}

#[test]
fn missing_asset_warns_and_renders_background() {
    let comp = Composition::new(small_config(), input(&["a.png", "gone.png"])).unwrap();
    let mut session = comp.start_export(opts(two_images())).unwrap();
    let mut sink = InMemorySink::new();
    let outcome = session.run(&mut sink).unwrap();

    assert_eq!(outcome.final_state, SessionState::Complete);
    assert!(matches!(
        outcome.warnings.as_slice(),
        [ExportWarning::AssetLoadFailure { segment: 1, .. }]
    ));
    assert_eq!(sink.frames()[19].1.pixel(0, 0), Some([0, 0, 0, 255]));
}

#[test]
fn captions_without_font_are_skipped_with_a_warning() {
    let mut inp = input(&["a.png"]);
    inp.captions.push(CaptionEvent::new(0.0, 1.0, "Hello"));
    let comp = Composition::new(small_config(), inp).unwrap();
    let mut session = comp.start_export(opts(two_images())).unwrap();
    let outcome = session.run(&mut InMemorySink::digests_only()).unwrap();
    assert!(
        outcome
            .warnings
            .iter()
            .any(|w| matches!(w, ExportWarning::CaptionsSkipped { .. }))
    );
}

#[test]
fn soundtrack_is_mixed_per_tick() {
    let comp = Composition::builder(small_config(), input(&["a.png"]))
        .soundtrack(AudioTrack::soundtrack("music.wav"))
        .build()
        .unwrap();
    let resolver = two_images().with_tone("music.wav", 0.8);
    let mut session = comp.start_export(opts(resolver)).unwrap();
    let mut sink = InMemorySink::digests_only();
    session.run(&mut sink).unwrap();

    assert_eq!(
        sink.config().unwrap().audio,
        Some(AudioFormat {
            sample_rate: 48_000,
            channels: 2,
        })
    );
    assert_eq!(sink.audio().len(), 2 * 48_000 * 2);
    assert!((sink.audio()[100] - 0.2).abs() < 1e-6);
}

#[test]
fn soundtrack_failure_still_completes_without_audio() {
    let comp = Composition::builder(small_config(), input(&["a.png"]))
        .soundtrack(AudioTrack::soundtrack("missing.wav"))
        .build()
        .unwrap();
    let mut session = comp.start_export(opts(two_images())).unwrap();
    let mut sink = InMemorySink::digests_only();
    let outcome = session.run(&mut sink).unwrap();

    assert_eq!(outcome.final_state, SessionState::Complete);
    assert!(sink.config().unwrap().audio.is_none());
    assert!(matches!(
        outcome.warnings.as_slice(),
        [ExportWarning::AudioSourceUnavailable {
            track: crate::audio::source::AudioTrackKind::Soundtrack,
            ..
        }]
    ));
}

#[test]
fn builder_pins_gain_to_the_slot_and_rejects_bad_offsets() {
    let comp = Composition::builder(small_config(), input(&["a.png"]))
        .soundtrack(AudioTrack::original_media("music.wav").with_offset(0.5))
        .build()
        .unwrap();
    let track = &comp.audio_tracks()[0];
    assert_eq!(track.kind, crate::audio::source::AudioTrackKind::Soundtrack);
    assert_eq!(track.gain(), 0.25);
    assert_eq!(track.offset_sec, 0.5);

    let err = Composition::builder(small_config(), input(&["a.png"]))
        .soundtrack(AudioTrack::soundtrack("music.wav").with_offset(f64::NAN))
        .build()
        .unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[test]
fn builder_keeps_one_track_per_kind() {
    let comp = Composition::builder(small_config(), input(&["a.png"]))
        .soundtrack(AudioTrack::soundtrack("one.wav"))
        .soundtrack(AudioTrack::soundtrack("two.wav"))
        .original_audio(AudioTrack::original_media("clip.mp4"))
        .build()
        .unwrap();
    assert_eq!(comp.audio_tracks().len(), 2);
    assert_eq!(comp.audio_tracks()[0].source, "two.wav");
}

#[test]
fn priming_timeout_fails_but_still_finalizes() {
    let resolver = two_images().slow("a.png", Duration::from_millis(500));
    let comp = Composition::new(small_config(), input(&["a.png"])).unwrap();
    let mut session = comp
        .start_export(ExportOpts {
            priming_timeout: Duration::from_millis(20),
            ..opts(resolver)
        })
        .unwrap();
    let mut sink = InMemorySink::digests_only();
    let err = session.run(&mut sink).unwrap_err();

    assert!(matches!(err, ReelError::AssetLoadTimeout { pending: 1, .. }));
    assert!(sink.is_finalized());
    assert_eq!(
        session.state(),
        SessionState::Failed(FailureReason::AssetLoadTimeout)
    );
}

#[test]
fn cancellation_drains_and_fails() {
    let comp = Composition::new(small_config(), input(&["a.png"])).unwrap();
    let o = opts(two_images());
    o.cancel.cancel();
    let mut session = comp.start_export(o).unwrap();
    let mut sink = InMemorySink::digests_only();
    let err = session.run(&mut sink).unwrap_err();

    assert!(matches!(err, ReelError::Cancelled));
    assert!(sink.is_finalized());
    assert!(sink.digests().is_empty());
    assert_eq!(session.state(), SessionState::Failed(FailureReason::Cancelled));
}

#[test]
fn render_frame_at_validates_time_and_renders() {
    let comp = Composition::new(small_config(), input(&["a.png", "b.png"])).unwrap();
    let o = opts(two_images());
    assert!(comp.render_frame_at(&o, 2.0).is_err());
    assert!(comp.render_frame_at(&o, -0.1).is_err());

    let still = comp.render_frame_at(&o, 0.0).unwrap();
    assert_eq!(still.frame.pixel(14, 8), Some([255, 0, 0, 255]));
    assert!(still.warnings.is_empty());
    assert!(!comp.is_busy());
}
