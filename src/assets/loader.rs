use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::Context as _;

use crate::assets::decode::{PreparedImage, decode_image};
use crate::assets::media::{AudioPcm, MIX_SAMPLE_RATE, VideoSourceInfo};
use crate::assets::resolve::AssetResolver;
use crate::audio::source::{AudioTrack, AudioTrackKind};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::retry::RetryPolicy;
use crate::session::warning::ExportWarning;
use crate::timeline::build::Timeline;
use crate::timeline::model::SourceRef;

/// Decoded visual content of one segment.
#[derive(Clone, Debug)]
pub(crate) enum SegmentAsset {
    Image(PreparedImage),
    Video(VideoSourceInfo),
}

#[derive(Clone, Debug)]
enum Slot {
    Segment { index: usize, source: SourceRef },
    CaptionFont(String),
    Audio(AudioTrack),
    // Audio of a lone source video, mixed only when the probe finds an audio stream.
    NativeAudio(AudioTrack),
}

impl Slot {
    fn source_ref(&self) -> &str {
        match self {
            Self::Segment { source, .. } => source.source(),
            Self::CaptionFont(s) => s,
            Self::Audio(track) | Self::NativeAudio(track) => &track.source,
        }
    }

    // Segments gate priming; fonts and audio are dropped when late.
    fn required(&self) -> bool {
        matches!(self, Self::Segment { .. })
    }

    fn failure(&self, reason: impl std::fmt::Display) -> ReelError {
        match self {
            Self::Audio(track) | Self::NativeAudio(track) => {
                ReelError::audio_unavailable(track.source.as_str(), reason)
            }
            _ => ReelError::asset_load(self.source_ref(), reason),
        }
    }
}

fn failure_reason(err: ReelError) -> String {
    match err {
        ReelError::AssetLoadFailure { reason, .. }
        | ReelError::AudioSourceUnavailable { reason, .. } => reason,
        other => other.to_string(),
    }
}

enum Loaded {
    Segment(SegmentAsset),
    Font(Arc<Vec<u8>>),
    Audio(AudioPcm),
    Silent,
}

/// Everything that became ready before the priming deadline.
#[derive(Debug, Default)]
pub(crate) struct LoadedAssets {
    pub(crate) segments: Vec<Option<SegmentAsset>>,
    pub(crate) caption_font: Option<Arc<Vec<u8>>>,
    pub(crate) audio: Vec<(AudioTrack, AudioPcm)>,
    pub(crate) warnings: Vec<ExportWarning>,
}

/// Asset decoding on a dedicated worker pool.
///
/// Work starts as soon as the loader is spawned; [`AssetLoader::await_ready`] collects the
/// results. Dropping the loader releases the pool.
pub(crate) struct AssetLoader {
    _pool: rayon::ThreadPool,
    slots: Vec<Slot>,
    segment_count: usize,
    rx: Receiver<(usize, ReelResult<Loaded>)>,
}

impl AssetLoader {
    /// Queue every segment source, the optional caption font and the audio tracks.
    #[tracing::instrument(
        skip_all,
        fields(segments = timeline.segments().len(), audio = audio.len())
    )]
    pub(crate) fn spawn(
        resolver: Arc<dyn AssetResolver>,
        retry: &RetryPolicy,
        timeline: &Timeline,
        caption_font: Option<&str>,
        audio: &[AudioTrack],
    ) -> ReelResult<Self> {
        let mut slots: Vec<Slot> = timeline
            .segments()
            .iter()
            .enumerate()
            .map(|(index, seg)| Slot::Segment {
                index,
                source: seg.source.clone(),
            })
            .collect();
        if let Some(font) = caption_font {
            slots.push(Slot::CaptionFont(font.to_owned()));
        }
        slots.extend(audio.iter().cloned().map(Slot::Audio));
        if let Some(track) = native_audio_track(timeline, audio) {
            tracing::debug!(source = %track.source, "mixing native audio of the source video");
            slots.push(Slot::NativeAudio(track));
        }

        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .clamp(1, 4)
            .min(slots.len().max(1));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("reelcast-assets-{i}"))
            .panic_handler(|_| tracing::error!("asset worker panicked"))
            .build()
            .context("build asset loader pool")?;

        let (tx, rx) = mpsc::channel();
        for (idx, slot) in slots.iter().enumerate() {
            let tx = tx.clone();
            let slot = slot.clone();
            let resolver = Arc::clone(&resolver);
            let retry = retry.clone();
            pool.spawn(move || {
                let res = retry
                    .run(slot.source_ref(), |_| load_slot(resolver.as_ref(), &slot))
                    .map_err(|e| slot.failure(e));
                let _ = tx.send((idx, res));
            });
        }
        drop(tx);

        Ok(Self {
            _pool: pool,
            slots,
            segment_count: timeline.segments().len(),
            rx,
        })
    }

    /// Wait up to `timeout` for the queued work.
    ///
    /// Fails with [`ReelError::AssetLoadTimeout`] when a segment source is still pending at the
    /// deadline. Failed segments, late or failed audio and a late or failed font become warnings.
    #[tracing::instrument(skip_all, fields(timeout_ms = timeout.as_millis() as u64))]
    pub(crate) fn await_ready(self, timeout: Duration) -> ReelResult<LoadedAssets> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut results: Vec<Option<ReelResult<Loaded>>> =
            self.slots.iter().map(|_| None).collect();
        let mut outstanding = self.slots.len();

        while outstanding > 0 {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok((idx, res)) => {
                    if results[idx].is_none() {
                        outstanding -= 1;
                    }
                    results[idx] = Some(res);
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    for (slot, r) in self.slots.iter().zip(results.iter_mut()) {
                        if r.is_none() {
                            *r = Some(Err(slot.failure("asset worker exited before reporting")));
                        }
                    }
                    break;
                }
            }
        }

        let pending = self
            .slots
            .iter()
            .zip(&results)
            .filter(|(slot, r)| slot.required() && r.is_none())
            .count();
        if pending > 0 {
            let waited_ms = started.elapsed().as_millis() as u64;
            tracing::warn!(pending, waited_ms, "required assets not ready before deadline");
            return Err(ReelError::AssetLoadTimeout { waited_ms, pending });
        }

        let mut out = LoadedAssets {
            segments: vec![None; self.segment_count],
            ..LoadedAssets::default()
        };
        for (slot, res) in self.slots.into_iter().zip(results) {
            let res = res
                .unwrap_or_else(|| Err(slot.failure("not ready before the priming deadline")));
            let res = match res {
                Err(e) if !e.is_recoverable() => return Err(e),
                other => other,
            };
            match (slot, res) {
                (Slot::Segment { index, .. }, Ok(Loaded::Segment(asset))) => {
                    out.segments[index] = Some(asset);
                }
                (Slot::CaptionFont(_), Ok(Loaded::Font(bytes))) => out.caption_font = Some(bytes),
                (Slot::Audio(track) | Slot::NativeAudio(track), Ok(Loaded::Audio(pcm))) => {
                    out.audio.push((track, pcm));
                }
                (Slot::NativeAudio(track), Ok(Loaded::Silent)) => {
                    tracing::debug!(source = %track.source, "source video has no audio stream");
                }
                (slot, Ok(_)) => {
                    return Err(ReelError::evaluation(format!(
                        "asset loader returned the wrong kind for '{}'",
                        slot.source_ref()
                    )));
                }
                (Slot::Segment { index, source }, Err(e)) => {
                    tracing::warn!(
                        segment = index,
                        source = source.source(),
                        error = %e,
                        "segment asset failed; rendering background"
                    );
                    out.warnings.push(ExportWarning::AssetLoadFailure {
                        segment: index,
                        source_ref: source.source().to_owned(),
                        reason: failure_reason(e),
                    });
                }
                (Slot::CaptionFont(source), Err(e)) => {
                    tracing::warn!(source = %source, error = %e, "caption font unavailable");
                    out.warnings.push(ExportWarning::CaptionsSkipped {
                        reason: format!("font '{source}': {}", failure_reason(e)),
                    });
                }
                (Slot::Audio(track) | Slot::NativeAudio(track), Err(e)) => {
                    tracing::warn!(
                        track = %track.kind,
                        source = %track.source,
                        error = %e,
                        "audio source omitted"
                    );
                    out.warnings.push(ExportWarning::AudioSourceUnavailable {
                        track: track.kind,
                        source_ref: track.source,
                        reason: failure_reason(e),
                    });
                }
            }
        }
        Ok(out)
    }
}

fn load_slot(resolver: &dyn AssetResolver, slot: &Slot) -> ReelResult<Loaded> {
    match slot {
        Slot::Segment {
            source: SourceRef::Image { source },
            ..
        } => {
            let bytes = resolver.read_bytes(source)?;
            Ok(Loaded::Segment(SegmentAsset::Image(decode_image(&bytes)?)))
        }
        Slot::Segment {
            source: SourceRef::Video { source },
            ..
        } => Ok(Loaded::Segment(SegmentAsset::Video(
            resolver.probe_video(source)?,
        ))),
        Slot::Segment {
            source: SourceRef::Audio { source },
            ..
        } => Err(ReelError::validation(format!(
            "audio source '{source}' cannot be used as a visual segment"
        ))),
        Slot::CaptionFont(source) => Ok(Loaded::Font(Arc::new(resolver.read_bytes(source)?))),
        Slot::Audio(track) => Ok(Loaded::Audio(
            resolver.decode_audio(&track.source, MIX_SAMPLE_RATE)?,
        )),
        Slot::NativeAudio(track) => {
            if !resolver.probe_video(&track.source)?.has_audio {
                return Ok(Loaded::Silent);
            }
            Ok(Loaded::Audio(
                resolver.decode_audio(&track.source, MIX_SAMPLE_RATE)?,
            ))
        }
    }
}

/// Original-media track implied by a timeline made of one source video.
///
/// An explicitly configured original-media track always wins.
fn native_audio_track(timeline: &Timeline, audio: &[AudioTrack]) -> Option<AudioTrack> {
    if audio.iter().any(|t| t.kind == AudioTrackKind::OriginalMedia) {
        return None;
    }
    match timeline.segments() {
        [seg] => match &seg.source {
            SourceRef::Video { source } => {
                Some(AudioTrack::original_media(source.as_str()).with_offset(seg.start_sec))
            }
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
