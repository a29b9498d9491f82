use crate::assets::media::{AudioPcm, MIX_SAMPLE_RATE};
use crate::audio::source::{AudioTrack, AudioTrackKind};
use crate::foundation::core::{Fps, FrameIndex};

/// Output channel count of the mix bus.
pub const MIX_CHANNELS: u16 = 2;

#[derive(Clone, Debug)]
struct MixSource {
    kind: AudioTrackKind,
    gain: f32,
    offset_sec: f64,
    pcm: AudioPcm,
}

/// Mixes up to one soundtrack and one original-media source into stereo `f32` at 48 kHz.
///
/// Audio is produced tick by tick so it stays aligned with the frames already pushed: tick `n`
/// covers samples `[frame_to_sample(n), frame_to_sample(n + 1))`.
#[derive(Clone, Debug)]
pub struct AudioMixer {
    fps: Fps,
    sample_rate: u32,
    sources: Vec<MixSource>,
}

impl AudioMixer {
    /// Empty mixer for the given frame rate.
    pub fn new(fps: Fps) -> Self {
        Self {
            fps,
            sample_rate: MIX_SAMPLE_RATE,
            sources: Vec::new(),
        }
    }

    /// Add a decoded source. A second source of the same kind replaces the first.
    pub fn add_source(&mut self, track: &AudioTrack, pcm: AudioPcm) {
        self.sources.retain(|s| s.kind != track.kind);
        self.sources.push(MixSource {
            kind: track.kind,
            gain: track.gain(),
            offset_sec: track.offset_sec,
            pcm,
        });
    }

    /// Whether any source survived acquisition.
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Kinds currently mixed.
    pub fn kinds(&self) -> Vec<AudioTrackKind> {
        self.sources.iter().map(|s| s.kind).collect()
    }

    /// Output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Half-open sample range covered by `tick`.
    pub fn sample_range(&self, tick: FrameIndex) -> (u64, u64) {
        (
            frame_to_sample(tick.0, self.fps, self.sample_rate),
            frame_to_sample(tick.0 + 1, self.fps, self.sample_rate),
        )
    }

    /// Interleaved stereo samples for `tick`, clamped to `[-1, 1]`.
    pub fn mix_tick(&self, tick: FrameIndex) -> Vec<f32> {
        let (start, end) = self.sample_range(tick);
        let frames = (end - start) as usize;
        let channels = usize::from(MIX_CHANNELS);
        let mut out = vec![0.0f32; frames * channels];

        for src in &self.sources {
            mix_source(&mut out, src, start, self.sample_rate);
        }

        for s in &mut out {
            *s = s.clamp(-1.0, 1.0);
        }
        out
    }
}

fn mix_source(out: &mut [f32], src: &MixSource, first_sample: u64, sample_rate: u32) {
    let pcm = &src.pcm;
    if pcm.channels == 0 || pcm.sample_rate == 0 {
        return;
    }
    let src_channels = usize::from(pcm.channels);
    let data = pcm.interleaved_f32.as_slice();
    let src_frames = pcm.frames();
    if src_frames == 0 {
        return;
    }

    let channels = usize::from(MIX_CHANNELS);
    for (i, frame) in out.chunks_exact_mut(channels).enumerate() {
        let dst_sample = first_sample + i as u64;
        let rel_sec = (dst_sample as f64) / f64::from(sample_rate) - src.offset_sec;
        if rel_sec < 0.0 {
            continue;
        }

        let src_pos = rel_sec * f64::from(pcm.sample_rate);
        if !src_pos.is_finite() {
            break;
        }
        let f0 = src_pos.floor() as usize;
        if f0 >= src_frames {
            break;
        }
        let f1 = (f0 + 1).min(src_frames - 1);
        let frac = (src_pos - f0 as f64) as f32;

        let (l, r) = if src_channels == 1 {
            let v = lerp(data[f0], data[f1], frac);
            (v, v)
        } else {
            let i0 = f0 * src_channels;
            let i1 = f1 * src_channels;
            (
                lerp(data[i0], data[i1], frac),
                lerp(data[i0 + 1], data[i1 + 1], frac),
            )
        };

        frame[0] += l * src.gain;
        frame[1] += r * src.gain;
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert a frame count to the nearest sample index at `sample_rate`.
pub(crate) fn frame_to_sample(frame: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
