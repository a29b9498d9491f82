use crate::timeline::build::Timeline;
use crate::timeline::model::TransitionKind;

/// The incoming segment while a transition window is active.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveTransition {
    /// Index of the incoming segment.
    pub next: usize,
    /// Blend applied across the window.
    pub kind: TransitionKind,
    /// Linear progress through the window in `[0, 1]`.
    pub progress: f64,
}

/// What is visible at one timestamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveView {
    /// Index of the segment containing the timestamp.
    pub index: usize,
    /// Intra-segment progress in `[0, 1]`.
    pub progress: f64,
    /// Set while inside the segment's trailing transition window.
    pub transition: Option<ActiveTransition>,
}

impl Timeline {
    /// Locate the segment whose `[start, end)` contains `t`.
    pub fn segment_at(&self, t: f64) -> Option<usize> {
        if !t.is_finite() || t < 0.0 {
            return None;
        }
        let after = self.segments.partition_point(|s| s.start_sec <= t);
        let idx = after.checked_sub(1)?;
        self.segments[idx].contains(t).then_some(idx)
    }

    /// Intra-segment progress of segment `index` at `t`, clamped to `[0, 1]`.
    pub fn local_progress(&self, index: usize, t: f64) -> f64 {
        let Some(seg) = self.segments.get(index) else {
            return 0.0;
        };
        ((t - seg.start_sec) / seg.duration_sec()).clamp(0.0, 1.0)
    }

    /// `[window_start, end)` of the trailing transition window of segment `index`.
    ///
    /// `None` for the last segment, for timelines with fewer than two segments, and for segments
    /// without an outgoing transition.
    pub fn transition_window(&self, index: usize) -> Option<(f64, f64)> {
        if index + 1 >= self.segments.len() {
            return None;
        }
        let seg = &self.segments[index];
        seg.transition_out?;
        let start = seg.end_sec - self.transition_fraction * seg.duration_sec();
        Some((start, seg.end_sec))
    }

    /// Resolve everything visible at `t`.
    pub fn view_at(&self, t: f64) -> Option<ActiveView> {
        let index = self.segment_at(t)?;
        let progress = self.local_progress(index, t);
        let transition = self.transition_window(index).and_then(|(ws, we)| {
            if t < ws {
                return None;
            }
            let kind = self.segments[index].transition_out?;
            Some(ActiveTransition {
                next: index + 1,
                kind,
                progress: ((t - ws) / (we - ws)).clamp(0.0, 1.0),
            })
        });
        Some(ActiveView {
            index,
            progress,
            transition,
        })
    }

    /// Global intro/outro multiplier for the composited content at `t`.
    ///
    /// Independent of per-segment transitions; it is applied on top of whatever the segments
    /// blend to. The ramp length is capped at half the timeline so the two fades never overlap
    /// past their midpoint.
    pub fn fade_envelope(&self, t: f64, intro: bool, outro: bool, fade_sec: f64) -> f32 {
        let ramp = fade_sec.min(self.total_duration_sec / 2.0);
        if ramp <= 0.0 {
            return 1.0;
        }
        let mut env = 1.0f64;
        if intro {
            env *= (t / ramp).clamp(0.0, 1.0);
        }
        if outro {
            env *= ((self.total_duration_sec - t) / ramp).clamp(0.0, 1.0);
        }
        env as f32
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/lookup.rs"]
mod tests;
