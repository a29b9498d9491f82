use crate::composition::config::CompositionConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::model::{
    CaptionEvent, EffectParams, SourceRef, TimelineInput, TimelineSegment, TransitionKind,
};

/// Boundary tolerance when checking coverage of `[0, total)`.
const COVERAGE_EPS: f64 = 1e-6;

/// Validated, read-only timeline for one composition.
///
/// Segments are ordered, non-overlapping and cover `[0, total_duration_sec)`. Captions are sorted
/// by start time (stable, so equal starts keep their input order) but may overlap.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    pub(crate) segments: Vec<TimelineSegment>,
    pub(crate) captions: Vec<CaptionEvent>,
    pub(crate) total_duration_sec: f64,
    pub(crate) transition_fraction: f64,
}

impl Timeline {
    /// Build segments from ordered input entries.
    ///
    /// Each entry receives `total * hint / sum(hints)` seconds. Entries without a hint weigh as
    /// the mean of the given hints (or `1.0` when no entry has one). Transitions are resolved here,
    /// once, so `Random` never changes between frames or runs.
    pub fn build(input: &TimelineInput, cfg: &CompositionConfig) -> ReelResult<Self> {
        cfg.validate()?;
        let total = cfg.total_duration_sec;

        let given: Vec<f64> = input
            .entries
            .iter()
            .filter_map(|e| e.duration_hint)
            .collect();
        for h in &given {
            if !h.is_finite() || *h <= 0.0 {
                return Err(ReelError::validation(
                    "timeline duration_hint must be finite and > 0",
                ));
            }
        }
        let fallback = if given.is_empty() {
            1.0
        } else {
            given.iter().sum::<f64>() / given.len() as f64
        };
        let weights: Vec<f64> = input
            .entries
            .iter()
            .map(|e| e.duration_hint.unwrap_or(fallback))
            .collect();
        let weight_sum: f64 = weights.iter().sum();

        let n = input.entries.len();
        let mut segments = Vec::with_capacity(n);
        let mut acc = 0.0f64;
        let mut prev_out: Option<TransitionKind> = None;
        for (i, (entry, w)) in input.entries.iter().zip(&weights).enumerate() {
            acc += w;
            let start_sec = segments
                .last()
                .map(|s: &TimelineSegment| s.end_sec)
                .unwrap_or(0.0);
            let end_sec = if i + 1 == n {
                total
            } else {
                total * acc / weight_sum
            };
            let transition_out = (i + 1 < n).then(|| {
                entry
                    .transition
                    .unwrap_or(cfg.transition)
                    .resolve(i)
            });
            let effect = entry.effect.unwrap_or(match entry.source {
                SourceRef::Video { .. } => EffectParams::still(),
                _ => EffectParams::default(),
            });
            segments.push(TimelineSegment {
                id: entry.id.clone().unwrap_or_else(|| format!("seg-{i}")),
                source: entry.source.clone(),
                start_sec,
                end_sec,
                transition_in: prev_out,
                transition_out,
                effect,
            });
            prev_out = transition_out;
        }

        Self::from_segments(
            segments,
            input.captions.clone(),
            total,
            cfg.transition_fraction,
        )
    }

    /// Validate externally constructed segments.
    pub fn from_segments(
        segments: Vec<TimelineSegment>,
        mut captions: Vec<CaptionEvent>,
        total_duration_sec: f64,
        transition_fraction: f64,
    ) -> ReelResult<Self> {
        if !total_duration_sec.is_finite() || total_duration_sec <= 0.0 {
            return Err(ReelError::validation(
                "timeline total duration must be finite and > 0",
            ));
        }
        if !(transition_fraction > 0.0 && transition_fraction < 1.0) {
            return Err(ReelError::validation(
                "transition_fraction must be within (0, 1)",
            ));
        }

        let mut cursor = 0.0f64;
        for (i, seg) in segments.iter().enumerate() {
            if !seg.source.is_visual() {
                return Err(ReelError::validation(format!(
                    "segment '{}' must reference an image or video",
                    seg.id
                )));
            }
            if !seg.start_sec.is_finite() || !seg.end_sec.is_finite() {
                return Err(ReelError::validation(format!(
                    "segment '{}' has non-finite bounds",
                    seg.id
                )));
            }
            if seg.end_sec <= seg.start_sec {
                return Err(ReelError::validation(format!(
                    "segment '{}' must have end > start",
                    seg.id
                )));
            }
            if (seg.start_sec - cursor).abs() > COVERAGE_EPS {
                let what = if seg.start_sec < cursor {
                    "overlaps the previous segment"
                } else {
                    "leaves a gap after the previous segment"
                };
                return Err(ReelError::validation(format!(
                    "segment '{}' {what}",
                    seg.id
                )));
            }
            if i + 1 == segments.len() && seg.transition_out.is_some() {
                return Err(ReelError::validation(
                    "the last segment cannot have a transition_out",
                ));
            }
            cursor = seg.end_sec;
        }
        if !segments.is_empty() && (cursor - total_duration_sec).abs() > COVERAGE_EPS {
            return Err(ReelError::validation(
                "segments must cover the whole timeline duration",
            ));
        }

        for c in &captions {
            if !c.start_sec.is_finite() || !c.end_sec.is_finite() || c.end_sec < c.start_sec {
                return Err(ReelError::validation(format!(
                    "caption '{}' must have finite bounds with end >= start",
                    c.id
                )));
            }
        }
        captions.sort_by(|a, b| a.start_sec.total_cmp(&b.start_sec));

        Ok(Self {
            segments,
            captions,
            total_duration_sec,
            transition_fraction,
        })
    }

    /// Ordered segments.
    pub fn segments(&self) -> &[TimelineSegment] {
        &self.segments
    }

    /// Captions sorted by start time.
    pub fn captions(&self) -> &[CaptionEvent] {
        &self.captions
    }

    /// Total duration in seconds.
    pub fn total_duration_sec(&self) -> f64 {
        self.total_duration_sec
    }

    /// The resolved outgoing transition of every segment, in order.
    pub fn transition_choices(&self) -> Vec<Option<TransitionKind>> {
        self.segments.iter().map(|s| s.transition_out).collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/build.rs"]
mod tests;
