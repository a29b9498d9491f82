use crate::composition::config::{CompositionConfig, TransitionPolicy};
use crate::timeline::build::Timeline;
use crate::timeline::model::{SourceRef, TimelineEntry, TimelineInput, TransitionKind};

fn timeline(n: usize, total: f64, transition: TransitionPolicy) -> Timeline {
    let input = TimelineInput {
        entries: (0..n)
            .map(|i| TimelineEntry::new(SourceRef::image(format!("img{i}.png"))))
            .collect(),
        captions: Vec::new(),
    };
    let cfg = CompositionConfig {
        total_duration_sec: total,
        transition,
        ..CompositionConfig::default()
    };
    Timeline::build(&input, &cfg).unwrap()
}

#[test]
fn segment_at_is_half_open() {
    let tl = timeline(4, 15.0, TransitionPolicy::Fade);
    assert_eq!(tl.segment_at(0.0), Some(0));
    assert_eq!(tl.segment_at(3.7499), Some(0));
    assert_eq!(tl.segment_at(3.75), Some(1));
    assert_eq!(tl.segment_at(14.999), Some(3));
    assert_eq!(tl.segment_at(15.0), None);
    assert_eq!(tl.segment_at(-0.1), None);
}

#[test]
fn transition_window_starts_at_eighty_percent() {
    let tl = timeline(4, 15.0, TransitionPolicy::Fade);
    for i in 0..3 {
        let seg = &tl.segments()[i];
        let (ws, we) = tl.transition_window(i).unwrap();
        let expected = seg.start_sec + 0.8 * seg.duration_sec();
        assert!((ws - expected).abs() < 1e-9);
        assert_eq!(we, seg.end_sec);
    }
    assert_eq!(tl.transition_window(3), None);
}

#[test]
fn view_reports_transition_progress_linearly() {
    let tl = timeline(2, 10.0, TransitionPolicy::Slide);
    // Segment 0 is [0, 5), window [4, 5).
    let v = tl.view_at(3.9).unwrap();
    assert_eq!(v.index, 0);
    assert!(v.transition.is_none());

    let v = tl.view_at(4.0).unwrap();
    let tr = v.transition.unwrap();
    assert_eq!(tr.next, 1);
    assert_eq!(tr.kind, TransitionKind::Slide);
    assert!(tr.progress.abs() < 1e-12);

    let v = tl.view_at(4.5).unwrap();
    assert!((v.transition.unwrap().progress - 0.5).abs() < 1e-9);

    // The final segment never transitions.
    let v = tl.view_at(9.99).unwrap();
    assert_eq!(v.index, 1);
    assert!(v.transition.is_none());
}

#[test]
fn single_segment_never_transitions() {
    let tl = timeline(1, 4.0, TransitionPolicy::Fade);
    for t in [0.0, 1.0, 3.5, 3.99] {
        assert!(tl.view_at(t).unwrap().transition.is_none());
    }
}

#[test]
fn local_progress_is_clamped() {
    let tl = timeline(2, 10.0, TransitionPolicy::Fade);
    assert_eq!(tl.local_progress(1, 2.0), 0.0);
    assert!((tl.local_progress(1, 7.5) - 0.5).abs() < 1e-12);
    assert_eq!(tl.local_progress(0, 99.0), 1.0);
}

#[test]
fn fade_envelope_ramps_at_both_ends() {
    let tl = timeline(2, 10.0, TransitionPolicy::Fade);
    assert_eq!(tl.fade_envelope(0.0, true, true, 1.0), 0.0);
    assert!((tl.fade_envelope(0.5, true, true, 1.0) - 0.5).abs() < 1e-6);
    assert_eq!(tl.fade_envelope(5.0, true, true, 1.0), 1.0);
    assert!((tl.fade_envelope(9.75, true, true, 1.0) - 0.25).abs() < 1e-6);
    assert_eq!(tl.fade_envelope(0.0, false, false, 1.0), 1.0);
    assert_eq!(tl.fade_envelope(0.0, true, false, 0.0), 1.0);
}

#[test]
fn fade_ramp_is_capped_at_half_duration() {
    let tl = timeline(1, 1.0, TransitionPolicy::Fade);
    // Ramp is 0.5s even though 2s was requested.
    assert!((tl.fade_envelope(0.25, true, false, 2.0) - 0.5).abs() < 1e-6);
}
