use super::*;
use crate::composition::config::TransitionPolicy;
use crate::timeline::model::TimelineEntry;

fn images(n: usize) -> TimelineInput {
    TimelineInput {
        entries: (0..n)
            .map(|i| TimelineEntry::new(SourceRef::image(format!("img{i}.png"))))
            .collect(),
        captions: Vec::new(),
    }
}

fn cfg(total: f64, transition: TransitionPolicy) -> CompositionConfig {
    CompositionConfig {
        total_duration_sec: total,
        transition,
        ..CompositionConfig::default()
    }
}

#[test]
fn equal_split_covers_total() {
    let tl = Timeline::build(&images(4), &cfg(15.0, TransitionPolicy::Fade)).unwrap();
    let bounds: Vec<(f64, f64)> = tl
        .segments()
        .iter()
        .map(|s| (s.start_sec, s.end_sec))
        .collect();
    assert_eq!(
        bounds,
        vec![(0.0, 3.75), (3.75, 7.5), (7.5, 11.25), (11.25, 15.0)]
    );
}

#[test]
fn duration_hints_are_proportional() {
    let mut input = images(3);
    input.entries[0].duration_hint = Some(1.0);
    input.entries[1].duration_hint = Some(3.0);
    // Missing hint weighs as the mean (2.0).
    let tl = Timeline::build(&input, &cfg(12.0, TransitionPolicy::Cut)).unwrap();
    let durs: Vec<f64> = tl.segments().iter().map(|s| s.duration_sec()).collect();
    assert!((durs[0] - 2.0).abs() < 1e-9);
    assert!((durs[1] - 6.0).abs() < 1e-9);
    assert!((durs[2] - 4.0).abs() < 1e-9);
}

#[test]
fn random_policy_cycles_by_index() {
    let tl = Timeline::build(&images(6), &cfg(12.0, TransitionPolicy::Random)).unwrap();
    assert_eq!(
        tl.transition_choices(),
        vec![
            Some(TransitionKind::Fade),
            Some(TransitionKind::Slide),
            Some(TransitionKind::Zoom),
            Some(TransitionKind::Cut),
            Some(TransitionKind::Fade),
            None,
        ]
    );
}

#[test]
fn transition_in_mirrors_previous_out() {
    let mut input = images(3);
    input.entries[0].transition = Some(TransitionPolicy::Slide);
    let tl = Timeline::build(&input, &cfg(6.0, TransitionPolicy::Zoom)).unwrap();
    let segs = tl.segments();
    assert_eq!(segs[0].transition_in, None);
    assert_eq!(segs[0].transition_out, Some(TransitionKind::Slide));
    assert_eq!(segs[1].transition_in, Some(TransitionKind::Slide));
    assert_eq!(segs[1].transition_out, Some(TransitionKind::Zoom));
    assert_eq!(segs[2].transition_in, Some(TransitionKind::Zoom));
    assert_eq!(segs[2].transition_out, None);
}

#[test]
fn video_entries_default_to_still_effect() {
    let input = TimelineInput {
        entries: vec![TimelineEntry::new(SourceRef::video("clip.mp4"))],
        captions: Vec::new(),
    };
    let tl = Timeline::build(&input, &cfg(3.0, TransitionPolicy::Fade)).unwrap();
    assert_eq!(tl.segments()[0].effect, EffectParams::still());
}

#[test]
fn audio_entries_are_rejected() {
    let input = TimelineInput {
        entries: vec![TimelineEntry::new(SourceRef::audio("song.mp3"))],
        captions: Vec::new(),
    };
    assert!(Timeline::build(&input, &cfg(3.0, TransitionPolicy::Fade)).is_err());
}

#[test]
fn empty_input_builds_an_empty_timeline() {
    let tl = Timeline::build(&images(0), &cfg(5.0, TransitionPolicy::Fade)).unwrap();
    assert!(tl.segments().is_empty());
    assert_eq!(tl.total_duration_sec(), 5.0);
}

#[test]
fn from_segments_rejects_overlap_and_gaps() {
    let seg = |id: &str, start: f64, end: f64| TimelineSegment {
        id: id.to_string(),
        source: SourceRef::image("a.png"),
        start_sec: start,
        end_sec: end,
        transition_in: None,
        transition_out: None,
        effect: EffectParams::default(),
    };
    let overlap = vec![seg("a", 0.0, 2.0), seg("b", 1.5, 4.0)];
    let err = Timeline::from_segments(overlap, Vec::new(), 4.0, 0.2).unwrap_err();
    assert!(err.to_string().contains("overlaps"));

    let gap = vec![seg("a", 0.0, 2.0), seg("b", 2.5, 4.0)];
    let err = Timeline::from_segments(gap, Vec::new(), 4.0, 0.2).unwrap_err();
    assert!(err.to_string().contains("gap"));

    let short = vec![seg("a", 0.0, 2.0)];
    assert!(Timeline::from_segments(short, Vec::new(), 4.0, 0.2).is_err());

    let mut audio = seg("a", 0.0, 4.0);
    audio.source = SourceRef::audio("song.mp3");
    let err = Timeline::from_segments(vec![audio], Vec::new(), 4.0, 0.2).unwrap_err();
    assert!(err.to_string().contains("image or video"));
}

#[test]
fn captions_are_sorted_stably_and_overlap_is_kept() {
    let input = TimelineInput {
        entries: images(1).entries,
        captions: vec![
            CaptionEvent::new(2.0, 4.0, "World"),
            CaptionEvent::new(0.0, 3.0, "first"),
            CaptionEvent::new(0.0, 2.0, "second"),
        ],
    };
    let tl = Timeline::build(&input, &cfg(4.0, TransitionPolicy::Fade)).unwrap();
    let texts: Vec<&str> = tl.captions().iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second", "World"]);
}
