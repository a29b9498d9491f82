use super::*;

fn cfg(w: u32, h: u32) -> SinkConfig {
    SinkConfig {
        width: w,
        height: h,
        fps: Fps::new(30, 1).unwrap(),
        audio: None,
    }
}

fn frame(w: u32, h: u32, fill: u8) -> RenderFrame {
    RenderFrame {
        width: w,
        height: h,
        data: vec![fill; (w * h * 4) as usize],
        timestamp_sec: 0.0,
    }
}

#[test]
fn finalize_without_frames_is_no_frames_captured() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg(2, 2)).unwrap();
    let err = sink.finalize().unwrap_err();
    assert!(matches!(err, ReelError::NoFramesCaptured));
    assert!(sink.is_finalized());
}

#[test]
fn frames_must_arrive_in_increasing_order() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg(2, 2)).unwrap();
    sink.push_frame(FrameIndex(0), &frame(2, 2, 1)).unwrap();
    sink.push_frame(FrameIndex(1), &frame(2, 2, 2)).unwrap();
    assert!(sink.push_frame(FrameIndex(1), &frame(2, 2, 3)).is_err());
    assert_eq!(sink.frames().len(), 2);
}

#[test]
fn size_mismatch_is_rejected() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg(2, 2)).unwrap();
    let err = sink.push_frame(FrameIndex(0), &frame(4, 2, 0)).unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[test]
fn push_before_begin_fails() {
    let mut sink = InMemorySink::new();
    assert!(sink.push_frame(FrameIndex(0), &frame(2, 2, 0)).is_err());
}

#[test]
fn output_carries_digests_and_duration() {
    let mut sink = InMemorySink::digests_only();
    sink.begin(cfg(2, 2)).unwrap();
    let a = frame(2, 2, 10);
    let b = frame(2, 2, 20);
    sink.push_frame(FrameIndex(0), &a).unwrap();
    sink.push_audio(&[0.5, -0.5]).unwrap();
    sink.push_frame(FrameIndex(1), &b).unwrap();
    sink.push_audio(&[0.25, -0.25]).unwrap();

    assert!(sink.frames().is_empty());
    assert_eq!(sink.digests(), &[a.digest(), b.digest()]);
    assert_eq!(sink.audio(), &[0.5, -0.5, 0.25, -0.25]);

    let out = sink.finalize().unwrap();
    assert_eq!(out.frames, 2);
    assert_eq!(out.bytes.len(), 16);
    assert_eq!(&out.bytes[..8], &a.digest().to_le_bytes());
    assert!((out.duration_sec - 2.0 / 30.0).abs() < 1e-12);
}
