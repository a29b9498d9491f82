use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ReelError::evaluation("x")
            .to_string()
            .contains("evaluation error:")
    );
    assert!(
        ReelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn only_load_and_audio_failures_are_recoverable() {
    assert!(ReelError::asset_load("a.png", "missing").is_recoverable());
    assert!(ReelError::audio_unavailable("song.mp3", "decode").is_recoverable());
    assert!(!ReelError::NoFramesCaptured.is_recoverable());
    assert!(!ReelError::SessionBusy.is_recoverable());
    assert!(
        !ReelError::AssetLoadTimeout {
            waited_ms: 10,
            pending: 1
        }
        .is_recoverable()
    );
}

#[test]
fn failure_reasons_map_fatal_kinds() {
    assert_eq!(
        ReelError::NoFramesCaptured.failure_reason(),
        FailureReason::NoFramesCaptured
    );
    assert_eq!(
        ReelError::EncoderUnsupported { tried: vec![] }.failure_reason(),
        FailureReason::EncoderUnsupported
    );
    assert_eq!(
        ReelError::Cancelled.failure_reason(),
        FailureReason::Cancelled
    );
    assert_eq!(
        ReelError::evaluation("x").failure_reason(),
        FailureReason::Pipeline
    );
}

#[test]
fn encoder_unsupported_lists_candidates() {
    let err = ReelError::EncoderUnsupported {
        tried: vec!["h264/mp4".to_string(), "vp9/webm".to_string()],
    };
    assert!(err.to_string().contains("h264/mp4, vp9/webm"));
}
