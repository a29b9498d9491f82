use super::*;
use crate::composition::config::{AspectRatio, CaptionMode};

const PROJECT: &str = r#"{
  "config": {
    "aspect_ratio": "portrait",
    "short_edge_px": 360,
    "fps": 24,
    "total_duration_sec": 6.0,
    "transition": "random",
    "caption_mode": "highlight"
  },
  "timeline": {
    "entries": [
      { "source": { "kind": "image", "source": "a.png" }, "duration_hint": 2.0 },
      { "source": { "kind": "image", "source": "b.png" } },
      { "source": { "kind": "image", "source": "c.png" }, "transition": "cut" }
    ],
    "captions": [
      { "start_sec": 0.0, "end_sec": 2.0, "text": "Hello" }
    ]
  },
  "soundtrack": { "source": "music.wav", "offset_sec": 0.5 },
  "original_audio": { "source": "clip.wav" },
  "caption_font": "fonts/caption.ttf"
}"#;

#[test]
fn parses_and_builds_a_project() {
    let def = ProjectDef::from_reader(PROJECT.as_bytes()).unwrap();
    assert_eq!(def.config.aspect_ratio, AspectRatio::Portrait);
    assert_eq!(def.config.caption_mode, CaptionMode::Highlight);
    // Unspecified config fields keep their defaults.
    assert_eq!(def.config.transition_fraction, 0.2);
    assert_eq!(def.timeline.entries.len(), 3);

    let comp = def.into_composition().unwrap();
    assert_eq!(comp.total_ticks(), 144);
    assert_eq!(comp.canvas().width, 360);

    let tracks = comp.audio_tracks();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].kind, AudioTrackKind::Soundtrack);
    assert_eq!(tracks[0].gain(), 0.25);
    assert_eq!(tracks[0].offset_sec, 0.5);
    assert_eq!(tracks[1].gain(), 1.0);
}

#[test]
fn project_cannot_override_fixed_gains() {
    let def = ProjectDef::from_reader(
        r#"{
          "timeline": {"entries": [{"source": {"kind": "image", "source": "a.png"}}]},
          "soundtrack": {"source": "m.wav", "gain": 1.0},
          "original_audio": {"source": "clip.wav", "gain": 0.1}
        }"#
        .as_bytes(),
    )
    .unwrap();
    let comp = def.into_composition().unwrap();
    let tracks = comp.audio_tracks();
    assert_eq!(tracks[0].kind, AudioTrackKind::Soundtrack);
    assert_eq!(tracks[0].gain(), AudioTrackKind::Soundtrack.gain());
    assert_eq!(tracks[0].gain(), 0.25);
    assert_eq!(tracks[1].gain(), 1.0);
}

#[test]
fn minimal_project_uses_defaults() {
    let def = ProjectDef::from_reader(
        r#"{"timeline": {"entries": [{"source": {"kind": "image", "source": "a.png"}}]}}"#
            .as_bytes(),
    )
    .unwrap();
    assert_eq!(def.config, CompositionConfig::default());
    assert!(def.soundtrack.is_none());
    assert!(def.caption_font.is_none());
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = ProjectDef::from_reader("{ not json".as_bytes()).unwrap_err();
    assert!(matches!(err, ReelError::Serde(_)));
}

#[test]
fn missing_file_is_a_validation_error() {
    let err = ProjectDef::from_path("/nonexistent/reelcast/project.json").unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[test]
fn invalid_config_fails_at_build() {
    let mut def = ProjectDef::from_reader(PROJECT.as_bytes()).unwrap();
    def.config.background_rgba = [0, 0, 0, 128];
    assert!(def.into_composition().is_err());
}
