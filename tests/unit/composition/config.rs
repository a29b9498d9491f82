use super::*;

#[test]
fn aspect_ratios_derive_even_dimensions() {
    assert_eq!(
        AspectRatio::Landscape.canvas(720),
        Canvas {
            width: 1280,
            height: 720
        }
    );
    assert_eq!(
        AspectRatio::Portrait.canvas(720),
        Canvas {
            width: 720,
            height: 1280
        }
    );
    assert_eq!(
        AspectRatio::Square.canvas(720),
        Canvas {
            width: 720,
            height: 720
        }
    );
    let small = AspectRatio::Landscape.canvas(15);
    assert!(small.width.is_multiple_of(2) && small.height.is_multiple_of(2));
}

#[test]
fn random_resolution_is_index_based() {
    let kinds: Vec<TransitionKind> = (0..5).map(|i| TransitionPolicy::Random.resolve(i)).collect();
    assert_eq!(
        kinds,
        vec![
            TransitionKind::Fade,
            TransitionKind::Slide,
            TransitionKind::Zoom,
            TransitionKind::Cut,
            TransitionKind::Fade
        ]
    );
    assert_eq!(TransitionPolicy::Cut.resolve(3), TransitionKind::Cut);
}

#[test]
fn validation_catches_bad_values() {
    assert!(CompositionConfig::default().validate().is_ok());
    let bad = [
        CompositionConfig {
            fps: 0,
            ..CompositionConfig::default()
        },
        CompositionConfig {
            total_duration_sec: 0.0,
            ..CompositionConfig::default()
        },
        CompositionConfig {
            background_rgba: [0, 0, 0, 128],
            ..CompositionConfig::default()
        },
        CompositionConfig {
            transition_fraction: 1.0,
            ..CompositionConfig::default()
        },
        CompositionConfig {
            short_edge_px: 0,
            ..CompositionConfig::default()
        },
    ];
    for cfg in bad {
        assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
    }
}

#[test]
fn json_uses_defaults_and_snake_case() {
    let cfg: CompositionConfig = serde_json::from_str(
        r#"{"aspect_ratio":"portrait","fps":24,"total_duration_sec":6.5,"transition":"random","caption_mode":"highlight","include_outro_fade":true}"#,
    )
    .unwrap();
    assert_eq!(cfg.aspect_ratio, AspectRatio::Portrait);
    assert_eq!(cfg.transition, TransitionPolicy::Random);
    assert_eq!(cfg.caption_mode, CaptionMode::Highlight);
    assert!(cfg.include_outro_fade);
    assert!(!cfg.include_intro_fade);
    assert_eq!(cfg.short_edge_px, 720);
    assert_eq!(cfg.total_ticks().unwrap(), 156);
}
