use super::*;

fn gradient(size: Canvas, seed: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(size.rgba_len());
    for y in 0..size.height {
        for x in 0..size.width {
            let v = (x * 13 + y * 7) as u8 ^ seed;
            out.extend_from_slice(&[v, v.wrapping_mul(3), seed, 255]);
        }
    }
    out
}

#[test]
fn every_kind_is_exact_at_both_endpoints() {
    let size = Canvas {
        width: 17,
        height: 9,
    };
    let a = gradient(size, 11);
    let b = gradient(size, 200);
    let layers = LayerPair {
        from: &a,
        to: &b,
        size,
    };
    for kind in TransitionKind::CYCLE {
        let mut dst = vec![0u8; size.rgba_len()];
        blend(kind, layers, 0.0, &mut dst).unwrap();
        assert_eq!(dst, a, "{kind:?} at t=0");
        blend(kind, layers, 1.0, &mut dst).unwrap();
        assert_eq!(dst, b, "{kind:?} at t=1");
    }
}

#[test]
fn cut_holds_outgoing_until_the_end() {
    let size = Canvas {
        width: 2,
        height: 2,
    };
    let a = gradient(size, 1);
    let b = gradient(size, 2);
    let mut dst = vec![0u8; size.rgba_len()];
    let layers = LayerPair {
        from: &a,
        to: &b,
        size,
    };
    blend(TransitionKind::Cut, layers, 0.999, &mut dst).unwrap();
    assert_eq!(dst, a);
}

#[test]
fn fade_midpoint_is_between_layers() {
    let size = Canvas {
        width: 1,
        height: 1,
    };
    let a = vec![0, 0, 0, 255];
    let b = vec![200, 200, 200, 255];
    let mut dst = vec![0u8; 4];
    let layers = LayerPair {
        from: &a,
        to: &b,
        size,
    };
    blend(TransitionKind::Fade, layers, 0.5, &mut dst).unwrap();
    assert!(dst[0] > 90 && dst[0] < 110);
    assert_eq!(dst[3], 255);
}
