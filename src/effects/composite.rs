use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::{mul_div255_u8, unit_to_u8_weight};

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over of `src` (scaled by `opacity`) onto `dst`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = unit_to_u8_weight(opacity);
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Linear blend `(1 - t) * a + t * b`. Exact at both endpoints.
pub fn crossfade(a: PremulRgba8, b: PremulRgba8, t: f32) -> PremulRgba8 {
    let tt = unit_to_u8_weight(t.clamp(0.0, 1.0));
    let it = 255u16 - tt;

    let mut out = [0u8; 4];
    for i in 0..4 {
        let av = mul_div255_u8(u16::from(a[i]), it);
        let bv = mul_div255_u8(u16::from(b[i]), tt);
        out[i] = av.saturating_add(bv);
    }
    out
}

/// `over` applied to whole buffers.
pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> ReelResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::evaluation(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Write `crossfade(a, b, t)` into `dst`.
pub fn crossfade_into(dst: &mut [u8], a: &[u8], b: &[u8], t: f32) -> ReelResult<()> {
    check_triplet(dst, a, b, None)?;
    for ((d, a), b) in dst
        .chunks_exact_mut(4)
        .zip(a.chunks_exact(4))
        .zip(b.chunks_exact(4))
    {
        let out = crossfade([a[0], a[1], a[2], a[3]], [b[0], b[1], b[2], b[3]], t);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Horizontal push: `a` leaves to the left by `t * width`, `b` enters from the right.
///
/// Both layers share one rounded offset so they always abut without a seam.
pub fn slide_into(dst: &mut [u8], a: &[u8], b: &[u8], size: Canvas, t: f32) -> ReelResult<()> {
    check_triplet(dst, a, b, Some(size))?;
    let w = size.width as i64;
    let shift = ((t.clamp(0.0, 1.0) as f64) * w as f64).round() as i64;
    for y in 0..size.height {
        for x in 0..size.width {
            let sx = x as i64 + shift;
            let px = if sx < w {
                sample_px(a, size, sx, y as i64)
            } else {
                sample_px(b, size, sx - w, y as i64)
            };
            let idx = px_index(size, x, y);
            dst[idx..idx + 4].copy_from_slice(&px);
        }
    }
    Ok(())
}

/// Zoom through: `a` shrinks to `1 - 0.2t` while fading out, `b` grows from `0.8` to `1` while
/// fading in. Both scale about the canvas center.
pub fn zoom_into(dst: &mut [u8], a: &[u8], b: &[u8], size: Canvas, t: f32) -> ReelResult<()> {
    check_triplet(dst, a, b, Some(size))?;
    let t = t.clamp(0.0, 1.0);
    let scale_a = 1.0 - 0.2 * f64::from(t);
    let scale_b = 0.8 + 0.2 * f64::from(t);
    let cx = f64::from(size.width) * 0.5;
    let cy = f64::from(size.height) * 0.5;

    for y in 0..size.height {
        for x in 0..size.width {
            let pa = sample_scaled(a, size, x, y, cx, cy, scale_a);
            let pb = sample_scaled(b, size, x, y, cx, cy, scale_b);
            let out = crossfade(pa, pb, t);
            let idx = px_index(size, x, y);
            dst[idx..idx + 4].copy_from_slice(&out);
        }
    }
    Ok(())
}

/// Hard switch: `a` until `t` reaches `1`, then `b`.
pub fn cut_into(dst: &mut [u8], a: &[u8], b: &[u8], t: f32) -> ReelResult<()> {
    check_triplet(dst, a, b, None)?;
    dst.copy_from_slice(if t >= 1.0 { b } else { a });
    Ok(())
}

// Pixel centers map back through the inverse scale; scale 1 is the identity.
fn sample_scaled(
    src: &[u8],
    size: Canvas,
    x: u32,
    y: u32,
    cx: f64,
    cy: f64,
    scale: f64,
) -> PremulRgba8 {
    let px = f64::from(x) + 0.5;
    let py = f64::from(y) + 0.5;
    let sx = cx + (px - cx) / scale;
    let sy = cy + (py - cy) / scale;
    sample_px(src, size, sx.floor() as i64, sy.floor() as i64)
}

fn sample_px(src: &[u8], size: Canvas, x: i64, y: i64) -> PremulRgba8 {
    if x < 0 || y < 0 || x >= i64::from(size.width) || y >= i64::from(size.height) {
        return [0, 0, 0, 0];
    }
    let idx = px_index(size, x as u32, y as u32);
    [src[idx], src[idx + 1], src[idx + 2], src[idx + 3]]
}

fn px_index(size: Canvas, x: u32, y: u32) -> usize {
    ((y as usize) * (size.width as usize) + (x as usize)) * 4
}

fn check_triplet(dst: &[u8], a: &[u8], b: &[u8], size: Option<Canvas>) -> ReelResult<()> {
    let expected = size.map(Canvas::rgba_len).unwrap_or(dst.len());
    if dst.len() != expected
        || a.len() != expected
        || b.len() != expected
        || !expected.is_multiple_of(4)
    {
        return Err(ReelError::evaluation(
            "transition expects equal-length rgba8 buffers matching the canvas",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
