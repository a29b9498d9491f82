use crate::effects::composite::{crossfade_into, cut_into, slide_into, zoom_into};
use crate::foundation::core::Canvas;
use crate::foundation::error::ReelResult;
use crate::timeline::model::TransitionKind;

/// Two full-canvas premultiplied layers meeting at a segment boundary.
#[derive(Clone, Copy, Debug)]
pub struct LayerPair<'a> {
    /// Outgoing segment.
    pub from: &'a [u8],
    /// Incoming segment.
    pub to: &'a [u8],
    /// Shared layer size.
    pub size: Canvas,
}

/// Blend `layers` into `dst` for transition progress `t` in `[0, 1]`.
///
/// `t = 0` reproduces `from` and `t = 1` reproduces `to`, pixel for pixel, for every kind.
pub fn blend(
    kind: TransitionKind,
    layers: LayerPair<'_>,
    t: f32,
    dst: &mut [u8],
) -> ReelResult<()> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let LayerPair { from, to, size } = layers;
    match kind {
        TransitionKind::Fade => crossfade_into(dst, from, to, t),
        TransitionKind::Slide => slide_into(dst, from, to, size, t),
        TransitionKind::Zoom => zoom_into(dst, from, to, size, t),
        TransitionKind::Cut => cut_into(dst, from, to, t),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/transitions.rs"]
mod tests;
