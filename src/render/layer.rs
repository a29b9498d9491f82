use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use kurbo::{Affine, Vec2};

use crate::assets::decode::PreparedImage;
use crate::assets::media::{VideoSourceInfo, decode_video_frame};
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::model::EffectParams;

const VIDEO_CACHE_CAPACITY: usize = 16;

/// A source ready to be painted into a segment layer.
#[derive(Clone)]
pub(crate) struct LayerPaint {
    pub(crate) paint: vello_cpu::Image,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl LayerPaint {
    pub(crate) fn from_prepared(img: &PreparedImage) -> ReelResult<Self> {
        Ok(Self {
            paint: premul_image(&img.rgba8_premul, img.width, img.height)?,
            width: img.width,
            height: img.height,
        })
    }
}

/// Transform placing a `src_w x src_h` source on `canvas`.
///
/// The source is fit (`s = min(W / w, H / h)`) and centered, then zoomed by
/// `1 + ken_burns_zoom * p` and panned by `pan * p` about the canvas center. `p` is clamped to
/// `[0, 1]` so motion is continuous in time.
pub fn layer_transform(
    canvas: Canvas,
    src_w: u32,
    src_h: u32,
    effect: &EffectParams,
    p: f64,
) -> Affine {
    let cw = f64::from(canvas.width);
    let ch = f64::from(canvas.height);
    let sw = f64::from(src_w.max(1));
    let sh = f64::from(src_h.max(1));
    let s = (cw / sw).min(ch / sh);
    let fit = Affine::translate(((cw - sw * s) * 0.5, (ch - sh * s) * 0.5)) * Affine::scale(s);

    let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
    let zoom = 1.0 + effect.ken_burns_zoom * p;
    let center = Vec2::new(cw * 0.5, ch * 0.5);
    let pan = Vec2::new(effect.pan.x * cw, effect.pan.y * ch) * p;
    let motion = Affine::translate(center + pan) * Affine::scale(zoom) * Affine::translate(-center);

    motion * fit
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

/// Paint `src` filling its own bounds under `transform`.
pub(crate) fn draw_paint(ctx: &mut vello_cpu::RenderContext, src: &LayerPaint, transform: Affine) {
    ctx.set_transform(affine_to_cpu(transform));
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
    ctx.set_paint(src.paint.clone());
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(src.width),
        f64::from(src.height),
    ));
}

/// Frame-accurate access to a probed video, with a small LRU of decoded frames.
pub(crate) struct VideoFrameDecoder {
    info: VideoSourceInfo,
    frame_cache: HashMap<u64, LayerPaint>,
    lru: VecDeque<u64>,
}

impl VideoFrameDecoder {
    pub(crate) fn new(info: VideoSourceInfo) -> Self {
        Self {
            info,
            frame_cache: HashMap::new(),
            lru: VecDeque::new(),
        }
    }

    /// Whether `local_sec` is past the end of the source.
    pub(crate) fn exhausted_at(&self, local_sec: f64) -> bool {
        self.info.source_time_sec(local_sec).is_none()
    }

    /// Frame shown `local_sec` into the segment; holds the last frame past the end.
    pub(crate) fn frame_at(&mut self, local_sec: f64) -> ReelResult<LayerPaint> {
        let t = self
            .info
            .source_time_sec(local_sec)
            .unwrap_or_else(|| self.info.last_frame_sec());
        let key = (t * 1000.0).round() as u64;
        if let Some(p) = self.frame_cache.get(&key).cloned() {
            self.touch(key);
            return Ok(p);
        }

        let paint = LayerPaint::from_prepared(&decode_video_frame(&self.info, t)?)?;
        self.frame_cache.insert(key, paint.clone());
        self.touch(key);
        while self.lru.len() > VIDEO_CACHE_CAPACITY {
            if let Some(old) = self.lru.pop_front() {
                self.frame_cache.remove(&old);
            }
        }
        Ok(paint)
    }

    fn touch(&mut self, key: u64) {
        if let Some(pos) = self.lru.iter().position(|x| *x == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key);
    }
}

fn premul_image(bytes: &[u8], width: u32, height: u32) -> ReelResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ReelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelError::evaluation("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelError::evaluation("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ReelError::evaluation("pixmap byte len mismatch"));
    }
    let pixels: Vec<vello_cpu::peniko::color::PremulRgba8> = bytes
        .chunks_exact(4)
        .map(|px| {
            vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]])
        })
        .collect();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

#[cfg(test)]
#[path = "../../tests/unit/render/layer.rs"]
mod tests;
