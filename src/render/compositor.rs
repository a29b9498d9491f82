use std::sync::Arc;

use crate::assets::loader::SegmentAsset;
use crate::composition::config::{CaptionMode, CompositionConfig};
use crate::effects::composite::over_in_place;
use crate::effects::transitions::{LayerPair, blend};
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::overlay::captions::caption_at;
use crate::overlay::text::CaptionPainter;
use crate::render::frame::RenderFrame;
use crate::render::layer::{LayerPaint, VideoFrameDecoder, draw_paint, layer_transform};
use crate::session::warning::ExportWarning;
use crate::timeline::build::Timeline;
use crate::timeline::lookup::ActiveView;

enum LayerSource {
    Image(LayerPaint),
    Video(VideoFrameDecoder),
}

/// Produces one opaque [`RenderFrame`] per timestamp.
///
/// Draw order: background, then segment content (one layer, or two blended by the active
/// transition) at the fade-envelope opacity, then captions. Transient draw state is reset after
/// every frame.
pub struct FrameCompositor {
    canvas: Canvas,
    background: [u8; 4],
    caption_mode: CaptionMode,
    intro_fade: bool,
    outro_fade: bool,
    fade_sec: f64,
    timeline: Arc<Timeline>,

    sources: Vec<Option<LayerSource>>,
    captions: Option<CaptionPainter>,
    warnings: Vec<ExportWarning>,

    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
    layer_a: Vec<u8>,
    layer_b: Vec<u8>,
    content: Vec<u8>,
}

impl FrameCompositor {
    /// Compositor over `timeline` with per-segment assets (`None` renders background) and an
    /// optional caption font.
    pub(crate) fn new(
        cfg: &CompositionConfig,
        timeline: Arc<Timeline>,
        segments: Vec<Option<SegmentAsset>>,
        caption_font: Option<&[u8]>,
    ) -> ReelResult<Self> {
        let canvas = cfg.canvas();
        let (w, h) = canvas_u16(canvas)?;
        let mut warnings = Vec::new();

        let mut sources = Vec::with_capacity(timeline.segments().len());
        for (i, asset) in segments.into_iter().enumerate() {
            let source = match asset {
                Some(SegmentAsset::Image(img)) => match LayerPaint::from_prepared(&img) {
                    Ok(p) => Some(LayerSource::Image(p)),
                    Err(e) => {
                        warnings.push(segment_warning(&timeline, i, &e));
                        None
                    }
                },
                Some(SegmentAsset::Video(info)) => {
                    Some(LayerSource::Video(VideoFrameDecoder::new(info)))
                }
                None => None,
            };
            sources.push(source);
        }
        sources.resize_with(timeline.segments().len(), || None);

        let captions = match caption_font {
            Some(bytes) => match CaptionPainter::new(bytes) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(error = %e, "caption font rejected");
                    warnings.push(ExportWarning::CaptionsSkipped {
                        reason: e.to_string(),
                    });
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            canvas,
            background: cfg.background_rgba,
            caption_mode: cfg.caption_mode,
            intro_fade: cfg.include_intro_fade,
            outro_fade: cfg.include_outro_fade,
            fade_sec: cfg.fade_sec,
            timeline,
            sources,
            captions,
            warnings,
            ctx: vello_cpu::RenderContext::new(w, h),
            pixmap: vello_cpu::Pixmap::new(w, h),
            layer_a: vec![0; canvas.rgba_len()],
            layer_b: vec![0; canvas.rgba_len()],
            content: vec![0; canvas.rgba_len()],
        })
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Whether captions can be drawn.
    pub fn has_caption_font(&self) -> bool {
        self.captions.is_some()
    }

    /// Warnings raised since the last call.
    pub fn take_warnings(&mut self) -> Vec<ExportWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// True when there is nothing left to render at `t`: the timeline is empty or the active
    /// video segment's source has run out.
    pub fn end_of_stream(&self, t: f64) -> bool {
        let Some(index) = self.timeline.segment_at(t) else {
            return self.timeline.segments().is_empty();
        };
        match self.sources.get(index) {
            Some(Some(LayerSource::Video(dec))) => {
                let seg = &self.timeline.segments()[index];
                dec.exhausted_at(t - seg.start_sec)
            }
            _ => false,
        }
    }

    /// Composite the frame for output time `t`.
    pub fn render(&mut self, t: f64) -> ReelResult<RenderFrame> {
        let mut data = Vec::with_capacity(self.canvas.rgba_len());
        for _ in 0..(self.canvas.width as usize * self.canvas.height as usize) {
            data.extend_from_slice(&self.background);
        }

        if let Some(view) = self.timeline.view_at(t) {
            let mut layers = [
                std::mem::take(&mut self.layer_a),
                std::mem::take(&mut self.layer_b),
                std::mem::take(&mut self.content),
            ];
            let res = self.compose_content(view, t, &mut layers, &mut data);
            let [a, b, content] = layers;
            self.layer_a = a;
            self.layer_b = b;
            self.content = content;
            res?;
        }

        self.draw_captions(t, &mut data)?;
        self.reset_draw_state();

        Ok(RenderFrame {
            width: self.canvas.width,
            height: self.canvas.height,
            data,
            timestamp_sec: t,
        })
    }

    fn compose_content(
        &mut self,
        view: ActiveView,
        t: f64,
        [layer_a, layer_b, content]: &mut [Vec<u8>; 3],
        frame: &mut [u8],
    ) -> ReelResult<()> {
        self.render_segment(view.index, view.progress, t, layer_a)?;
        match view.transition {
            Some(tr) => {
                let next_progress = self.timeline.local_progress(tr.next, t);
                self.render_segment(tr.next, next_progress, t, layer_b)?;
                let pair = LayerPair {
                    from: layer_a,
                    to: layer_b,
                    size: self.canvas,
                };
                blend(tr.kind, pair, tr.progress as f32, content)?;
            }
            None => content.copy_from_slice(layer_a),
        }
        let env = self
            .timeline
            .fade_envelope(t, self.intro_fade, self.outro_fade, self.fade_sec);
        over_in_place(frame, content, env)
    }

    /// Render segment `index` at intra-segment progress `p` into `out` (premultiplied, transparent
    /// where the source does not cover the canvas).
    fn render_segment(&mut self, index: usize, p: f64, t: f64, out: &mut [u8]) -> ReelResult<()> {
        out.fill(0);
        let seg = self
            .timeline
            .segments()
            .get(index)
            .ok_or_else(|| ReelError::evaluation(format!("segment {index} out of range")))?;
        let effect = seg.effect;
        let local_sec = (t - seg.start_sec).max(0.0);

        let paint = match self.sources.get_mut(index) {
            Some(Some(LayerSource::Image(p))) => p.clone(),
            Some(Some(LayerSource::Video(dec))) => match dec.frame_at(local_sec) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(
                        segment = index,
                        error = %e,
                        "video decode failed; rendering background"
                    );
                    let w = segment_warning(&self.timeline, index, &e);
                    self.warnings.push(w);
                    self.sources[index] = None;
                    return Ok(());
                }
            },
            _ => return Ok(()),
        };

        let transform = layer_transform(self.canvas, paint.width, paint.height, &effect, p);
        self.ctx.reset();
        draw_paint(&mut self.ctx, &paint, transform);
        self.flush_into(out)
    }

    fn draw_captions(&mut self, t: f64, frame: &mut [u8]) -> ReelResult<()> {
        let Some(painter) = self.captions.as_mut() else {
            return Ok(());
        };
        let Some(view) = caption_at(self.timeline.captions(), self.caption_mode, t) else {
            return Ok(());
        };
        self.ctx.reset();
        painter.draw(&mut self.ctx, &view, self.canvas)?;
        let mut overlay = std::mem::take(&mut self.layer_a);
        let res = self
            .flush_into(&mut overlay)
            .and_then(|()| over_in_place(frame, &overlay, 1.0));
        self.layer_a = overlay;
        res
    }

    fn flush_into(&mut self, out: &mut [u8]) -> ReelResult<()> {
        self.ctx.flush();
        self.pixmap.data_as_u8_slice_mut().fill(0);
        self.ctx.render_to_pixmap(&mut self.pixmap);
        let src = self.pixmap.data_as_u8_slice();
        if src.len() != out.len() {
            return Err(ReelError::evaluation("raster target size mismatch"));
        }
        out.copy_from_slice(src);
        Ok(())
    }

    fn reset_draw_state(&mut self) {
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
    }
}

fn segment_warning(timeline: &Timeline, index: usize, e: &ReelError) -> ExportWarning {
    ExportWarning::AssetLoadFailure {
        segment: index,
        source_ref: timeline
            .segments()
            .get(index)
            .map(|s| s.source.source().to_owned())
            .unwrap_or_default(),
        reason: e.to_string(),
    }
}

fn canvas_u16(canvas: Canvas) -> ReelResult<(u16, u16)> {
    let w = u16::try_from(canvas.width)
        .map_err(|_| ReelError::validation("canvas width exceeds u16"))?;
    let h = u16::try_from(canvas.height)
        .map_err(|_| ReelError::validation("canvas height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(ReelError::validation("canvas must be non-empty"));
    }
    Ok((w, h))
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
