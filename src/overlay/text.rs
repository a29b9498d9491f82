use std::borrow::Cow;

use crate::composition::config::CaptionMode;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::overlay::captions::CaptionView;

/// Caption font size as a fraction of the canvas width.
pub const CAPTION_SIZE_FRACTION: f32 = 0.055;
/// Maximum caption line width as a fraction of the canvas width.
pub const CAPTION_MAX_WIDTH_FRACTION: f32 = 0.9;
/// Outline width as a fraction of the font size.
pub const CAPTION_STROKE_FRACTION: f32 = 0.12;
/// Gap between the caption block and the bottom edge, as a fraction of the canvas height.
pub const CAPTION_BOTTOM_MARGIN_FRACTION: f32 = 0.08;

/// Fill of regular caption words.
pub const CAPTION_FILL: TextBrushRgba8 = TextBrushRgba8::opaque(255, 255, 255);
/// Fill of the highlighted word.
pub const CAPTION_HIGHLIGHT: TextBrushRgba8 = TextBrushRgba8::opaque(255, 191, 0);
/// Outline color.
pub const CAPTION_STROKE: TextBrushRgba8 = TextBrushRgba8::opaque(0, 0, 0);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color carried through Parley text layout.
pub struct TextBrushRgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl TextBrushRgba8 {
    /// Fully opaque color.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    fn to_cpu(self) -> vello_cpu::peniko::Color {
        vello_cpu::peniko::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

/// A shaped caption positioned on the canvas.
pub struct CaptionLayout {
    layout: parley::Layout<TextBrushRgba8>,
    origin: (f64, f64),
    font_size: f32,
}

impl CaptionLayout {
    /// Top-left of the text block in canvas pixels.
    pub fn origin(&self) -> (f64, f64) {
        self.origin
    }

    /// Block size in pixels.
    pub fn size(&self) -> (f32, f32) {
        (self.layout.width(), self.layout.height())
    }

    /// Number of wrapped lines.
    pub fn line_count(&self) -> usize {
        self.layout.len()
    }
}

/// Lays out and draws captions with one registered font.
pub struct CaptionPainter {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

impl CaptionPainter {
    /// Register `font_bytes` and prepare layout contexts.
    pub fn new(font_bytes: &[u8]) -> ReelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            ReelError::validation("no font families registered from caption font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ReelError::validation("registered caption font has no family name"))?
            .to_string();

        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font_bytes.to_vec()),
            0,
        );

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font,
        })
    }

    /// Family name of the registered font.
    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Shape `view` for `canvas`: wrapped to the max width, centered, resting above the bottom
    /// margin.
    pub fn layout(&mut self, view: &CaptionView<'_>, canvas: Canvas) -> ReelResult<CaptionLayout> {
        let width = canvas.width as f32;
        let height = canvas.height as f32;
        let font_size = (width * CAPTION_SIZE_FRACTION).max(1.0);
        let max_width = width * CAPTION_MAX_WIDTH_FRACTION;
        let text = view.event.text.as_str();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font_size));
        builder.push_default(parley::style::StyleProperty::Brush(CAPTION_FILL));
        if view.mode == CaptionMode::Highlight
            && let Some(span) = view.highlight_word.and_then(|i| view.words.get(i))
        {
            builder.push(
                parley::style::StyleProperty::Brush(CAPTION_HIGHLIGHT),
                span.clone(),
            );
        }

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(Some(max_width));
        layout.align(
            Some(max_width),
            parley::Alignment::Center,
            parley::AlignmentOptions::default(),
        );

        let x = f64::from((width - max_width) * 0.5);
        let y = f64::from(height - height * CAPTION_BOTTOM_MARGIN_FRACTION - layout.height())
            .max(0.0);
        Ok(CaptionLayout {
            layout,
            origin: (x, y),
            font_size,
        })
    }

    /// Draw `view`: a black outline pass over every glyph, then the fill pass on top.
    pub fn draw(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        view: &CaptionView<'_>,
        canvas: Canvas,
    ) -> ReelResult<()> {
        let laid = self.layout(view, canvas)?;
        ctx.set_transform(vello_cpu::kurbo::Affine::translate(laid.origin));
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());

        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(f64::from(
            laid.font_size * CAPTION_STROKE_FRACTION,
        )));
        ctx.set_paint(CAPTION_STROKE.to_cpu());
        for line in laid.layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&self.font)
                    .font_size(run.run().font_size())
                    .stroke_glyphs(glyphs);
            }
        }

        for line in laid.layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                ctx.set_paint(run.style().brush.to_cpu());
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&self.font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/text.rs"]
mod tests;
