use std::sync::Arc;

use crate::{
    assets::{
        color::{CssColor, parse_css_color},
        decode::DecodedImage,
        fonts::{FontBook, ShapedText, TextBrushRgba8, TextLayoutEngine},
    },
    foundation::{
        core::{Affine, CanvasSize, Vec2},
        error::{VeilError, VeilResult},
    },
    layers::{edit::validate_layer_geometry, model::TextLayer},
    render::{
        blur::{BlurKernel, blur_rgba8_premul},
        canvas::{Raster, canvas_scale, layer_transform},
        composite::over_in_place,
    },
};

/// Everything the compositor paints, in stacking order.
#[derive(Clone, Copy, Debug)]
pub struct Scene<'a> {
    /// Background image; its native size defines the composition space.
    pub background: &'a DecodedImage,
    /// Foreground cutout drawn over every text layer, if available.
    pub cutout: Option<&'a DecodedImage>,
    /// Text layers in paint order.
    pub layers: &'a [TextLayer],
}

impl Scene<'_> {
    /// Native composition size (the background's pixel size).
    pub fn native_size(&self) -> VeilResult<CanvasSize> {
        self.background.size()
    }
}

/// CPU compositor: background, then text layers, then the cutout.
///
/// Rendering is a pure function of the [`Scene`] and the target width; the compositor only caches
/// font contexts between calls.
pub struct Compositor {
    fonts: Arc<FontBook>,
    text_engine: TextLayoutEngine,
    ctx: Option<vello_cpu::RenderContext>,
}

impl Compositor {
    /// Construct a compositor drawing text with faces from `fonts`.
    pub fn new(fonts: Arc<FontBook>) -> Self {
        Self {
            fonts,
            text_engine: TextLayoutEngine::new(),
            ctx: None,
        }
    }

    /// Fonts available to text layers.
    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Composite at the background's native resolution.
    pub fn render_native(&mut self, scene: &Scene<'_>) -> VeilResult<Raster> {
        let native = scene.native_size()?;
        self.render(scene, native)
    }

    /// Composite at `container_width`, keeping the background's aspect ratio.
    pub fn render_fit_width(&mut self, scene: &Scene<'_>, container_width: u32) -> VeilResult<Raster> {
        let native = scene.native_size()?;
        let canvas = CanvasSize::fit_width(native, container_width)?;
        self.render(scene, canvas)
    }

    /// Composite onto a canvas of exactly `canvas` pixels.
    ///
    /// Text sizes, shadows and positions are defined in native image pixels and scaled by
    /// `canvas.width / native.width`, so a smaller canvas is a uniformly scaled copy of the
    /// native composite.
    #[tracing::instrument(skip_all, fields(width = canvas.width, height = canvas.height, layers = scene.layers.len()))]
    pub fn render(&mut self, scene: &Scene<'_>, canvas: CanvasSize) -> VeilResult<Raster> {
        let native = scene.native_size()?;
        let scale = canvas_scale(canvas, native);

        let background = image_paint(scene.background)?;
        let mut out = self.rasterize(canvas, |ctx| {
            fill_canvas_with_image(ctx, canvas, &background);
            Ok(())
        })?;

        for layer in scene.layers {
            self.draw_layer(&mut out, layer, canvas, scale)?;
        }

        if let Some(cutout) = scene.cutout {
            if cutout.width != native.width || cutout.height != native.height {
                tracing::debug!(
                    cutout_w = cutout.width,
                    cutout_h = cutout.height,
                    native_w = native.width,
                    native_h = native.height,
                    "cutout size differs from background; scaling to fill"
                );
            }
            let paint = image_paint(cutout)?;
            let top = self.rasterize(canvas, |ctx| {
                fill_canvas_with_image(ctx, canvas, &paint);
                Ok(())
            })?;
            over_in_place(&mut out, &top, 1.0)?;
        }

        Raster::from_parts(canvas, out)
    }

    fn draw_layer(
        &mut self,
        dst: &mut [u8],
        layer: &TextLayer,
        canvas: CanvasSize,
        scale: f64,
    ) -> VeilResult<()> {
        let opacity = layer.effective_opacity();
        if opacity <= 0.0 || layer.text.is_empty() {
            return Ok(());
        }
        if let Err(e) = validate_layer_geometry(layer) {
            tracing::warn!(layer = layer.id, error = %e, "skipping out-of-range text layer");
            return Ok(());
        }

        let fonts = self.fonts.clone();
        let weight = f32::from(layer.font_weight);
        let Some(resolved) = fonts.resolve(&layer.font_family, weight) else {
            tracing::warn!(layer = layer.id, "no fonts loaded; text layer not drawn");
            return Ok(());
        };
        if resolved.substituted {
            tracing::debug!(
                layer = layer.id,
                requested = %layer.font_family,
                used = %resolved.face.family,
                "font family not found; using fallback"
            );
        }

        let fill = parse_css_color(&layer.color).unwrap_or_else(|e| {
            tracing::warn!(layer = layer.id, error = %e, "invalid fill color; using white");
            CssColor::rgba(1.0, 1.0, 1.0, 1.0)
        });
        let shadow = if layer.shadow_size > 0.0 {
            match parse_css_color(&layer.shadow_color) {
                Ok(c) if !c.is_transparent() => Some(c),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(layer = layer.id, error = %e, "invalid shadow color; shadow skipped");
                    None
                }
            }
        } else {
            None
        };

        let shaped = self.text_engine.layout_line(
            &fonts,
            resolved.id,
            &layer.text,
            layer.font_size,
            weight,
            brush(fill),
        )?;
        let transform = layer_transform(
            layer,
            canvas,
            scale,
            Vec2::new(f64::from(shaped.width), f64::from(shaped.height)),
        );

        if let Some(shadow) = shadow
            && let Some(kernel) = BlurKernel::for_shadow(
                f64::from(layer.shadow_size) * scale,
                canvas.width.max(canvas.height),
            )
        {
            let glyphs = self.rasterize(canvas, |ctx| {
                fill_glyphs(ctx, &shaped, transform, Some(shadow));
                Ok(())
            })?;
            let blurred = blur_rgba8_premul(&glyphs, canvas, &kernel)?;
            over_in_place(dst, &blurred, opacity)?;
        }

        let glyphs = self.rasterize(canvas, |ctx| {
            fill_glyphs(ctx, &shaped, transform, None);
            Ok(())
        })?;
        over_in_place(dst, &glyphs, opacity)
    }

    /// Run `draw` on a cleared render context and read back premultiplied RGBA8.
    fn rasterize(
        &mut self,
        canvas: CanvasSize,
        draw: impl FnOnce(&mut vello_cpu::RenderContext) -> VeilResult<()>,
    ) -> VeilResult<Vec<u8>> {
        let (w, h) = canvas.as_u16();
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        ctx.reset();
        draw(&mut ctx)?;
        ctx.flush();

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        self.ctx = Some(ctx);
        Ok(pixmap.data_as_u8_slice().to_vec())
    }
}

fn brush(c: CssColor) -> TextBrushRgba8 {
    let [r, g, b, a] = c.to_rgba8();
    TextBrushRgba8 { r, g, b, a }
}

struct ImagePaint {
    paint: vello_cpu::Image,
    w: u32,
    h: u32,
}

fn image_paint(img: &DecodedImage) -> VeilResult<ImagePaint> {
    let pixmap = pixmap_from_premul_bytes(&img.rgba8_premul, img.width, img.height)?;
    Ok(ImagePaint {
        paint: vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        },
        w: img.width,
        h: img.height,
    })
}

fn fill_canvas_with_image(ctx: &mut vello_cpu::RenderContext, canvas: CanvasSize, img: &ImagePaint) {
    let sx = f64::from(canvas.width) / f64::from(img.w);
    let sy = f64::from(canvas.height) / f64::from(img.h);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(Affine::scale_non_uniform(sx, sy)));
    ctx.set_paint(img.paint.clone());
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(img.w),
        f64::from(img.h),
    ));
}

/// Draw every glyph run of `shaped` at its line position and baseline; `color` overrides the
/// layout brush (used for shadows).
fn fill_glyphs(
    ctx: &mut vello_cpu::RenderContext,
    shaped: &ShapedText,
    transform: Affine,
    color: Option<CssColor>,
) {
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(transform));
    for line in shaped.layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let b = match color {
                Some(c) => brush(c),
                None => run.style().brush,
            };
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(b.r, b.g, b.b, b.a));
            let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(&shaped.font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn pixmap_from_premul_bytes(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> VeilResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| VeilError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| VeilError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(VeilError::render("decoded image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        width as usize * height as usize,
    );
    for px in rgba8_premul.chunks_exact(4) {
        may_have_opacities |= px[3] != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
