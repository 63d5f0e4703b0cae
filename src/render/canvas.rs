use crate::{
    foundation::{
        core::{Affine, CanvasSize, Point, Vec2},
        error::{VeilError, VeilResult},
        math::Fnv1a64,
    },
    layers::model::TextLayer,
};

/// A composited raster as RGBA8 pixels.
///
/// Rasters produced by the compositor are **premultiplied alpha**; the flag makes this explicit
/// at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl Raster {
    /// Dimensions as a [`CanvasSize`].
    pub fn size(&self) -> VeilResult<CanvasSize> {
        CanvasSize::new(self.width, self.height)
    }

    /// Pixel at `(x, y)`, or `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Straight-alpha copy of the pixel data.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        if self.premultiplied {
            crate::render::composite::unpremultiply_rgba8(&self.data)
        } else {
            self.data.clone()
        }
    }

    /// Stable 64-bit digest of size and pixels, for change detection and tests.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u32(self.width);
        h.write_u32(self.height);
        h.write_bytes(&self.data);
        h.finish()
    }

    pub(crate) fn from_parts(size: CanvasSize, data: Vec<u8>) -> VeilResult<Self> {
        if data.len() != size.pixel_count() * 4 {
            return Err(VeilError::render("raster byte length mismatch"));
        }
        Ok(Self {
            width: size.width,
            height: size.height,
            data,
            premultiplied: true,
        })
    }
}

/// Canvas-space center point of `layer`.
///
/// `x = W * (left + 50) / 100`, `y = H * (50 - top) / 100`: `left`/`top` are percentage offsets
/// from the center with `top` pointing up.
pub fn layer_anchor(layer: &TextLayer, canvas: CanvasSize) -> Point {
    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    Point::new(
        w * (f64::from(layer.left) + 50.0) / 100.0,
        h * (50.0 - f64::from(layer.top)) / 100.0,
    )
}

/// Ratio between a canvas and the native image it was fitted from.
pub fn canvas_scale(canvas: CanvasSize, native: CanvasSize) -> f64 {
    f64::from(canvas.width) / f64::from(native.width)
}

/// Transform from text-block space (origin at the block's top-left) to canvas space.
///
/// The block of `block_size` is centered on the anchor, scaled by `scale` and rotated about the
/// anchor.
pub(crate) fn layer_transform(
    layer: &TextLayer,
    canvas: CanvasSize,
    scale: f64,
    block_size: Vec2,
) -> Affine {
    let anchor = layer_anchor(layer, canvas);
    Affine::translate(anchor.to_vec2())
        * Affine::rotate(layer.rotation_rad())
        * Affine::scale(scale)
        * Affine::translate(-block_size / 2.0)
}

#[cfg(test)]
#[path = "../../tests/unit/render/canvas.rs"]
mod tests;
