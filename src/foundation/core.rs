use crate::foundation::error::{VeilError, VeilResult};

pub use kurbo::{Affine, Point, Vec2};

/// Pixel dimensions of a raster surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CanvasSize {
    /// Largest edge the CPU raster backend accepts.
    pub const MAX_EDGE: u32 = u16::MAX as u32;

    /// Construct a size, rejecting empty or oversized surfaces.
    pub fn new(width: u32, height: u32) -> VeilResult<Self> {
        if width == 0 || height == 0 {
            return Err(VeilError::validation("canvas width and height must be > 0"));
        }
        if width > Self::MAX_EDGE || height > Self::MAX_EDGE {
            return Err(VeilError::validation(format!(
                "canvas {width}x{height} exceeds {} px per edge",
                Self::MAX_EDGE
            )));
        }
        Ok(Self { width, height })
    }

    /// Fit an image of `image` dimensions to `container_width`, preserving aspect ratio.
    ///
    /// `height = round(width / (image.width / image.height))`, never below one pixel.
    pub fn fit_width(image: CanvasSize, container_width: u32) -> VeilResult<Self> {
        let aspect = f64::from(image.width) / f64::from(image.height);
        let height = (f64::from(container_width) / aspect).round().max(1.0) as u32;
        Self::new(container_width, height)
    }

    pub(crate) fn as_u16(self) -> (u16, u16) {
        // `new` caps both edges at u16::MAX.
        (self.width as u16, self.height as u16)
    }

    pub(crate) fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
