use std::sync::Arc;

use anyhow::Context;

use crate::foundation::{
    core::CanvasSize,
    error::{VeilError, VeilResult},
};

/// Image formats accepted from the file select surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Portable Network Graphics.
    Png,
    /// JPEG / JFIF.
    Jpeg,
    /// GIF (first frame).
    Gif,
}

impl SourceFormat {
    /// MIME type sent alongside the original bytes.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
        }
    }

    fn as_image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Gif => image::ImageFormat::Gif,
        }
    }
}

/// Decoded raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl DecodedImage {
    /// Dimensions as a [`CanvasSize`].
    pub fn size(&self) -> VeilResult<CanvasSize> {
        CanvasSize::new(self.width, self.height)
    }
}

/// Identify the container format from magic bytes, accepting only PNG, JPEG and GIF.
pub fn sniff_format(bytes: &[u8]) -> VeilResult<SourceFormat> {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => Ok(SourceFormat::Png),
        Ok(image::ImageFormat::Jpeg) => Ok(SourceFormat::Jpeg),
        Ok(image::ImageFormat::Gif) => Ok(SourceFormat::Gif),
        Ok(other) => Err(VeilError::decode(format!(
            "unsupported image format {other:?} (expected PNG, JPEG or GIF)"
        ))),
        Err(_) => Err(VeilError::decode("unrecognized image data")),
    }
}

/// Decode a source image of a known format.
pub fn decode_source(bytes: &[u8], format: SourceFormat) -> VeilResult<DecodedImage> {
    let dyn_img = image::load_from_memory_with_format(bytes, format.as_image_format())
        .with_context(|| format!("decode {format:?} image"))?;
    Ok(from_dynamic(dyn_img))
}

/// Decode any image the `image` crate understands (used for cutouts returned by collaborators).
pub fn decode_image(bytes: &[u8]) -> VeilResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(from_dynamic(dyn_img))
}

fn from_dynamic(dyn_img: image::DynamicImage) -> DecodedImage {
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    DecodedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
