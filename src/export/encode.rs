use std::path::{Path, PathBuf};

use anyhow::Context;
use image::ImageEncoder;

use crate::{
    foundation::{
        error::{VeilError, VeilResult},
        math::mul_div255_u16,
    },
    render::canvas::Raster,
};

/// File stem used for exported images unless overridden.
pub const DEFAULT_FILE_STEM: &str = "text-behind-image";

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Output encoding of an export.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Lossless RGBA PNG.
    #[default]
    Png,
    /// RGB JPEG; transparency is flattened over white.
    Jpeg,
}

impl ExportFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Export options stored in the project file.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportSettings {
    /// Output encoding.
    pub format: ExportFormat,
    /// JPEG quality, 1..=100.
    pub jpeg_quality: u8,
    /// File name without extension.
    pub file_stem: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            file_stem: DEFAULT_FILE_STEM.to_owned(),
        }
    }
}

impl ExportSettings {
    /// `"<stem>.<ext>"` for the configured format.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.file_stem, self.format.extension())
    }

    /// Check quality range and file stem.
    pub fn validate(&self) -> VeilResult<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(VeilError::validation(format!(
                "jpeg quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        let stem = self.file_stem.trim();
        if stem.is_empty() || stem.contains(['/', '\\']) {
            return Err(VeilError::validation(
                "export file stem must be a non-empty file name",
            ));
        }
        Ok(())
    }
}

/// An encoded export ready to be written.
#[derive(Clone, Debug)]
pub struct ExportedImage {
    /// Encoded file bytes.
    pub bytes: Vec<u8>,
    /// Encoding used.
    pub format: ExportFormat,
    /// Target file name, e.g. `text-behind-image.png`.
    pub file_name: String,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
}

impl ExportedImage {
    /// Write into `dir` (created if missing) and return the full path.
    pub fn write_to_dir(&self, dir: &Path) -> VeilResult<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir '{}'", dir.display()))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("write export '{}'", path.display()))?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "export written");
        Ok(path)
    }
}

/// Encode a composite as PNG (straight RGBA) or JPEG (RGB over white).
#[tracing::instrument(skip(raster), fields(width = raster.width, height = raster.height))]
pub fn encode(raster: &Raster, format: ExportFormat, jpeg_quality: u8) -> VeilResult<Vec<u8>> {
    let mut out = Vec::new();
    match format {
        ExportFormat::Png => {
            let rgba = raster.to_straight_rgba8();
            image::codecs::png::PngEncoder::new(&mut out)
                .write_image(
                    &rgba,
                    raster.width,
                    raster.height,
                    image::ExtendedColorType::Rgba8,
                )
                .context("encode png")?;
        }
        ExportFormat::Jpeg => {
            if !(1..=100).contains(&jpeg_quality) {
                return Err(VeilError::validation(format!(
                    "jpeg quality must be in 1..=100, got {jpeg_quality}"
                )));
            }
            let rgb = flatten_to_rgb8(raster, [255, 255, 255])?;
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, jpeg_quality)
                .write_image(
                    &rgb,
                    raster.width,
                    raster.height,
                    image::ExtendedColorType::Rgb8,
                )
                .context("encode jpeg")?;
        }
    }
    Ok(out)
}

/// Composite premultiplied (or straight) RGBA over an opaque background, dropping alpha.
fn flatten_to_rgb8(raster: &Raster, bg_rgb: [u8; 3]) -> VeilResult<Vec<u8>> {
    if raster.data.len() != raster.width as usize * raster.height as usize * 4 {
        return Err(VeilError::render("raster byte length mismatch"));
    }
    let premul;
    let src: &[u8] = if raster.premultiplied {
        &raster.data
    } else {
        premul = premultiply(&raster.data);
        &premul
    };

    let mut out = Vec::with_capacity(src.len() / 4 * 3);
    for s in src.chunks_exact(4) {
        let inv = 255u16 - u16::from(s[3]);
        for (&sc, &bc) in s[..3].iter().zip(&bg_rgb) {
            let v = u16::from(sc) + mul_div255_u16(u16::from(bc), inv);
            out.push(v.min(255) as u8);
        }
    }
    Ok(out)
}

fn premultiply(straight: &[u8]) -> Vec<u8> {
    let mut out = straight.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in px.iter_mut().take(3) {
            *c = mul_div255_u16(u16::from(*c), a) as u8;
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/export/encode.rs"]
mod tests;
