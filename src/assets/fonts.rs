use std::{
    borrow::Cow,
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::foundation::error::{VeilError, VeilResult};

/// Family names tried, in order, when a layer asks for a family that is not loaded.
pub const SANS_SERIF_FALLBACKS: &[&str] = &[
    "Inter",
    "Helvetica",
    "Arial",
    "Liberation Sans",
    "DejaVu Sans",
    "Noto Sans",
    "Roboto",
];

/// One loaded font face.
#[derive(Clone)]
pub struct FontFace {
    /// Family name reported by the font.
    pub family: String,
    /// Numeric weight reported by the font.
    pub weight: f32,
    /// Face index inside the font file (non-zero for collections).
    pub index: u32,
    /// Raw font file bytes.
    pub bytes: Arc<Vec<u8>>,
    /// Where the bytes came from (path or caller-supplied label).
    pub source: String,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("family", &self.family)
            .field("weight", &self.weight)
            .field("index", &self.index)
            .field("bytes_len", &self.bytes.len())
            .field("source", &self.source)
            .finish()
    }
}

/// Index of a face inside a [`FontBook`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceId(pub(crate) usize);

/// Result of resolving a requested family/weight.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedFont<'a> {
    /// Face chosen for drawing.
    pub id: FaceId,
    /// The face itself.
    pub face: &'a FontFace,
    /// True when the requested family was not available and a fallback was used.
    pub substituted: bool,
}

/// Registry of font faces available to the compositor, looked up by family name.
#[derive(Debug, Default, Clone)]
pub struct FontBook {
    faces: Vec<FontFace>,
    fallback_family: Option<String>,
}

impl FontBook {
    /// Empty font book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every face found in `bytes`, returning how many were added.
    pub fn register_bytes(&mut self, bytes: Vec<u8>, source: impl Into<String>) -> VeilResult<usize> {
        let source = source.into();
        let bytes = Arc::new(bytes);

        // A scratch collection reads family names and weights without touching shared state.
        let mut scratch = parley::FontContext::default();
        let families = scratch
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.as_ref().clone()), None);

        let mut added = 0usize;
        for (family_id, infos) in families {
            let Some(name) = scratch.collection.family_name(family_id) else {
                continue;
            };
            let name = name.to_string();
            for info in infos {
                self.faces.push(FontFace {
                    family: name.clone(),
                    weight: info.weight().value(),
                    index: info.index(),
                    bytes: bytes.clone(),
                    source: source.clone(),
                });
                added += 1;
            }
        }

        if added == 0 {
            return Err(VeilError::validation(format!(
                "no font faces found in '{source}'"
            )));
        }
        tracing::debug!(source = %source, faces = added, "registered font");
        Ok(added)
    }

    /// Register a font file from disk.
    pub fn register_file(&mut self, path: &Path) -> VeilResult<usize> {
        let bytes = std::fs::read(path).map_err(|e| {
            VeilError::validation(format!("failed to read font '{}': {e}", path.display()))
        })?;
        self.register_bytes(bytes, path.display().to_string())
    }

    /// Register every `.ttf`/`.otf`/`.ttc` file directly inside `dir`.
    ///
    /// Missing directories and unreadable files are skipped.
    pub fn load_dir(&mut self, dir: &Path) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_font_path(p))
            .collect();
        // Directory iteration order is platform dependent.
        paths.sort();

        let mut added = 0usize;
        for path in paths {
            match self.register_file(&path) {
                Ok(n) => added += n,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping font"),
            }
        }
        added
    }

    /// Prefer `family` whenever a requested family is missing.
    pub fn set_fallback_family(&mut self, family: impl Into<String>) {
        self.fallback_family = Some(family.into());
    }

    /// All loaded faces in registration order.
    pub fn faces(&self) -> &[FontFace] {
        &self.faces
    }

    /// Distinct family names in registration order.
    pub fn families(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for face in &self.faces {
            if !out.iter().any(|f| f.eq_ignore_ascii_case(&face.family)) {
                out.push(face.family.as_str());
            }
        }
        out
    }

    /// True when no face is loaded.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub(crate) fn face(&self, id: FaceId) -> Option<&FontFace> {
        self.faces.get(id.0)
    }

    /// Pick the face for `family` closest to `weight`, falling back to a sans-serif face and then
    /// to any loaded face. `None` only when the book is empty.
    pub fn resolve(&self, family: &str, weight: f32) -> Option<ResolvedFont<'_>> {
        if let Some(id) = self.best_in_family(family, weight) {
            return Some(self.resolved(id, false));
        }

        let generic = is_generic_family(family);
        let fallbacks = self
            .fallback_family
            .iter()
            .map(String::as_str)
            .chain(SANS_SERIF_FALLBACKS.iter().copied());
        for candidate in fallbacks {
            if let Some(id) = self.best_in_family(candidate, weight) {
                return Some(self.resolved(id, !generic));
            }
        }

        let id = self.nearest_weight(0..self.faces.len(), weight)?;
        Some(self.resolved(id, !generic))
    }

    fn resolved(&self, id: FaceId, substituted: bool) -> ResolvedFont<'_> {
        ResolvedFont {
            id,
            face: &self.faces[id.0],
            substituted,
        }
    }

    fn best_in_family(&self, family: &str, weight: f32) -> Option<FaceId> {
        let family = family.trim().trim_matches(|c| c == '"' || c == '\'');
        let candidates = (0..self.faces.len()).filter(|&i| self.faces[i].family.eq_ignore_ascii_case(family));
        self.nearest_weight(candidates, weight)
    }

    fn nearest_weight(&self, candidates: impl Iterator<Item = usize>, weight: f32) -> Option<FaceId> {
        // Ties keep the earliest registered face so resolution is stable.
        let mut best: Option<(usize, f32)> = None;
        for i in candidates {
            let d = (self.faces[i].weight - weight).abs();
            match best {
                Some((_, bd)) if bd <= d => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| FaceId(i))
    }
}

fn is_font_path(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc")
}

fn is_generic_family(family: &str) -> bool {
    matches!(
        family.trim().to_ascii_lowercase().as_str(),
        "sans-serif" | "system-ui" | "ui-sans-serif"
    )
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
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

/// A shaped single-run text block plus the font needed to draw its glyphs.
pub(crate) struct ShapedText {
    pub(crate) layout: parley::Layout<TextBrushRgba8>,
    pub(crate) font: vello_cpu::peniko::FontData,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

struct FaceContext {
    font_ctx: parley::FontContext,
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

/// Stateful helper for building Parley text layouts from [`FontBook`] faces.
///
/// Every face gets its own font context so shaping can only ever pick that face, which keeps
/// glyph ids consistent with the font data used for drawing.
pub(crate) struct TextLayoutEngine {
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    faces: HashMap<FaceId, FaceContext>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            layout_ctx: parley::LayoutContext::new(),
            faces: HashMap::new(),
        }
    }

    /// Shape `text` on one line with the given face, size and weight.
    pub(crate) fn layout_line(
        &mut self,
        book: &FontBook,
        face_id: FaceId,
        text: &str,
        size_px: f32,
        weight: f32,
        brush: TextBrushRgba8,
    ) -> VeilResult<ShapedText> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(VeilError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        if !self.faces.contains_key(&face_id) {
            let face = book
                .face(face_id)
                .ok_or_else(|| VeilError::render("font face id is not in the font book"))?;
            let ctx = Self::face_context(face)?;
            self.faces.insert(face_id, ctx);
        }
        let face_ctx = self
            .faces
            .get_mut(&face_id)
            .ok_or_else(|| VeilError::render("font face context missing"))?;

        let text = single_line(text);
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut face_ctx.font_ctx, &text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(
                face_ctx.family_name.clone(),
            )),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::FontWeight::new(weight),
        ));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(&text);
        layout.break_all_lines(None);

        let width = layout.width();
        let height = layout.height();
        Ok(ShapedText {
            layout,
            font: face_ctx.font.clone(),
            width,
            height,
        })
    }

    fn face_context(face: &FontFace) -> VeilResult<FaceContext> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(face.bytes.as_ref().clone()), None);
        if families.is_empty() {
            return Err(VeilError::validation(
                "no font families registered from font bytes",
            ));
        }

        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(face.bytes.as_ref().clone()),
            face.index,
        );
        Ok(FaceContext {
            font_ctx,
            family_name: face.family.clone(),
            font,
        })
    }
}

/// Line breaks draw as spaces: a text layer is always one line.
fn single_line(text: &str) -> Cow<'_, str> {
    if !text.contains(['\n', '\r']) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", " ").replace(['\n', '\r'], " "))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;
