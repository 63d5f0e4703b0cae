use serde::{Deserialize, Serialize};

/// Identifier of a text layer, unique within one [`crate::LayerStore`].
pub type LayerId = u32;

/// One independently positioned and styled text overlay.
///
/// Positions are percentage offsets from the canvas center: `left` grows to the right and `top`
/// grows upwards, both roughly in `[-50, 50]`. Sizes are expressed in native image pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextLayer {
    /// Store-assigned identifier.
    pub id: LayerId,
    /// Text content.
    pub text: String,
    /// Requested font family name.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// CSS-style numeric weight (100..=900 typical).
    pub font_weight: u16,
    /// CSS color string for the glyph fill.
    pub color: String,
    /// Global alpha applied to the whole layer, in `[0, 1]`.
    pub opacity: f32,
    /// Vertical offset from the center in percent (positive is up).
    pub top: f32,
    /// Horizontal offset from the center in percent (positive is right).
    pub left: f32,
    /// Clockwise rotation in degrees about the anchor.
    pub rotation: f32,
    /// CSS color string for the drop shadow.
    pub shadow_color: String,
    /// Drop-shadow blur radius in pixels.
    pub shadow_size: f32,
}

impl TextLayer {
    /// Default text content for new layers.
    pub const DEFAULT_TEXT: &'static str = "edit";
    /// Default font family for new layers.
    pub const DEFAULT_FONT_FAMILY: &'static str = "Inter";

    /// A layer with the default attributes and the given id.
    pub fn with_id(id: LayerId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Rotation converted to radians.
    pub fn rotation_rad(&self) -> f64 {
        f64::from(self.rotation).to_radians()
    }

    /// Opacity clamped to `[0, 1]`; non-finite values count as fully transparent.
    pub fn effective_opacity(&self) -> f32 {
        if self.opacity.is_finite() {
            self.opacity.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for TextLayer {
    fn default() -> Self {
        Self {
            id: 0,
            text: Self::DEFAULT_TEXT.to_owned(),
            font_family: Self::DEFAULT_FONT_FAMILY.to_owned(),
            font_size: 200.0,
            font_weight: 800,
            color: "white".to_owned(),
            opacity: 1.0,
            top: 0.0,
            left: 0.0,
            rotation: 0.0,
            shadow_color: "rgba(0, 0, 0, 0.8)".to_owned(),
            shadow_size: 4.0,
        }
    }
}
