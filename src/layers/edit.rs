use serde::{Deserialize, Serialize};

use crate::{
    assets::color::parse_css_color,
    foundation::error::{VeilError, VeilResult},
    layers::model::TextLayer,
};

/// A single-field edit on a [`TextLayer`].
///
/// Serialized as `{"key": "<camelCaseField>", "value": ...}`, which is also the shape accepted
/// by [`LayerAttr::from_key_value`] for dynamic edits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key", content = "value", rename_all = "camelCase")]
pub enum LayerAttr {
    /// Replace the text content.
    Text(String),
    /// Replace the requested font family.
    FontFamily(String),
    /// Replace the font size in pixels.
    FontSize(f32),
    /// Replace the numeric font weight.
    FontWeight(u16),
    /// Replace the fill color.
    Color(String),
    /// Replace the layer opacity (clamped to `[0, 1]`).
    Opacity(f32),
    /// Replace the vertical center offset in percent.
    Top(f32),
    /// Replace the horizontal center offset in percent.
    Left(f32),
    /// Replace the rotation in degrees.
    Rotation(f32),
    /// Replace the drop-shadow color.
    ShadowColor(String),
    /// Replace the drop-shadow blur radius.
    ShadowSize(f32),
}

impl LayerAttr {
    /// Build an edit from a camelCase attribute name and a JSON value.
    pub fn from_key_value(key: &str, value: serde_json::Value) -> VeilResult<Self> {
        let raw = serde_json::json!({ "key": key, "value": value });
        serde_json::from_value(raw)
            .map_err(|e| VeilError::validation(format!("invalid layer attribute '{key}': {e}")))
    }

    /// camelCase name of the field this edit replaces.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::FontFamily(_) => "fontFamily",
            Self::FontSize(_) => "fontSize",
            Self::FontWeight(_) => "fontWeight",
            Self::Color(_) => "color",
            Self::Opacity(_) => "opacity",
            Self::Top(_) => "top",
            Self::Left(_) => "left",
            Self::Rotation(_) => "rotation",
            Self::ShadowColor(_) => "shadowColor",
            Self::ShadowSize(_) => "shadowSize",
        }
    }

    /// Largest accepted `fontSize`, in native image pixels.
    pub const MAX_FONT_SIZE: f32 = 4096.0;
    /// Largest accepted `shadowSize`, in native image pixels.
    pub const MAX_SHADOW_SIZE: f32 = 1024.0;

    /// Reject values the compositor cannot draw.
    pub fn validate(&self) -> VeilResult<()> {
        let finite = |v: f32| -> VeilResult<()> {
            if v.is_finite() {
                Ok(())
            } else {
                Err(VeilError::validation(format!(
                    "{} must be a finite number",
                    self.key()
                )))
            }
        };

        match self {
            Self::Text(_) => Ok(()),
            Self::FontFamily(f) => {
                if f.trim().is_empty() {
                    Err(VeilError::validation("fontFamily must be non-empty"))
                } else {
                    Ok(())
                }
            }
            Self::FontSize(v) => {
                finite(*v)?;
                if *v <= 0.0 || *v > Self::MAX_FONT_SIZE {
                    return Err(VeilError::validation(format!(
                        "fontSize must be in (0, {}]",
                        Self::MAX_FONT_SIZE
                    )));
                }
                Ok(())
            }
            Self::FontWeight(w) => {
                if (1..=1000).contains(w) {
                    Ok(())
                } else {
                    Err(VeilError::validation("fontWeight must be in 1..=1000"))
                }
            }
            Self::Color(c) | Self::ShadowColor(c) => parse_css_color(c).map(|_| ()),
            Self::Opacity(v) | Self::Top(v) | Self::Left(v) | Self::Rotation(v) => finite(*v),
            Self::ShadowSize(v) => {
                finite(*v)?;
                if *v < 0.0 || *v > Self::MAX_SHADOW_SIZE {
                    return Err(VeilError::validation(format!(
                        "shadowSize must be in [0, {}]",
                        Self::MAX_SHADOW_SIZE
                    )));
                }
                Ok(())
            }
        }
    }

    /// Write this edit into `layer`. Callers validate first.
    pub(crate) fn apply_to(self, layer: &mut TextLayer) {
        match self {
            Self::Text(v) => layer.text = v,
            Self::FontFamily(v) => layer.font_family = v,
            Self::FontSize(v) => layer.font_size = v,
            Self::FontWeight(v) => layer.font_weight = v,
            Self::Color(v) => layer.color = v,
            Self::Opacity(v) => layer.opacity = v.clamp(0.0, 1.0),
            Self::Top(v) => layer.top = v,
            Self::Left(v) => layer.left = v,
            Self::Rotation(v) => layer.rotation = v,
            Self::ShadowColor(v) => layer.shadow_color = v,
            Self::ShadowSize(v) => layer.shadow_size = v,
        }
    }
}

/// Check the numeric attributes of a whole layer with the same rules as [`LayerAttr::validate`].
///
/// Colors are left alone: a bad color on a loaded layer falls back at render time.
pub(crate) fn validate_layer_geometry(layer: &TextLayer) -> VeilResult<()> {
    let attrs = [
        LayerAttr::FontSize(layer.font_size),
        LayerAttr::FontWeight(layer.font_weight),
        LayerAttr::Opacity(layer.opacity),
        LayerAttr::Top(layer.top),
        LayerAttr::Left(layer.left),
        LayerAttr::Rotation(layer.rotation),
        LayerAttr::ShadowSize(layer.shadow_size),
    ];
    for attr in &attrs {
        attr.validate().map_err(|e| match e {
            VeilError::Validation(msg) => {
                VeilError::validation(format!("text layer {}: {msg}", layer.id))
            }
            other => other,
        })?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/layers/edit.rs"]
mod tests;
