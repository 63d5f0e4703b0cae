use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    foundation::error::{VeilError, VeilResult},
    layers::{
        edit::{LayerAttr, validate_layer_geometry},
        model::{LayerId, TextLayer},
    },
};

/// Ordered collection of text layers; insertion order is paint order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TextLayer>", into = "Vec<TextLayer>")]
pub struct LayerStore {
    layers: Vec<TextLayer>,
}

impl LayerStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records, rejecting duplicate or reserved ids.
    pub fn from_layers(layers: Vec<TextLayer>) -> VeilResult<Self> {
        let mut seen = HashSet::with_capacity(layers.len());
        for layer in &layers {
            if layer.id == 0 || layer.id == LayerId::MAX {
                return Err(VeilError::validation(format!(
                    "text layer id {} is reserved",
                    layer.id
                )));
            }
            if !seen.insert(layer.id) {
                return Err(VeilError::validation(format!(
                    "duplicate text layer id {}",
                    layer.id
                )));
            }
            validate_layer_geometry(layer)?;
        }
        Ok(Self { layers })
    }

    /// `max(existing ids, 0) + 1`.
    pub fn next_id(&self) -> LayerId {
        self.layers.iter().map(|l| l.id).max().unwrap_or(0) + 1
    }

    /// Append a layer with default attributes and a fresh id.
    pub fn add(&mut self) -> &TextLayer {
        let id = self.next_id();
        self.push(TextLayer::with_id(id))
    }

    /// Replace one field on the layer with `id`.
    pub fn set_attribute(&mut self, id: LayerId, attr: LayerAttr) -> VeilResult<()> {
        attr.validate()?;
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(VeilError::NoSuchLayer(id))?;
        attr.apply_to(layer);
        Ok(())
    }

    /// Dynamic form of [`LayerStore::set_attribute`] keyed by camelCase field name.
    pub fn set_attribute_by_name(
        &mut self,
        id: LayerId,
        key: &str,
        value: serde_json::Value,
    ) -> VeilResult<()> {
        let attr = LayerAttr::from_key_value(key, value)?;
        self.set_attribute(id, attr)
    }

    /// Copy the layer with `id` under a fresh id and append it.
    pub fn duplicate(&mut self, id: LayerId) -> Option<&TextLayer> {
        let source = self.get(id)?.clone();
        Some(self.duplicate_layer(&source))
    }

    /// Copy every field of `layer` under a fresh id and append it.
    pub fn duplicate_layer(&mut self, layer: &TextLayer) -> &TextLayer {
        let copy = TextLayer {
            id: self.next_id(),
            ..layer.clone()
        };
        self.push(copy)
    }

    /// Remove and return the layer with `id`, if present.
    pub fn remove(&mut self, id: LayerId) -> Option<TextLayer> {
        let pos = self.layers.iter().position(|l| l.id == id)?;
        Some(self.layers.remove(pos))
    }

    /// Look up a layer by id.
    pub fn get(&self, id: LayerId) -> Option<&TextLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Layers in paint order.
    pub fn iter(&self) -> std::slice::Iter<'_, TextLayer> {
        self.layers.iter()
    }

    /// Layers in paint order as a slice.
    pub fn as_slice(&self) -> &[TextLayer] {
        &self.layers
    }

    /// Layer ids in paint order.
    pub fn ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True when the store holds no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn push(&mut self, layer: TextLayer) -> &TextLayer {
        self.layers.push(layer);
        let last = self.layers.len() - 1;
        &self.layers[last]
    }
}

impl TryFrom<Vec<TextLayer>> for LayerStore {
    type Error = VeilError;

    fn try_from(layers: Vec<TextLayer>) -> Result<Self, Self::Error> {
        Self::from_layers(layers)
    }
}

impl From<LayerStore> for Vec<TextLayer> {
    fn from(store: LayerStore) -> Self {
        store.layers
    }
}

impl<'a> IntoIterator for &'a LayerStore {
    type Item = &'a TextLayer;
    type IntoIter = std::slice::Iter<'a, TextLayer>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layers/store.rs"]
mod tests;
