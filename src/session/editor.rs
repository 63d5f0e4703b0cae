use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    assets::fonts::FontBook,
    export::encode::{ExportFormat, ExportSettings, ExportedImage, encode},
    foundation::error::{VeilError, VeilResult},
    layers::{
        edit::LayerAttr,
        model::{LayerId, TextLayer},
        store::LayerStore,
    },
    pipeline::{
        image::{ImageFile, ImagePipeline, PendingCutout, RemovalResult, Settle, UploadTicket},
        remover::BackgroundRemover,
    },
    render::{
        canvas::Raster,
        compositor::{Compositor, Scene},
    },
};

/// A user interaction handled by [`EditorSession::dispatch`].
#[derive(Debug)]
pub enum EditorAction {
    /// Replace the image; starts background removal.
    Upload(ImageFile),
    /// Append a default text layer.
    AddLayer,
    /// Replace one field of a layer.
    SetAttribute {
        /// Target layer.
        id: LayerId,
        /// New field value.
        attr: LayerAttr,
    },
    /// Replace one field of a layer, addressed by camelCase key.
    SetAttributeByName {
        /// Target layer.
        id: LayerId,
        /// Field name, e.g. `"fontSize"`.
        key: String,
        /// New value.
        value: serde_json::Value,
    },
    /// Copy a layer under a fresh id.
    DuplicateLayer(LayerId),
    /// Delete a layer.
    RemoveLayer(LayerId),
    /// Deliver a background-removal result.
    SettleCutout {
        /// Upload the result belongs to.
        ticket: UploadTicket,
        /// Encoded cutout bytes or the failure.
        result: RemovalResult,
    },
}

struct PreviewCache {
    revision: u64,
    width: u32,
    raster: Arc<Raster>,
}

/// Editing state for one image: layers, image pipeline and render caches.
///
/// Every state change bumps [`EditorSession::revision`]; previews are re-rendered lazily when the
/// revision or the requested width changes.
pub struct EditorSession {
    layers: LayerStore,
    pipeline: ImagePipeline,
    compositor: Compositor,
    remover: Option<Arc<dyn BackgroundRemover>>,
    pending: Option<PendingCutout>,
    export_settings: ExportSettings,
    revision: u64,
    preview: Option<PreviewCache>,
}

impl EditorSession {
    /// Empty session drawing text with `fonts`.
    pub fn new(fonts: Arc<FontBook>) -> Self {
        Self {
            layers: LayerStore::new(),
            pipeline: ImagePipeline::new(),
            compositor: Compositor::new(fonts),
            remover: None,
            pending: None,
            export_settings: ExportSettings::default(),
            revision: 0,
            preview: None,
        }
    }

    /// Use `remover` for every subsequent upload.
    pub fn with_remover(mut self, remover: Arc<dyn BackgroundRemover>) -> Self {
        self.remover = Some(remover);
        self
    }

    /// Start from an existing layer list.
    pub fn with_layers(mut self, layers: LayerStore) -> Self {
        self.layers = layers;
        self.revision += 1;
        self
    }

    /// Export options used by [`EditorSession::export`].
    pub fn with_export_settings(mut self, settings: ExportSettings) -> Self {
        self.export_settings = settings;
        self
    }

    /// Current layers.
    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    /// Image and cutout state.
    pub fn pipeline(&self) -> &ImagePipeline {
        &self.pipeline
    }

    /// Export options.
    pub fn export_settings(&self) -> &ExportSettings {
        &self.export_settings
    }

    /// Monotonic change counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True while a spawned background-removal call has not been collected.
    pub fn has_pending_cutout(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply `action`; returns whether state changed.
    ///
    /// Invalid input (unknown layer ids, bad attribute values, unsupported files) is logged and
    /// leaves the session untouched.
    pub fn dispatch(&mut self, action: EditorAction) -> bool {
        let changed = match action {
            EditorAction::Upload(file) => {
                // `upload` bumps the revision itself.
                return match self.upload(file) {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!(error = %e, "upload rejected");
                        false
                    }
                };
            }
            EditorAction::AddLayer => {
                let id = self.layers.add().id;
                tracing::debug!(id, "layer added");
                true
            }
            EditorAction::SetAttribute { id, attr } => {
                let key = attr.key();
                match self.layers.set_attribute(id, attr) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(id, key, error = %e, "attribute edit ignored");
                        false
                    }
                }
            }
            EditorAction::SetAttributeByName { id, key, value } => {
                match self.layers.set_attribute_by_name(id, &key, value) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(id, key = %key, error = %e, "attribute edit ignored");
                        false
                    }
                }
            }
            EditorAction::DuplicateLayer(id) => match self.layers.duplicate(id) {
                Some(copy) => {
                    tracing::debug!(from = id, to = copy.id, "layer duplicated");
                    true
                }
                None => {
                    tracing::warn!(id, "duplicate ignored: no such layer");
                    false
                }
            },
            EditorAction::RemoveLayer(id) => self.layers.remove(id).is_some(),
            EditorAction::SettleCutout { ticket, result } => self.settle(ticket, result),
        };
        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Upload `file` and start background removal, surfacing decode errors.
    ///
    /// [`EditorAction::Upload`] is the logging, non-failing form of this call.
    pub fn upload(&mut self, file: ImageFile) -> VeilResult<UploadTicket> {
        let ticket = self.pipeline.upload(file)?;
        self.pending = None;
        self.revision += 1;

        let Some(remover) = self.remover.clone() else {
            tracing::info!("no background remover configured; continuing without cutout");
            self.pipeline.settle(
                ticket,
                Err(VeilError::removal("no background remover configured")),
            );
            return Ok(ticket);
        };
        match self.pipeline.spawn_removal(ticket, remover) {
            Ok(pending) => self.pending = Some(pending),
            Err(e) => {
                self.pipeline.settle(ticket, Err(e));
            }
        }
        Ok(ticket)
    }

    fn settle(&mut self, ticket: UploadTicket, result: RemovalResult) -> bool {
        if self.pending.as_ref().is_some_and(|p| p.ticket() == ticket) {
            self.pending = None;
        }
        self.pipeline.settle(ticket, result) == Settle::Applied
    }

    /// Collect a finished background-removal call without blocking.
    pub fn poll_cutout(&mut self) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            return false;
        };
        match pending.try_take() {
            Some((ticket, result)) => self.dispatch(EditorAction::SettleCutout { ticket, result }),
            None => false,
        }
    }

    /// Block until the in-flight background-removal call (if any) has settled.
    pub fn wait_for_cutout(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        let (ticket, result) = pending.wait();
        self.dispatch(EditorAction::SettleCutout { ticket, result })
    }

    /// Composite fitted to `width`; `None` until an image is uploaded.
    ///
    /// The last preview is reused while neither the revision nor the width changed.
    pub fn render_preview(&mut self, width: u32) -> VeilResult<Option<Arc<Raster>>> {
        if let Some(cache) = &self.preview
            && cache.revision == self.revision
            && cache.width == width
        {
            return Ok(Some(Arc::clone(&cache.raster)));
        }

        let Some(source) = self.pipeline.source().cloned() else {
            return Ok(None);
        };
        let cutout = self.pipeline.cutout().cloned();
        let scene = Scene {
            background: &source.decoded,
            cutout: cutout.as_deref(),
            layers: self.layers.as_slice(),
        };
        tracing::debug!(revision = self.revision, width, "rendering preview");
        let raster = Arc::new(self.compositor.render_fit_width(&scene, width)?);
        self.preview = Some(PreviewCache {
            revision: self.revision,
            width,
            raster: Arc::clone(&raster),
        });
        Ok(Some(raster))
    }

    /// Composite at native resolution without encoding; `None` until setup is done.
    pub fn render_export(&mut self) -> VeilResult<Option<Raster>> {
        if !self.pipeline.is_setup_done() {
            return Ok(None);
        }
        let Some(source) = self.pipeline.source().cloned() else {
            return Ok(None);
        };
        let cutout = self.pipeline.cutout().cloned();
        let scene = Scene {
            background: &source.decoded,
            cutout: cutout.as_deref(),
            layers: self.layers.as_slice(),
        };
        self.compositor.render_native(&scene).map(Some)
    }

    /// Render at native resolution and encode as `format`.
    ///
    /// Returns `Ok(None)` when no image is loaded or background removal has not settled.
    #[tracing::instrument(skip(self))]
    pub fn export(&mut self, format: ExportFormat) -> VeilResult<Option<ExportedImage>> {
        let settings = ExportSettings {
            format,
            ..self.export_settings.clone()
        };
        settings.validate()?;

        let Some(raster) = self.render_export()? else {
            tracing::debug!("export skipped: image not ready");
            return Ok(None);
        };
        let bytes = encode(&raster, format, settings.jpeg_quality)?;
        tracing::info!(
            width = raster.width,
            height = raster.height,
            bytes = bytes.len(),
            "export encoded"
        );
        Ok(Some(ExportedImage {
            bytes,
            format,
            file_name: settings.file_name(),
            width: raster.width,
            height: raster.height,
        }))
    }

    /// [`EditorSession::export`] followed by [`ExportedImage::write_to_dir`].
    pub fn export_to_dir(&mut self, format: ExportFormat, dir: &Path) -> VeilResult<Option<PathBuf>> {
        match self.export(format)? {
            Some(img) => img.write_to_dir(dir).map(Some),
            None => Ok(None),
        }
    }

    /// Copy of the current layers, in paint order.
    pub fn snapshot(&self) -> Vec<TextLayer> {
        self.layers.as_slice().to_vec()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/editor.rs"]
mod tests;
