use std::{
    path::Path,
    sync::{Arc, mpsc},
};

use anyhow::Context;

use crate::{
    assets::decode::{DecodedImage, SourceFormat, decode_image, decode_source, sniff_format},
    foundation::error::{VeilError, VeilResult},
    pipeline::remover::BackgroundRemover,
};

/// One file picked from the file select surface.
#[derive(Clone, Debug)]
pub struct ImageFile {
    /// Original file name (used for logs and multipart uploads).
    pub name: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Wrap in-memory bytes.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk; the name is the path's file name.
    pub fn read(path: &Path) -> VeilResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_owned());
        Ok(Self { name, bytes })
    }
}

/// The uploaded image: original bytes plus its decoded pixels.
#[derive(Debug)]
pub struct SourceImage {
    /// Original file name.
    pub name: String,
    /// Original encoded bytes, forwarded verbatim to background removal.
    pub bytes: Arc<Vec<u8>>,
    /// Sniffed container format.
    pub format: SourceFormat,
    /// Decoded pixels.
    pub decoded: DecodedImage,
}

/// Tags one upload; background-removal results are only applied for the current generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UploadTicket {
    generation: u64,
}

impl UploadTicket {
    /// Generation this ticket was issued for.
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Progress of the cutout for the current upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CutoutState {
    /// Nothing uploaded yet.
    Idle,
    /// Background removal has not settled.
    Pending,
    /// A cutout is available.
    Ready,
    /// Background removal failed; compositing continues without a cutout.
    Unavailable,
}

/// Outcome of [`ImagePipeline::settle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settle {
    /// The result belonged to the current upload and was applied.
    Applied,
    /// The result was for a superseded upload and was dropped.
    Stale,
}

/// Result delivered by a background-removal call: encoded cutout bytes.
pub type RemovalResult = VeilResult<Vec<u8>>;

/// Handle to a background-removal call running on the rayon pool.
#[derive(Debug)]
pub struct PendingCutout {
    ticket: UploadTicket,
    rx: mpsc::Receiver<RemovalResult>,
}

impl PendingCutout {
    /// Ticket the call was started for.
    pub fn ticket(&self) -> UploadTicket {
        self.ticket
    }

    /// Block until the call finishes.
    pub fn wait(self) -> (UploadTicket, RemovalResult) {
        let result = self
            .rx
            .recv()
            .unwrap_or_else(|_| Err(VeilError::removal("removal worker exited without a result")));
        (self.ticket, result)
    }

    /// Non-blocking poll; `None` while the call is still running.
    pub fn try_take(&mut self) -> Option<(UploadTicket, RemovalResult)> {
        match self.rx.try_recv() {
            Ok(result) => Some((self.ticket, result)),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some((
                self.ticket,
                Err(VeilError::removal("removal worker exited without a result")),
            )),
        }
    }
}

/// Owns the uploaded image and its cutout.
///
/// Every upload bumps a generation counter. Background-removal results carry the ticket they
/// were started with and are dropped if a newer upload happened in the meantime.
#[derive(Debug)]
pub struct ImagePipeline {
    generation: u64,
    source: Option<Arc<SourceImage>>,
    cutout: Option<Arc<DecodedImage>>,
    state: CutoutState,
}

impl Default for ImagePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePipeline {
    /// Empty pipeline with nothing uploaded.
    pub fn new() -> Self {
        Self {
            generation: 0,
            source: None,
            cutout: None,
            state: CutoutState::Idle,
        }
    }

    /// Accept exactly one file; anything else is rejected without touching state.
    pub fn upload_files(&mut self, files: Vec<ImageFile>) -> VeilResult<UploadTicket> {
        let count = files.len();
        let mut files = files.into_iter();
        match (files.next(), files.next()) {
            (Some(file), None) => self.upload(file),
            _ => Err(VeilError::validation(format!(
                "expected exactly one image file, got {count}"
            ))),
        }
    }

    /// Decode and install a new source image, dropping the previous image and cutout.
    #[tracing::instrument(skip_all, fields(name = %file.name, bytes = file.bytes.len()))]
    pub fn upload(&mut self, file: ImageFile) -> VeilResult<UploadTicket> {
        let format = sniff_format(&file.bytes)?;
        let decoded = decode_source(&file.bytes, format)?;
        decoded.size()?;

        self.generation += 1;
        tracing::info!(
            generation = self.generation,
            width = decoded.width,
            height = decoded.height,
            ?format,
            "image uploaded"
        );
        self.source = Some(Arc::new(SourceImage {
            name: file.name,
            bytes: Arc::new(file.bytes),
            format,
            decoded,
        }));
        self.cutout = None;
        self.state = CutoutState::Pending;
        Ok(self.ticket())
    }

    fn ticket(&self) -> UploadTicket {
        UploadTicket {
            generation: self.generation,
        }
    }

    /// Ticket for the current upload, if any.
    pub fn current_ticket(&self) -> Option<UploadTicket> {
        self.source.as_ref().map(|_| self.ticket())
    }

    /// Current generation; 0 before the first upload.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The uploaded image.
    pub fn source(&self) -> Option<&Arc<SourceImage>> {
        self.source.as_ref()
    }

    /// The background-removed image, once ready.
    pub fn cutout(&self) -> Option<&Arc<DecodedImage>> {
        self.cutout.as_ref()
    }

    /// Cutout progress for the current upload.
    pub fn state(&self) -> CutoutState {
        self.state
    }

    /// True once background removal has settled, with or without a cutout.
    pub fn is_setup_done(&self) -> bool {
        matches!(self.state, CutoutState::Ready | CutoutState::Unavailable)
    }

    /// Start background removal for the current source on the rayon pool.
    #[tracing::instrument(skip_all, fields(generation = ticket.generation, remover = remover.name()))]
    pub fn spawn_removal(
        &self,
        ticket: UploadTicket,
        remover: Arc<dyn BackgroundRemover>,
    ) -> VeilResult<PendingCutout> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| VeilError::validation("no image uploaded"))?;
        let (tx, rx) = mpsc::channel();
        rayon::spawn(move || {
            let result = remover.remove_background(&source);
            // The receiver may be gone if the session was dropped.
            let _ = tx.send(result);
        });
        Ok(PendingCutout { ticket, rx })
    }

    /// Run background removal inline and settle the result.
    #[tracing::instrument(skip_all, fields(generation = ticket.generation, remover = remover.name()))]
    pub fn run_removal(&mut self, ticket: UploadTicket, remover: &dyn BackgroundRemover) -> Settle {
        let result = match self.source.as_ref() {
            Some(source) => remover.remove_background(source),
            None => Err(VeilError::validation("no image uploaded")),
        };
        self.settle(ticket, result)
    }

    /// Apply a background-removal result if `ticket` is still current.
    pub fn settle(&mut self, ticket: UploadTicket, result: RemovalResult) -> Settle {
        if self.source.is_none() || ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale background-removal result"
            );
            return Settle::Stale;
        }

        match result.and_then(|bytes| decode_image(&bytes)) {
            Ok(cutout) => {
                tracing::info!(
                    width = cutout.width,
                    height = cutout.height,
                    "cutout ready"
                );
                self.cutout = Some(Arc::new(cutout));
                self.state = CutoutState::Ready;
            }
            Err(e) => {
                tracing::error!(error = %e, "background removal failed; continuing without cutout");
                self.cutout = None;
                self.state = CutoutState::Unavailable;
            }
        }
        Settle::Applied
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/image.rs"]
mod tests;
