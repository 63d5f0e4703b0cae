//! Veil composites text *behind* the subject of a photo.
//!
//! An uploaded image is sent to a background-removal collaborator; the resulting cutout is drawn
//! over a stack of styled text layers, which are in turn drawn over the original image. The
//! public API is session-oriented:
//!
//! - Upload an [`ImageFile`] into an [`EditorSession`] (or open a [`Project`])
//! - Edit the [`LayerStore`] through [`EditorAction`]s
//! - Render previews with [`EditorSession::render_preview`] and export PNG/JPEG with
//!   [`EditorSession::export`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;

pub(crate) mod export;
pub(crate) mod layers;
pub(crate) mod pipeline;
pub(crate) mod project;
pub(crate) mod render;
pub(crate) mod session;

pub use crate::foundation::core::{Affine, CanvasSize, Point, Vec2};
pub use crate::foundation::error::{VeilError, VeilResult};

pub use crate::assets::color::{CssColor, parse_css_color};
pub use crate::assets::decode::{
    DecodedImage, SourceFormat, decode_image, decode_source, sniff_format,
};
pub use crate::assets::fonts::{FaceId, FontBook, FontFace, ResolvedFont, SANS_SERIF_FALLBACKS};
pub use crate::export::encode::{
    DEFAULT_FILE_STEM, DEFAULT_JPEG_QUALITY, ExportFormat, ExportSettings, ExportedImage, encode,
};
pub use crate::layers::edit::LayerAttr;
pub use crate::layers::model::{LayerId, TextLayer};
pub use crate::layers::store::LayerStore;
pub use crate::pipeline::image::{
    CutoutState, ImageFile, ImagePipeline, PendingCutout, RemovalResult, Settle, SourceImage,
    UploadTicket,
};
#[cfg(feature = "remove-bg")]
pub use crate::pipeline::remover::RemoveBgApi;
pub use crate::pipeline::remover::{
    BackgroundRemover, CommandRemover, FileCutout, REMOVE_BG_API_KEY_ENV,
};
pub use crate::project::{
    CutoutSource, FONT_DIRS_ENV, FontSettings, Project, env_font_dirs, remover_for,
};
pub use crate::render::canvas::{Raster, canvas_scale, layer_anchor};
pub use crate::render::compositor::{Compositor, Scene};
pub use crate::session::editor::{EditorAction, EditorSession};
