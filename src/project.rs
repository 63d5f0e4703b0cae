use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    assets::fonts::FontBook,
    export::encode::ExportSettings,
    foundation::error::{VeilError, VeilResult},
    layers::store::LayerStore,
    pipeline::{
        image::ImageFile,
        remover::{BackgroundRemover, CommandRemover, FileCutout, REMOVE_BG_API_KEY_ENV},
    },
    session::editor::EditorSession,
};

/// Environment variable listing extra font directories (platform path-list syntax).
pub const FONT_DIRS_ENV: &str = "VEIL_FONT_DIRS";

/// Where the foreground cutout comes from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CutoutSource {
    /// No cutout; text is drawn over the whole image.
    #[default]
    None,
    /// A precomputed cutout image.
    File {
        /// Path to the cutout, relative to the project file.
        path: PathBuf,
    },
    /// A local program; `{input}`/`{output}` in `args` are replaced by file paths.
    Command {
        /// Executable name or path.
        program: String,
        /// Arguments with placeholders.
        #[serde(default)]
        args: Vec<String>,
    },
    /// The hosted remove.bg API.
    RemoveBg {
        /// Environment variable holding the API key.
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
        /// Requested output size.
        #[serde(default = "default_remove_bg_size")]
        size: String,
    },
}

fn default_api_key_env() -> String {
    REMOVE_BG_API_KEY_ENV.to_owned()
}

fn default_remove_bg_size() -> String {
    "regular".to_owned()
}

/// Font lookup configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FontSettings {
    /// Extra directories scanned for `.ttf`/`.otf`/`.ttc` files, relative to the project file.
    pub dirs: Vec<PathBuf>,
    /// Family used when a layer's family is not installed.
    pub fallback_family: Option<String>,
}

/// Serialized editing session: image, cutout source, layers and export options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Background image, relative to the project file.
    pub image: PathBuf,
    /// Cutout provider.
    #[serde(default)]
    pub cutout: CutoutSource,
    /// Text layers in paint order.
    #[serde(default)]
    pub layers: LayerStore,
    /// Export options.
    #[serde(default)]
    pub export: ExportSettings,
    /// Font options.
    #[serde(default)]
    pub fonts: FontSettings,

    #[serde(skip)]
    base_dir: PathBuf,
}

impl Project {
    /// Project for `image` with one default text layer.
    pub fn new(image: impl Into<PathBuf>) -> Self {
        let mut layers = LayerStore::new();
        layers.add();
        Self {
            image: image.into(),
            cutout: CutoutSource::None,
            layers,
            export: ExportSettings::default(),
            fonts: FontSettings::default(),
            base_dir: PathBuf::from("."),
        }
    }

    /// Parse a project from JSON; relative paths resolve against `base_dir`.
    pub fn from_json_str(s: &str, base_dir: impl Into<PathBuf>) -> VeilResult<Self> {
        let mut project: Self = serde_json::from_str(s)
            .map_err(|e| VeilError::serde(format!("project json: {e}")))?;
        project.base_dir = base_dir.into();
        project.validate()?;
        Ok(project)
    }

    /// Read a project file.
    pub fn load(path: &Path) -> VeilResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read project '{}'", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        Self::from_json_str(&text, base)
    }

    /// Write the project as pretty JSON.
    pub fn save(&self, path: &Path) -> VeilResult<()> {
        let text = self.to_json_string()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create project dir '{}'", parent.display()))?;
        }
        std::fs::write(path, text).with_context(|| format!("write project '{}'", path.display()))?;
        Ok(())
    }

    /// Pretty JSON form.
    pub fn to_json_string(&self) -> VeilResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| VeilError::serde(e.to_string()))
    }

    /// Check export settings and cutout configuration.
    pub fn validate(&self) -> VeilResult<()> {
        if self.image.as_os_str().is_empty() {
            return Err(VeilError::validation("project image path is empty"));
        }
        self.export.validate()?;
        if let CutoutSource::Command { program, .. } = &self.cutout
            && program.trim().is_empty()
        {
            return Err(VeilError::validation("cutout command program is empty"));
        }
        Ok(())
    }

    /// Directory relative paths resolve against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve `p` against the project directory unless it is absolute.
    pub fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    /// Absolute (or cwd-relative) path of the background image.
    pub fn image_path(&self) -> PathBuf {
        self.resolve(&self.image)
    }

    /// Font directories in scan order: configured dirs, `<project>/fonts`, then `VEIL_FONT_DIRS`.
    pub fn font_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.fonts.dirs.iter().map(|d| self.resolve(d)).collect();
        dirs.push(self.base_dir.join("fonts"));
        dirs.extend(env_font_dirs());
        dirs.dedup();
        dirs
    }

    /// Load every font found in [`Project::font_dirs`].
    pub fn load_fonts(&self) -> FontBook {
        let mut book = FontBook::new();
        for dir in self.font_dirs() {
            if dir.is_dir() {
                let n = book.load_dir(&dir);
                tracing::debug!(dir = %dir.display(), faces = n, "font directory scanned");
            }
        }
        if let Some(family) = &self.fonts.fallback_family {
            book.set_fallback_family(family.clone());
        }
        if book.is_empty() {
            tracing::warn!("no fonts found; text layers will not be drawn");
        }
        book
    }

    /// Background remover described by [`Project::cutout`].
    pub fn remover(&self) -> VeilResult<Option<Arc<dyn BackgroundRemover>>> {
        remover_for(&self.cutout, &self.base_dir)
    }

    /// Build an editor session, upload the image and settle the cutout.
    #[tracing::instrument(skip(self), fields(image = %self.image.display()))]
    pub fn open_session(&self) -> VeilResult<EditorSession> {
        let fonts = Arc::new(self.load_fonts());
        let mut session = EditorSession::new(fonts)
            .with_layers(self.layers.clone())
            .with_export_settings(self.export.clone());
        if let Some(remover) = self.remover()? {
            session = session.with_remover(remover);
        }
        session.upload(ImageFile::read(&self.image_path())?)?;
        session.wait_for_cutout();
        Ok(session)
    }
}

/// Font directories from `VEIL_FONT_DIRS`.
pub fn env_font_dirs() -> Vec<PathBuf> {
    std::env::var_os(FONT_DIRS_ENV)
        .map(|v| std::env::split_paths(&v).filter(|p| !p.as_os_str().is_empty()).collect())
        .unwrap_or_default()
}

/// Instantiate the collaborator for `source`; file paths resolve against `base_dir`.
pub fn remover_for(
    source: &CutoutSource,
    base_dir: &Path,
) -> VeilResult<Option<Arc<dyn BackgroundRemover>>> {
    let remover: Option<Arc<dyn BackgroundRemover>> = match source {
        CutoutSource::None => None,
        CutoutSource::File { path } => {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                base_dir.join(path)
            };
            Some(Arc::new(FileCutout::new(path)))
        }
        CutoutSource::Command { program, args } => {
            Some(Arc::new(CommandRemover::new(program.clone(), args.clone())))
        }
        CutoutSource::RemoveBg { api_key_env, size } => Some(remove_bg(api_key_env, size)?),
    };
    Ok(remover)
}

#[cfg(feature = "remove-bg")]
fn remove_bg(api_key_env: &str, size: &str) -> VeilResult<Arc<dyn BackgroundRemover>> {
    let api = crate::pipeline::remover::RemoveBgApi::from_env(api_key_env)?.with_size(size);
    Ok(Arc::new(api))
}

#[cfg(not(feature = "remove-bg"))]
fn remove_bg(_api_key_env: &str, _size: &str) -> VeilResult<Arc<dyn BackgroundRemover>> {
    Err(VeilError::validation(
        "remove.bg support is disabled (build with the `remove-bg` feature)",
    ))
}

#[cfg(test)]
#[path = "../tests/unit/project.rs"]
mod tests;
