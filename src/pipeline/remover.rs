use std::{
    path::{Path, PathBuf},
    process::Command,
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::Context;

use crate::{
    foundation::error::{VeilError, VeilResult},
    pipeline::image::SourceImage,
};

/// External collaborator that produces a background-removed version of an image.
///
/// Implementations return encoded image bytes (typically PNG with alpha). They run off the
/// editing thread, so they must be `Send + Sync`.
pub trait BackgroundRemover: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Produce the cutout for `source`.
    fn remove_background(&self, source: &SourceImage) -> VeilResult<Vec<u8>>;
}

/// Default environment variable holding the remove.bg API key.
pub const REMOVE_BG_API_KEY_ENV: &str = "VEIL_REMOVEBG_API_KEY";

/// Hosted remove.bg HTTP API.
#[cfg(feature = "remove-bg")]
#[derive(Clone)]
pub struct RemoveBgApi {
    api_key: String,
    size: String,
    endpoint: String,
}

#[cfg(feature = "remove-bg")]
impl std::fmt::Debug for RemoveBgApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoveBgApi")
            .field("size", &self.size)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "remove-bg")]
impl RemoveBgApi {
    /// Public API endpoint.
    pub const ENDPOINT: &'static str = "https://api.remove.bg/v1.0/removebg";

    /// Client with an explicit key and the `regular` output size.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            size: "regular".to_owned(),
            endpoint: Self::ENDPOINT.to_owned(),
        }
    }

    /// Read the key from `var`; missing or empty keys are a validation error.
    pub fn from_env(var: &str) -> VeilResult<Self> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(VeilError::validation(format!(
                "environment variable {var} must hold a remove.bg API key"
            ))),
        }
    }

    /// Output size requested from the API (`regular`, `full`, `auto`, ...).
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    /// Point at a different endpoint (e.g. a proxy).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[cfg(feature = "remove-bg")]
impl BackgroundRemover for RemoveBgApi {
    fn name(&self) -> &str {
        "remove.bg"
    }

    fn remove_background(&self, source: &SourceImage) -> VeilResult<Vec<u8>> {
        use reqwest::blocking::multipart;

        let image_part = multipart::Part::bytes(source.bytes.as_ref().clone())
            .file_name(source.name.clone())
            .mime_str(source.format.mime_type())
            .map_err(|e| VeilError::removal(format!("build upload part: {e}")))?;
        let form = multipart::Form::new()
            .part("image_file", image_part)
            .text("size", self.size.clone())
            .text("type", "auto");

        let resp = reqwest::blocking::Client::new()
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| VeilError::removal(format!("remove.bg request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(VeilError::removal(format!(
                "remove.bg returned {status}: {}",
                body.trim()
            )));
        }
        let bytes = resp
            .bytes()
            .map_err(|e| VeilError::removal(format!("read remove.bg response: {e}")))?;
        tracing::debug!(bytes = bytes.len(), "remove.bg response received");
        Ok(bytes.to_vec())
    }
}

/// Runs a local program (for example a segmentation model) to produce the cutout.
///
/// `{input}` and `{output}` in `args` are replaced by temporary file paths. When no argument
/// mentions `{output}`, the cutout is read from the program's stdout.
#[derive(Clone, Debug)]
pub struct CommandRemover {
    program: String,
    args: Vec<String>,
}

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

impl CommandRemover {
    /// Remover invoking `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn scratch_path(ext: &str) -> PathBuf {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("veil-{}-{n}.{ext}", std::process::id()))
    }
}

impl BackgroundRemover for CommandRemover {
    fn name(&self) -> &str {
        &self.program
    }

    fn remove_background(&self, source: &SourceImage) -> VeilResult<Vec<u8>> {
        let input = Self::scratch_path(source.format.extension());
        let output = Self::scratch_path("png");
        std::fs::write(&input, source.bytes.as_slice())
            .with_context(|| format!("write scratch image '{}'", input.display()))?;

        let writes_file = self.args.iter().any(|a| a.contains("{output}"));
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| {
                a.replace("{input}", &input.to_string_lossy())
                    .replace("{output}", &output.to_string_lossy())
            })
            .collect();

        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| VeilError::removal(format!("failed to run '{}': {e}", self.program)))
            .and_then(|out| {
                if !out.status.success() {
                    return Err(VeilError::removal(format!(
                        "'{}' failed with {}: {}",
                        self.program,
                        out.status,
                        String::from_utf8_lossy(&out.stderr).trim()
                    )));
                }
                if writes_file {
                    std::fs::read(&output).map_err(|e| {
                        VeilError::removal(format!(
                            "'{}' did not write '{}': {e}",
                            self.program,
                            output.display()
                        ))
                    })
                } else {
                    Ok(out.stdout)
                }
            });

        let _ = std::fs::remove_file(&input);
        let _ = std::fs::remove_file(&output);
        result
    }
}

/// Uses a precomputed cutout file.
#[derive(Clone, Debug)]
pub struct FileCutout {
    path: PathBuf,
}

impl FileCutout {
    /// Cutout read from `path` on every call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cutout file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BackgroundRemover for FileCutout {
    fn name(&self) -> &str {
        "file"
    }

    fn remove_background(&self, _source: &SourceImage) -> VeilResult<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| {
            VeilError::removal(format!("read cutout '{}': {e}", self.path.display()))
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/remover.rs"]
mod tests;
