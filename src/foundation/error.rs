/// Convenience result type used across Veil.
pub type VeilResult<T> = Result<T, VeilError>;

/// Top-level error taxonomy used by library APIs.
#[derive(thiserror::Error, Debug)]
pub enum VeilError {
    /// Invalid user-provided, project or layer data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A layer edit referenced an id that is not in the store.
    #[error("no text layer with id {0}")]
    NoSuchLayer(u32),

    /// Input bytes could not be decoded as a supported image.
    #[error("decode error: {0}")]
    Decode(String),

    /// Errors raised while compositing a raster.
    #[error("render error: {0}")]
    Render(String),

    /// The background-removal collaborator failed.
    #[error("background removal error: {0}")]
    Removal(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VeilError {
    /// Build a [`VeilError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`VeilError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`VeilError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`VeilError::Removal`] value.
    pub fn removal(msg: impl Into<String>) -> Self {
        Self::Removal(msg.into())
    }

    /// Build a [`VeilError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
