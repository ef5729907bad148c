/// Convenience result type used across drape.
pub type DrapeResult<T> = Result<T, DrapeError>;

/// An image reference could not be fetched or decoded.
///
/// Carries the reference that failed so callers can report which asset is broken.
#[derive(thiserror::Error, Debug)]
#[error("load error for '{reference}': {source}")]
pub struct LoadError {
    /// Reference passed to the image source.
    pub reference: String,
    /// Underlying IO or decode failure.
    #[source]
    pub source: anyhow::Error,
}

impl LoadError {
    /// Build a [`LoadError`] for `reference`.
    pub fn new(reference: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            reference: reference.into(),
            source: source.into(),
        }
    }
}

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum DrapeError {
    /// An image reference failed to load.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// User scale percentage outside the accepted `[10, 200]` range.
    #[error("invalid scale: {0}% is outside [10, 200]")]
    InvalidScale(u32),

    /// Invalid user-provided or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while producing a composite.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DrapeError {
    /// Build a [`DrapeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DrapeError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`DrapeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return the wrapped [`LoadError`], if this is a load failure.
    pub fn as_load(&self) -> Option<&LoadError> {
        match self {
            Self::Load(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
