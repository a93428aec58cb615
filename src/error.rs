//! Error type shared by the annotator library and its binaries.
//!
//! Network, parsing and storage failures all funnel into [`AnnotatorError`].
//! None of them are fatal to a page: callers log the error, show the
//! message to the user and keep their in-memory state as it was.

use thiserror::Error;

/// Convenience alias for results using the annotator error type.
pub type AnnotatorResult<T> = std::result::Result<T, AnnotatorError>;

#[derive(Error, Debug)]
pub enum AnnotatorError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. `detail` is the server's `detail` field when the
    /// body carried one, otherwise the raw body text.
    #[error("Server returned {status}: {detail}")]
    Server { status: u16, detail: String },

    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The chart's size is not known yet, so image-space coordinates
    /// cannot be computed.
    #[error("Chart is still loading")]
    ChartNotReady,

    #[error("Page session lock poisoned")]
    SessionPoisoned,

    #[error("Unknown chat session: {0}")]
    UnknownSession(String),

    #[error("Unsupported memory schema version {0}")]
    UnsupportedSchema(u64),
}

impl AnnotatorError {
    /// Text suitable for a user-facing alert.
    ///
    /// Server errors show only the detail message; everything else uses the
    /// full display form.
    pub fn user_message(&self) -> String {
        match self {
            AnnotatorError::Server { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}
