//! Error types for the ticket export pipeline

use thiserror::Error;

use crate::form::FieldName;

/// Result type alias for ticket operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while composing or exporting a ticket
#[derive(Error, Debug)]
pub enum Error {
    /// Export was requested before the capture region was mounted
    #[error("Capture region is not available")]
    MissingRenderTarget,

    /// Rasterization failed, or an asset needed by the region could not be loaded
    #[error("Capture failed: {0}")]
    CaptureFailure(String),

    /// Failed to encode the raster as PNG
    #[error("Image encoding failed: {0}")]
    EncodeError(String),

    /// Failed to build the PDF document
    #[error("Document construction failed: {0}")]
    DocumentError(String),

    /// Another export is still running
    #[error("An export is already in progress")]
    ExportInProgress,

    /// A required field was left empty
    #[error("Field `{0}` is required")]
    MissingField(FieldName),

    /// A field holds a value its control would not accept
    #[error("Field `{field}` does not accept {value:?}")]
    InvalidField { field: FieldName, value: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error while saving an artifact
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::EncodeError(err.to_string())
    }
}
