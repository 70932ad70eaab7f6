//! Error types for the export pipeline

use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while exporting an article
#[derive(Error, Debug)]
pub enum Error {
    /// Page geometry (or the raster width) yields a zero-height page slice
    #[error("Degenerate page geometry: {0}")]
    DegenerateGeometry(String),

    /// The source raster has no rows to paginate
    #[error("Nothing to paginate: source raster is empty")]
    EmptySource,

    /// The article page is missing required content
    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    /// Failed to rasterize or decode the export document
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to encode a page image or the PDF byte stream
    #[error("Encoding failed: {0}")]
    EncodeError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Another export is still running
    #[error("An export is already in progress")]
    Busy,

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// I/O error when reading inputs or writing outputs
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => Error::EncodeError(e.to_string()),
            other => Error::RenderError(other.to_string()),
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::EncodeError(err.to_string())
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_user_facing() {
        assert_eq!(
            Error::EmptySource.to_string(),
            "Nothing to paginate: source raster is empty"
        );
        assert_eq!(Error::Timeout(250).to_string(), "Operation timed out after 250ms");
        let err = Error::ExtractionError("Cannot read article title.".into());
        assert_eq!(err.to_string(), "Extraction failed: Cannot read article title.");
    }

    #[test]
    fn io_errors_convert() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
