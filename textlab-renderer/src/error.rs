//! Renderer error types.

use thiserror::Error;

use crate::ExportFormat;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during export.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The format is recognised but not implemented yet.
    #[error("{0} export is a planned feature")]
    Unsupported(ExportFormat),

    /// The format name is not recognised at all.
    #[error("Unknown export format: {0}")]
    UnknownFormat(String),

    /// Writing the document failed.
    #[error("Export failed: {0}")]
    Format(#[from] std::fmt::Error),
}
