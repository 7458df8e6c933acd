//! Error types for Text Lab operations.
//!
//! Most direct-manipulation guards (degenerate scale, empty selection, stack
//! boundaries) are not errors at all: those operations report `false` and
//! leave the history untouched. The variants here cover the paths where the
//! caller needs to surface a message.

use thiserror::Error;

/// Result type for Text Lab operations.
pub type LabResult<T> = Result<T, LabError>;

/// Errors that can occur in Text Lab operations.
#[derive(Debug, Error)]
pub enum LabError {
    /// A glyph name outside the registry.
    #[error("Unknown glyph: {0}")]
    UnknownGlyph(String),

    /// Element not found in the current scene.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The prompt for a layout request was empty.
    #[error("Please enter a concept or word")]
    EmptyPrompt,

    /// A layout request is already in flight for this composition.
    #[error("A draft request is already pending")]
    DraftPending,

    /// No drafts are available to accept.
    #[error("No drafts available")]
    NoDrafts,

    /// The requested draft index is outside the candidate list.
    #[error("Draft index {index} out of range ({available} available)")]
    DraftOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of candidates held.
        available: usize,
    },

    /// The layout payload did not contain a list of layouts.
    #[error("Malformed layout response: {0}")]
    MalformedProposals(String),

    /// A layout response arrived for a request that is no longer pending.
    #[error("Draft request is no longer pending")]
    StaleDraftResponse,

    /// The external layout service failed or returned malformed data.
    #[error("Failed to generate drafts: {0}")]
    LayoutService(String),

    /// Scene serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
