//! Input validation for untrusted request data.
//!
//! Path parameters and prompts are checked here before they reach the
//! session store or the layout service.

use textlab_core::ElementId;
use thiserror::Error;

/// Maximum length for session IDs.
pub const MAX_SESSION_ID_LEN: usize = 64;
/// Maximum length for element IDs (UUIDs are 36 chars).
pub const MAX_ELEMENT_ID_LEN: usize = 64;
/// Maximum prompt length in characters.
pub const MAX_PROMPT_LEN: usize = 500;
/// Maximum elements per scene.
pub const MAX_ELEMENTS_PER_SCENE: usize = 2_000;

/// Validation error types.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Session ID exceeds maximum length.
    #[error("session_id too long (max {MAX_SESSION_ID_LEN} chars)")]
    SessionIdTooLong,
    /// Session ID is empty or contains invalid characters.
    #[error("session_id contains invalid characters")]
    SessionIdInvalidChars,
    /// Element ID exceeds maximum length.
    #[error("element_id too long (max {MAX_ELEMENT_ID_LEN} chars)")]
    ElementIdTooLong,
    /// Element ID is not a UUID.
    #[error("element_id is not a valid UUID")]
    ElementIdMalformed,
    /// Prompt exceeds maximum length.
    #[error("prompt too long (max {MAX_PROMPT_LEN} chars)")]
    PromptTooLong,
    /// Too many elements in scene.
    #[error("too many elements (max {MAX_ELEMENTS_PER_SCENE})")]
    TooManyElements,
    /// A coordinate was NaN or infinite.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(&'static str),
}

impl ValidationError {
    /// Label used for the validation failure metric.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionIdTooLong | Self::SessionIdInvalidChars => "session_id",
            Self::ElementIdTooLong | Self::ElementIdMalformed => "element_id",
            Self::PromptTooLong => "prompt",
            Self::TooManyElements => "element_count",
            Self::InvalidCoordinate(_) => "coordinate",
        }
    }
}

fn is_valid_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Validate a session ID.
///
/// Valid session IDs:
/// - 1-64 characters
/// - ASCII alphanumeric, hyphen, underscore only
///
/// # Errors
///
/// Returns [`ValidationError::SessionIdTooLong`] if the ID exceeds 64 characters.
/// Returns [`ValidationError::SessionIdInvalidChars`] if the ID is empty or contains invalid characters.
pub fn validate_session_id(id: &str) -> Result<(), ValidationError> {
    if id.len() > MAX_SESSION_ID_LEN {
        return Err(ValidationError::SessionIdTooLong);
    }
    if id.is_empty() || !id.chars().all(is_valid_id_char) {
        return Err(ValidationError::SessionIdInvalidChars);
    }
    Ok(())
}

/// Parse an element ID from a path segment.
///
/// # Errors
///
/// Returns [`ValidationError::ElementIdTooLong`] for oversized input and
/// [`ValidationError::ElementIdMalformed`] if it is not a UUID.
pub fn parse_element_id(id: &str) -> Result<ElementId, ValidationError> {
    if id.len() > MAX_ELEMENT_ID_LEN {
        return Err(ValidationError::ElementIdTooLong);
    }
    ElementId::parse(id).map_err(|_| ValidationError::ElementIdMalformed)
}

/// Validate a layout prompt length. Blank prompts are rejected later by the
/// draft flow.
///
/// # Errors
///
/// Returns [`ValidationError::PromptTooLong`] above 500 characters.
pub fn validate_prompt(prompt: &str) -> Result<(), ValidationError> {
    if prompt.chars().count() > MAX_PROMPT_LEN {
        return Err(ValidationError::PromptTooLong);
    }
    Ok(())
}

/// Validate element count before adding another element.
///
/// # Errors
///
/// Returns [`ValidationError::TooManyElements`] if the count reaches the limit.
pub fn validate_element_count(count: usize) -> Result<(), ValidationError> {
    if count >= MAX_ELEMENTS_PER_SCENE {
        return Err(ValidationError::TooManyElements);
    }
    Ok(())
}

/// Validate that both coordinates are finite.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidCoordinate`] naming the bad axis.
pub fn validate_point(x: f64, y: f64) -> Result<(), ValidationError> {
    if !x.is_finite() {
        return Err(ValidationError::InvalidCoordinate("x"));
    }
    if !y.is_finite() {
        return Err(ValidationError::InvalidCoordinate("y"));
    }
    Ok(())
}
