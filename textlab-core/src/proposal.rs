//! Layout proposals from the AI service.
//!
//! The service answers with loosely typed JSON. Each candidate layout is
//! validated on its own: a malformed candidate is rejected with a reason and
//! the rest of the batch survives. Accepted candidates become a full
//! replacement scene in a single commit.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    is_valid_scale, CanvasElement, Composition, ElementStyle, GlyphId, LabError, LabResult, Point,
    MAX_FONT_WEIGHT, MIN_FONT_WEIGHT,
};

/// Numeric fields every proposed element must carry.
const REQUIRED_NUMBERS: [&str; 5] = ["x", "y", "scale", "rotation", "fontWeight"];

/// Why a single candidate layout was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandidateError {
    /// The candidate is not a JSON object.
    #[error("layout is not an object")]
    NotAnObject,

    /// `elements` is missing, not an array, or empty.
    #[error("layout has no elements")]
    NoElements,

    /// An element is not a JSON object.
    #[error("element {element} is not an object")]
    ElementNotAnObject {
        /// Position of the element in the layout.
        element: usize,
    },

    /// An element names a glyph outside the registry.
    #[error("element {element} has unknown glyph {glyph:?}")]
    UnknownGlyph {
        /// Position of the element in the layout.
        element: usize,
        /// The name as received.
        glyph: String,
    },

    /// A required numeric field is absent or not a finite number.
    #[error("element {element} is missing numeric field {field}")]
    MissingNumber {
        /// Position of the element in the layout.
        element: usize,
        /// The field name.
        field: &'static str,
    },

    /// The scale would make the element degenerate.
    #[error("element {element} has degenerate scale {scale}")]
    DegenerateScale {
        /// Position of the element in the layout.
        element: usize,
        /// The proposed scale.
        scale: f64,
    },
}

/// One validated element of a proposed layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSpec {
    /// Glyph to place.
    pub glyph: GlyphId,
    /// Centre x.
    pub x: f64,
    /// Centre y.
    pub y: f64,
    /// Scale, always above the degeneracy threshold.
    pub scale: f64,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Font weight, clamped to 100-900.
    pub font_weight: u16,
    /// Horizontal flip.
    pub is_mirror: bool,
    /// Stroke-only rendering.
    pub is_outline: bool,
}

/// A validated candidate layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiLayout {
    /// Short description of the composition.
    pub description: String,
    /// Elements in proposed stacking order, bottom first.
    pub elements: Vec<ElementSpec>,
}

impl AiLayout {
    /// Synthesize canvas elements: fresh ids, resolved characters, and
    /// z-indices following list order.
    #[must_use]
    pub fn materialize(&self) -> Vec<CanvasElement> {
        self.elements
            .iter()
            .enumerate()
            .map(|(z, spec)| {
                let style = ElementStyle {
                    font_weight: spec.font_weight,
                    is_mirror: spec.is_mirror,
                    is_outline: spec.is_outline,
                };
                CanvasElement::new(spec.glyph, Point::new(spec.x, spec.y), style, z)
                    .with_transform(spec.scale, spec.rotation)
            })
            .collect()
    }
}

/// A candidate that failed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedCandidate {
    /// Position of the candidate in the response.
    pub index: usize,
    /// Human-readable reason.
    pub reason: String,
}

/// Result of parsing one service response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProposalBatch {
    /// Candidates that passed validation, in response order.
    pub candidates: Vec<AiLayout>,
    /// Candidates that were dropped.
    pub rejected: Vec<RejectedCandidate>,
}

impl ProposalBatch {
    /// Whether no candidate survived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Parse a service response into validated candidates.
///
/// Accepts `{"layouts": [...]}` or a bare array of layouts.
///
/// # Errors
///
/// Returns [`LabError::MalformedProposals`] if no list of layouts can be found.
pub fn parse_proposals(response: &Value) -> LabResult<ProposalBatch> {
    let layouts = match response {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("layouts")
            .and_then(Value::as_array)
            .ok_or_else(|| LabError::MalformedProposals("missing `layouts` array".to_string()))?,
        other => {
            return Err(LabError::MalformedProposals(format!(
                "expected object or array, got {}",
                json_kind(other)
            )))
        }
    };

    let mut batch = ProposalBatch::default();
    for (index, raw) in layouts.iter().enumerate() {
        match parse_layout(raw, index) {
            Ok(layout) => batch.candidates.push(layout),
            Err(err) => {
                tracing::warn!(index, error = %err, "rejecting layout candidate");
                batch.rejected.push(RejectedCandidate {
                    index,
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok(batch)
}

/// Validate one candidate layout.
///
/// # Errors
///
/// Returns the first problem found; nothing is partially synthesized.
pub fn parse_layout(raw: &Value, index: usize) -> Result<AiLayout, CandidateError> {
    let object = raw.as_object().ok_or(CandidateError::NotAnObject)?;

    let description = object
        .get("description")
        .and_then(Value::as_str)
        .map_or_else(|| format!("Composition {}", index + 1), str::to_string);

    let raw_elements = object
        .get("elements")
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or(CandidateError::NoElements)?;

    let elements = raw_elements
        .iter()
        .enumerate()
        .map(|(element, raw)| parse_element(raw, element))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AiLayout {
        description,
        elements,
    })
}

fn parse_element(raw: &Value, element: usize) -> Result<ElementSpec, CandidateError> {
    let object = raw
        .as_object()
        .ok_or(CandidateError::ElementNotAnObject { element })?;

    let name = object.get("glyph").and_then(Value::as_str).unwrap_or_default();
    let glyph = name
        .parse::<GlyphId>()
        .map_err(|_| CandidateError::UnknownGlyph {
            element,
            glyph: name.to_string(),
        })?;

    let mut numbers = [0.0; REQUIRED_NUMBERS.len()];
    for (slot, field) in numbers.iter_mut().zip(REQUIRED_NUMBERS) {
        *slot = object
            .get(field)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or(CandidateError::MissingNumber { element, field })?;
    }
    let [x, y, scale, rotation, font_weight] = numbers;

    if !is_valid_scale(scale) {
        return Err(CandidateError::DegenerateScale { element, scale });
    }

    let flag = |key: &str| object.get(key).and_then(Value::as_bool).unwrap_or(false);

    Ok(ElementSpec {
        glyph,
        x,
        y,
        scale,
        rotation,
        font_weight: weight_from_number(font_weight),
        is_mirror: flag("isMirror"),
        is_outline: flag("isOutline"),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn weight_from_number(weight: f64) -> u16 {
    weight
        .round()
        .clamp(f64::from(MIN_FONT_WEIGHT), f64::from(MAX_FONT_WEIGHT)) as u16
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Identifies one layout request so late answers can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DraftTicket(u64);

/// Lifecycle of the AI draft flow for one composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DraftState {
    /// No request made, or drafts dismissed.
    #[default]
    Idle,
    /// Waiting for the service.
    Pending {
        /// The prompt sent.
        prompt: String,
    },
    /// Candidates are available.
    Ready {
        /// The prompt that produced them.
        prompt: String,
        /// Validated candidates plus rejections.
        batch: ProposalBatch,
    },
    /// The last request failed; the scene was not touched.
    Failed {
        /// The prompt that failed.
        prompt: String,
        /// User-facing message.
        message: String,
    },
}

/// Drives one composition's AI draft requests.
///
/// At most one request is in flight; a second `begin` while pending is
/// rejected rather than queued.
#[derive(Debug, Clone, Default)]
pub struct DraftFlow {
    state: DraftState,
    next_ticket: u64,
    pending: Option<DraftTicket>,
}

impl DraftFlow {
    /// Create an idle flow.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> &DraftState {
        &self.state
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a request for `prompt`.
    ///
    /// Returns the trimmed prompt to send and a ticket for [`Self::resolve`].
    ///
    /// # Errors
    ///
    /// [`LabError::EmptyPrompt`] for a blank prompt, [`LabError::DraftPending`]
    /// if a request is already in flight. Neither changes the state.
    pub fn begin(&mut self, prompt: &str) -> LabResult<(DraftTicket, String)> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(LabError::EmptyPrompt);
        }
        if self.is_pending() {
            return Err(LabError::DraftPending);
        }
        self.next_ticket += 1;
        let ticket = DraftTicket(self.next_ticket);
        self.pending = Some(ticket);
        self.state = DraftState::Pending {
            prompt: prompt.to_string(),
        };
        Ok((ticket, prompt.to_string()))
    }

    /// Deliver the service outcome for `ticket`.
    ///
    /// # Errors
    ///
    /// [`LabError::StaleDraftResponse`] if the ticket is not the pending one
    /// (the flow was discarded meanwhile); [`LabError::LayoutService`] on a
    /// service failure or malformed payload; [`LabError::NoDrafts`] if every
    /// candidate was rejected. The composition is never touched here.
    pub fn resolve<E: std::fmt::Display>(
        &mut self,
        ticket: DraftTicket,
        outcome: Result<Value, E>,
    ) -> LabResult<ProposalBatch> {
        if self.pending != Some(ticket) {
            return Err(LabError::StaleDraftResponse);
        }
        self.pending = None;
        let prompt = match std::mem::take(&mut self.state) {
            DraftState::Pending { prompt } => prompt,
            _ => String::new(),
        };

        let parsed = match outcome {
            Ok(response) => parse_proposals(&response),
            Err(err) => Err(LabError::LayoutService(err.to_string())),
        };
        let batch = match parsed {
            Ok(batch) if !batch.is_empty() => batch,
            Ok(_) => return Err(self.fail(prompt, LabError::NoDrafts)),
            Err(err) => return Err(self.fail(prompt, err)),
        };

        tracing::debug!(
            candidates = batch.candidates.len(),
            rejected = batch.rejected.len(),
            "drafts ready"
        );
        self.state = DraftState::Ready {
            prompt,
            batch: batch.clone(),
        };
        Ok(batch)
    }

    /// Replace the composition's scene with candidate `index`.
    ///
    /// The flow returns to idle; the previous scene stays reachable via undo.
    ///
    /// # Errors
    ///
    /// [`LabError::NoDrafts`] unless drafts are ready,
    /// [`LabError::DraftOutOfRange`] for a bad index.
    pub fn accept(&mut self, index: usize, composition: &mut Composition) -> LabResult<()> {
        let DraftState::Ready { batch, .. } = &self.state else {
            return Err(LabError::NoDrafts);
        };
        let layout = batch
            .candidates
            .get(index)
            .ok_or(LabError::DraftOutOfRange {
                index,
                available: batch.candidates.len(),
            })?;

        composition.replace_scene(layout.materialize());
        tracing::debug!(index, description = %layout.description, "draft accepted");
        self.state = DraftState::Idle;
        Ok(())
    }

    /// Drop drafts or forget a pending request.
    pub fn discard(&mut self) {
        self.pending = None;
        self.state = DraftState::Idle;
    }

    /// Give up on `ticket` without an answer.
    ///
    /// Returns to idle only if `ticket` is still the pending request, so an
    /// abandoned request never clobbers a newer one. Returns whether it did.
    pub fn abandon(&mut self, ticket: DraftTicket) -> bool {
        if self.pending != Some(ticket) {
            return false;
        }
        tracing::debug!("draft request abandoned");
        self.discard();
        true
    }

    fn fail(&mut self, prompt: String, err: LabError) -> LabError {
        tracing::warn!(error = %err, "draft request failed");
        self.state = DraftState::Failed {
            prompt,
            message: err.to_string(),
        };
        err
    }
}
