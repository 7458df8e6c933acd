//! API route handlers.
//!
//! Every handler validates its path parameters first, then runs against the
//! session under the store lock. Mutations answer with whether a history
//! entry was committed plus the fresh session snapshot, so a client never
//! needs a second round trip to redraw.
//!
//! Request bodies use snake_case; element patches use the element's own
//! camelCase wire form (`fontWeight`, `isMirror`, `isOutline`).

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use textlab_core::{
    clamp_font_weight, DraftTicket, ElementId, ElementPatch, ElementStyle, GlyphId, LabError,
    LabResult, LabSession, Point, PointerEvent, PointerOutcome, ProposalBatch, SessionSnapshot,
    SessionStore, SurfaceRect, DEFAULT_FONT_WEIGHT,
};
use textlab_renderer::{ExportConfig, ExportFormat, RenderError, SceneExporter};
use thiserror::Error;

use crate::drafts::DraftServiceError;
use crate::metrics;
use crate::validation::{
    parse_element_id, validate_element_count, validate_point, validate_prompt,
    validate_session_id, ValidationError,
};
use crate::AppState;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced to HTTP clients as `{"error": ..., "code": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed path parameter or body value.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Composition or draft flow error.
    #[error(transparent)]
    Lab(#[from] LabError),
    /// Export error.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Every AI candidate failed validation.
    #[error("The layout service returned no usable drafts")]
    NoUsableDrafts,
    /// A screen-space drop could not be mapped onto the canvas.
    #[error("Drop point cannot be mapped onto the canvas surface")]
    UnmappedPoint,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Self::Lab(err) => match err {
                LabError::UnknownGlyph(_) => (StatusCode::BAD_REQUEST, "unknown_glyph"),
                LabError::ElementNotFound(_) => (StatusCode::NOT_FOUND, "element_not_found"),
                LabError::EmptyPrompt => (StatusCode::BAD_REQUEST, "empty_prompt"),
                LabError::DraftPending => (StatusCode::CONFLICT, "draft_pending"),
                LabError::NoDrafts => (StatusCode::CONFLICT, "no_drafts"),
                LabError::DraftOutOfRange { .. } => (StatusCode::NOT_FOUND, "draft_out_of_range"),
                LabError::StaleDraftResponse => (StatusCode::CONFLICT, "stale_draft"),
                LabError::MalformedProposals(_) => (StatusCode::BAD_GATEWAY, "malformed_proposals"),
                LabError::LayoutService(_) => (StatusCode::BAD_GATEWAY, "layout_service"),
                LabError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "serialization"),
            },
            Self::Render(err) => match err {
                RenderError::Unsupported(_) => (StatusCode::NOT_IMPLEMENTED, "unsupported_format"),
                RenderError::UnknownFormat(_) => (StatusCode::BAD_REQUEST, "unknown_format"),
                RenderError::Format(_) => (StatusCode::INTERNAL_SERVER_ERROR, "export_failed"),
            },
            Self::NoUsableDrafts => (StatusCode::BAD_GATEWAY, "no_usable_drafts"),
            Self::UnmappedPoint => (StatusCode::UNPROCESSABLE_ENTITY, "unmapped_point"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if let Self::Validation(err) = &self {
            metrics::record_validation_failure(err.kind());
        }
        if status.is_server_error() {
            tracing::error!(code, "{self}");
        } else {
            tracing::debug!(code, "{self}");
        }
        let body = Json(json!({ "error": self.to_string(), "code": code }));
        (status, body).into_response()
    }
}

/// One palette entry.
#[derive(Debug, Serialize)]
pub struct GlyphInfo {
    /// Wire name.
    pub name: &'static str,
    /// Display character.
    pub char: &'static str,
    /// Whether the glyph is a basic stroke rather than a radical.
    pub stroke: bool,
}

/// Reply to a mutation.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// Whether a history entry was committed.
    pub committed: bool,
    /// Whether undo or redo moved the history cursor.
    pub navigated: bool,
    /// Element created by the operation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementId>,
    /// Session state after the operation.
    pub session: SessionSnapshot,
}

impl CommandResponse {
    fn new(
        session_id: &str,
        session: &LabSession,
        operation: &'static str,
        committed: bool,
        element: Option<ElementId>,
    ) -> Self {
        if committed {
            metrics::record_commit(operation);
            metrics::set_scene_elements(session_id, session.composition.scene().len());
        }
        Self {
            committed,
            navigated: false,
            element,
            session: session.snapshot(session_id),
        }
    }

    /// Reply to undo or redo. Navigation never commits.
    fn navigation(
        session_id: &str,
        session: &LabSession,
        direction: &'static str,
        moved: bool,
    ) -> Self {
        if moved {
            metrics::record_history_step(direction);
            metrics::set_scene_elements(session_id, session.composition.scene().len());
        }
        Self {
            committed: false,
            navigated: moved,
            element: None,
            session: session.snapshot(session_id),
        }
    }
}

/// Optional style fields shared by the insertion routes.
#[derive(Debug, Default, Deserialize)]
pub struct StyleRequest {
    /// Font weight, clamped to 100-900.
    #[serde(default)]
    pub font_weight: Option<u16>,
    /// Mirror flag.
    #[serde(default)]
    pub is_mirror: bool,
    /// Outline flag.
    #[serde(default)]
    pub is_outline: bool,
}

impl StyleRequest {
    fn style(&self) -> ElementStyle {
        ElementStyle {
            font_weight: clamp_font_weight(self.font_weight.unwrap_or(DEFAULT_FONT_WEIGHT)),
            is_mirror: self.is_mirror,
            is_outline: self.is_outline,
        }
    }
}

/// Body of `POST /elements`.
#[derive(Debug, Deserialize)]
pub struct AddElementRequest {
    /// Glyph wire name.
    pub glyph: String,
    /// Center x.
    pub x: f64,
    /// Center y.
    pub y: f64,
    /// Treat `x`/`y` as screen pixels on the session surface (a drop).
    #[serde(default)]
    pub screen: bool,
    /// Style.
    #[serde(flatten)]
    pub style: StyleRequest,
}

/// Body of `POST /elements/activate`.
#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    /// Glyph wire name.
    pub glyph: String,
    /// Style.
    #[serde(flatten)]
    pub style: StyleRequest,
}

/// Body of `POST /selection`.
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    /// Element to select; absent or null deselects.
    #[serde(default)]
    pub element: Option<ElementId>,
}

/// Body of `POST /commands`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Step back one snapshot.
    Undo,
    /// Step forward one snapshot.
    Redo,
    /// Delete the selection.
    Delete,
    /// Duplicate the selection.
    Duplicate,
    /// Remove every element.
    Clear,
    /// Raise an element (default: the selection) one step.
    BringForward {
        /// Target element.
        #[serde(default)]
        element: Option<ElementId>,
    },
    /// Lower an element (default: the selection) one step.
    SendBackward {
        /// Target element.
        #[serde(default)]
        element: Option<ElementId>,
    },
    /// Flip the selection horizontally.
    ToggleMirror,
    /// Toggle outline rendering of the selection.
    ToggleOutline,
    /// Set the selection's font weight.
    SetFontWeight {
        /// New weight, clamped to 100-900.
        weight: u16,
    },
}

impl Command {
    /// Operation label.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Delete => "delete",
            Self::Duplicate => "duplicate",
            Self::Clear => "clear",
            Self::BringForward { .. } => "bring_forward",
            Self::SendBackward { .. } => "send_backward",
            Self::ToggleMirror => "toggle_mirror",
            Self::ToggleOutline => "toggle_outline",
            Self::SetFontWeight { .. } => "set_font_weight",
        }
    }

    fn is_navigation(self) -> bool {
        matches!(self, Self::Undo | Self::Redo)
    }

    /// Run against a session. Returns whether the history changed and any new element.
    fn apply(self, session: &mut LabSession) -> ApiResult<(bool, Option<ElementId>)> {
        let composition = &mut session.composition;
        let result = match self {
            Self::Undo => (composition.undo(), None),
            Self::Redo => (composition.redo(), None),
            Self::Delete => (composition.delete_selected(), None),
            Self::Duplicate => {
                if composition.selected().is_some() {
                    validate_element_count(composition.scene().len())?;
                }
                let id = composition.duplicate_selected();
                (id.is_some(), id)
            }
            Self::Clear => (composition.clear_canvas(), None),
            Self::BringForward { element } => {
                let target = element.or(composition.selected());
                (target.is_some_and(|id| composition.bring_forward(id)), None)
            }
            Self::SendBackward { element } => {
                let target = element.or(composition.selected());
                (target.is_some_and(|id| composition.send_backward(id)), None)
            }
            Self::ToggleMirror => (composition.toggle_mirror(), None),
            Self::ToggleOutline => (composition.toggle_outline(), None),
            Self::SetFontWeight { weight } => (composition.set_font_weight(weight), None),
        };
        // A history change under a live gesture would leave its preview stale.
        if result.0 {
            session.engine.reset();
        }
        Ok(result)
    }
}

/// Body of `POST /pointer`.
#[derive(Debug, Deserialize)]
pub struct PointerRequest {
    /// The event.
    #[serde(flatten)]
    pub event: PointerEvent,
    /// New surface bounds, applied before the event.
    #[serde(default)]
    pub surface: Option<SurfaceRect>,
}

/// Reply to a pointer event.
#[derive(Debug, Serialize)]
pub struct PointerResponse {
    /// What the event did.
    #[serde(flatten)]
    pub outcome: PointerOutcome,
    /// Session state after the event, including any live preview.
    pub session: SessionSnapshot,
}

/// Body of `POST /drafts`.
#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    /// Concept to visualize.
    pub prompt: String,
}

/// Query of `GET /export`.
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    /// `svg` (default) or `pdf`.
    #[serde(default)]
    pub format: Option<String>,
    /// Draw selection chrome around the selected element.
    #[serde(default)]
    pub selection: bool,
}

fn outcome_label(outcome: PointerOutcome) -> &'static str {
    match outcome {
        PointerOutcome::Ignored => "ignored",
        PointerOutcome::Deselected => "deselected",
        PointerOutcome::Started { .. } => "started",
        PointerOutcome::Previewed => "previewed",
        PointerOutcome::Committed => "committed",
        PointerOutcome::Unchanged => "unchanged",
        PointerOutcome::Cancelled => "cancelled",
    }
}

/// List the glyph palette.
pub async fn list_glyphs() -> Json<Vec<GlyphInfo>> {
    Json(
        GlyphId::ALL
            .iter()
            .map(|glyph| GlyphInfo {
                name: glyph.name(),
                char: glyph.display_char(),
                stroke: glyph.is_stroke(),
            })
            .collect(),
    )
}

/// Get a session snapshot. Unknown sessions read as empty.
#[tracing::instrument(name = "get_session", skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    validate_session_id(&session_id)?;
    Ok(Json(state.store.snapshot(&session_id)))
}

/// Add a glyph at canvas coordinates, or at a screen point when `screen` is set.
#[tracing::instrument(name = "add_element", skip(state, request), fields(glyph = %request.glyph))]
pub async fn add_element(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<AddElementRequest>,
) -> ApiResult<Json<CommandResponse>> {
    validate_session_id(&session_id)?;
    validate_point(request.x, request.y)?;
    let glyph: GlyphId = request.glyph.parse()?;
    let style = request.style.style();
    let point = Point::new(request.x, request.y);

    let response = state.store.with_session(&session_id, |session| {
        validate_element_count(session.composition.scene().len())?;
        let id = if request.screen {
            session
                .engine
                .drop_glyph(&mut session.composition, glyph, point, style)
                .ok_or(ApiError::UnmappedPoint)?
        } else {
            session.composition.add_element(glyph, point, style)
        };
        Ok::<_, ApiError>(CommandResponse::new(&session_id, session, "add", true, Some(id)))
    })?;
    Ok(Json(response))
}

/// Add a glyph without a position; successive glyphs fan out around the centre.
#[tracing::instrument(name = "activate_glyph", skip(state, request), fields(glyph = %request.glyph))]
pub async fn activate_glyph(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ActivateRequest>,
) -> ApiResult<Json<CommandResponse>> {
    validate_session_id(&session_id)?;
    let glyph: GlyphId = request.glyph.parse()?;
    let style = request.style.style();

    let response = state.store.with_session(&session_id, |session| {
        validate_element_count(session.composition.scene().len())?;
        let id = session
            .engine
            .activate_glyph(&mut session.composition, glyph, style);
        Ok::<_, ApiError>(CommandResponse::new(&session_id, session, "add", true, Some(id)))
    })?;
    Ok(Json(response))
}

/// Apply a sparse update to one element.
#[tracing::instrument(name = "update_element", skip(state, patch))]
pub async fn update_element(
    State(state): State<AppState>,
    Path((session_id, element_id)): Path<(String, String)>,
    Json(patch): Json<ElementPatch>,
) -> ApiResult<Json<CommandResponse>> {
    validate_session_id(&session_id)?;
    let id = parse_element_id(&element_id)?;

    let response = state.store.with_session(&session_id, |session| {
        if !session.composition.scene().contains(id) {
            return Err(ApiError::from(LabError::ElementNotFound(id.to_string())));
        }
        let committed = session.composition.update_element(id, &patch);
        Ok(CommandResponse::new(&session_id, session, "update", committed, None))
    })?;
    Ok(Json(response))
}

/// Select an element or clear the selection.
#[tracing::instrument(name = "select", skip(state, request))]
pub async fn select(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<Json<SessionSnapshot>> {
    validate_session_id(&session_id)?;

    let snapshot = state.store.with_session(&session_id, |session| {
        if !session.composition.select(request.element) {
            if let Some(id) = request.element {
                return Err(ApiError::from(LabError::ElementNotFound(id.to_string())));
            }
        }
        Ok(session.snapshot(&session_id))
    })?;
    Ok(Json(snapshot))
}

/// Run an editing command.
#[tracing::instrument(name = "command", skip(state, command), fields(command = command.name()))]
pub async fn command(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(command): Json<Command>,
) -> ApiResult<Json<CommandResponse>> {
    validate_session_id(&session_id)?;

    let response = state.store.with_session(&session_id, |session| {
        let (changed, element) = command.apply(session)?;
        Ok::<_, ApiError>(if command.is_navigation() {
            CommandResponse::navigation(&session_id, session, command.name(), changed)
        } else {
            CommandResponse::new(&session_id, session, command.name(), changed, element)
        })
    })?;
    Ok(Json(response))
}

/// Feed one pointer event into the session's interaction engine.
#[tracing::instrument(
    name = "pointer",
    skip(state, request),
    fields(phase = ?request.event.phase, pointer = request.event.pointer_id)
)]
pub async fn pointer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<PointerRequest>,
) -> ApiResult<Json<PointerResponse>> {
    validate_session_id(&session_id)?;

    let response = state.store.with_session(&session_id, |session| {
        if let Some(surface) = request.surface {
            session.engine.set_surface(surface);
        }
        let outcome = session
            .engine
            .handle(&mut session.composition, request.event);
        metrics::record_pointer_event(outcome_label(outcome));
        if outcome == PointerOutcome::Committed {
            metrics::record_commit("gesture");
        }
        PointerResponse {
            outcome,
            session: session.snapshot(&session_id),
        }
    });
    Ok(Json(response))
}

/// A draft request in flight for one session.
///
/// Dropping it before [`PendingDraft::resolve`] abandons the request, so a
/// client that disconnects mid-request does not leave the session pending.
struct PendingDraft {
    store: SessionStore,
    session_id: String,
    service: &'static str,
    ticket: Option<DraftTicket>,
}

impl PendingDraft {
    fn begin(state: &AppState, session_id: &str, prompt: &str) -> LabResult<(Self, String)> {
        let (ticket, prompt) = state
            .store
            .with_session(session_id, |session| session.drafts.begin(prompt))?;
        let pending = Self {
            store: state.store.clone(),
            session_id: session_id.to_string(),
            service: state.layouts.name(),
            ticket: Some(ticket),
        };
        Ok((pending, prompt))
    }

    fn resolve(
        mut self,
        outcome: Result<serde_json::Value, DraftServiceError>,
    ) -> LabResult<ProposalBatch> {
        let ticket = self.ticket.take().ok_or(LabError::StaleDraftResponse)?;
        self.store.with_session(&self.session_id, |session| {
            session.drafts.resolve(ticket, outcome)
        })
    }
}

impl Drop for PendingDraft {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        let abandoned = self
            .store
            .with_session(&self.session_id, |session| session.drafts.abandon(ticket));
        if abandoned {
            tracing::info!(session = %self.session_id, "Draft request dropped before completion");
            metrics::record_draft_request(self.service, "abandoned");
        }
    }
}

/// Ask the layout service for drafts.
///
/// The session lock is released while the service runs; the reply is
/// delivered with the ticket from `begin`, so a discard in the meantime
/// turns it into a stale response.
#[tracing::instrument(name = "request_drafts", skip(state, request))]
pub async fn request_drafts(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<DraftRequest>,
) -> ApiResult<Json<ProposalBatch>> {
    validate_session_id(&session_id)?;
    validate_prompt(&request.prompt)?;

    let (pending, prompt) = PendingDraft::begin(&state, &session_id, &request.prompt)?;

    let service = state.layouts.name();
    tracing::info!(service, prompt = %prompt, "Requesting layout drafts");
    let outcome = state.layouts.propose(&prompt).await;
    let resolved = pending.resolve(outcome);

    match resolved {
        Ok(batch) => {
            metrics::record_draft_request(service, "ready");
            metrics::record_rejected_candidates(batch.rejected.len());
            Ok(Json(batch))
        }
        Err(LabError::StaleDraftResponse) => {
            metrics::record_draft_request(service, "stale");
            Err(LabError::StaleDraftResponse.into())
        }
        Err(LabError::NoDrafts) => {
            metrics::record_draft_request(service, "rejected");
            Err(ApiError::NoUsableDrafts)
        }
        Err(err) => {
            metrics::record_draft_request(service, "failed");
            Err(err.into())
        }
    }
}

/// Replace the scene with a ready draft.
#[tracing::instrument(name = "accept_draft", skip(state))]
pub async fn accept_draft(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(String, usize)>,
) -> ApiResult<Json<CommandResponse>> {
    validate_session_id(&session_id)?;

    let response = state.store.with_session(&session_id, |session| {
        session.drafts.accept(index, &mut session.composition)?;
        session.engine.reset();
        Ok::<_, ApiError>(CommandResponse::new(
            &session_id,
            session,
            "accept_draft",
            true,
            None,
        ))
    })?;
    Ok(Json(response))
}

/// Drop drafts or forget a pending request.
#[tracing::instrument(name = "discard_drafts", skip(state))]
pub async fn discard_drafts(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    validate_session_id(&session_id)?;

    let snapshot = state.store.with_session(&session_id, |session| {
        session.drafts.discard();
        session.snapshot(&session_id)
    });
    Ok(Json(snapshot))
}

/// Export the committed scene.
#[tracing::instrument(name = "export", skip(state))]
pub async fn export_scene(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    validate_session_id(&session_id)?;
    let format: ExportFormat = query.format.as_deref().unwrap_or("svg").parse()?;

    let (scene, selected) = state
        .store
        .read(&session_id, |session| {
            (
                session.composition.scene().clone(),
                session.composition.selected(),
            )
        })
        .unwrap_or_default();

    let exporter = if query.selection {
        SceneExporter::new(ExportConfig {
            selection: selected,
            ..ExportConfig::default()
        })
    } else {
        SceneExporter::with_defaults()
    };

    let result = exporter.export(&scene, format);
    metrics::record_export(format.extension(), result.is_ok());
    let bytes = result?;

    let headers = [
        (header::CONTENT_TYPE, format.mime_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", format.file_name()),
        ),
    ];
    Ok((headers, bytes).into_response())
}
