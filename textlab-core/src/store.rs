//! Shared session storage.
//!
//! Provides a thread-safe [`SessionStore`] that HTTP handlers share. Each
//! session owns one composition, its interaction engine and its draft flow;
//! every access runs under the store's lock, so all mutations of a session's
//! scene are serialized onto one owner. Sessions live in memory only.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::{
    CanvasElement, Composition, DraftFlow, DraftState, ElementId, InteractionEngine, Scene,
};

/// Default session identifier.
pub const DEFAULT_SESSION: &str = "default";

/// Everything one user's Text Lab needs.
#[derive(Debug, Clone, Default)]
pub struct LabSession {
    /// Scene history and selection.
    pub composition: Composition,
    /// Pointer gesture state.
    pub engine: InteractionEngine,
    /// AI draft requests.
    pub drafts: DraftFlow,
}

impl LabSession {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The scene as it should be drawn, including any gesture preview.
    #[must_use]
    pub fn view(&self) -> Scene {
        self.engine.view(self.composition.scene())
    }

    /// A serializable summary of the session.
    #[must_use]
    pub fn snapshot(&self, session_id: &str) -> SessionSnapshot {
        let history = self.composition.history();
        SessionSnapshot {
            session_id: session_id.to_string(),
            elements: self.view().paint_order().into_iter().cloned().collect(),
            selected: self.composition.selected(),
            can_undo: self.composition.can_undo(),
            can_redo: self.composition.can_redo(),
            can_bring_forward: self.composition.can_bring_forward(),
            can_send_backward: self.composition.can_send_backward(),
            history_index: history.index(),
            history_len: history.len(),
            gesture: self.engine.gesture().kind(),
            drafts: self.drafts.state().clone(),
        }
    }
}

/// Wire view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub session_id: String,
    /// Elements in paint order, with any gesture preview applied.
    pub elements: Vec<CanvasElement>,
    /// Selected element.
    pub selected: Option<ElementId>,
    /// Whether undo is available.
    pub can_undo: bool,
    /// Whether redo is available.
    pub can_redo: bool,
    /// Whether the selection can move up the stack.
    pub can_bring_forward: bool,
    /// Whether the selection can move down the stack.
    pub can_send_backward: bool,
    /// History cursor.
    pub history_index: usize,
    /// Snapshots held.
    pub history_len: usize,
    /// Active gesture kind.
    pub gesture: &'static str,
    /// Draft flow state.
    pub drafts: DraftState,
}

/// Thread-safe session storage.
///
/// # Example
///
/// ```
/// use textlab_core::store::SessionStore;
/// use textlab_core::{ElementStyle, GlyphId, Point};
///
/// let store = SessionStore::new();
/// let id = store.with_session("default", |session| {
///     session
///         .composition
///         .add_element(GlyphId::Shan, Point::new(150.0, 150.0), ElementStyle::default())
/// });
/// assert!(store.snapshot("default").selected == Some(id));
/// ```
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, LabSession>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a new store holding the default session.
    #[must_use]
    pub fn new() -> Self {
        let mut sessions = HashMap::new();
        sessions.insert(DEFAULT_SESSION.to_string(), LabSession::new());
        Self {
            sessions: Arc::new(RwLock::new(sessions)),
        }
    }

    /// Run `f` against a session, creating it if needed.
    pub fn with_session<R, F>(&self, session_id: &str, f: F) -> R
    where
        F: FnOnce(&mut LabSession) -> R,
    {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::debug!("Creating session {session_id}");
            LabSession::new()
        });
        f(session)
    }

    /// Run `f` against an existing session without creating it.
    #[must_use]
    pub fn read<R, F>(&self, session_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&LabSession) -> R,
    {
        let sessions = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        sessions.get(session_id).map(f)
    }

    /// Summary of a session; unknown sessions read as empty.
    #[must_use]
    pub fn snapshot(&self, session_id: &str) -> SessionSnapshot {
        self.read(session_id, |session| session.snapshot(session_id))
            .unwrap_or_else(|| LabSession::new().snapshot(session_id))
    }

    /// Remove a session. Returns whether it existed.
    pub fn remove(&self, session_id: &str) -> bool {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sessions.remove(session_id).is_some()
    }

    /// Get a list of all session IDs.
    #[must_use]
    pub fn session_ids(&self) -> Vec<String> {
        let sessions = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        sessions.keys().cloned().collect()
    }
}
