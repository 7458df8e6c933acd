//! Element operations layered on the history store.
//!
//! Each operation builds the complete next scene in memory and commits it
//! once. Guarded cases (nothing selected, unknown id, stack boundary, empty
//! canvas) return `false`/`None` and leave the history untouched.

use crate::{
    CanvasElement, ElementId, ElementPatch, ElementStyle, GlyphId, History, Point, Scene, ZStep,
};

/// A composition: its undo history plus the ephemeral selection.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    history: History,
    selected: Option<ElementId>,
}

impl Composition {
    /// Create an empty composition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed scene at the history cursor.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        self.history.current()
    }

    /// The underlying history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    // --- Selection ---

    /// The selected element id, if any.
    #[must_use]
    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    /// The selected element, if any.
    #[must_use]
    pub fn selected_element(&self) -> Option<&CanvasElement> {
        self.selected.and_then(|id| self.scene().get(id))
    }

    /// Select an element, or clear the selection with `None`.
    ///
    /// Returns `false` (and clears the selection) if the id is not in the scene.
    pub fn select(&mut self, id: Option<ElementId>) -> bool {
        match id {
            Some(id) if self.scene().contains(id) => {
                self.selected = Some(id);
                true
            }
            Some(_) => {
                self.selected = None;
                false
            }
            None => {
                self.selected = None;
                true
            }
        }
    }

    // --- Element operations ---

    /// Place a new glyph on top of the stack and select it.
    pub fn add_element(&mut self, glyph: GlyphId, position: Point, style: ElementStyle) -> ElementId {
        let element = CanvasElement::new(glyph, position, style, self.scene().len());
        let id = element.id;
        let next = self.scene().with_element(element);
        self.commit("add", next);
        self.selected = Some(id);
        id
    }

    /// Apply a sparse update to one element.
    ///
    /// Returns `false` if the id is unknown or the patch changes nothing.
    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        let Some(next) = self.scene().with_patch(id, patch) else {
            tracing::debug!("update ignored, element {id} not in scene");
            return false;
        };
        if next == *self.scene() {
            return false;
        }
        self.commit("update", next);
        true
    }

    /// Remove the selected element and clear the selection.
    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        let Some(next) = self.scene().without(id) else {
            self.selected = None;
            return false;
        };
        self.selected = None;
        self.commit("delete", next);
        true
    }

    /// Copy the selected element, offset it, put it on top and select it.
    pub fn duplicate_selected(&mut self) -> Option<ElementId> {
        let source = self.selected_element()?;
        let copy = source.duplicate(self.scene().len());
        let id = copy.id;
        let next = self.scene().with_element(copy);
        self.commit("duplicate", next);
        self.selected = Some(id);
        Some(id)
    }

    /// Commit an empty scene. No-op when already empty.
    pub fn clear_canvas(&mut self) -> bool {
        if self.scene().is_empty() {
            return false;
        }
        self.selected = None;
        self.commit("clear", Scene::new());
        true
    }

    /// Move an element one step up the stack.
    pub fn bring_forward(&mut self, id: ElementId) -> bool {
        self.restack(id, ZStep::Forward)
    }

    /// Move an element one step down the stack.
    pub fn send_backward(&mut self, id: ElementId) -> bool {
        self.restack(id, ZStep::Backward)
    }

    /// Whether the selected element can move up the stack.
    #[must_use]
    pub fn can_bring_forward(&self) -> bool {
        self.selected
            .is_some_and(|id| self.scene().can_restack(id, ZStep::Forward))
    }

    /// Whether the selected element can move down the stack.
    #[must_use]
    pub fn can_send_backward(&self) -> bool {
        self.selected
            .is_some_and(|id| self.scene().can_restack(id, ZStep::Backward))
    }

    /// Flip the mirror flag of the selected element.
    pub fn toggle_mirror(&mut self) -> bool {
        let Some(element) = self.selected_element() else {
            return false;
        };
        let patch = ElementPatch {
            is_mirror: Some(!element.is_mirror),
            ..ElementPatch::default()
        };
        let id = element.id;
        self.update_element(id, &patch)
    }

    /// Flip the outline flag of the selected element.
    pub fn toggle_outline(&mut self) -> bool {
        let Some(element) = self.selected_element() else {
            return false;
        };
        let patch = ElementPatch {
            is_outline: Some(!element.is_outline),
            ..ElementPatch::default()
        };
        let id = element.id;
        self.update_element(id, &patch)
    }

    /// Set the font weight of the selected element.
    pub fn set_font_weight(&mut self, weight: u16) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        let patch = ElementPatch {
            font_weight: Some(weight),
            ..ElementPatch::default()
        };
        self.update_element(id, &patch)
    }

    /// Replace the whole scene in one commit and clear the selection.
    pub fn replace_scene(&mut self, elements: Vec<CanvasElement>) {
        self.selected = None;
        self.commit("replace", Scene::from_elements(elements));
    }

    // --- History navigation ---

    /// Step back one snapshot.
    pub fn undo(&mut self) -> bool {
        let moved = self.history.undo();
        self.drop_stale_selection();
        moved
    }

    /// Step forward one snapshot.
    pub fn redo(&mut self) -> bool {
        let moved = self.history.redo();
        self.drop_stale_selection();
        moved
    }

    /// Whether undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn restack(&mut self, id: ElementId, step: ZStep) -> bool {
        let Some(next) = self.scene().restacked(id, step) else {
            return false;
        };
        self.commit("restack", next);
        true
    }

    fn drop_stale_selection(&mut self) {
        if self.selected.is_some_and(|id| !self.scene().contains(id)) {
            self.selected = None;
        }
    }

    fn commit(&mut self, operation: &'static str, scene: Scene) {
        tracing::debug!(operation, elements = scene.len(), "composition commit");
        self.history.commit(scene);
    }
}
