//! Scenes - immutable snapshots of the whole composition.
//!
//! Elements keep their insertion order; paint order is given by `z_index`.
//! Every transforming method returns a new scene and leaves `self` intact, so
//! a scene held by the history can never be torn by a later edit.

use serde::{Deserialize, Serialize};

use crate::{CanvasElement, ElementId, ElementPatch, LabResult, Point};

/// Direction of a one-step stacking-order change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZStep {
    /// Swap with the element directly above.
    Forward,
    /// Swap with the element directly below.
    Backward,
}

/// A complete composition at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    elements: Vec<CanvasElement>,
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scene from elements, dropping any whose id repeats an earlier one.
    #[must_use]
    pub fn from_elements(elements: Vec<CanvasElement>) -> Self {
        let mut unique: Vec<CanvasElement> = Vec::with_capacity(elements.len());
        for element in elements {
            if unique.iter().any(|e| e.id == element.id) {
                tracing::warn!("Dropping element with duplicate id {}", element.id);
                continue;
            }
            unique.push(element);
        }
        Self { elements: unique }
    }

    /// Elements in insertion order.
    #[must_use]
    pub fn elements(&self) -> &[CanvasElement] {
        &self.elements
    }

    /// Get an element by ID.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&CanvasElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Whether the scene holds an element with this ID.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    /// Get the number of elements in the scene.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in paint order (bottom first). Ties keep insertion order.
    #[must_use]
    pub fn paint_order(&self) -> Vec<&CanvasElement> {
        let mut sorted: Vec<&CanvasElement> = self.elements.iter().collect();
        sorted.sort_by_key(|e| e.z_index);
        sorted
    }

    /// Whether the z-indices are exactly `0..len` with no gaps or repeats.
    #[must_use]
    pub fn has_dense_z_order(&self) -> bool {
        let mut seen = vec![false; self.elements.len()];
        for element in &self.elements {
            match seen.get_mut(element.z_index) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        true
    }

    /// Find the topmost element whose glyph box contains `point`.
    #[must_use]
    pub fn element_at(&self, point: Point) -> Option<ElementId> {
        self.paint_order()
            .into_iter()
            .rev()
            .find(|e| e.contains_point(point))
            .map(|e| e.id)
    }

    /// A new scene with `element` appended.
    #[must_use]
    pub fn with_element(&self, element: CanvasElement) -> Self {
        let mut elements = self.elements.clone();
        elements.push(element);
        Self { elements }
    }

    /// A new scene with one element patched, or `None` if the id is absent.
    #[must_use]
    pub fn with_patch(&self, id: ElementId, patch: &ElementPatch) -> Option<Self> {
        let position = self.elements.iter().position(|e| e.id == id)?;
        let mut elements = self.elements.clone();
        elements[position] = elements[position].patched(patch);
        Some(Self { elements })
    }

    /// A new scene without the given element, z-order renormalized.
    #[must_use]
    pub fn without(&self, id: ElementId) -> Option<Self> {
        if !self.contains(id) {
            return None;
        }
        let elements = self
            .elements
            .iter()
            .filter(|e| e.id != id)
            .cloned()
            .collect();
        let mut scene = Self { elements };
        scene.normalize_z_order();
        Some(scene)
    }

    /// A new scene with `id` moved one step in the stack.
    ///
    /// Returns `None` if the element is absent or already at the boundary.
    #[must_use]
    pub fn restacked(&self, id: ElementId, step: ZStep) -> Option<Self> {
        let mut order: Vec<usize> = (0..self.elements.len()).collect();
        order.sort_by_key(|&i| self.elements[i].z_index);

        let from = order.iter().position(|&i| self.elements[i].id == id)?;
        let to = match step {
            ZStep::Forward if from + 1 < order.len() => from + 1,
            ZStep::Backward if from > 0 => from - 1,
            _ => return None,
        };
        order.swap(from, to);

        let mut elements = self.elements.clone();
        for (z, &i) in order.iter().enumerate() {
            elements[i].z_index = z;
        }
        Some(Self { elements })
    }

    /// Whether `id` can move one step in the given direction.
    #[must_use]
    pub fn can_restack(&self, id: ElementId, step: ZStep) -> bool {
        let Some(rank) = self
            .paint_order()
            .iter()
            .position(|e| e.id == id)
        else {
            return false;
        };
        match step {
            ZStep::Forward => rank + 1 < self.elements.len(),
            ZStep::Backward => rank > 0,
        }
    }

    /// Reassign z-indices to `0..len` preserving the current paint order.
    fn normalize_z_order(&mut self) {
        let mut order: Vec<usize> = (0..self.elements.len()).collect();
        order.sort_by_key(|&i| self.elements[i].z_index);
        for (z, i) in order.into_iter().enumerate() {
            self.elements[i].z_index = z;
        }
    }

    /// Serialize the scene to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> LabResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize a scene from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> LabResult<Self> {
        let scene: Self = serde_json::from_str(json)?;
        Ok(Self::from_elements(scene.elements))
    }
}
