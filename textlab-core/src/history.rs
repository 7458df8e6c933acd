//! Linear undo/redo log of full scene snapshots.

use crate::Scene;

/// Append-only sequence of scene snapshots with a cursor.
///
/// The cursor always points at a valid snapshot. Committing after an undo
/// discards the forward branch.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Scene>,
    index: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create a history holding a single empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial(Scene::new())
    }

    /// Create a history whose first snapshot is `scene`.
    #[must_use]
    pub fn with_initial(scene: Scene) -> Self {
        Self {
            snapshots: vec![scene],
            index: 0,
        }
    }

    /// The scene at the cursor.
    #[must_use]
    pub fn current(&self) -> &Scene {
        &self.snapshots[self.index]
    }

    /// Append `scene` after the cursor, pruning any redo branch.
    pub fn commit(&mut self, scene: Scene) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(scene);
        self.index = self.snapshots.len() - 1;
        tracing::trace!(index = self.index, "history commit");
    }

    /// Step back one snapshot. Returns `false` at the oldest snapshot.
    pub fn undo(&mut self) -> bool {
        if self.can_undo() {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward one snapshot. Returns `false` at the newest snapshot.
    pub fn redo(&mut self) -> bool {
        if self.can_redo() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Whether an older snapshot exists.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Whether a newer snapshot exists.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    /// Number of snapshots held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always `false`: a history holds at least one snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Position of the cursor.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}
