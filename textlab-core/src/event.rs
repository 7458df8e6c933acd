//! Pointer input events for canvas interaction.
//!
//! Mouse, pen and touch input all arrive as pointer events carrying the
//! pointer id assigned by the host, so a gesture can be bound to the pointer
//! that started it.

use serde::{Deserialize, Serialize};

use crate::Point;

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed or finger down.
    Down,
    /// Pointer moved.
    Move,
    /// Button released or finger up.
    Up,
    /// The host aborted the pointer (e.g., palm rejection, lost capture).
    Cancel,
}

/// Which button produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    /// Left mouse button, touch contact, or pen tip.
    #[default]
    Primary,
    /// Middle mouse button.
    Auxiliary,
    /// Right mouse button or pen barrel button.
    Secondary,
}

/// A single pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Host-assigned pointer identifier.
    pub pointer_id: u32,
    /// Phase of this event.
    pub phase: PointerPhase,
    /// Button involved; only meaningful for `Down`.
    #[serde(default)]
    pub button: PointerButton,
    /// Horizontal screen position in pixels.
    pub x: f64,
    /// Vertical screen position in pixels.
    pub y: f64,
}

impl PointerEvent {
    /// Create a primary-button pointer event.
    #[must_use]
    pub fn new(pointer_id: u32, phase: PointerPhase, x: f64, y: f64) -> Self {
        Self {
            pointer_id,
            phase,
            button: PointerButton::Primary,
            x,
            y,
        }
    }

    /// Shorthand for a primary `Down` event.
    #[must_use]
    pub fn down(pointer_id: u32, x: f64, y: f64) -> Self {
        Self::new(pointer_id, PointerPhase::Down, x, y)
    }

    /// Shorthand for a `Move` event.
    #[must_use]
    pub fn moved(pointer_id: u32, x: f64, y: f64) -> Self {
        Self::new(pointer_id, PointerPhase::Move, x, y)
    }

    /// Shorthand for an `Up` event.
    #[must_use]
    pub fn up(pointer_id: u32, x: f64, y: f64) -> Self {
        Self::new(pointer_id, PointerPhase::Up, x, y)
    }

    /// Shorthand for a `Cancel` event.
    #[must_use]
    pub fn cancel(pointer_id: u32, x: f64, y: f64) -> Self {
        Self::new(pointer_id, PointerPhase::Cancel, x, y)
    }

    /// Set the button.
    #[must_use]
    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    /// The screen position as a point.
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}
