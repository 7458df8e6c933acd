//! Pointer gesture state machine.
//!
//! ```text
//!            down on body          move            up
//!   Idle ─────────────────▶ Move ───────▶ (preview) ───▶ commit ─▶ Idle
//!     │   down on rotate   ▶ Rotate                cancel ─▶ discard ─▶ Idle
//!     │   down on scale    ▶ Scale
//!     └── down on empty: clear selection
//! ```
//!
//! While a gesture runs, the engine edits a private preview copy of the
//! grabbed element. [`InteractionEngine::view`] overlays it on the committed
//! scene, and pointer-up commits the accumulated change as one history entry.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::hit::{hit_test, HitPart};
use crate::{
    is_valid_scale, CanvasElement, Composition, ElementId, ElementPatch, ElementStyle, GlyphId,
    PointerButton, PointerEvent, PointerPhase, Point, Scene, CANVAS_SIZE,
};

/// Centre of the canvas on both axes.
const CANVAS_CENTER: f64 = CANVAS_SIZE / 2.0;

/// Ring spacing for tap insertion.
const TAP_SPREAD: f64 = 18.0;

/// Elements per ring for tap insertion.
const TAP_RING_SLOTS: usize = 6;

/// Keep tapped glyphs this far from the canvas edge.
const TAP_MARGIN: f64 = 15.0;

/// Distances below this cannot anchor a scale gesture.
const MIN_ANCHOR_DISTANCE: f64 = 1e-6;

/// On-screen bounds of the rendered canvas surface, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Rendered width.
    pub width: f64,
    /// Rendered height. The surface is assumed square; only `width` sets the scale.
    pub height: f64,
}

impl Default for SurfaceRect {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: CANVAS_SIZE,
            height: CANVAS_SIZE,
        }
    }
}

impl SurfaceRect {
    /// Create a surface rect.
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Map a screen point into canvas units.
    ///
    /// Returns `None` when the surface has no usable width.
    #[must_use]
    pub fn to_canvas(&self, screen: Point) -> Option<Point> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return None;
        }
        let factor = CANVAS_SIZE / self.width;
        let point = Point::new((screen.x - self.left) * factor, (screen.y - self.top) * factor);
        (point.x.is_finite() && point.y.is_finite()).then_some(point)
    }
}

/// State kept for the grabbed element in every active gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct Grab {
    /// Pointer bound to the gesture.
    pub pointer_id: u32,
    /// The element as committed when the gesture started.
    pub original: CanvasElement,
    /// The element with the gesture applied so far.
    pub preview: CanvasElement,
}

/// The active transform, if any.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    /// No transform in progress.
    #[default]
    Idle,
    /// Dragging the element body.
    Move {
        /// Grabbed element.
        grab: Grab,
        /// Pointer position at gesture start.
        start_pointer: Point,
        /// Element centre at gesture start.
        start_position: Point,
    },
    /// Dragging the rotate handle.
    Rotate {
        /// Grabbed element.
        grab: Grab,
        /// Fixed rotation centre.
        center: Point,
        /// Angle from centre to pointer at gesture start, in degrees.
        start_angle: f64,
        /// Element rotation at gesture start.
        start_rotation: f64,
    },
    /// Dragging the scale handle.
    Scale {
        /// Grabbed element.
        grab: Grab,
        /// Fixed scaling centre.
        center: Point,
        /// Distance from centre to pointer at gesture start.
        start_distance: f64,
        /// Element scale at gesture start.
        start_scale: f64,
    },
}

impl Gesture {
    /// The grab of the active gesture.
    #[must_use]
    pub fn grab(&self) -> Option<&Grab> {
        match self {
            Self::Idle => None,
            Self::Move { grab, .. } | Self::Rotate { grab, .. } | Self::Scale { grab, .. } => {
                Some(grab)
            }
        }
    }

    /// Short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Move { .. } => "move",
            Self::Rotate { .. } => "rotate",
            Self::Scale { .. } => "scale",
        }
    }
}

/// What a pointer event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PointerOutcome {
    /// The event was not for this engine (wrong pointer, wrong button, unmapped).
    Ignored,
    /// Pointer-down over empty canvas cleared the selection.
    Deselected,
    /// A gesture began on an element.
    Started {
        /// Grabbed element.
        element: ElementId,
        /// Part that was grabbed.
        part: HitPart,
    },
    /// The preview was updated.
    Previewed,
    /// The gesture ended and its change was committed.
    Committed,
    /// The gesture ended without any change to commit.
    Unchanged,
    /// The gesture was aborted and its preview discarded.
    Cancelled,
}

/// Translates pointer input into element transforms.
#[derive(Debug, Clone, Default)]
pub struct InteractionEngine {
    surface: SurfaceRect,
    gesture: Gesture,
}

impl InteractionEngine {
    /// Create an engine for a surface.
    #[must_use]
    pub fn new(surface: SurfaceRect) -> Self {
        Self {
            surface,
            gesture: Gesture::Idle,
        }
    }

    /// The current surface bounds.
    #[must_use]
    pub fn surface(&self) -> SurfaceRect {
        self.surface
    }

    /// Update the surface bounds (e.g., after a resize).
    pub fn set_surface(&mut self, surface: SurfaceRect) {
        self.surface = surface;
    }

    /// The active gesture.
    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Whether a gesture is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    /// The in-progress preview of the grabbed element.
    #[must_use]
    pub fn preview(&self) -> Option<&CanvasElement> {
        self.gesture.grab().map(|grab| &grab.preview)
    }

    /// The committed scene with any in-progress preview applied.
    #[must_use]
    pub fn view(&self, committed: &Scene) -> Scene {
        let Some(grab) = self.gesture.grab() else {
            return committed.clone();
        };
        let patch = ElementPatch::diff(&grab.original, &grab.preview);
        committed
            .with_patch(grab.preview.id, &patch)
            .unwrap_or_else(|| committed.clone())
    }

    /// Feed one pointer event.
    pub fn handle(&mut self, composition: &mut Composition, event: PointerEvent) -> PointerOutcome {
        match event.phase {
            PointerPhase::Down => self.pointer_down(composition, event),
            PointerPhase::Move => self.pointer_move(event),
            PointerPhase::Up => self.pointer_up(composition, event),
            PointerPhase::Cancel => self.pointer_cancel(event),
        }
    }

    /// Start a gesture, or clear the selection over empty canvas.
    pub fn pointer_down(&mut self, composition: &mut Composition, event: PointerEvent) -> PointerOutcome {
        if self.is_active() || event.button != PointerButton::Primary {
            return PointerOutcome::Ignored;
        }
        let Some(point) = self.surface.to_canvas(event.position()) else {
            return PointerOutcome::Ignored;
        };

        let Some(hit) = hit_test(composition.scene(), composition.selected(), point) else {
            composition.select(None);
            return PointerOutcome::Deselected;
        };
        let Some(element) = composition.scene().get(hit.element).cloned() else {
            return PointerOutcome::Ignored;
        };
        composition.select(Some(element.id));

        let center = element.center();
        let grab = Grab {
            pointer_id: event.pointer_id,
            original: element.clone(),
            preview: element.clone(),
        };
        self.gesture = match hit.part {
            HitPart::Body => Gesture::Move {
                grab,
                start_pointer: point,
                start_position: center,
            },
            HitPart::RotateHandle => Gesture::Rotate {
                grab,
                center,
                start_angle: center.angle_to(point),
                start_rotation: element.rotation,
            },
            HitPart::ScaleHandle => Gesture::Scale {
                grab,
                center,
                start_distance: center.distance_to(point),
                start_scale: element.scale,
            },
        };
        tracing::debug!(
            gesture = self.gesture.kind(),
            pointer = event.pointer_id,
            element = %element.id,
            "gesture started"
        );
        PointerOutcome::Started {
            element: element.id,
            part: hit.part,
        }
    }

    /// Advance the active gesture's preview.
    pub fn pointer_move(&mut self, event: PointerEvent) -> PointerOutcome {
        if !self.owns(event.pointer_id) {
            return PointerOutcome::Ignored;
        }
        let Some(point) = self.surface.to_canvas(event.position()) else {
            return PointerOutcome::Ignored;
        };

        match &mut self.gesture {
            Gesture::Idle => return PointerOutcome::Ignored,
            Gesture::Move {
                grab,
                start_pointer,
                start_position,
            } => {
                grab.preview.x = start_position.x + (point.x - start_pointer.x);
                grab.preview.y = start_position.y + (point.y - start_pointer.y);
            }
            Gesture::Rotate {
                grab,
                center,
                start_angle,
                start_rotation,
            } => {
                let angle = center.angle_to(point);
                grab.preview.rotation = *start_rotation + (angle - *start_angle);
            }
            Gesture::Scale {
                grab,
                center,
                start_distance,
                start_scale,
            } => {
                if *start_distance < MIN_ANCHOR_DISTANCE {
                    return PointerOutcome::Ignored;
                }
                let scale = center.distance_to(point) / *start_distance * *start_scale;
                // Degenerate scales keep the last valid preview.
                if is_valid_scale(scale) {
                    grab.preview.scale = scale;
                }
            }
        }
        PointerOutcome::Previewed
    }

    /// End the gesture and commit its change.
    pub fn pointer_up(&mut self, composition: &mut Composition, event: PointerEvent) -> PointerOutcome {
        if !self.owns(event.pointer_id) {
            return PointerOutcome::Ignored;
        }
        // The release position counts as a final move.
        self.pointer_move(event);

        let gesture = std::mem::take(&mut self.gesture);
        let kind = gesture.kind();
        let Some(grab) = gesture.grab() else {
            return PointerOutcome::Ignored;
        };
        let patch = ElementPatch::diff(&grab.original, &grab.preview);
        if patch.is_empty() || !composition.update_element(grab.original.id, &patch) {
            tracing::debug!(gesture = kind, "gesture ended without change");
            return PointerOutcome::Unchanged;
        }
        tracing::debug!(gesture = kind, element = %grab.original.id, "gesture committed");
        PointerOutcome::Committed
    }

    /// Abort the gesture, discarding its preview.
    pub fn pointer_cancel(&mut self, event: PointerEvent) -> PointerOutcome {
        if !self.owns(event.pointer_id) {
            return PointerOutcome::Ignored;
        }
        tracing::debug!(gesture = self.gesture.kind(), "gesture cancelled");
        self.gesture = Gesture::Idle;
        PointerOutcome::Cancelled
    }

    /// Drop any active gesture without committing.
    pub fn reset(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// Add a glyph dropped at a screen point.
    ///
    /// Returns `None` if the surface cannot map the point.
    pub fn drop_glyph(
        &self,
        composition: &mut Composition,
        glyph: GlyphId,
        screen: Point,
        style: ElementStyle,
    ) -> Option<ElementId> {
        let point = self.surface.to_canvas(screen)?;
        Some(composition.add_element(glyph, point, style))
    }

    /// Add a glyph activated without a position (tap or keyboard).
    ///
    /// Successive glyphs fan out on rings of six around the canvas centre.
    pub fn activate_glyph(
        &self,
        composition: &mut Composition,
        glyph: GlyphId,
        style: ElementStyle,
    ) -> ElementId {
        let point = tap_position(composition.scene().len());
        composition.add_element(glyph, point, style)
    }

    fn owns(&self, pointer_id: u32) -> bool {
        self.gesture
            .grab()
            .is_some_and(|grab| grab.pointer_id == pointer_id)
    }
}

/// Placement of the `count`-th tapped glyph.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn tap_position(count: usize) -> Point {
    let ring = (count / TAP_RING_SLOTS) as f64;
    let slot = (count % TAP_RING_SLOTS) as f64;
    let angle = slot * PI / 3.0;
    let radius = ring * TAP_SPREAD + TAP_SPREAD;
    let clamp = |v: f64| v.clamp(TAP_MARGIN, CANVAS_SIZE - TAP_MARGIN);
    Point::new(
        clamp(CANVAS_CENTER + angle.cos() * radius),
        clamp(CANVAS_CENTER + angle.sin() * radius),
    )
}
