//! Hit-testing against the composition surface geometry.
//!
//! Handles are drawn at the corners of the selected element's glyph box and
//! keep a constant on-canvas size regardless of the element's scale.

use serde::{Deserialize, Serialize};

use crate::{CanvasElement, ElementId, Point, Scene, GLYPH_BOX};

/// Radius of the rotate handle in canvas units.
pub const ROTATE_HANDLE_RADIUS: f64 = 6.0;

/// Side of the square scale handle in canvas units.
pub const SCALE_HANDLE_SIZE: f64 = 10.0;

/// The part of an element under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitPart {
    /// The glyph box itself.
    Body,
    /// The circular handle at the top-right corner.
    RotateHandle,
    /// The square handle at the bottom-right corner.
    ScaleHandle,
}

/// Result of a successful hit-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Element that was hit.
    pub element: ElementId,
    /// Which part of it.
    pub part: HitPart,
}

/// Local-frame position of the rotate handle.
#[must_use]
pub fn rotate_handle_anchor() -> Point {
    Point::new(GLYPH_BOX / 2.0, -GLYPH_BOX / 2.0)
}

/// Local-frame position of the scale handle.
#[must_use]
pub fn scale_handle_anchor() -> Point {
    Point::new(GLYPH_BOX / 2.0, GLYPH_BOX / 2.0)
}

/// Test the handles of one element.
#[must_use]
pub fn handle_at(element: &CanvasElement, point: Point) -> Option<HitPart> {
    let local = element.to_local(point);

    if local.distance_to(rotate_handle_anchor()) <= ROTATE_HANDLE_RADIUS / element.scale {
        return Some(HitPart::RotateHandle);
    }

    let anchor = scale_handle_anchor();
    let half = SCALE_HANDLE_SIZE / 2.0 / element.scale;
    if (local.x - anchor.x).abs() <= half && (local.y - anchor.y).abs() <= half {
        return Some(HitPart::ScaleHandle);
    }

    None
}

/// Find what lies under `point`.
///
/// The selected element's handles win over any body; bodies are tested
/// top-most first.
#[must_use]
pub fn hit_test(scene: &Scene, selected: Option<ElementId>, point: Point) -> Option<Hit> {
    if let Some(element) = selected.and_then(|id| scene.get(id)) {
        if let Some(part) = handle_at(element, point) {
            return Some(Hit {
                element: element.id,
                part,
            });
        }
    }

    scene.element_at(point).map(|element| Hit {
        element,
        part: HitPart::Body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ElementStyle, GlyphId};

    fn scene_with(elements: Vec<CanvasElement>) -> Scene {
        Scene::from_elements(elements)
    }

    #[test]
    fn test_body_hit() {
        let el = CanvasElement::new(GlyphId::Ren, Point::new(150.0, 150.0), ElementStyle::default(), 0);
        let id = el.id;
        let scene = scene_with(vec![el]);

        let hit = hit_test(&scene, None, Point::new(150.0, 150.0)).expect("hit");
        assert_eq!(hit.element, id);
        assert_eq!(hit.part, HitPart::Body);
        assert!(hit_test(&scene, None, Point::new(20.0, 20.0)).is_none());
    }

    #[test]
    fn test_handles_only_for_selected_element() {
        let el = CanvasElement::new(GlyphId::Ren, Point::new(150.0, 150.0), ElementStyle::default(), 0);
        let id = el.id;
        let scene = scene_with(vec![el]);
        let rotate_point = Point::new(174.0, 126.0);

        let unselected = hit_test(&scene, None, rotate_point).expect("corner is still body");
        assert_eq!(unselected.part, HitPart::Body);

        let selected = hit_test(&scene, Some(id), rotate_point).expect("hit");
        assert_eq!(selected.part, HitPart::RotateHandle);

        let scale = hit_test(&scene, Some(id), Point::new(176.0, 176.0)).expect("hit");
        assert_eq!(scale.part, HitPart::ScaleHandle);
    }

    #[test]
    fn test_handle_outside_body_still_hits() {
        let el = CanvasElement::new(GlyphId::Mu, Point::new(150.0, 150.0), ElementStyle::default(), 0);
        let id = el.id;
        let scene = scene_with(vec![el]);
        // 4 units beyond the corner, inside the 6-unit rotate radius.
        let hit = hit_test(&scene, Some(id), Point::new(177.0, 123.0)).expect("hit");
        assert_eq!(hit.part, HitPart::RotateHandle);
    }

    #[test]
    fn test_handles_follow_rotation_and_scale() {
        let el = CanvasElement::new(GlyphId::Tu, Point::new(150.0, 150.0), ElementStyle::default(), 0)
            .with_transform(2.0, 90.0);
        // Rotating by 90 degrees moves the local (24, -24) corner to (+24, +24)
        // in canvas offsets, scaled by 2.
        let corner = el.to_canvas(rotate_handle_anchor());
        assert!((corner.x - 198.0).abs() < 1e-9);
        assert!((corner.y - 198.0).abs() < 1e-9);
        assert_eq!(handle_at(&el, corner), Some(HitPart::RotateHandle));
        // Constant on-canvas radius: 5 units away still hits, 7 does not.
        assert_eq!(
            handle_at(&el, Point::new(corner.x + 5.0, corner.y)),
            Some(HitPart::RotateHandle)
        );
        assert_eq!(handle_at(&el, Point::new(corner.x + 7.0, corner.y)), None);
    }

    #[test]
    fn test_selected_handle_beats_higher_body() {
        let low = CanvasElement::new(GlyphId::Kou, Point::new(150.0, 150.0), ElementStyle::default(), 0);
        let high = CanvasElement::new(GlyphId::Ri, Point::new(190.0, 180.0), ElementStyle::default(), 1);
        let low_id = low.id;
        let scene = scene_with(vec![low, high]);

        let hit = hit_test(&scene, Some(low_id), Point::new(174.0, 174.0)).expect("hit");
        assert_eq!(hit.element, low_id);
        assert_eq!(hit.part, HitPart::ScaleHandle);
    }
}
