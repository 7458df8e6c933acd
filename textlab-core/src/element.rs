//! Canvas elements - placed glyph instances.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::GlyphId;

/// Side length of the square logical canvas, in canvas units.
pub const CANVAS_SIZE: f64 = 300.0;

/// Side length of a glyph's box at scale 1.0, in canvas units.
pub const GLYPH_BOX: f64 = 48.0;

/// Scales at or below this value are rejected.
pub const MIN_SCALE: f64 = 0.1;

/// Font weight used when none is given.
pub const DEFAULT_FONT_WEIGHT: u16 = 900;

/// Lightest accepted font weight.
pub const MIN_FONT_WEIGHT: u16 = 100;

/// Heaviest accepted font weight.
pub const MAX_FONT_WEIGHT: u16 = 900;

/// Offset applied to both axes when duplicating an element.
pub const DUPLICATE_OFFSET: f64 = 10.0;

/// Unique identifier for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an element ID from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in canvas (or screen) space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Angle in degrees of the vector from `self` to `other`.
    #[must_use]
    pub fn angle_to(self, other: Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x).to_degrees()
    }
}

/// Visual style chosen when an element is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementStyle {
    /// Font weight, 100-900.
    pub font_weight: u16,
    /// Horizontal flip about the element's own center.
    pub is_mirror: bool,
    /// Stroke-only rendering.
    pub is_outline: bool,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            font_weight: DEFAULT_FONT_WEIGHT,
            is_mirror: false,
            is_outline: false,
        }
    }
}

/// Clamp a font weight into the accepted range.
#[must_use]
pub fn clamp_font_weight(weight: u16) -> u16 {
    weight.clamp(MIN_FONT_WEIGHT, MAX_FONT_WEIGHT)
}

/// Whether a scale value keeps an element non-degenerate.
#[must_use]
pub fn is_valid_scale(scale: f64) -> bool {
    scale.is_finite() && scale > MIN_SCALE
}

/// One placed glyph on the composition surface.
///
/// Elements are value objects: once committed to history they are never
/// mutated, every change produces a new copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasElement {
    /// Unique identifier, stable for the element's lifetime.
    pub id: ElementId,
    /// Glyph drawn by this element.
    pub glyph: GlyphId,
    /// Display character resolved from the registry at creation time.
    #[serde(rename = "char")]
    pub character: String,
    /// Center x in canvas units.
    pub x: f64,
    /// Center y in canvas units.
    pub y: f64,
    /// Uniform scale, 1.0 is nominal size.
    pub scale: f64,
    /// Rotation in degrees (not normalized).
    pub rotation: f64,
    /// Stacking order; lower paints first.
    pub z_index: usize,
    /// Font weight, 100-900.
    pub font_weight: u16,
    /// Horizontal flip about the element's own center.
    pub is_mirror: bool,
    /// Stroke-only rendering.
    pub is_outline: bool,
}

impl CanvasElement {
    /// Create a new element with a fresh id at the given center.
    #[must_use]
    pub fn new(glyph: GlyphId, position: Point, style: ElementStyle, z_index: usize) -> Self {
        Self {
            id: ElementId::new(),
            glyph,
            character: glyph.display_char().to_string(),
            x: position.x,
            y: position.y,
            scale: 1.0,
            rotation: 0.0,
            z_index,
            font_weight: clamp_font_weight(style.font_weight),
            is_mirror: style.is_mirror,
            is_outline: style.is_outline,
        }
    }

    /// Set scale and rotation.
    #[must_use]
    pub fn with_transform(mut self, scale: f64, rotation: f64) -> Self {
        if is_valid_scale(scale) {
            self.scale = scale;
        }
        if rotation.is_finite() {
            self.rotation = rotation;
        }
        self
    }

    /// The element's center.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// A copy with a fresh id, offset by [`DUPLICATE_OFFSET`] on both axes.
    #[must_use]
    pub fn duplicate(&self, z_index: usize) -> Self {
        Self {
            id: ElementId::new(),
            x: self.x + DUPLICATE_OFFSET,
            y: self.y + DUPLICATE_OFFSET,
            z_index,
            ..self.clone()
        }
    }

    /// Return a copy with the patch applied.
    ///
    /// Non-finite coordinates and degenerate scales in the patch are ignored.
    #[must_use]
    pub fn patched(&self, patch: &ElementPatch) -> Self {
        let mut next = self.clone();
        if let Some(x) = patch.x.filter(|v| v.is_finite()) {
            next.x = x;
        }
        if let Some(y) = patch.y.filter(|v| v.is_finite()) {
            next.y = y;
        }
        if let Some(scale) = patch.scale.filter(|s| is_valid_scale(*s)) {
            next.scale = scale;
        }
        if let Some(rotation) = patch.rotation.filter(|r| r.is_finite()) {
            next.rotation = rotation;
        }
        if let Some(weight) = patch.font_weight {
            next.font_weight = clamp_font_weight(weight);
        }
        if let Some(mirror) = patch.is_mirror {
            next.is_mirror = mirror;
        }
        if let Some(outline) = patch.is_outline {
            next.is_outline = outline;
        }
        next
    }

    /// Map a canvas point into this element's unscaled, unrotated frame.
    ///
    /// The origin of the local frame is the element's center.
    #[must_use]
    pub fn to_local(&self, point: Point) -> Point {
        let dx = point.x - self.x;
        let dy = point.y - self.y;
        let (sin, cos) = (-self.rotation.to_radians()).sin_cos();
        Point::new(
            (dx * cos - dy * sin) / self.scale,
            (dx * sin + dy * cos) / self.scale,
        )
    }

    /// Map a point in the element's local frame back to canvas space.
    #[must_use]
    pub fn to_canvas(&self, local: Point) -> Point {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let sx = local.x * self.scale;
        let sy = local.y * self.scale;
        Point::new(self.x + sx * cos - sy * sin, self.y + sx * sin + sy * cos)
    }

    /// Check if a canvas point lies within this element's glyph box.
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        let local = self.to_local(point);
        let half = GLYPH_BOX / 2.0;
        local.x.abs() <= half && local.y.abs() <= half
    }
}

/// Sparse update for an element. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPatch {
    /// New center x.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// New center y.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// New scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// New rotation in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// New font weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u16>,
    /// New mirror flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mirror: Option<bool>,
    /// New outline flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_outline: Option<bool>,
}

impl ElementPatch {
    /// A patch moving the element center.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// A patch setting the rotation.
    #[must_use]
    pub fn rotation(rotation: f64) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::default()
        }
    }

    /// A patch setting the scale.
    #[must_use]
    pub fn scale(scale: f64) -> Self {
        Self {
            scale: Some(scale),
            ..Self::default()
        }
    }

    /// Whether the patch carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The patch turning `from` into `to`, limited to patchable fields.
    #[must_use]
    pub fn diff(from: &CanvasElement, to: &CanvasElement) -> Self {
        #[allow(clippy::float_cmp)]
        fn changed(a: f64, b: f64) -> Option<f64> {
            (a != b).then_some(b)
        }
        Self {
            x: changed(from.x, to.x),
            y: changed(from.y, to.y),
            scale: changed(from.scale, to.scale),
            rotation: changed(from.rotation, to.rotation),
            font_weight: (from.font_weight != to.font_weight).then_some(to.font_weight),
            is_mirror: (from.is_mirror != to.is_mirror).then_some(to.is_mirror),
            is_outline: (from.is_outline != to.is_outline).then_some(to.is_outline),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CanvasElement {
        CanvasElement::new(GlyphId::Shan, Point::new(150.0, 150.0), ElementStyle::default(), 0)
    }

    #[test]
    fn test_new_resolves_char_and_defaults() {
        let el = sample();
        assert_eq!(el.character, "山");
        assert!((el.scale - 1.0).abs() < f64::EPSILON);
        assert!(el.rotation.abs() < f64::EPSILON);
        assert_eq!(el.font_weight, 900);
        assert!(!el.is_mirror);
        assert!(!el.is_outline);
    }

    #[test]
    fn test_font_weight_is_clamped() {
        let style = ElementStyle {
            font_weight: 1200,
            ..ElementStyle::default()
        };
        let el = CanvasElement::new(GlyphId::Kou, Point::default(), style, 0);
        assert_eq!(el.font_weight, 900);

        let lighter = el.patched(&ElementPatch {
            font_weight: Some(20),
            ..ElementPatch::default()
        });
        assert_eq!(lighter.font_weight, 100);
    }

    #[test]
    fn test_patch_changes_only_named_fields() {
        let el = sample();
        let moved = el.patched(&ElementPatch::position(10.0, 20.0));
        assert_eq!(moved.id, el.id);
        assert!((moved.x - 10.0).abs() < f64::EPSILON);
        assert!((moved.y - 20.0).abs() < f64::EPSILON);
        assert!((moved.scale - el.scale).abs() < f64::EPSILON);
        assert_eq!(moved.character, el.character);
    }

    #[test]
    fn test_patch_ignores_degenerate_scale() {
        let el = sample();
        assert!((el.patched(&ElementPatch::scale(0.1)).scale - 1.0).abs() < f64::EPSILON);
        assert!((el.patched(&ElementPatch::scale(-2.0)).scale - 1.0).abs() < f64::EPSILON);
        assert!((el.patched(&ElementPatch::scale(f64::NAN)).scale - 1.0).abs() < f64::EPSILON);
        assert!((el.patched(&ElementPatch::scale(0.5)).scale - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_duplicate_offsets_and_renews_id() {
        let el = sample();
        let copy = el.duplicate(7);
        assert_ne!(copy.id, el.id);
        assert!((copy.x - 160.0).abs() < f64::EPSILON);
        assert!((copy.y - 160.0).abs() < f64::EPSILON);
        assert_eq!(copy.z_index, 7);
        assert_eq!(copy.glyph, el.glyph);
    }

    #[test]
    fn test_local_frame_roundtrip() {
        let el = sample().with_transform(2.0, 30.0);
        let p = Point::new(170.0, 120.0);
        let back = el.to_canvas(el.to_local(p));
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn test_contains_point_respects_rotation_and_scale() {
        let el = sample();
        assert!(el.contains_point(Point::new(170.0, 170.0)));
        assert!(!el.contains_point(Point::new(180.0, 150.0)));

        let big = el.clone().with_transform(2.0, 0.0);
        assert!(big.contains_point(Point::new(190.0, 150.0)));

        let turned = el.with_transform(1.0, 45.0);
        // Corner of the unrotated box falls outside once turned by 45 degrees.
        assert!(!turned.contains_point(Point::new(173.0, 173.0)));
        // Along the axis the rotated box now reaches further.
        assert!(turned.contains_point(Point::new(182.0, 150.0)));
    }

    #[test]
    fn test_diff_lists_changed_fields() {
        let el = sample();
        let next = el.patched(&ElementPatch::rotation(45.0));
        let diff = ElementPatch::diff(&el, &next);
        assert_eq!(diff, ElementPatch::rotation(45.0));
        assert!(ElementPatch::diff(&el, &el).is_empty());
    }

    #[test]
    fn test_serializes_with_camel_case_and_char() {
        let json = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(json["char"], "山");
        assert_eq!(json["glyph"], "shan");
        assert_eq!(json["zIndex"], 0);
        assert_eq!(json["fontWeight"], 900);
        assert_eq!(json["isMirror"], false);
    }
}
