//! Property-based invariant tests for the composition.
//!
//! 1. z-indices stay a dense permutation of `0..N` after any operation mix
//! 2. Element ids are unique within every reachable scene
//! 3. No committed scale is ever at or below the degeneracy threshold
//! 4. Undo then redo returns to the same scene

use proptest::prelude::*;
use textlab_core::{
    Composition, ElementPatch, ElementStyle, GlyphId, InteractionEngine, Point, PointerEvent,
    SurfaceRect, MIN_SCALE,
};

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Add(usize, f64, f64),
    SelectNth(usize),
    Delete,
    Duplicate,
    Forward(usize),
    Backward(usize),
    Clear,
    Undo,
    Redo,
    Scale(usize, f64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..28, 0.0f64..300.0, 0.0f64..300.0).prop_map(|(g, x, y)| Op::Add(g, x, y)),
        2 => (0usize..16).prop_map(Op::SelectNth),
        1 => Just(Op::Delete),
        1 => Just(Op::Duplicate),
        2 => (0usize..16).prop_map(Op::Forward),
        2 => (0usize..16).prop_map(Op::Backward),
        1 => Just(Op::Clear),
        1 => Just(Op::Undo),
        1 => Just(Op::Redo),
        1 => (0usize..16, -2.0f64..3.0).prop_map(|(n, s)| Op::Scale(n, s)),
    ]
}

fn nth_id(c: &Composition, n: usize) -> Option<textlab_core::ElementId> {
    let elements = c.scene().elements();
    if elements.is_empty() {
        None
    } else {
        Some(elements[n % elements.len()].id)
    }
}

fn apply(c: &mut Composition, op: &Op) {
    match op {
        Op::Add(g, x, y) => {
            c.add_element(GlyphId::ALL[*g], Point::new(*x, *y), ElementStyle::default());
        }
        Op::SelectNth(n) => {
            c.select(nth_id(c, *n));
        }
        Op::Delete => {
            c.delete_selected();
        }
        Op::Duplicate => {
            c.duplicate_selected();
        }
        Op::Forward(n) => {
            if let Some(id) = nth_id(c, *n) {
                c.bring_forward(id);
            }
        }
        Op::Backward(n) => {
            if let Some(id) = nth_id(c, *n) {
                c.send_backward(id);
            }
        }
        Op::Clear => {
            c.clear_canvas();
        }
        Op::Undo => {
            c.undo();
        }
        Op::Redo => {
            c.redo();
        }
        Op::Scale(n, s) => {
            if let Some(id) = nth_id(c, *n) {
                c.update_element(id, &ElementPatch::scale(*s));
            }
        }
    }
}

proptest! {
    #[test]
    fn prop_z_order_stays_dense(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut c = Composition::new();
        for op in &ops {
            apply(&mut c, op);
            prop_assert!(
                c.scene().has_dense_z_order(),
                "z-order not dense after {:?}: {:?}",
                op,
                c.scene().elements().iter().map(|e| e.z_index).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn prop_ids_unique_and_scales_valid(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut c = Composition::new();
        for op in &ops {
            apply(&mut c, op);
            let mut ids: Vec<_> = c.scene().elements().iter().map(|e| e.id).collect();
            let len = ids.len();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), len);
            for element in c.scene().elements() {
                prop_assert!(element.scale > MIN_SCALE);
            }
        }
    }

    #[test]
    fn prop_undo_redo_roundtrip(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut c = Composition::new();
        for op in &ops {
            apply(&mut c, op);
        }
        let current = c.scene().clone();
        if c.undo() {
            prop_assert!(c.redo());
            prop_assert_eq!(c.scene(), &current);
        }
    }

    #[test]
    fn prop_scale_gesture_never_degenerates(
        path in prop::collection::vec((0.0f64..300.0, 0.0f64..300.0), 1..30)
    ) {
        let mut c = Composition::new();
        let id = c.add_element(GlyphId::Kou, Point::new(150.0, 150.0), ElementStyle::default());
        let mut engine = InteractionEngine::new(SurfaceRect::default());

        // Grab the scale handle of the selected element.
        engine.handle(&mut c, PointerEvent::down(1, 174.0, 174.0));
        for (x, y) in &path {
            engine.handle(&mut c, PointerEvent::moved(1, *x, *y));
            if let Some(preview) = engine.preview() {
                prop_assert!(preview.scale > MIN_SCALE);
            }
        }
        let (x, y) = path[path.len() - 1];
        engine.handle(&mut c, PointerEvent::up(1, x, y));

        let scale = c.scene().get(id).map(|e| e.scale).unwrap_or_default();
        prop_assert!(scale > MIN_SCALE);
    }
}
