//! # Text Lab Core
//!
//! Core logic for the Text Lab typographic composition canvas.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               textlab-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Model           │  Input                   │
//! │  - Glyph table   │  - Pointer events        │
//! │  - Elements      │  - Hit-testing           │
//! │  - Scenes        │  - Gesture engine        │
//! ├─────────────────────────────────────────────┤
//! │  History         │  AI drafts               │
//! │  - Snapshots     │  - Payload validation    │
//! │  - Composition   │  - Draft flow            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The history is the only writer of committed scenes. Composition
//! operations, the gesture engine and the draft flow each build a complete
//! next scene and commit it once.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod composition;
pub mod element;
pub mod error;
pub mod event;
pub mod glyph;
pub mod history;
pub mod hit;
pub mod interaction;
pub mod proposal;
pub mod scene;
pub mod store;

pub use composition::Composition;
pub use element::{
    clamp_font_weight, is_valid_scale, CanvasElement, ElementId, ElementPatch, ElementStyle,
    Point, CANVAS_SIZE, DEFAULT_FONT_WEIGHT, DUPLICATE_OFFSET, GLYPH_BOX, MAX_FONT_WEIGHT,
    MIN_FONT_WEIGHT, MIN_SCALE,
};
pub use error::{LabError, LabResult};
pub use event::{PointerButton, PointerEvent, PointerPhase};
pub use glyph::{lookup_name, GlyphId, PLACEHOLDER_CHAR};
pub use history::History;
pub use hit::{hit_test, Hit, HitPart};
pub use interaction::{Gesture, InteractionEngine, PointerOutcome, SurfaceRect};
pub use proposal::{
    parse_proposals, AiLayout, CandidateError, DraftFlow, DraftState, DraftTicket, ElementSpec,
    ProposalBatch, RejectedCandidate,
};
pub use scene::{Scene, ZStep};
pub use store::{LabSession, SessionSnapshot, SessionStore, DEFAULT_SESSION};

/// Text Lab core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
