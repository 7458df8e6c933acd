//! # Text Lab Renderer
//!
//! Turns a [`textlab_core::Scene`] into the composition surface document.
//!
//! ## Output
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              SceneExporter                  │
//! ├──────────────────────┬──────────────────────┤
//! │ SVG                  │ PDF                  │
//! │ grid, glyphs,        │ reserved             │
//! │ attribution          │ (Unsupported)        │
//! └──────────────────────┴──────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;

pub use error::{RenderError, RenderResult};
pub use export::{escape_xml, ExportConfig, ExportFormat, SceneExporter};

/// Renderer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
