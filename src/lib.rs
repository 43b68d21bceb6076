//! # edgequake-doclabel
//!
//! Turn rendered document pages and a document-analysis result into labeled
//! training data for a template extraction model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF ──render──▶ pages (JPEG + pixel size)
//!                   │
//! analysis tree ────┼─▶ regions   one rectangle per field per page
//!                   │
//! fields.json ──────┴─▶ session   one LabelEditor per region, driven by
//!                                 EditCommands (SelectField, SetRowNumber, …)
//!                         │
//!                         ├─▶ <doc>.labels.json   sorted labels, normalised boxes
//!                         └─▶ <doc>.ocr.json      canonicalised analysis tree
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doclabel::{
//!     render_pages, write_training_set, AnalysisResult, EditCommand, FieldSchema,
//!     LabelingConfig, Region, Session,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LabelingConfig::default();
//!     let pages = render_pages(Path::new("invoice.pdf"), &config).await?;
//!     let schema = Arc::new(FieldSchema::from_json_str(&std::fs::read_to_string("fields.json")?)?);
//!
//!     let mut session = Session::new(schema, pages);
//!     session.prepopulate(&AnalysisResult::from_file(Path::new("analysis.json"))?)?;
//!
//!     let id = session.draw_region(1, Region::new(120.0, 80.0, 410.0, 115.0))?;
//!     session.apply(id, EditCommand::SelectField("Vendor".into()))??;
//!     session.apply(id, EditCommand::SetContent("Contoso Ltd.".into()))??;
//!
//!     let labels = session.label_document("invoice.pdf")?;
//!     write_training_set(Path::new("training"), "invoice.pdf", &labels, None).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doclabel` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-doclabel = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analysis;
pub mod canonical;
pub mod config;
pub mod editor;
pub mod error;
pub mod formatter;
pub mod geometry;
pub mod persist;
pub mod progress;
pub mod regions;
pub mod render;
pub mod schema;
pub mod script;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analysis::{AnalysisResult, FieldMap, FieldNode, FieldValue};
pub use canonical::{canonicalize, canonicalize_with, to_camel_case, ShapePolicy};
pub use config::{LabelingConfig, LabelingConfigBuilder, PageSelection};
pub use editor::{EditCommand, EditorState, Label, LabelEditor, LabelType};
pub use error::{EditError, LabelError};
pub use formatter::{format_labels, format_ocr, LabelDocument, LabelRecord, LabelValue, OcrDocument};
pub use geometry::{
    normalize, polygon_to_region, scale_factor, NormalizedRegion, Page, PageContext, PageSize,
    Point, Polygon, Region, ScaleFactor,
};
pub use persist::{read_json, write_json, write_training_set};
pub use progress::{NoopProgressCallback, ProgressCallback, RenderProgressCallback};
pub use regions::{extract_page_regions, extract_regions, LabeledRegion};
pub use render::{read_page_list, render_pages};
pub use schema::{FieldDescriptor, FieldSchema, FieldType};
pub use script::{EditScript, ScriptReport};
pub use session::{LabelId, Session};
