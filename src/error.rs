//! Error types for the edgequake-doclabel library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`LabelError`] — **Fatal**: the labeling session cannot proceed
//!   (degenerate page dimensions, malformed field schema, unreadable input,
//!   PDF that will not render). Returned as `Err(LabelError)` from geometry,
//!   schema loading, rendering and persistence.
//!
//! * [`EditError`] — **Recoverable**: a single edit command could not be
//!   applied (unknown field, row edit on a non-table label). The editor state
//!   is left untouched and the session carries on, so an adapter can report
//!   the problem for that one action and keep going.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-doclabel library.
///
/// Edit-level failures use [`EditError`] and never abort a session.
#[derive(Debug, Error)]
pub enum LabelError {
    // ── Geometry errors ───────────────────────────────────────────────────
    /// A page or analysis dimension was zero while scaling or normalising.
    #[error("Division by zero: {context}")]
    DivisionByZero { context: String },

    // ── Schema errors ─────────────────────────────────────────────────────
    /// The field schema document is malformed.
    #[error("Invalid field schema: {0}")]
    SchemaParse(String),

    // ── Canonicalisation errors ───────────────────────────────────────────
    /// Strict canonicalisation met a tree shape it has no rule for.
    #[error("Unsupported shape at '{path}': {detail}")]
    UnsupportedShape { path: String, detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file was read but does not hold the expected JSON document.
    #[error("Invalid JSON in '{path}': {detail}")]
    InvalidJson { path: PathBuf, detail: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The pdfium shared library could not be loaded.
    #[error("Cannot load pdfium from {location}: {reason}\nSet PDFIUM_LIB_PATH to an existing libpdfium.")]
    PdfiumUnavailable { location: String, reason: String },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// A page number does not exist in the document or session.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// An edit referenced a label that does not exist on the page.
    #[error("No label #{index} on page {page}")]
    UnknownLabel { page: usize, index: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LabelError {
    pub(crate) fn division_by_zero(context: impl Into<String>) -> Self {
        LabelError::DivisionByZero {
            context: context.into(),
        }
    }
}

/// A recoverable error for a single edit command.
///
/// The label keeps its previous state when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum EditError {
    /// The field key is not declared in the field schema.
    #[error("Field '{field}' is not declared in the field schema")]
    NotFound { field: String },

    /// The command is not valid in the editor's current state.
    #[error("'{command}' is not allowed while the label is in the {state} state")]
    InvalidState { command: String, state: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_by_zero_display() {
        let e = LabelError::division_by_zero("page 2 has zero width");
        assert!(e.to_string().contains("page 2 has zero width"), "got: {e}");
    }

    #[test]
    fn unknown_label_display() {
        let e = LabelError::UnknownLabel { page: 3, index: 7 };
        let msg = e.to_string();
        assert!(msg.contains("#7"));
        assert!(msg.contains("page 3"));
    }

    #[test]
    fn invalid_state_display() {
        let e = EditError::InvalidState {
            command: "SetRowNumber".into(),
            state: "Simple".into(),
        };
        assert!(e.to_string().contains("SetRowNumber"));
        assert!(e.to_string().contains("Simple"));
    }

    #[test]
    fn edit_error_serialises_for_adapters() {
        let e = EditError::NotFound {
            field: "Total".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("NotFound"));
        assert!(json.contains("Total"));
    }
}
