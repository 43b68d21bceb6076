//! Reading inputs and writing the training set to disk.
//!
//! A template-model training container expects, per document:
//!
//! ```text
//! <dir>/invoice.pdf
//! <dir>/invoice.pdf.labels.json
//! <dir>/invoice.pdf.ocr.json
//! ```
//!
//! Writes are atomic (temp file + rename) so a crashed run never leaves a
//! half-written label file that the trainer would reject.

use crate::error::LabelError;
use crate::formatter::{LabelDocument, OcrDocument};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Read and deserialise a JSON file.
///
/// # Errors
/// [`LabelError::FileNotFound`] when the file cannot be opened,
/// [`LabelError::InvalidJson`] when its content does not match `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LabelError> {
    let text = std::fs::read_to_string(path).map_err(|_| LabelError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    serde_json::from_str(&text).map_err(|e| LabelError::InvalidJson {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Serialise `value` as JSON with a 4-space indent.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, LabelError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| LabelError::Internal(format!("JSON serialisation failed: {}", e)))?;
    buf.push(b'\n');
    Ok(buf)
}

/// Write `value` as pretty JSON to `path`, creating parent directories.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), LabelError> {
    let bytes = to_pretty_json(value)?;
    let write_failed = |e| LabelError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Where [`write_training_set`] put its two files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSetPaths {
    pub labels: PathBuf,
    pub ocr: PathBuf,
}

/// Path of the labels file for `document_name` inside `dir`.
pub fn labels_path(dir: &Path, document_name: &str) -> PathBuf {
    dir.join(format!("{}.labels.json", document_name))
}

/// Path of the OCR file for `document_name` inside `dir`.
pub fn ocr_path(dir: &Path, document_name: &str) -> PathBuf {
    dir.join(format!("{}.ocr.json", document_name))
}

/// Write `{document}.labels.json` and, when given, `{document}.ocr.json`
/// into `dir`.
pub async fn write_training_set(
    dir: &Path,
    document_name: &str,
    labels: &LabelDocument,
    ocr: Option<&OcrDocument>,
) -> Result<TrainingSetPaths, LabelError> {
    let paths = TrainingSetPaths {
        labels: labels_path(dir, document_name),
        ocr: ocr_path(dir, document_name),
    };

    write_json(&paths.labels, labels).await?;
    if let Some(ocr) = ocr {
        write_json(&paths.ocr, ocr).await?;
    }

    info!(
        "Training set for '{}': {} labels → {}",
        document_name,
        labels.labels.len(),
        dir.display()
    );
    Ok(paths)
}
