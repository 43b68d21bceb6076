//! Output documents: the labels file and the canonical OCR file.
//!
//! Both are plain serde structs; nothing here touches the file system (see
//! [`crate::persist`] for that).

use crate::canonical::{canonicalize_with, ShapePolicy};
use crate::editor::LabelType;
use crate::error::LabelError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `$schema` marker of the labels file.
pub const LABELS_SCHEMA_URI: &str =
    "https://schema.cognitiveservices.azure.com/formrecognizer/2021-03-01/labels.json";

/// Timestamp format of the OCR envelope.
const OCR_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One page reference of a label: text plus one box of 8 normalised numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelValue {
    pub page: usize,
    pub text: String,
    pub bounding_boxes: Vec<Vec<f64>>,
}

/// A label as written to the labels file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelRecord {
    pub label: String,
    pub value: Vec<LabelValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_type: Option<LabelType>,
}

/// The labels file for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDocument {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub document: String,
    pub labels: Vec<LabelRecord>,
}

/// Sort labels by label string and wrap them into a labels file.
///
/// The sort is stable: labels sharing a label string keep their relative
/// order.
pub fn format_labels(labels: Vec<LabelRecord>, document_name: impl Into<String>) -> LabelDocument {
    format_labels_with_schema(labels, document_name, LABELS_SCHEMA_URI)
}

/// [`format_labels`] with an explicit `$schema` marker.
pub fn format_labels_with_schema(
    mut labels: Vec<LabelRecord>,
    document_name: impl Into<String>,
    schema_uri: impl Into<String>,
) -> LabelDocument {
    labels.sort_by(|a, b| a.label.cmp(&b.label));
    LabelDocument {
        schema: schema_uri.into(),
        document: document_name.into(),
        labels,
    }
}

/// The canonical analysis document persisted next to the labels file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrDocument {
    pub status: String,
    pub created_date_time: String,
    pub last_updated_date_time: String,
    pub analyze_result: Value,
}

/// Canonicalise a raw analysis result and wrap it as a succeeded operation
/// stamped with `now`.
///
/// A raw value that is already an `{"analyzeResult": ..}` envelope is
/// unwrapped first.
///
/// # Errors
/// [`LabelError::UnsupportedShape`] under [`ShapePolicy::Strict`] only.
pub fn format_ocr(
    raw_analysis: &Value,
    now: DateTime<Utc>,
    policy: ShapePolicy,
) -> Result<OcrDocument, LabelError> {
    let raw_analysis = raw_analysis.get("analyzeResult").unwrap_or(raw_analysis);
    let stamp = now.format(OCR_TIMESTAMP_FORMAT).to_string();
    Ok(OcrDocument {
        status: "succeeded".to_string(),
        created_date_time: stamp.clone(),
        last_updated_date_time: stamp,
        analyze_result: canonicalize_with(raw_analysis, policy)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(label: &str, text: &str) -> LabelRecord {
        LabelRecord {
            label: label.to_string(),
            value: vec![LabelValue {
                page: 1,
                text: text.to_string(),
                bounding_boxes: vec![vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]],
            }],
            label_type: None,
        }
    }

    #[test]
    fn labels_sorted_by_label_string() {
        let doc = format_labels(vec![record("b", ""), record("a", ""), record("c", "")], "invoice.pdf");
        let order: Vec<&str> = doc.labels.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
        assert_eq!(doc.document, "invoice.pdf");
        assert_eq!(doc.schema, LABELS_SCHEMA_URI);
    }

    #[test]
    fn equal_labels_keep_insertion_order() {
        let doc = format_labels(
            vec![record("x", "first"), record("a", ""), record("x", "second")],
            "d.pdf",
        );
        let texts: Vec<&str> = doc.labels.iter().map(|l| l.value[0].text.as_str()).collect();
        assert_eq!(texts, ["", "first", "second"]);
    }

    #[test]
    fn labels_document_wire_shape() {
        let mut signature = record("Approval", "");
        signature.label_type = Some(LabelType::Region);
        let doc = format_labels(vec![record("Vendor", "Contoso"), signature], "inv.pdf");
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["$schema"], LABELS_SCHEMA_URI);
        assert_eq!(json["document"], "inv.pdf");
        assert_eq!(json["labels"][0]["label"], "Approval");
        assert_eq!(json["labels"][0]["labelType"], "region");
        assert_eq!(json["labels"][1]["value"][0]["text"], "Contoso");
        assert_eq!(json["labels"][1]["value"][0]["boundingBoxes"][0].as_array().unwrap().len(), 8);
        assert!(json["labels"][1].get("labelType").is_none());
    }

    #[test]
    fn ocr_envelope() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let doc = format_ocr(
            &json!({"api_version": "2023-07-31", "pages": [{"page_number": 1}]}),
            now,
            ShapePolicy::Lenient,
        )
        .unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["createdDateTime"], "2024-03-09T14:05:07Z");
        assert_eq!(json["lastUpdatedDateTime"], "2024-03-09T14:05:07Z");
        assert_eq!(json["analyzeResult"]["apiVersion"], "2023-07-31");
        assert_eq!(json["analyzeResult"]["pages"][0]["pageNumber"], 1);
    }

    #[test]
    fn ocr_envelope_is_not_nested_twice() {
        let doc = format_ocr(
            &json!({"status": "succeeded", "analyzeResult": {"model_id": "prebuilt-layout"}}),
            Utc::now(),
            ShapePolicy::Lenient,
        )
        .unwrap();
        assert_eq!(doc.analyze_result, json!({"modelId": "prebuilt-layout"}));
    }

    #[test]
    fn ocr_strict_propagates_unsupported_shape() {
        let err = format_ocr(&json!({"mixed": [{}, 1]}), Utc::now(), ShapePolicy::Strict).unwrap_err();
        assert!(matches!(err, LabelError::UnsupportedShape { .. }));
    }
}
