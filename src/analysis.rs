//! Typed view of the externally produced document-analysis tree.
//!
//! The analysis service hands back a deeply nested structure. Two spellings
//! of it exist in the wild and both deserialise into the same types here:
//!
//! | | SDK dictionary | REST / canonical |
//! |---|---|---|
//! | field kind | `value_type: "list"` | `type: "array"` |
//! | rows | `value: [{value_type: "dictionary", value: {..}}]` | `valueArray: [{type: "object", valueObject: {..}}]` |
//! | regions | `bounding_regions` / `page_number` | `boundingRegions` / `pageNumber` |
//! | polygon | `[{x, y}, ..]` | `[x0, y0, x1, y1, ..]` |
//!
//! A field is modelled as a tagged [`FieldValue`] (`Scalar | Mapping |
//! Sequence`) so region extraction matches on the variant instead of probing
//! for keys.

use crate::error::LabelError;
use crate::geometry::{PageSize, Polygon};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Root of an analysis result: page sizes plus analysed documents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub pages: Vec<AnalysisPage>,
    #[serde(default)]
    pub documents: Vec<AnalyzedDocument>,
}

/// Size of one page in analysis-native units.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisPage {
    #[serde(default, alias = "pageNumber")]
    pub page_number: Option<usize>,
    pub width: f64,
    pub height: f64,
    /// `inch` for PDFs, `pixel` for images.
    #[serde(default)]
    pub unit: Option<String>,
}

/// One logical document found by the analysis service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzedDocument {
    #[serde(default, alias = "docType")]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub fields: FieldMap,
}

impl AnalysisResult {
    /// Parse an analysis result from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, LabelError> {
        // Accept both a bare result and the `{"analyzeResult": {..}}` envelope.
        let value = match value {
            Value::Object(mut map) if map.contains_key("analyzeResult") => map
                .remove("analyzeResult")
                .unwrap_or(Value::Object(serde_json::Map::new())),
            other => other,
        };
        serde_json::from_value(value).map_err(|e| LabelError::InvalidJson {
            path: Path::new("<analysis>").to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Read an analysis result from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, LabelError> {
        let value: Value = crate::persist::read_json(path)?;
        Self::from_value(value).map_err(|e| match e {
            LabelError::InvalidJson { detail, .. } => LabelError::InvalidJson {
                path: path.to_path_buf(),
                detail,
            },
            other => other,
        })
    }

    /// Analysis-unit size of a 1-based page.
    ///
    /// Pages are matched on `pageNumber` when the service reports it and on
    /// position otherwise.
    pub fn page_size(&self, page_number: usize) -> Option<PageSize> {
        self.pages
            .iter()
            .find(|p| p.page_number == Some(page_number))
            .or_else(|| {
                page_number
                    .checked_sub(1)
                    .and_then(|idx| self.pages.get(idx))
                    .filter(|p| p.page_number.is_none())
            })
            .map(|p| PageSize::new(p.width, p.height))
    }
}

/// Fields of a document or table row, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    entries: Vec<(String, FieldNode)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, node: FieldNode) {
        self.entries.push((key.into(), node));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&FieldNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, FieldNode)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldNode)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldMapVisitor;

        impl<'de> Visitor<'de> for FieldMapVisitor {
            type Value = FieldMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field keys to analysed fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldMap, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, node)) = access.next_entry::<String, Option<FieldNode>>()? {
                    match node {
                        Some(node) => entries.push((key, node)),
                        None => debug!("Skipping field '{}' with no value", key),
                    }
                }
                Ok(FieldMap { entries })
            }

            fn visit_unit<E: de::Error>(self) -> Result<FieldMap, E> {
                Ok(FieldMap::default())
            }
        }

        deserializer.deserialize_any(FieldMapVisitor)
    }
}

/// A page-scoped polygon attached to an analysed field.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundingRegion {
    #[serde(alias = "pageNumber")]
    pub page_number: usize,
    pub polygon: Polygon,
}

/// Structural kind of an analysed field's value.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Text, number, date, selection mark, signature, …
    Scalar,
    /// An object / dictionary of named sub-fields.
    Mapping(FieldMap),
    /// A list of rows (tables, repeated groups).
    Sequence(Vec<FieldNode>),
}

/// One entry of the analysis field tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawFieldNode")]
pub struct FieldNode {
    /// The service's own type tag, kept verbatim (`"list"`, `"string"`, …).
    pub value_type: String,
    pub content: Option<String>,
    pub bounding_regions: Vec<BoundingRegion>,
    pub value: FieldValue,
}

impl FieldNode {
    pub fn scalar(value_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            value_type: value_type.into(),
            content: Some(content.into()),
            bounding_regions: Vec::new(),
            value: FieldValue::Scalar,
        }
    }

    /// A list node whose rows are the given field maps.
    pub fn list(rows: Vec<FieldMap>) -> Self {
        Self {
            value_type: "list".into(),
            content: None,
            bounding_regions: Vec::new(),
            value: FieldValue::Sequence(
                rows.into_iter()
                    .map(|row| FieldNode {
                        value_type: "dictionary".into(),
                        content: None,
                        bounding_regions: Vec::new(),
                        value: FieldValue::Mapping(row),
                    })
                    .collect(),
            ),
        }
    }

    pub fn with_region(mut self, page_number: usize, polygon: Polygon) -> Self {
        self.bounding_regions.push(BoundingRegion {
            page_number,
            polygon,
        });
        self
    }

    /// Rows of a list node; empty for every other kind.
    pub fn rows(&self) -> &[FieldNode] {
        match &self.value {
            FieldValue::Sequence(rows) => rows,
            _ => &[],
        }
    }

    /// The first bounding region on `page_number`, if any.
    pub fn region_on_page(&self, page_number: usize) -> Option<&BoundingRegion> {
        self.bounding_regions
            .iter()
            .find(|r| r.page_number == page_number)
    }
}

#[derive(Deserialize)]
struct RawFieldNode {
    #[serde(default, alias = "valueType", alias = "type")]
    value_type: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, alias = "boundingRegions")]
    bounding_regions: Option<Vec<BoundingRegion>>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default, alias = "valueArray")]
    value_array: Option<Vec<FieldNode>>,
    #[serde(default, alias = "valueObject")]
    value_object: Option<FieldMap>,
}

impl TryFrom<RawFieldNode> for FieldNode {
    type Error = String;

    fn try_from(raw: RawFieldNode) -> Result<Self, Self::Error> {
        let value_type = raw.value_type.unwrap_or_default();
        let value = match value_type.as_str() {
            "list" | "array" => match (raw.value_array, raw.value) {
                (Some(rows), _) => FieldValue::Sequence(rows),
                (None, Some(v)) if !v.is_null() => FieldValue::Sequence(
                    serde_json::from_value(v).map_err(|e| format!("list rows: {e}"))?,
                ),
                _ => FieldValue::Sequence(Vec::new()),
            },
            "dictionary" | "object" => match (raw.value_object, raw.value) {
                (Some(map), _) => FieldValue::Mapping(map),
                (None, Some(v)) if !v.is_null() => FieldValue::Mapping(
                    serde_json::from_value(v).map_err(|e| format!("object fields: {e}"))?,
                ),
                _ => FieldValue::Mapping(FieldMap::default()),
            },
            _ => FieldValue::Scalar,
        };

        Ok(FieldNode {
            value_type,
            content: raw.content,
            bounding_regions: raw.bounding_regions.unwrap_or_default(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sdk_dictionary_shape() {
        let result = AnalysisResult::from_value(json!({
            "pages": [{"page_number": 1, "width": 8.5, "height": 11.0, "unit": "inch"}],
            "documents": [{
                "doc_type": "invoice",
                "fields": {
                    "Vendor": {
                        "value_type": "string",
                        "value": "Contoso",
                        "content": "Contoso",
                        "bounding_regions": [{
                            "page_number": 1,
                            "polygon": [{"x":1,"y":1},{"x":2,"y":1},{"x":2,"y":1.5},{"x":1,"y":1.5}]
                        }]
                    },
                    "Items": {
                        "value_type": "list",
                        "value": [{
                            "value_type": "dictionary",
                            "value": {
                                "Amount": {"value_type": "string", "content": "10.00", "bounding_regions": []}
                            }
                        }]
                    }
                }
            }]
        }))
        .unwrap();

        let fields = &result.documents[0].fields;
        assert_eq!(fields.len(), 2);
        let keys: Vec<&str> = fields.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["Vendor", "Items"]);
        assert_eq!(fields.get("Vendor").unwrap().bounding_regions.len(), 1);
        let rows = fields.get("Items").unwrap().rows();
        assert_eq!(rows.len(), 1);
        assert!(matches!(rows[0].value, FieldValue::Mapping(ref m) if m.get("Amount").is_some()));
    }

    #[test]
    fn rest_shape_with_envelope() {
        let result = AnalysisResult::from_value(json!({
            "status": "succeeded",
            "analyzeResult": {
                "pages": [{"pageNumber": 1, "width": 1000, "height": 2000, "unit": "pixel"}],
                "documents": [{
                    "docType": "custom",
                    "fields": {
                        "Items": {
                            "type": "array",
                            "valueArray": [{
                                "type": "object",
                                "valueObject": {
                                    "Qty": {
                                        "type": "string",
                                        "content": "2",
                                        "boundingRegions": [{"pageNumber": 1, "polygon": [0,0,10,0,10,5,0,5]}]
                                    }
                                }
                            }]
                        }
                    }
                }]
            }
        }))
        .unwrap();

        assert_eq!(result.page_size(1), Some(PageSize::new(1000.0, 2000.0)));
        let items = result.documents[0].fields.get("Items").unwrap();
        assert_eq!(items.rows().len(), 1);
    }

    #[test]
    fn page_size_by_position_when_unnumbered() {
        let result = AnalysisResult::from_value(json!({
            "pages": [{"width": 1, "height": 2}, {"width": 3, "height": 4}]
        }))
        .unwrap();
        assert_eq!(result.page_size(2), Some(PageSize::new(3.0, 4.0)));
        assert_eq!(result.page_size(3), None);
        assert_eq!(result.page_size(0), None);
    }

    #[test]
    fn null_fields_are_skipped() {
        let result = AnalysisResult::from_value(json!({
            "documents": [{"fields": {"Missing": null, "Present": {"value_type": "string"}}}]
        }))
        .unwrap();
        assert_eq!(result.documents[0].fields.len(), 1);
    }

    #[test]
    fn malformed_polygon_is_rejected() {
        let err = AnalysisResult::from_value(json!({
            "documents": [{"fields": {"A": {
                "value_type": "string",
                "bounding_regions": [{"page_number": 1, "polygon": [1, 2, 3]}]
            }}}]
        }))
        .unwrap_err();
        assert!(matches!(err, LabelError::InvalidJson { .. }));
    }
}
