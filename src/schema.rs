//! Field schema: the vocabulary of labelable fields.
//!
//! Mirrors the `fields.json` document a template-model training set ships
//! with:
//!
//! ```json
//! {
//!   "fields": [
//!     {"fieldKey": "Vendor", "fieldType": "string"},
//!     {"fieldKey": "Items", "fieldType": "array", "itemType": "Items_row"},
//!     {"fieldKey": "Approval", "fieldType": "signature"}
//!   ],
//!   "definitions": {
//!     "Items_row": {"fields": [{"fieldKey": "Qty", "fieldType": "number"}]}
//!   }
//! }
//! ```
//!
//! Every `itemType` reference is resolved once at load time, so a loaded
//! [`FieldSchema`] is immutable and can be shared across all editors of a
//! session behind an `Arc`.

use crate::error::{EditError, LabelError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    String,
    Number,
    Date,
    Time,
    Integer,
    SelectionMark,
    CountryRegion,
    /// A region with no text; exported with `labelType: "region"`.
    Signature,
    /// A table; rows are described by the definition named in `itemType`.
    Array,
    Object,
    /// Any type this crate has no special handling for.
    Other(String),
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "string" => FieldType::String,
            "number" => FieldType::Number,
            "date" => FieldType::Date,
            "time" => FieldType::Time,
            "integer" => FieldType::Integer,
            "selectionMark" => FieldType::SelectionMark,
            "countryRegion" => FieldType::CountryRegion,
            "signature" => FieldType::Signature,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            _ => FieldType::Other(s),
        }
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Integer => "integer",
            FieldType::SelectionMark => "selectionMark",
            FieldType::CountryRegion => "countryRegion",
            FieldType::Signature => "signature",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Other(s) => s,
        };
        f.write_str(s)
    }
}

/// A resolved field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub key: String,
    pub field_type: FieldType,
    /// Name of the row definition, for arrays.
    pub item_type: Option<String>,
    /// Row-level fields, resolved from `definitions[item_type]` (arrays only).
    pub row_fields: Vec<FieldDescriptor>,
}

impl FieldDescriptor {
    pub fn is_array(&self) -> bool {
        self.field_type == FieldType::Array
    }

    pub fn is_signature(&self) -> bool {
        self.field_type == FieldType::Signature
    }
}

/// The loaded, read-only field schema.
#[derive(Debug, Clone, Default)]
pub struct FieldSchema {
    fields: Vec<FieldDescriptor>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSchema {
    fields: Vec<RawField>,
    #[serde(default)]
    definitions: HashMap<String, RawDefinition>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    field_key: String,
    field_type: FieldType,
    #[serde(default)]
    item_type: Option<String>,
}

#[derive(Deserialize)]
struct RawDefinition {
    fields: Vec<RawField>,
}

impl FieldSchema {
    /// Load a schema from a `fields.json` value.
    ///
    /// # Errors
    /// [`LabelError::SchemaParse`] when `fields` is missing, an array lacks
    /// `itemType`, or an `itemType` names a missing (or self-referencing)
    /// definition.
    pub fn from_value(value: Value) -> Result<Self, LabelError> {
        let raw: RawSchema =
            serde_json::from_value(value).map_err(|e| LabelError::SchemaParse(e.to_string()))?;

        let mut stack = Vec::new();
        let fields = raw
            .fields
            .iter()
            .map(|f| resolve_field(f, &raw.definitions, &mut stack))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Loaded field schema: {} fields ({} tables)",
            fields.len(),
            fields.iter().filter(|f| f.is_array()).count()
        );
        Ok(Self { fields })
    }

    /// Load a schema from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self, LabelError> {
        let value: Value =
            serde_json::from_str(s).map_err(|e| LabelError::SchemaParse(e.to_string()))?;
        Self::from_value(value)
    }

    /// Look up a top-level field.
    pub fn resolve(&self, field_key: &str) -> Result<&FieldDescriptor, EditError> {
        self.fields
            .iter()
            .find(|f| f.key == field_key)
            .ok_or_else(|| EditError::NotFound {
                field: field_key.to_string(),
            })
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Options for a field picker, in declaration order.
    pub fn field_keys(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.key.as_str()).collect()
    }

    /// Options for a row-field picker; empty unless `field_key` is an array.
    pub fn row_field_keys(&self, field_key: &str) -> Vec<&str> {
        self.resolve(field_key)
            .map(|f| f.row_fields.iter().map(|r| r.key.as_str()).collect())
            .unwrap_or_default()
    }
}

fn resolve_field(
    raw: &RawField,
    definitions: &HashMap<String, RawDefinition>,
    stack: &mut Vec<String>,
) -> Result<FieldDescriptor, LabelError> {
    let mut descriptor = FieldDescriptor {
        key: raw.field_key.clone(),
        field_type: raw.field_type.clone(),
        item_type: raw.item_type.clone(),
        row_fields: Vec::new(),
    };

    if descriptor.field_type != FieldType::Array {
        return Ok(descriptor);
    }

    let item_type = raw.item_type.as_deref().ok_or_else(|| {
        LabelError::SchemaParse(format!("array field '{}' has no itemType", raw.field_key))
    })?;
    let definition = definitions.get(item_type).ok_or_else(|| {
        LabelError::SchemaParse(format!(
            "field '{}' references missing definition '{}'",
            raw.field_key, item_type
        ))
    })?;
    if stack.iter().any(|s| s == item_type) {
        return Err(LabelError::SchemaParse(format!(
            "definition '{}' refers to itself through '{}'",
            item_type, raw.field_key
        )));
    }

    stack.push(item_type.to_string());
    let row_fields = definition
        .fields
        .iter()
        .map(|f| resolve_field(f, definitions, stack))
        .collect::<Result<Vec<_>, _>>();
    stack.pop();

    descriptor.row_fields = row_fields?;
    Ok(descriptor)
}
