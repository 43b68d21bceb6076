//! Per-region label editor: a small state machine driven by edit commands.
//!
//! ```text
//!                SelectField(array)
//!        ┌──────────────────────────────┐
//!        ▼                              │
//!   ┌──────────┐  SelectField(other) ┌────────┐  SelectField(signature) ┌───────────┐
//!   │ ArrayRow │ ──────────────────▶ │ Simple │ ──────────────────────▶ │ Signature │
//!   └──────────┘                     └────────┘ ◀────────────────────── └───────────┘
//!     SetRowNumber / SetRowField       SetContent       (content pinned to "")
//! ```
//!
//! The state is derived from the schema type of the label's field every time
//! the field changes. A field the schema does not declare behaves as
//! `Simple`. The host UI never holds behaviour itself: it turns user events
//! into [`EditCommand`]s, applies them, and re-renders from [`LabelEditor::label`].

use crate::error::{EditError, LabelError};
use crate::formatter::{LabelRecord, LabelValue};
use crate::geometry::{PageContext, Region};
use crate::regions::LabeledRegion;
use crate::schema::FieldSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which inputs a label currently needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorState {
    /// Plain field: label string is the field key.
    Simple,
    /// Table cell: label string is `field/row/rowField`.
    ArrayRow,
    /// Region-only field with no text.
    Signature,
}

impl fmt::Display for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EditorState::Simple => "Simple",
            EditorState::ArrayRow => "ArrayRow",
            EditorState::Signature => "Signature",
        };
        f.write_str(s)
    }
}

/// One user action against a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditCommand {
    SelectField(String),
    SetRowNumber(usize),
    SetRowField(String),
    SetContent(String),
}

impl EditCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EditCommand::SelectField(_) => "SelectField",
            EditCommand::SetRowNumber(_) => "SetRowNumber",
            EditCommand::SetRowField(_) => "SetRowField",
            EditCommand::SetContent(_) => "SetContent",
        }
    }
}

/// Tag for labels that carry a region but no text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelType {
    Region,
}

/// The current state of one annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub label: String,
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_field: Option<String>,
    pub content: String,
    pub page: usize,
    pub region: Region,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_type: Option<LabelType>,
}

/// Editor for a single region on a single page.
#[derive(Debug, Clone)]
pub struct LabelEditor {
    schema: Arc<FieldSchema>,
    page: PageContext,
    state: EditorState,
    label: Label,
}

impl LabelEditor {
    /// A freshly drawn region with no field chosen yet.
    pub fn new(schema: Arc<FieldSchema>, page: PageContext, region: Region) -> Self {
        let label = Label {
            label: String::new(),
            field: String::new(),
            row_number: None,
            row_field: None,
            content: String::new(),
            page: page.page_number,
            region,
            label_type: None,
        };
        Self::settled(schema, page, label)
    }

    /// An editor seeded from a region found in the analysis tree.
    pub fn from_extracted(schema: Arc<FieldSchema>, page: PageContext, found: &LabeledRegion) -> Self {
        let label = Label {
            label: found.label.clone(),
            field: found.field.clone(),
            row_number: found.row_number,
            row_field: Some(found.row_field.clone()),
            content: found.content.clone(),
            page: page.page_number,
            region: found.region,
            label_type: None,
        };
        Self::settled(schema, page, label)
    }

    /// Derive the initial state from the seeded field.
    ///
    /// Unlike [`EditCommand::SelectField`], an undeclared field keeps the
    /// seeded label string.
    fn settled(schema: Arc<FieldSchema>, page: PageContext, label: Label) -> Self {
        let mut editor = Self {
            schema,
            page,
            state: EditorState::Simple,
            label,
        };
        let resolved = editor
            .schema
            .resolve(&editor.label.field)
            .map(|d| (d.is_array(), d.is_signature()));
        match resolved {
            Ok((true, _)) => {
                let row = editor.label.row_number.unwrap_or(0);
                // A list's own region is seeded with the list key as row
                // field; only declared row fields survive.
                let row_field = editor
                    .label
                    .row_field
                    .take()
                    .filter(|f| {
                        editor
                            .schema
                            .row_field_keys(&editor.label.field)
                            .contains(&f.as_str())
                    })
                    .unwrap_or_default();
                editor.enter_array_row(row, row_field);
            }
            Ok((_, true)) => editor.enter_signature(),
            Ok(_) => editor.enter_simple(),
            Err(_) => {
                debug!(
                    "Field '{}' is not in the schema; treating as simple",
                    editor.label.field
                );
                editor.state = EditorState::Simple;
                editor.label.row_number = None;
                editor.label.row_field = None;
                editor.label.label_type = None;
            }
        }
        editor
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn page(&self) -> PageContext {
        self.page
    }

    /// Apply one command.
    ///
    /// # Errors
    /// [`EditError::InvalidState`] for row edits outside `ArrayRow`. The
    /// label is unchanged when an error is returned.
    pub fn apply(&mut self, command: EditCommand) -> Result<(), EditError> {
        match command {
            EditCommand::SelectField(field) => {
                self.select_field(field);
                Ok(())
            }
            EditCommand::SetRowNumber(n) => self.set_row_number(n),
            EditCommand::SetRowField(f) => self.set_row_field(f),
            EditCommand::SetContent(text) => {
                self.set_content(text);
                Ok(())
            }
        }
    }

    /// Choose the label's field and re-derive the state from its type.
    pub fn select_field(&mut self, field: impl Into<String>) {
        self.label.field = field.into();
        let resolved = self
            .schema
            .resolve(&self.label.field)
            .map(|d| (d.is_array(), d.is_signature()));
        match resolved {
            Ok((true, _)) => {
                let row = self.label.row_number.unwrap_or(0);
                self.enter_array_row(row, String::new());
            }
            Ok((_, true)) => self.enter_signature(),
            Ok(_) => self.enter_simple(),
            Err(e) => {
                debug!("{}; label falls back to the field key", e);
                self.enter_simple();
            }
        }
    }

    pub fn set_row_number(&mut self, row_number: usize) -> Result<(), EditError> {
        self.require_array_row("SetRowNumber")?;
        self.label.row_number = Some(row_number);
        self.recompute_row_label();
        Ok(())
    }

    pub fn set_row_field(&mut self, row_field: impl Into<String>) -> Result<(), EditError> {
        self.require_array_row("SetRowField")?;
        self.label.row_field = Some(row_field.into());
        self.recompute_row_label();
        Ok(())
    }

    /// Set the label text. Signature labels have no text, so this is a
    /// no-op for them.
    pub fn set_content(&mut self, text: impl Into<String>) {
        if self.state == EditorState::Signature {
            debug!("Ignoring content for signature field '{}'", self.label.field);
            return;
        }
        self.label.content = text.into();
    }

    /// The label in label-file form, with its region normalised against its
    /// own page.
    ///
    /// # Errors
    /// [`LabelError::DivisionByZero`] when the page has a zero dimension.
    pub fn as_label(&self) -> Result<LabelRecord, LabelError> {
        let normalized = self.page.normalize(&self.label.region)?;
        Ok(LabelRecord {
            label: self.label.label.clone(),
            value: vec![LabelValue {
                page: self.label.page,
                text: self.label.content.clone(),
                bounding_boxes: vec![normalized.to_corner_list().to_vec()],
            }],
            label_type: self.label.label_type,
        })
    }

    fn require_array_row(&self, command: &str) -> Result<(), EditError> {
        if self.state == EditorState::ArrayRow {
            Ok(())
        } else {
            Err(EditError::InvalidState {
                command: command.to_string(),
                state: self.state.to_string(),
            })
        }
    }

    fn enter_array_row(&mut self, row_number: usize, row_field: String) {
        self.state = EditorState::ArrayRow;
        self.label.row_number = Some(row_number);
        self.label.row_field = Some(row_field);
        self.label.label_type = None;
        self.recompute_row_label();
    }

    fn enter_signature(&mut self) {
        self.state = EditorState::Signature;
        self.label.label = self.label.field.clone();
        self.label.content.clear();
        self.label.label_type = Some(LabelType::Region);
        self.label.row_number = None;
        self.label.row_field = None;
    }

    fn enter_simple(&mut self) {
        self.state = EditorState::Simple;
        self.label.label = self.label.field.clone();
        self.label.label_type = None;
        self.label.row_number = None;
        self.label.row_field = None;
    }

    fn recompute_row_label(&mut self) {
        self.label.label = format!(
            "{}/{}/{}",
            self.label.field,
            self.label.row_number.unwrap_or(0),
            self.label.row_field.as_deref().unwrap_or("")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Page;
    use serde_json::json;

    fn schema() -> Arc<FieldSchema> {
        Arc::new(
            FieldSchema::from_value(json!({
                "fields": [
                    {"fieldKey": "Vendor", "fieldType": "string"},
                    {"fieldKey": "Items", "fieldType": "array", "itemType": "Items_row"},
                    {"fieldKey": "Approval", "fieldType": "signature"}
                ],
                "definitions": {
                    "Items_row": {"fields": [
                        {"fieldKey": "Qty", "fieldType": "number"},
                        {"fieldKey": "Amount", "fieldType": "string"}
                    ]}
                }
            }))
            .unwrap(),
        )
    }

    fn page() -> PageContext {
        Page::new(1, 200, 100).context()
    }

    fn drawn() -> LabelEditor {
        LabelEditor::new(schema(), page(), Region::new(20.0, 10.0, 100.0, 30.0))
    }

    #[test]
    fn drawn_region_starts_simple_and_blank() {
        let editor = drawn();
        assert_eq!(editor.state(), EditorState::Simple);
        assert_eq!(editor.label().label, "");
        assert_eq!(editor.label().field, "");
    }

    #[test]
    fn select_simple_field() {
        let mut editor = drawn();
        editor.apply(EditCommand::SelectField("Vendor".into())).unwrap();
        assert_eq!(editor.state(), EditorState::Simple);
        assert_eq!(editor.label().label, "Vendor");
        assert_eq!(editor.label().label_type, None);
    }

    #[test]
    fn select_array_field_builds_row_label() {
        let mut editor = drawn();
        editor.select_field("Items");
        assert_eq!(editor.state(), EditorState::ArrayRow);
        assert_eq!(editor.label().label, "Items/0/");

        editor.apply(EditCommand::SetRowNumber(2)).unwrap();
        editor.apply(EditCommand::SetRowField("Qty".into())).unwrap();
        assert_eq!(editor.label().label, "Items/2/Qty");
        assert_eq!(editor.label().row_number, Some(2));
        assert_eq!(editor.label().row_field.as_deref(), Some("Qty"));
    }

    #[test]
    fn signature_clears_content_regardless_of_prior_text() {
        let mut editor = drawn();
        editor.set_content("John Smith");
        editor.select_field("Approval");
        assert_eq!(editor.state(), EditorState::Signature);
        assert_eq!(editor.label().content, "");
        assert_eq!(editor.label().label_type, Some(LabelType::Region));
        assert_eq!(editor.label().label, "Approval");

        // Content stays pinned; not an error.
        editor.apply(EditCommand::SetContent("scribble".into())).unwrap();
        assert_eq!(editor.label().content, "");
    }

    #[test]
    fn leaving_array_discards_row_state() {
        let mut editor = drawn();
        editor.select_field("Items");
        editor.set_row_number(3).unwrap();
        editor.select_field("Vendor");
        assert_eq!(editor.label().row_number, None);
        assert_eq!(editor.label().row_field, None);
        assert_eq!(editor.label().label, "Vendor");
    }

    #[test]
    fn leaving_signature_clears_label_type() {
        let mut editor = drawn();
        editor.select_field("Approval");
        editor.select_field("Vendor");
        assert_eq!(editor.label().label_type, None);
        editor.set_content("Contoso");
        assert_eq!(editor.label().content, "Contoso");
    }

    #[test]
    fn row_edits_outside_array_are_invalid_state() {
        let mut editor = drawn();
        editor.select_field("Vendor");
        let before = editor.label().clone();
        let err = editor.apply(EditCommand::SetRowNumber(1)).unwrap_err();
        assert!(matches!(err, EditError::InvalidState { .. }));
        let err = editor.apply(EditCommand::SetRowField("Qty".into())).unwrap_err();
        assert!(matches!(err, EditError::InvalidState { ref state, .. } if state == "Simple"));
        assert_eq!(editor.label(), &before);
    }

    #[test]
    fn unknown_field_selects_simple_with_key_as_label() {
        let mut editor = drawn();
        editor.select_field("Items");
        editor.apply(EditCommand::SelectField("Mystery".into())).unwrap();
        assert_eq!(editor.state(), EditorState::Simple);
        assert_eq!(editor.label().label, "Mystery");
        assert_eq!(editor.label().row_number, None);
    }

    #[test]
    fn array_reselect_keeps_prior_row_number() {
        let mut editor = drawn();
        editor.select_field("Items");
        editor.set_row_number(4).unwrap();
        editor.set_row_field("Qty").unwrap();
        editor.select_field("Items");
        assert_eq!(editor.label().label, "Items/4/");
    }

    #[test]
    fn extracted_table_cell_starts_in_array_row() {
        let found = LabeledRegion {
            page_number: 1,
            region: Region::new(0.0, 0.0, 10.0, 10.0),
            label: "Qty".into(),
            content: "3".into(),
            field: "Items".into(),
            row_field: "Qty".into(),
            row_number: Some(1),
        };
        let editor = LabelEditor::from_extracted(schema(), page(), &found);
        assert_eq!(editor.state(), EditorState::ArrayRow);
        assert_eq!(editor.label().label, "Items/1/Qty");
        assert_eq!(editor.label().content, "3");
    }

    #[test]
    fn extracted_list_region_drops_undeclared_row_field() {
        let found = LabeledRegion {
            page_number: 1,
            region: Region::new(0.0, 0.0, 50.0, 50.0),
            label: "Items".into(),
            content: String::new(),
            field: "Items".into(),
            row_field: "Items".into(),
            row_number: None,
        };
        let editor = LabelEditor::from_extracted(schema(), page(), &found);
        assert_eq!(editor.state(), EditorState::ArrayRow);
        assert_eq!(editor.label().label, "Items/0/");
        assert_eq!(editor.label().row_field.as_deref(), Some(""));
    }

    #[test]
    fn extracted_unknown_field_keeps_its_label() {
        let found = LabeledRegion {
            page_number: 1,
            region: Region::new(0.0, 0.0, 10.0, 10.0),
            label: "Cell".into(),
            content: "x".into(),
            field: "UnknownTable".into(),
            row_field: "Cell".into(),
            row_number: Some(0),
        };
        let editor = LabelEditor::from_extracted(schema(), page(), &found);
        assert_eq!(editor.state(), EditorState::Simple);
        assert_eq!(editor.label().label, "Cell");
        // Row state only exists for array fields.
        assert_eq!(editor.label().row_number, None);
        assert_eq!(editor.label().row_field, None);
    }

    #[test]
    fn extracted_signature_loses_its_text() {
        let found = LabeledRegion {
            page_number: 1,
            region: Region::new(0.0, 0.0, 10.0, 10.0),
            label: "Approval".into(),
            content: "J. Smith".into(),
            field: "Approval".into(),
            row_field: "Approval".into(),
            row_number: None,
        };
        let editor = LabelEditor::from_extracted(schema(), page(), &found);
        assert_eq!(editor.state(), EditorState::Signature);
        assert_eq!(editor.label().content, "");
    }

    #[test]
    fn as_label_normalises_against_its_page() {
        let mut editor = drawn();
        editor.select_field("Approval");
        let record = editor.as_label().unwrap();
        assert_eq!(record.label, "Approval");
        assert_eq!(record.label_type, Some(LabelType::Region));
        assert_eq!(record.value.len(), 1);
        assert_eq!(record.value[0].page, 1);
        assert_eq!(
            record.value[0].bounding_boxes,
            vec![vec![0.1, 0.1, 0.5, 0.1, 0.5, 0.3, 0.1, 0.3]]
        );
    }

    #[test]
    fn as_label_on_degenerate_page_fails() {
        let editor = LabelEditor::new(schema(), Page::new(1, 0, 0).context(), Region::default());
        assert!(matches!(
            editor.as_label(),
            Err(LabelError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn commands_deserialise_from_camel_case() {
        let cmd: EditCommand = serde_json::from_str(r#"{"setRowNumber": 3}"#).unwrap();
        assert_eq!(cmd, EditCommand::SetRowNumber(3));
        let cmd: EditCommand = serde_json::from_str(r#"{"selectField": "Items"}"#).unwrap();
        assert_eq!(cmd.name(), "SelectField");
    }
}
