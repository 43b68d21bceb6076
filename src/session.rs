//! A labeling session: every page of one document and the editors on it.
//!
//! The session is the aggregate a UI or the CLI drives. It owns the page
//! list and, per page, an ordered list of [`LabelEditor`]s (pre-populated
//! from an analysis result, then drawn by hand). The [`FieldSchema`] is
//! shared read-only by every editor.

use crate::analysis::AnalysisResult;
use crate::editor::{EditCommand, Label, LabelEditor};
use crate::error::{EditError, LabelError};
use crate::formatter::{format_labels_with_schema, LabelDocument, LabelRecord, LABELS_SCHEMA_URI};
use crate::geometry::{Page, Region};
use crate::regions::extract_page_regions;
use crate::schema::FieldSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Address of one label: its page and its position on that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelId {
    /// 1-based page number.
    pub page: usize,
    /// 0-based position among the page's labels.
    pub index: usize,
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} #{}", self.page, self.index)
    }
}

#[derive(Debug, Clone)]
struct PageLabels {
    page: Page,
    editors: Vec<LabelEditor>,
}

/// All labels of one document.
#[derive(Debug, Clone)]
pub struct Session {
    schema: Arc<FieldSchema>,
    schema_uri: String,
    pages: Vec<PageLabels>,
}

impl Session {
    /// Start a session over `pages`. Pages are kept in page-number order;
    /// a repeated page number keeps its first occurrence.
    pub fn new(schema: Arc<FieldSchema>, pages: Vec<Page>) -> Self {
        let mut pages = pages;
        pages.sort_by_key(|p| p.number);
        pages.dedup_by_key(|p| p.number);
        Self {
            schema,
            schema_uri: LABELS_SCHEMA_URI.to_string(),
            pages: pages
                .into_iter()
                .map(|page| PageLabels {
                    page,
                    editors: Vec::new(),
                })
                .collect(),
        }
    }

    /// Override the `$schema` marker of [`Session::label_document`].
    pub fn with_schema_uri(mut self, uri: impl Into<String>) -> Self {
        self.schema_uri = uri.into();
        self
    }

    pub fn schema(&self) -> &Arc<FieldSchema> {
        &self.schema
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().map(|p| &p.page)
    }

    /// Number of labels across all pages.
    pub fn len(&self) -> usize {
        self.pages.iter().map(|p| p.editors.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seed one editor per region the analysis found on each page.
    ///
    /// Returns the number of editors added.
    pub fn prepopulate(&mut self, analysis: &AnalysisResult) -> Result<usize, LabelError> {
        // Extract everything before touching any page, so a failure leaves
        // the session as it was.
        let extracted = self
            .pages
            .iter()
            .map(|entry| extract_page_regions(analysis, &entry.page))
            .collect::<Result<Vec<_>, _>>()?;

        let mut added = 0;
        for (entry, regions) in self.pages.iter_mut().zip(extracted) {
            let ctx = entry.page.context();
            added += regions.len();
            entry.editors.extend(
                regions
                    .iter()
                    .map(|found| LabelEditor::from_extracted(self.schema.clone(), ctx, found)),
            );
        }
        info!("Pre-populated {} labels over {} pages", added, self.pages.len());
        Ok(added)
    }

    /// Add a hand-drawn region (no field, no content yet) to a page.
    ///
    /// # Errors
    /// [`LabelError::PageOutOfRange`] when the session has no such page.
    pub fn draw_region(&mut self, page_number: usize, region: Region) -> Result<LabelId, LabelError> {
        let schema = self.schema.clone();
        let entry = self.page_mut(page_number)?;
        entry
            .editors
            .push(LabelEditor::new(schema, entry.page.context(), region));
        let id = LabelId {
            page: page_number,
            index: entry.editors.len() - 1,
        };
        debug!("Drew region {} at {}", region, id);
        Ok(id)
    }

    /// Borrow one editor.
    pub fn editor(&self, id: LabelId) -> Result<&LabelEditor, LabelError> {
        self.pages
            .iter()
            .find(|p| p.page.number == id.page)
            .and_then(|p| p.editors.get(id.index))
            .ok_or(LabelError::UnknownLabel {
                page: id.page,
                index: id.index,
            })
    }

    /// Apply an edit command to one label.
    ///
    /// The outer result fails only for an id the session does not know; the
    /// inner one carries the recoverable outcome of the edit itself.
    pub fn apply(
        &mut self,
        id: LabelId,
        command: EditCommand,
    ) -> Result<Result<(), EditError>, LabelError> {
        let editor = self
            .page_mut(id.page)
            .ok()
            .and_then(|p| p.editors.get_mut(id.index))
            .ok_or(LabelError::UnknownLabel {
                page: id.page,
                index: id.index,
            })?;
        Ok(editor.apply(command))
    }

    /// Every label, in page order then insertion order.
    pub fn labels(&self) -> Vec<(LabelId, &Label)> {
        self.pages
            .iter()
            .flat_map(|p| {
                p.editors.iter().enumerate().map(move |(index, editor)| {
                    (
                        LabelId {
                            page: p.page.number,
                            index,
                        },
                        editor.label(),
                    )
                })
            })
            .collect()
    }

    /// Every label in label-file form. Labels with no field chosen yet are
    /// left out.
    pub fn label_records(&self) -> Result<Vec<LabelRecord>, LabelError> {
        let mut records = Vec::with_capacity(self.len());
        for editor in self.pages.iter().flat_map(|p| p.editors.iter()) {
            if editor.label().label.is_empty() {
                debug!(
                    "Skipping unassigned region on page {}",
                    editor.label().page
                );
                continue;
            }
            records.push(editor.as_label()?);
        }
        Ok(records)
    }

    /// The labels file for this session.
    pub fn label_document(&self, document_name: &str) -> Result<LabelDocument, LabelError> {
        Ok(format_labels_with_schema(
            self.label_records()?,
            document_name,
            self.schema_uri.clone(),
        ))
    }

    fn page_mut(&mut self, page_number: usize) -> Result<&mut PageLabels, LabelError> {
        let total = self.pages.len();
        self.pages
            .iter_mut()
            .find(|p| p.page.number == page_number)
            .ok_or(LabelError::PageOutOfRange {
                page: page_number,
                total,
            })
    }
}
