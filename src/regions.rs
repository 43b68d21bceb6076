//! Region extraction: walk the analysis field tree and collect one labeled
//! rectangle per field per page.
//!
//! A field can be a container (a list of rows) and, once nested, carry its
//! own geometry (a table cell), so the walk always does both: it recurses
//! into rows *and* emits the node's own region. Nothing short-circuits at the
//! first matching branch.
//!
//! Output order is deterministic: declaration order of the field map, with a
//! list's row regions emitted before the list's own region.

use crate::analysis::{AnalysisResult, FieldMap, FieldValue};
use crate::error::LabelError;
use crate::geometry::{polygon_to_region, scale_factor, Page, Region, ScaleFactor};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A pixel-space region pre-populated from the analysis tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabeledRegion {
    pub page_number: usize,
    pub region: Region,
    /// The field key the region was found under.
    pub label: String,
    pub content: String,
    /// Top-level field: the enclosing list for table cells, else `label`.
    pub field: String,
    pub row_field: String,
    /// 0-based row index, present only for regions inside a list.
    pub row_number: Option<usize>,
}

/// Collect regions on `page_number` from a field map.
///
/// `scale` maps analysis units onto the rendered page (see
/// [`crate::geometry::scale_factor`]). For every field, list rows are walked
/// first (each row passing the list key as parent and its 0-based index as
/// row number), then the field's first bounding region on the requested page
/// is emitted. Regions on other pages are ignored.
pub fn extract_regions(fields: &FieldMap, page_number: usize, scale: ScaleFactor) -> Vec<LabeledRegion> {
    let mut regions = Vec::new();
    collect(fields, page_number, scale, None, None, &mut regions);
    regions
}

fn collect(
    fields: &FieldMap,
    page_number: usize,
    scale: ScaleFactor,
    parent_field: Option<&str>,
    row_number: Option<usize>,
    out: &mut Vec<LabeledRegion>,
) {
    for (key, node) in fields.iter() {
        for (idx, row) in node.rows().iter().enumerate() {
            match &row.value {
                FieldValue::Mapping(row_fields) => {
                    collect(row_fields, page_number, scale, Some(key), Some(idx), out)
                }
                _ => debug!("Row {} of '{}' has no sub-fields; skipping", idx, key),
            }
        }

        if let Some(bounding) = node.region_on_page(page_number) {
            out.push(LabeledRegion {
                page_number,
                region: polygon_to_region(&bounding.polygon, scale),
                label: key.to_string(),
                content: node.content.clone().unwrap_or_default(),
                field: parent_field.unwrap_or(key).to_string(),
                row_field: key.to_string(),
                row_number,
            });
        }
    }
}

/// Collect regions for one rendered page across every analysed document.
///
/// The scale factor comes from the analysis page size and the rendered
/// pixel size. An analysis with no documents (a plain layout run) yields no
/// regions, as does a page the analysis did not cover.
///
/// # Errors
/// [`LabelError::DivisionByZero`] when the analysis reports a zero page
/// dimension.
pub fn extract_page_regions(
    analysis: &AnalysisResult,
    page: &Page,
) -> Result<Vec<LabeledRegion>, LabelError> {
    if analysis.documents.is_empty() {
        debug!("Analysis has no documents; nothing to pre-populate");
        return Ok(Vec::new());
    }

    let Some(analysis_size) = analysis.page_size(page.number) else {
        warn!("Analysis does not cover page {}; skipping", page.number);
        return Ok(Vec::new());
    };

    let scale = scale_factor(analysis_size, page.context().size()).map_err(|_| {
        LabelError::division_by_zero(format!(
            "analysis page {} is {}x{}",
            page.number, analysis_size.width, analysis_size.height
        ))
    })?;

    let regions: Vec<LabeledRegion> = analysis
        .documents
        .iter()
        .flat_map(|doc| extract_regions(&doc.fields, page.number, scale))
        .collect();

    debug!("Page {}: extracted {} regions", page.number, regions.len());
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalyzedDocument, FieldNode};
    use crate::geometry::{Point, Polygon};
    use serde_json::json;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Polygon {
        Polygon::quad([
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ])
    }

    fn row(key: &str, content: &str, page: usize, polygon: Polygon) -> FieldMap {
        let mut m = FieldMap::new();
        m.insert(key, FieldNode::scalar("string", content).with_region(page, polygon));
        m
    }

    #[test]
    fn list_rows_carry_parent_and_row_number() {
        let mut fields = FieldMap::new();
        fields.insert(
            "Items",
            FieldNode::list(vec![
                row("Amount", "10", 1, rect(0.0, 0.0, 10.0, 5.0)),
                row("Amount", "20", 1, rect(0.0, 10.0, 10.0, 5.0)),
            ]),
        );

        let regions = extract_regions(&fields, 1, ScaleFactor::IDENTITY);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].field, "Items");
        assert_eq!(regions[1].field, "Items");
        assert_eq!(regions[0].row_number, Some(0));
        assert_eq!(regions[1].row_number, Some(1));
        assert_eq!(regions[0].row_field, "Amount");
        assert_eq!(regions[1].content, "20");
        assert_eq!(regions[1].region, Region::new(0.0, 10.0, 10.0, 15.0));
    }

    #[test]
    fn region_on_other_page_is_ignored() {
        let mut fields = FieldMap::new();
        fields.insert(
            "Vendor",
            FieldNode::scalar("string", "Contoso").with_region(1, rect(1.0, 1.0, 1.0, 1.0)),
        );
        assert!(extract_regions(&fields, 2, ScaleFactor::IDENTITY).is_empty());
        assert_eq!(extract_regions(&fields, 1, ScaleFactor::IDENTITY).len(), 1);
    }

    #[test]
    fn first_matching_region_wins() {
        let mut fields = FieldMap::new();
        fields.insert(
            "Total",
            FieldNode::scalar("string", "42")
                .with_region(1, rect(0.0, 0.0, 1.0, 1.0))
                .with_region(2, rect(5.0, 5.0, 1.0, 1.0))
                .with_region(2, rect(9.0, 9.0, 1.0, 1.0)),
        );
        let regions = extract_regions(&fields, 2, ScaleFactor::IDENTITY);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].region.start_x, 5.0);
        assert_eq!(regions[0].field, "Total");
        assert_eq!(regions[0].row_number, None);
    }

    #[test]
    fn list_without_geometry_on_page_still_contributes_rows() {
        // The list itself is bounded only on page 1, its rows on page 2.
        let mut fields = FieldMap::new();
        fields.insert(
            "Items",
            FieldNode::list(vec![row("Qty", "3", 2, rect(0.0, 0.0, 2.0, 2.0))])
                .with_region(1, rect(0.0, 0.0, 50.0, 50.0)),
        );

        let page2 = extract_regions(&fields, 2, ScaleFactor::IDENTITY);
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].label, "Qty");

        let page1 = extract_regions(&fields, 1, ScaleFactor::IDENTITY);
        assert_eq!(page1.len(), 1);
        assert_eq!(page1[0].label, "Items");
        assert_eq!(page1[0].field, "Items");
    }

    #[test]
    fn list_with_geometry_emits_rows_then_itself() {
        let mut fields = FieldMap::new();
        fields.insert(
            "Items",
            FieldNode::list(vec![row("Qty", "3", 1, rect(0.0, 0.0, 2.0, 2.0))])
                .with_region(1, rect(0.0, 0.0, 50.0, 50.0)),
        );
        let labels: Vec<String> = extract_regions(&fields, 1, ScaleFactor::IDENTITY)
            .into_iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(labels, ["Qty", "Items"]);
    }

    #[test]
    fn extract_page_regions_scales_to_pixels() {
        let analysis = AnalysisResult::from_value(json!({
            "pages": [{"page_number": 1, "width": 8.5, "height": 11.0}],
            "documents": [{"fields": {
                "Vendor": {
                    "value_type": "string",
                    "content": "Contoso",
                    "bounding_regions": [{"page_number": 1, "polygon": [1, 1, 2, 1, 2, 1.5, 1, 1.5]}]
                }
            }}]
        }))
        .unwrap();
        let page = Page::new(1, 1700, 2200);

        let regions = extract_page_regions(&analysis, &page).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].region, Region::new(200.0, 200.0, 400.0, 300.0));
    }

    #[test]
    fn no_documents_yields_nothing() {
        let analysis = AnalysisResult {
            pages: Vec::new(),
            documents: Vec::new(),
        };
        assert!(extract_page_regions(&analysis, &Page::new(1, 10, 10))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn zero_analysis_dimension_is_fatal() {
        let analysis = AnalysisResult::from_value(json!({
            "pages": [{"width": 0, "height": 11}],
            "documents": [{"fields": {}}]
        }))
        .unwrap();
        let err = extract_page_regions(&analysis, &Page::new(1, 100, 100)).unwrap_err();
        assert!(matches!(err, LabelError::DivisionByZero { .. }));
    }

    #[test]
    fn documents_are_walked_in_order() {
        let mut first = FieldMap::new();
        first.insert("A", FieldNode::scalar("string", "a").with_region(1, rect(0.0, 0.0, 1.0, 1.0)));
        let mut second = FieldMap::new();
        second.insert("B", FieldNode::scalar("string", "b").with_region(1, rect(0.0, 0.0, 1.0, 1.0)));

        let analysis = AnalysisResult {
            pages: Vec::new(),
            documents: vec![
                AnalyzedDocument {
                    doc_type: None,
                    fields: first,
                },
                AnalyzedDocument {
                    doc_type: None,
                    fields: second,
                },
            ],
        };
        // No page sizes reported: the page is not covered.
        assert!(extract_page_regions(&analysis, &Page::new(1, 1, 1)).unwrap().is_empty());

        let regions: Vec<_> = analysis
            .documents
            .iter()
            .flat_map(|d| extract_regions(&d.fields, 1, ScaleFactor::IDENTITY))
            .map(|r| r.label)
            .collect();
        assert_eq!(regions, ["A", "B"]);
    }
}
