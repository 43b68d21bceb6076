//! Coordinate systems: analysis units, rendered pixels, normalised fractions.
//!
//! Three spaces meet in a labeling session:
//!
//! ```text
//! analysis space ──scale──▶ pixel space ──normalise──▶ [0,1] space
//! (inches / pts)            (rendered JPEG)            (labels.json)
//! ```
//!
//! The analysis service reports polygons in page-native units, the human
//! draws on the rendered image in pixels, and the label file wants fractions
//! of the page. Every conversion here is a pure function; page dimensions are
//! always passed in explicitly through [`PageContext`] rather than looked up
//! from whatever container a region happens to live in.
//!
//! Only axis-aligned rectangles are supported. Rotated or skewed polygons are
//! neither detected nor rejected.

use crate::error::LabelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height of a page in some unit (analysis units or pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Per-axis factor mapping analysis units onto rendered pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
    pub sx: f64,
    pub sy: f64,
}

impl ScaleFactor {
    /// The identity scale, for analysis trees already expressed in pixels.
    pub const IDENTITY: ScaleFactor = ScaleFactor { sx: 1.0, sy: 1.0 };
}

/// Compute `(render / analysis)` per axis.
///
/// # Errors
/// [`LabelError::DivisionByZero`] when either analysis dimension is zero.
pub fn scale_factor(analysis: PageSize, render: PageSize) -> Result<ScaleFactor, LabelError> {
    if analysis.width == 0.0 || analysis.height == 0.0 {
        return Err(LabelError::division_by_zero(format!(
            "analysis page size is {}x{}",
            analysis.width, analysis.height
        )));
    }
    Ok(ScaleFactor {
        sx: render.width / analysis.width,
        sy: render.height / analysis.height,
    })
}

/// One rendered page of the source document.
///
/// Produced by the renderer (or read from a page list) and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    /// Rendered image width in pixels.
    pub width: u32,
    /// Rendered image height in pixels.
    pub height: u32,
    /// Where the rendered image was saved, when the renderer wrote one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<std::path::PathBuf>,
}

impl Page {
    pub fn new(number: usize, width: u32, height: u32) -> Self {
        Self {
            number,
            width,
            height,
            image_path: None,
        }
    }

    /// The geometry context every region on this page is measured against.
    pub fn context(&self) -> PageContext {
        PageContext {
            page_number: self.number,
            width: f64::from(self.width),
            height: f64::from(self.height),
        }
    }
}

/// The page a geometry operation runs against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageContext {
    pub page_number: usize,
    pub width: f64,
    pub height: f64,
}

impl PageContext {
    pub fn size(&self) -> PageSize {
        PageSize::new(self.width, self.height)
    }

    /// Normalise `region` against this page.
    pub fn normalize(&self, region: &Region) -> Result<NormalizedRegion, LabelError> {
        normalize(region, self.width, self.height).map_err(|_| {
            LabelError::division_by_zero(format!(
                "page {} has size {}x{}",
                self.page_number, self.width, self.height
            ))
        })
    }
}

/// A point in analysis units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A quadrilateral from the analysis tree, corners in TL, TR, BR, BL order.
///
/// Deserialises from either the SDK form `[{"x":..,"y":..}, ..]` or the flat
/// REST form `[x0, y0, x1, y1, ..]`. At least four points are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPolygon", into = "Vec<Point>")]
pub struct Polygon {
    points: Vec<Point>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPolygon {
    Points(Vec<Point>),
    Flat(Vec<f64>),
}

impl TryFrom<RawPolygon> for Polygon {
    type Error = String;

    fn try_from(raw: RawPolygon) -> Result<Self, Self::Error> {
        let points = match raw {
            RawPolygon::Points(points) => points,
            RawPolygon::Flat(coords) => {
                if coords.len() % 2 != 0 {
                    return Err(format!(
                        "flat polygon has an odd number of coordinates ({})",
                        coords.len()
                    ));
                }
                coords
                    .chunks_exact(2)
                    .map(|xy| Point::new(xy[0], xy[1]))
                    .collect()
            }
        };
        Polygon::try_from(points)
    }
}

impl TryFrom<Vec<Point>> for Polygon {
    type Error = String;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        if points.len() < 4 {
            return Err(format!(
                "polygon needs 4 corners, got {} points",
                points.len()
            ));
        }
        Ok(Self { points })
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(polygon: Polygon) -> Self {
        polygon.points
    }
}

impl Polygon {
    /// Build a quadrilateral from its four corners (TL, TR, BR, BL).
    pub fn quad(corners: [Point; 4]) -> Self {
        Self {
            points: corners.to_vec(),
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// An axis-aligned rectangle in pixel space.
///
/// `end >= start` is expected but not enforced: degenerate and inverted
/// regions are kept as drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl Region {
    pub fn new(start_x: f64, start_y: f64, end_x: f64, end_y: f64) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.end_x - self.start_x
    }

    pub fn height(&self) -> f64 {
        self.end_y - self.start_y
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[({}, {}), ({}, {})]",
            self.start_x, self.start_y, self.end_x, self.end_y
        )
    }
}

/// Convert an axis-aligned analysis polygon into a pixel region.
///
/// Uses the top-left corner, the top edge for width and the left edge for
/// height; the remaining corners are not consulted.
pub fn polygon_to_region(polygon: &Polygon, scale: ScaleFactor) -> Region {
    let p = polygon.points();
    let start_x = p[0].x * scale.sx;
    let start_y = p[0].y * scale.sy;
    let width = (p[1].x - p[0].x) * scale.sx;
    let height = (p[2].y - p[0].y) * scale.sy;
    Region::new(start_x, start_y, start_x + width, start_y + height)
}

/// A region expressed as fractions of its page's width and height.
///
/// Always derived from a [`Region`] at the moment it is needed; never stored
/// alongside the pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRegion {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

/// Divide each coordinate by the matching page dimension.
///
/// # Errors
/// [`LabelError::DivisionByZero`] when `page_width` or `page_height` is zero.
pub fn normalize(
    region: &Region,
    page_width: f64,
    page_height: f64,
) -> Result<NormalizedRegion, LabelError> {
    if page_width == 0.0 || page_height == 0.0 {
        return Err(LabelError::division_by_zero(format!(
            "page size is {page_width}x{page_height}"
        )));
    }
    Ok(NormalizedRegion {
        start_x: region.start_x / page_width,
        start_y: region.start_y / page_height,
        end_x: region.end_x / page_width,
        end_y: region.end_y / page_height,
    })
}

impl NormalizedRegion {
    /// Corners as `[x0,y0, x1,y0, x1,y1, x0,y1]` (TL, TR, BR, BL).
    ///
    /// The label-file consumer depends on this exact order.
    pub fn to_corner_list(&self) -> [f64; 8] {
        [
            self.start_x,
            self.start_y,
            self.end_x,
            self.start_y,
            self.end_x,
            self.end_y,
            self.start_x,
            self.end_y,
        ]
    }

    /// Scale back into pixel space for a page of the given size.
    ///
    /// Each coordinate comes back within two ulps of the original, not
    /// necessarily bit for bit.
    pub fn denormalize(&self, page_width: f64, page_height: f64) -> Region {
        Region::new(
            self.start_x * page_width,
            self.start_y * page_height,
            self.end_x * page_width,
            self.end_y * page_height,
        )
    }
}
