//! Configuration types for a labeling session.
//!
//! Everything a session needs besides its inputs lives in [`LabelingConfig`],
//! built via [`LabelingConfigBuilder`]. Setters clamp obviously out-of-range
//! values; `build()` rejects the rest.

use crate::error::LabelError;
use crate::formatter::LABELS_SCHEMA_URI;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for rendering, labeling and persisting one document.
///
/// # Example
/// ```rust
/// use edgequake_doclabel::{LabelingConfig, PageSelection};
///
/// let config = LabelingConfig::builder()
///     .images_dir("out/images")
///     .max_rendered_pixels(1600)
///     .pages(PageSelection::Range(1, 3))
///     .build()
///     .unwrap();
/// assert_eq!(config.max_rendered_pixels, 1600);
/// ```
#[derive(Clone)]
pub struct LabelingConfig {
    /// Directory rendered page images are written to. Default: `images`.
    pub images_dir: PathBuf,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// Caps either dimension, scaling the other proportionally. Labels are
    /// normalised against whatever size comes out, so this only trades
    /// drawing precision against image size.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// `$schema` marker written into the labels file.
    pub schema_uri: String,

    /// Fail on analysis-tree shapes canonicalisation has no rule for,
    /// instead of passing them through. Default: false.
    pub strict_canonicalization: bool,

    /// Receives per-page render events.
    pub progress_callback: ProgressCallback,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("images"),
            max_rendered_pixels: 2000,
            password: None,
            pages: PageSelection::default(),
            schema_uri: LABELS_SCHEMA_URI.to_string(),
            strict_canonicalization: false,
            progress_callback: Arc::new(NoopProgressCallback),
        }
    }
}

impl fmt::Debug for LabelingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelingConfig")
            .field("images_dir", &self.images_dir)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("schema_uri", &self.schema_uri)
            .field("strict_canonicalization", &self.strict_canonicalization)
            .finish_non_exhaustive()
    }
}

impl LabelingConfig {
    /// Create a new builder for `LabelingConfig`.
    pub fn builder() -> LabelingConfigBuilder {
        LabelingConfigBuilder {
            config: Self::default(),
        }
    }

    /// The canonicalisation policy this config asks for.
    pub fn shape_policy(&self) -> crate::canonical::ShapePolicy {
        if self.strict_canonicalization {
            crate::canonical::ShapePolicy::Strict
        } else {
            crate::canonical::ShapePolicy::Lenient
        }
    }
}

/// Builder for [`LabelingConfig`].
pub struct LabelingConfigBuilder {
    config: LabelingConfig,
}

impl fmt::Debug for LabelingConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelingConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl LabelingConfigBuilder {
    pub fn images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.images_dir = dir.into();
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn schema_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.schema_uri = uri.into();
        self
    }

    pub fn strict_canonicalization(mut self, v: bool) -> Self {
        self.config.strict_canonicalization = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = cb;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<LabelingConfig, LabelError> {
        let c = &self.config;
        if c.images_dir.as_os_str().is_empty() {
            return Err(LabelError::InvalidConfig(
                "images_dir must not be empty".into(),
            ));
        }
        if c.schema_uri.trim().is_empty() {
            return Err(LabelError::InvalidConfig(
                "schema_uri must not be empty".into(),
            ));
        }
        if let PageSelection::Range(start, end) = c.pages {
            if start == 0 || end < start {
                return Err(LabelError::InvalidConfig(format!(
                    "page range {}-{} is empty (pages are 1-indexed)",
                    start, end
                )));
            }
        }
        Ok(self.config)
    }
}

/// Specifies which pages of the PDF to render and label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Whether 1-based `page` is selected.
    pub fn contains(&self, page: usize) -> bool {
        match self {
            PageSelection::All => page >= 1,
            PageSelection::Single(p) => *p == page,
            PageSelection::Range(start, end) => page >= (*start).max(1) && page <= *end,
            PageSelection::Set(pages) => pages.contains(&page),
        }
    }
}

impl std::str::FromStr for PageSelection {
    type Err = LabelError;

    /// Parse `all`, `3`, `2-5` or `1,3,7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || LabelError::InvalidConfig(format!("invalid page selection '{}'", s));
        let number = |t: &str| t.trim().parse::<usize>().map_err(|_| bad());

        if s.eq_ignore_ascii_case("all") {
            Ok(PageSelection::All)
        } else if let Some((a, b)) = s.split_once('-') {
            Ok(PageSelection::Range(number(a)?, number(b)?))
        } else if s.contains(',') {
            s.split(',')
                .map(number)
                .collect::<Result<Vec<_>, _>>()
                .map(PageSelection::Set)
        } else {
            Ok(PageSelection::Single(number(s)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = LabelingConfig::default();
        assert_eq!(c.images_dir, PathBuf::from("images"));
        assert_eq!(c.max_rendered_pixels, 2000);
        assert_eq!(c.schema_uri, LABELS_SCHEMA_URI);
        assert!(!c.strict_canonicalization);
        assert_eq!(c.pages, PageSelection::All);
    }

    #[test]
    fn builder_clamps_pixels() {
        let c = LabelingConfig::builder().max_rendered_pixels(5).build().unwrap();
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn builder_rejects_empty_range() {
        let err = LabelingConfig::builder()
            .pages(PageSelection::Range(5, 2))
            .build()
            .unwrap_err();
        assert!(matches!(err, LabelError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_password() {
        let c = LabelingConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("redacted"));
    }

    #[test]
    fn page_selection_indices() {
        assert_eq!(PageSelection::All.to_indices(3), [0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), [1]);
        assert!(PageSelection::Single(9).to_indices(3).is_empty());
        assert_eq!(PageSelection::Range(2, 10).to_indices(4), [1, 2, 3]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3, 8]).to_indices(4), [0, 2]);
    }

    #[test]
    fn page_selection_parses() {
        assert_eq!("all".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!("4".parse::<PageSelection>().unwrap(), PageSelection::Single(4));
        assert_eq!("2-5".parse::<PageSelection>().unwrap(), PageSelection::Range(2, 5));
        assert_eq!(
            "1, 3,7".parse::<PageSelection>().unwrap(),
            PageSelection::Set(vec![1, 3, 7])
        );
        assert!("two".parse::<PageSelection>().is_err());
    }

    #[test]
    fn page_selection_contains() {
        assert!(PageSelection::All.contains(7));
        assert!(PageSelection::Range(2, 4).contains(4));
        assert!(!PageSelection::Range(2, 4).contains(1));
        assert!(PageSelection::Set(vec![1, 5]).contains(5));
    }
}
