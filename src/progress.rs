//! Progress-callback trait for per-page render events.
//!
//! Inject an [`Arc<dyn RenderProgressCallback>`] via
//! [`crate::config::LabelingConfigBuilder::progress_callback`]. The CLI uses
//! it to drive an `indicatif` bar; library callers can forward events
//! anywhere.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doclabel::{LabelingConfig, RenderProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl RenderProgressCallback for Counter {
//!     fn on_page_rendered(&self, _page: usize, _total: usize, _w: u32, _h: u32) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = LabelingConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the renderer as it rasterises each page.
///
/// Rendering happens on a blocking worker thread, so implementations must be
/// `Send + Sync`. Every method defaults to a no-op.
pub trait RenderProgressCallback: Send + Sync {
    /// Called once before the first page, with the number of selected pages.
    fn on_render_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page image has been written.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — number of selected pages
    /// * `width`, `height` — rendered size in pixels
    fn on_page_rendered(&self, page_num: usize, total_pages: usize, width: u32, height: u32) {
        let _ = (page_num, total_pages, width, height);
    }

    /// Called once after the last page.
    fn on_render_complete(&self, rendered: usize) {
        let _ = rendered;
    }
}

/// Default callback; ignores every event.
pub struct NoopProgressCallback;

impl RenderProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::config::LabelingConfig`].
pub type ProgressCallback = Arc<dyn RenderProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Tracking {
        total: AtomicUsize,
        pages: Mutex<Vec<(usize, u32, u32)>>,
        done: AtomicUsize,
    }

    impl RenderProgressCallback for Tracking {
        fn on_render_start(&self, total_pages: usize) {
            self.total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_rendered(&self, page_num: usize, _total: usize, width: u32, height: u32) {
            self.pages.lock().unwrap().push((page_num, width, height));
        }

        fn on_render_complete(&self, rendered: usize) {
            self.done.store(rendered, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_render_start(2);
        cb.on_page_rendered(1, 2, 100, 200);
        cb.on_render_complete(2);
    }

    #[test]
    fn tracking_callback_through_arc_dyn() {
        let tracker = Arc::new(Tracking::default());
        let cb: ProgressCallback = tracker.clone();

        cb.on_render_start(2);
        cb.on_page_rendered(1, 2, 1545, 2000);
        cb.on_page_rendered(2, 2, 1545, 2000);
        cb.on_render_complete(2);

        assert_eq!(tracker.total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.pages.lock().unwrap().len(), 2);
        assert_eq!(tracker.pages.lock().unwrap()[1], (2, 1545, 2000));
        assert_eq!(tracker.done.load(Ordering::SeqCst), 2);
    }
}
