//! PDF rasterisation: render selected pages to JPEG files via pdfium.
//!
//! pdfium keeps thread-local state and blocks for the whole render, so the
//! work runs inside `tokio::task::spawn_blocking`. `max_rendered_pixels`
//! caps the longest edge regardless of physical page size; labels are later
//! normalised against whatever pixel size comes out.

use crate::config::LabelingConfig;
use crate::error::LabelError;
use crate::geometry::Page;
use crate::persist::read_json;
use crate::progress::ProgressCallback;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Bind to pdfium: `PDFIUM_LIB_PATH` when set, the system library otherwise.
pub fn bind_pdfium() -> Result<Pdfium, LabelError> {
    match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(path) => Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| LabelError::PdfiumUnavailable {
                location: PathBuf::from(path).display().to_string(),
                reason: e.to_string(),
            }),
        None => Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| LabelError::PdfiumUnavailable {
                location: "system library path".to_string(),
                reason: e.to_string(),
            }),
    }
}

/// File name of the rendered image for 1-based `page_number`:
/// `{pdf file name}.page_{n}.jpg`.
pub fn page_image_name(pdf_path: &Path, page_number: usize) -> String {
    let file_name = pdf_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());
    format!("{}.page_{}.jpg", file_name, page_number)
}

/// Rasterise the selected pages of a PDF into `config.images_dir`.
///
/// # Returns
/// One [`Page`] per rendered page, in page order, each carrying the path of
/// its JPEG.
pub async fn render_pages(pdf_path: &Path, config: &LabelingConfig) -> Result<Vec<Page>, LabelError> {
    if !pdf_path.exists() {
        return Err(LabelError::FileNotFound {
            path: pdf_path.to_path_buf(),
        });
    }

    let job = RenderJob {
        pdf_path: pdf_path.to_path_buf(),
        images_dir: config.images_dir.clone(),
        max_pixels: config.max_rendered_pixels,
        password: config.password.clone(),
        selection: config.pages.clone(),
        progress: config.progress_callback.clone(),
    };

    tokio::task::spawn_blocking(move || job.run())
        .await
        .map_err(|e| LabelError::Internal(format!("Render task panicked: {}", e)))?
}

/// Read a page list (`[{number, width, height, imagePath?}]`) produced by an
/// earlier `render` run or by an external renderer.
pub fn read_page_list(path: &Path) -> Result<Vec<Page>, LabelError> {
    let mut pages: Vec<Page> = read_json(path)?;
    pages.sort_by_key(|p| p.number);
    info!("Loaded {} pages from {}", pages.len(), path.display());
    Ok(pages)
}

struct RenderJob {
    pdf_path: PathBuf,
    images_dir: PathBuf,
    max_pixels: u32,
    password: Option<String>,
    selection: crate::config::PageSelection,
    progress: ProgressCallback,
}

impl RenderJob {
    fn run(self) -> Result<Vec<Page>, LabelError> {
        let pdfium = bind_pdfium()?;
        let password = self.password.as_deref();

        let document = pdfium
            .load_pdf_from_file(&self.pdf_path, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        LabelError::WrongPassword {
                            path: self.pdf_path.clone(),
                        }
                    } else {
                        LabelError::PasswordRequired {
                            path: self.pdf_path.clone(),
                        }
                    }
                } else {
                    LabelError::CorruptPdf {
                        path: self.pdf_path.clone(),
                        detail: err_str,
                    }
                }
            })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        let indices = self.selection.to_indices(total_pages);
        info!(
            "PDF loaded: {} pages, rendering {}",
            total_pages,
            indices.len()
        );
        if indices.is_empty() {
            warn!("Page selection {:?} matches no page", self.selection);
        }

        std::fs::create_dir_all(&self.images_dir).map_err(|e| LabelError::OutputWriteFailed {
            path: self.images_dir.clone(),
            source: e,
        })?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        self.progress.on_render_start(indices.len());
        let mut rendered = Vec::with_capacity(indices.len());

        for idx in indices.iter().copied() {
            let number = idx + 1;
            let page = pages
                .get(idx as u16)
                .map_err(|e| LabelError::RasterisationFailed {
                    page: number,
                    detail: format!("{:?}", e),
                })?;

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                LabelError::RasterisationFailed {
                    page: number,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            let image_path = self
                .images_dir
                .join(page_image_name(&self.pdf_path, number));
            image
                .to_rgb8()
                .save_with_format(&image_path, ImageFormat::Jpeg)
                .map_err(|e| LabelError::RasterisationFailed {
                    page: number,
                    detail: format!("saving {}: {}", image_path.display(), e),
                })?;

            debug!(
                "Rendered page {} → {}x{} px ({})",
                number,
                image.width(),
                image.height(),
                image_path.display()
            );
            self.progress
                .on_page_rendered(number, indices.len(), image.width(), image.height());

            rendered.push(Page {
                number,
                width: image.width(),
                height: image.height(),
                image_path: Some(image_path),
            });
        }

        self.progress.on_render_complete(rendered.len());
        Ok(rendered)
    }
}
