//! Page rasterisation for the OCR fallback.
//!
//! `max_rendered_pixels` caps the longest edge regardless of physical page
//! size so a poster-sized booklet page cannot exhaust memory.

use super::text::{bind_pdfium, load_error};
use crate::error::YutaiError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rasterise every page of a PDF.
///
/// Returns `(page_index_0based, image)` pairs. Pages that fail to render are
/// skipped with a warning.
pub async fn render_pages(
    name: &str,
    bytes: Arc<[u8]>,
    password: Option<&str>,
    max_pixels: u32,
) -> Result<Vec<(usize, DynamicImage)>, YutaiError> {
    let name = name.to_string();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&name, &bytes, password.as_deref(), max_pixels)
    })
    .await
    .map_err(|e| YutaiError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_pages_blocking(
    name: &str,
    bytes: &[u8],
    password: Option<&str>,
    max_pixels: u32,
) -> Result<Vec<(usize, DynamicImage)>, YutaiError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| load_error(name, password, e))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let pages = document.pages();
    let mut results = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        match page.render_with_config(&render_config) {
            Ok(bitmap) => {
                let image = bitmap.as_image();
                debug!(
                    "{} page {} → {}x{} px",
                    name,
                    idx + 1,
                    image.width(),
                    image.height()
                );
                results.push((idx, image));
            }
            Err(e) => warn!("{} page {}: render failed: {:?}", name, idx + 1, e),
        }
    }
    Ok(results)
}
