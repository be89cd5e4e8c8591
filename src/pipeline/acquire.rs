//! Text acquisition for one source: embedded text first, OCR when thin.
//!
//! When the embedded text has fewer than `min_text_chars` non-whitespace
//! characters, an OCR candidate is produced and whichever candidate has more
//! non-whitespace characters is kept. OCR problems (no provider, render
//! failure, every page failing) are logged and leave the embedded text in
//! place.

use super::input::PdfSource;
use super::normalize::visible_chars;
use super::{ocr, render, text};
use crate::config::ExtractionConfig;
use crate::error::YutaiError;
use tracing::{info, warn};

/// Text chosen for a source.
#[derive(Debug, Clone)]
pub struct AcquiredText {
    pub text: String,
    pub total_pages: usize,
    /// Non-whitespace characters in `text`.
    pub visible_chars: usize,
    pub used_ocr: bool,
}

/// Keep the candidate with more visible characters; ties keep the embedded text.
pub fn select_candidate(embedded: String, ocr: Option<String>) -> (String, bool) {
    match ocr {
        Some(o) if visible_chars(&o) > visible_chars(&embedded) => (o, true),
        _ => (embedded, false),
    }
}

/// `true` when embedded text is too thin to trust on its own.
pub fn needs_ocr(embedded_chars: usize, config: &ExtractionConfig) -> bool {
    config.ocr_fallback && embedded_chars < config.min_text_chars
}

/// Read the source's text, falling back to OCR when the embedded text is thin.
///
/// # Errors
/// pdfium failures are returned as-is; [`YutaiError::EmptyDocument`] when
/// no candidate has a single visible character.
pub async fn acquire_text(
    source: &PdfSource,
    config: &ExtractionConfig,
) -> Result<AcquiredText, YutaiError> {
    let pages = text::page_texts(
        &source.name,
        source.bytes.clone(),
        config.password.as_deref(),
    )
    .await?;
    let total_pages = pages.len();
    let embedded = pages.join("\n");
    let embedded_chars = visible_chars(&embedded);

    let ocr_text = if needs_ocr(embedded_chars, config) {
        info!(
            "{}: embedded text has {} chars (< {}), trying OCR",
            source.name, embedded_chars, config.min_text_chars
        );
        ocr_candidate(source, config).await
    } else {
        None
    };

    let (text, used_ocr) = select_candidate(embedded, ocr_text);
    let chars = visible_chars(&text);
    if chars == 0 {
        return Err(YutaiError::EmptyDocument {
            name: source.name.clone(),
        });
    }
    if used_ocr {
        info!("{}: using OCR text ({} chars)", source.name, chars);
    }

    Ok(AcquiredText {
        text,
        total_pages,
        visible_chars: chars,
        used_ocr,
    })
}

async fn ocr_candidate(source: &PdfSource, config: &ExtractionConfig) -> Option<String> {
    let provider = match ocr::resolve_provider(config) {
        Ok(p) => p,
        Err(e) => {
            warn!("{}: OCR skipped: {}", source.name, e);
            return None;
        }
    };
    let images = match render::render_pages(
        &source.name,
        source.bytes.clone(),
        config.password.as_deref(),
        config.max_rendered_pixels,
    )
    .await
    {
        Ok(images) => images,
        Err(e) => {
            warn!("{}: OCR skipped, render failed: {}", source.name, e);
            return None;
        }
    };
    let text = ocr::transcribe_document(&provider, images, config).await;
    (!text.trim().is_empty()).then_some(text)
}
