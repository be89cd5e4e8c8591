//! Embedded text extraction via pdfium, one string per page.
//!
//! pdfium is not async-safe, so every call runs inside
//! `tokio::task::spawn_blocking`.

use crate::error::YutaiError;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// Bind to the pdfium library, downloading it on first use.
pub(crate) fn bind_pdfium() -> Result<Pdfium, YutaiError> {
    pdfium_auto::bind_pdfium_silent().map_err(|e| YutaiError::PdfiumBindingFailed(e.to_string()))
}

/// Map a pdfium load failure to the matching error.
pub(crate) fn load_error(name: &str, password: Option<&str>, err: PdfiumError) -> YutaiError {
    let err_str = format!("{:?}", err);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            YutaiError::WrongPassword {
                name: name.to_string(),
            }
        } else {
            YutaiError::PasswordRequired {
                name: name.to_string(),
            }
        }
    } else {
        YutaiError::CorruptPdf {
            name: name.to_string(),
            detail: err_str,
        }
    }
}

/// Embedded text of every page, in page order.
pub async fn page_texts(
    name: &str,
    bytes: Arc<[u8]>,
    password: Option<&str>,
) -> Result<Vec<String>, YutaiError> {
    let name = name.to_string();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || page_texts_blocking(&name, &bytes, password.as_deref()))
        .await
        .map_err(|e| YutaiError::Internal(format!("Text extraction task panicked: {}", e)))?
}

fn page_texts_blocking(
    name: &str,
    bytes: &[u8],
    password: Option<&str>,
) -> Result<Vec<String>, YutaiError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| load_error(name, password, e))?;

    let pages = document.pages();
    info!("{}: {} pages", name, pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        // A page whose text layer cannot be read counts as empty; OCR may
        // still recover it.
        let text = page.text().map(|t| t.all()).unwrap_or_default();
        debug!("{} page {}: {} chars", name, idx + 1, text.chars().count());
        texts.push(text);
    }
    Ok(texts)
}
