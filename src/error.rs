//! Error types for the yutai-map library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`YutaiError`] — **Fatal** for the call that returns it: the input
//!   cannot be read at all, the configuration is invalid, the cache backend
//!   is unusable, or a whole batch produced nothing.
//!
//! * [`SourceError`] — **Non-fatal**: a single PDF failed (unreadable, no
//!   text, no store lines) but the other sources in the batch are fine. Stored
//!   in [`crate::output::BatchOutput::failures`] so callers can report them
//!   without losing the rest of the job.
//!
//! * [`GeocodeError`] — a single provider request failed. The resolver logs
//!   it and treats it exactly like "no coordinate found"; it never aborts a
//!   bulk geocoding run.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the yutai-map library.
#[derive(Debug, Error)]
pub enum YutaiError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("'{name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not parse the document.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    PdfiumBindingFailed(String),

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Neither embedded text nor OCR produced a single visible character.
    #[error("No text could be extracted from '{name}'")]
    EmptyDocument { name: String },

    /// Text was present but no line matched any known store-list layout.
    #[error("No store records found in '{name}'")]
    NoRecords { name: String },

    /// Every source in a batch failed or yielded nothing.
    #[error("All {total} sources failed to produce store records.\nFirst error: {first_error}")]
    AllSourcesFailed { total: usize, first_error: String },

    // ── Geocoding errors ──────────────────────────────────────────────────
    /// The geocode cache backend could not be opened or queried.
    #[error("Geocode cache error: {0}")]
    Cache(String),

    /// The selected provider is not usable (missing API key, bad endpoint).
    #[error("Geocoding provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl YutaiError {
    /// Classify a fatal single-source error as a per-source batch failure.
    pub fn into_source_error(self, source: &str) -> SourceError {
        match self {
            YutaiError::EmptyDocument { .. } => SourceError::EmptyDocument {
                name: source.to_string(),
            },
            YutaiError::NoRecords { .. } => SourceError::NoRecords {
                name: source.to_string(),
            },
            other => SourceError::AcquisitionFailed {
                name: source.to_string(),
                detail: other.to_string(),
            },
        }
    }
}

impl From<sqlx::Error> for YutaiError {
    fn from(e: sqlx::Error) -> Self {
        YutaiError::Cache(e.to_string())
    }
}

/// A non-fatal error for a single source in a batch.
///
/// Acquisition failures and empty extractions are distinct conditions so a
/// report can tell "this file is broken" apart from "this file has no store
/// list we understand".
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SourceError {
    /// The PDF could not be read (missing, corrupt, not a PDF, download failed).
    #[error("{name}: PDF could not be read: {detail}")]
    AcquisitionFailed { name: String, detail: String },

    /// No text was extracted, even after OCR.
    #[error("{name}: no text could be extracted")]
    EmptyDocument { name: String },

    /// Text was extracted but no store record matched.
    #[error("{name}: no store records found")]
    NoRecords { name: String },
}

impl SourceError {
    /// Name of the source this error belongs to.
    pub fn source_name(&self) -> &str {
        match self {
            SourceError::AcquisitionFailed { name, .. }
            | SourceError::EmptyDocument { name }
            | SourceError::NoRecords { name } => name,
        }
    }
}

/// Failure of a single geocoding request.
///
/// Every variant means the same thing to the caller: no coordinate for this
/// attempt. The distinction only exists for diagnostics.
#[derive(Debug, Clone, Error)]
pub enum GeocodeError {
    /// Connection refused, DNS failure, TLS error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request exceeded its per-call timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Non-2xx HTTP status (429 rate-limit rejections land here).
    #[error("HTTP {status}")]
    HttpStatus { status: u16 },

    /// The body could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The provider answered with an explicit error status.
    #[error("provider status {0}")]
    ProviderStatus(String),
}

impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GeocodeError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            GeocodeError::HttpStatus {
                status: status.as_u16(),
            }
        } else {
            GeocodeError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sources_failed_display() {
        let e = YutaiError::AllSourcesFailed {
            total: 3,
            first_error: "broken.pdf: PDF could not be read".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 3 sources"), "got: {msg}");
        assert!(msg.contains("broken.pdf"));
    }

    #[test]
    fn empty_document_maps_to_distinct_source_error() {
        let e = YutaiError::EmptyDocument {
            name: "a.pdf".into(),
        };
        match e.into_source_error("a.pdf") {
            SourceError::EmptyDocument { name } => assert_eq!(name, "a.pdf"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn corrupt_pdf_maps_to_acquisition_failure() {
        let e = YutaiError::CorruptPdf {
            name: "b.pdf".into(),
            detail: "xref".into(),
        };
        let se = e.into_source_error("b.pdf");
        assert!(matches!(se, SourceError::AcquisitionFailed { .. }));
        assert_eq!(se.source_name(), "b.pdf");
        assert!(se.to_string().contains("xref"));
    }

    #[test]
    fn geocode_timeout_display() {
        let e = GeocodeError::Timeout { secs: 10 };
        assert!(e.to_string().contains("10s"));
    }
}
