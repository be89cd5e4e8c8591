//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! pdfium reads straight from a byte slice, so URLs are downloaded into
//! memory rather than a temp file. The `%PDF` magic is checked before
//! returning so callers get a meaningful error rather than a pdfium failure.

use crate::error::YutaiError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A PDF read into memory, with the name used for company labels and reports.
#[derive(Debug, Clone)]
pub struct PdfSource {
    /// File name (local path) or last URL segment.
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl PdfSource {
    /// Wrap in-memory bytes, validating the PDF magic.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, YutaiError> {
        let name = name.into();
        check_magic(&name, &bytes)?;
        Ok(Self {
            name,
            bytes: Arc::from(bytes),
        })
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to PDF bytes.
///
/// URLs are downloaded under `timeout_secs`; local files are checked for
/// existence and read permission.
pub async fn resolve_source(input: &str, timeout_secs: u64) -> Result<PdfSource, YutaiError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else if input.trim().is_empty() {
        Err(YutaiError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        read_local(input).await
    }
}

fn check_magic(name: &str, bytes: &[u8]) -> Result<(), YutaiError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(YutaiError::NotAPdf {
            name: name.to_string(),
            magic,
        });
    }
    Ok(())
}

async fn read_local(path_str: &str) -> Result<PdfSource, YutaiError> {
    let path = PathBuf::from(path_str);
    if !path.exists() {
        return Err(YutaiError::FileNotFound { path });
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(YutaiError::PermissionDenied { path });
        }
        Err(_) => return Err(YutaiError::FileNotFound { path }),
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());
    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    PdfSource::from_bytes(name, bytes)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<PdfSource, YutaiError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| YutaiError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let to_error = |e: reqwest::Error| {
        if e.is_timeout() {
            YutaiError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            YutaiError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(to_error)?;
    if !response.status().is_success() {
        return Err(YutaiError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(to_error)?;
    info!("Downloaded {} bytes", bytes.len());
    PdfSource::from_bytes(extract_filename(url), bytes.to_vec())
}

/// Last path segment of the URL if it looks like a file name.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return urlencoding::decode(last)
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| last.to_string());
                }
            }
        }
    }
    "downloaded.pdf".to_string()
}

/// `*.pdf` files directly inside `dir`, sorted by file name.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, YutaiError> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => YutaiError::PermissionDenied {
            path: dir.to_path_buf(),
        },
        _ => YutaiError::FileNotFound {
            path: dir.to_path_buf(),
        },
    })?;

    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort();
    debug!("Discovered {} PDFs in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn magic_is_checked() {
        assert!(PdfSource::from_bytes("a.pdf", b"%PDF-1.7\n".to_vec()).is_ok());
        match PdfSource::from_bytes("b.pdf", b"PK\x03\x04".to_vec()) {
            Err(YutaiError::NotAPdf { name, magic }) => {
                assert_eq!(name, "b.pdf");
                assert_eq!(&magic, b"PK\x03\x04");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            PdfSource::from_bytes("c.pdf", b"%P".to_vec()),
            Err(YutaiError::NotAPdf { .. })
        ));
    }

    #[test]
    fn filename_from_url() {
        assert_eq!(
            extract_filename("https://example.com/ir/%E5%84%AA%E5%BE%85.pdf"),
            "優待.pdf"
        );
        assert_eq!(extract_filename("https://example.com/"), "downloaded.pdf");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_source("/nonexistent/クリエイト.pdf", 5).await;
        assert!(matches!(err, Err(YutaiError::FileNotFound { .. })));
        assert!(matches!(
            resolve_source("  ", 5).await,
            Err(YutaiError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn local_file_keeps_its_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("すかいらーく_優待.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%%EOF").expect("write");
        let src = resolve_source(path.to_str().expect("utf8"), 5)
            .await
            .expect("resolve");
        assert_eq!(src.name, "すかいらーく_優待.pdf");
        assert_eq!(&src.bytes[..4], b"%PDF");
    }

    #[test]
    fn discover_sorts_and_filters() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.pdf", "a.PDF", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"%PDF").expect("write");
        }
        std::fs::create_dir(dir.path().join("sub.pdf")).expect("mkdir");
        let found = discover_pdfs(dir.path()).expect("discover");
        let names: Vec<_> = found
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }
}
