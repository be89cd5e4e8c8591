//! Extraction entry points: one source, in-memory bytes, or a whole batch.
//!
//! A batch isolates failures per source: an unreadable or empty booklet is
//! recorded in [`BatchOutput::failures`] and the others carry on. Only a
//! batch where no source produced a single record is an error.

use crate::config::ExtractionConfig;
use crate::error::{SourceError, YutaiError};
use crate::extract::{self, company_label};
use crate::output::{BatchOutput, ExtractionOutput, ExtractionStats, SourceReport};
use crate::pipeline::acquire::{acquire_text, AcquiredText};
use crate::pipeline::input::{resolve_source, PdfSource};
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{info, warn};

/// Sources read at the same time within a batch.
const SOURCE_CONCURRENCY: usize = 2;

/// Extract store records from a PDF file or URL.
///
/// # Errors
/// Fatal for this source: unreadable input, not a PDF, corrupt PDF,
/// [`YutaiError::EmptyDocument`] when no text could be read, and
/// [`YutaiError::NoRecords`] when the text matched no layout.
pub async fn extract(
    input: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, YutaiError> {
    let input = input.as_ref();
    info!("Starting extraction: {}", input);
    let source = resolve_source(input, config.download_timeout_secs).await?;
    extract_source(&source, config).await
}

/// Extract store records from PDF bytes already in memory.
///
/// `name` is used for the company label and in reports.
pub async fn extract_from_bytes(
    name: impl Into<String>,
    bytes: Vec<u8>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, YutaiError> {
    let source = PdfSource::from_bytes(name, bytes)?;
    extract_source(&source, config).await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, YutaiError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| YutaiError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input, config))
}

async fn extract_source(
    source: &PdfSource,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, YutaiError> {
    let start = Instant::now();
    let acquired = acquire_text(source, config).await?;
    let mut output = extract_from_text(&source.name, &acquired.text)?;
    let AcquiredText {
        total_pages,
        visible_chars,
        used_ocr,
        ..
    } = acquired;
    output.stats.total_pages = total_pages;
    output.stats.text_chars = visible_chars;
    output.stats.used_ocr = used_ocr;
    output.stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "{}: {} records ({} layout) in {}ms",
        output.source_file,
        output.records.len(),
        output.layout,
        output.stats.duration_ms
    );
    Ok(output)
}

/// Run the extractor over already-acquired text.
///
/// Useful when the text comes from somewhere other than a PDF (a saved OCR
/// transcript, a test fixture).
pub fn extract_from_text(source_file: &str, text: &str) -> Result<ExtractionOutput, YutaiError> {
    let company = company_label(source_file);
    let extraction = extract::extract_records(text, &company);
    if extraction.records.is_empty() {
        return Err(YutaiError::NoRecords {
            name: source_file.to_string(),
        });
    }

    let mut records = extraction.records;
    for r in &mut records {
        r.source_file = Some(source_file.to_string());
    }
    Ok(ExtractionOutput {
        source_file: source_file.to_string(),
        company,
        layout: extraction.layout,
        stats: ExtractionStats {
            raw_records: extraction.raw_records,
            duplicates_removed: extraction.raw_records - records.len(),
            ..Default::default()
        },
        records,
    })
}

/// Extract many sources with per-source isolation.
///
/// Records from every successful source are concatenated in input order and
/// deduplicated across sources.
///
/// # Errors
/// [`YutaiError::AllSourcesFailed`] when no source produced a record.
pub async fn extract_all<S: AsRef<str>>(
    inputs: &[S],
    config: &ExtractionConfig,
) -> Result<BatchOutput, YutaiError> {
    let total = inputs.len();
    if let Some(cb) = &config.progress_callback {
        cb.on_extraction_start(total);
    }
    info!("Extracting {} sources", total);

    let results: Vec<(String, Result<ExtractionOutput, YutaiError>)> =
        stream::iter(inputs.iter().map(|i| i.as_ref().to_string()))
            .map(|input| async move {
                let result = extract(&input, config).await;
                (input, result)
            })
            .buffered(SOURCE_CONCURRENCY)
            .collect()
            .await;

    let mut batch = BatchOutput::default();
    let mut records = Vec::new();
    for (input, result) in results {
        match result {
            Ok(output) => {
                if let Some(cb) = &config.progress_callback {
                    cb.on_source_complete(&output.source_file, output.records.len());
                }
                batch.sources.push(SourceReport {
                    source_file: output.source_file,
                    company: output.company,
                    layout: output.layout,
                    record_count: output.records.len(),
                    stats: output.stats,
                });
                records.extend(output.records);
            }
            Err(e) => {
                let failure: SourceError = e.into_source_error(&display_name(&input));
                warn!("{}", failure);
                if let Some(cb) = &config.progress_callback {
                    cb.on_source_error(failure.source_name(), &failure.to_string());
                }
                batch.failures.push(failure);
            }
        }
    }

    batch.records = extract::dedup(records);
    if batch.records.is_empty() {
        return Err(YutaiError::AllSourcesFailed {
            total,
            first_error: batch
                .failures
                .first()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "no sources given".to_string()),
        });
    }
    info!(
        "Batch done: {} records from {}/{} sources",
        batch.records.len(),
        batch.sources.len(),
        total
    );
    Ok(batch)
}

/// File name part of a path or URL, for failure reports.
fn display_name(input: &str) -> String {
    input
        .rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or(input)
        .to_string()
}
