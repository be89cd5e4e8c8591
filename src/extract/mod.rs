//! Format-dispatching store-record extractor.
//!
//! Booklets come in a handful of layouts. Rather than one parser full of
//! special cases, the raw text is classified once by [`classify`] and handed
//! to exactly one independent layout parser:
//!
//! ```text
//! text ──▶ clean_text ──▶ classify ──┬─▶ line_based  (prefecture headers + phone-anchored lines)
//!                                    ├─▶ delimited   ("name","address","tel" rows)
//!                                    └─▶ generic     (OCR output, column splits, postal-code pairs)
//!                                               │
//!                                               ▼
//!                                            dedup ──▶ Vec<StoreRecord>
//! ```
//!
//! Each parser is a pure `&str -> Vec<StoreRecord>` function. The only
//! dispatch-level fallback is re-running the text through the generic
//! parser when the classified layout produced nothing.

pub mod delimited;
pub mod generic;
pub mod line_based;

use crate::address::{find_address_start, find_phone};
use crate::output::StoreRecord;
use crate::pipeline::normalize::clean_text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Minimum number of quote-comma-quote lines before a document counts as
/// delimited.
pub const DELIMITED_MIN_ROWS: usize = 3;

/// Minimum share (in percent) of non-empty lines that must carry the
/// quote-comma-quote sequence.
pub const DELIMITED_MIN_DENSITY_PCT: usize = 30;

/// Store-list layout detected in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// Prefecture section headers followed by one store per line, each
    /// anchored by a phone number.
    LineBased,
    /// Quoted, comma-separated rows exported from a spreadsheet.
    Delimited,
    /// Anything else: OCR text, unlabeled column dumps.
    Generic,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::LineBased => "line-based",
            Layout::Delimited => "delimited",
            Layout::Generic => "generic",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cleaned document text with its detected layout.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub layout: Layout,
}

impl Document {
    /// Clean `raw` and classify the result.
    pub fn new(raw: &str) -> Self {
        let text = clean_text(raw);
        let layout = classify(&text);
        Self { text, layout }
    }
}

/// Records extracted from one document.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Layout that produced the records (after any generic re-run).
    pub layout: Layout,
    /// Deduplicated records in document order.
    pub records: Vec<StoreRecord>,
    /// Records produced before deduplication.
    pub raw_records: usize,
}

/// Classify cleaned document text into a [`Layout`].
///
/// * Delimited — at least [`DELIMITED_MIN_ROWS`] lines contain `","` and they
///   make up at least [`DELIMITED_MIN_DENSITY_PCT`] % of the non-empty lines,
///   so an incidental quoted phrase in a line-based booklet does not flip the
///   layout.
/// * Line-based — some line carries a phone number with a locatable address
///   before it.
/// * Generic — everything else.
pub fn classify(text: &str) -> Layout {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Layout::Generic;
    }

    let quoted = lines.iter().filter(|l| l.contains("\",\"")).count();
    if quoted >= DELIMITED_MIN_ROWS && quoted * 100 >= lines.len() * DELIMITED_MIN_DENSITY_PCT {
        return Layout::Delimited;
    }

    let anchored = lines.iter().any(|l| {
        find_phone(l).is_some_and(|p| find_address_start(&l[..p.start]).is_some())
    });
    if anchored {
        Layout::LineBased
    } else {
        Layout::Generic
    }
}

/// Run the parser for `layout` over already-cleaned text.
pub fn parse_layout(layout: Layout, text: &str, company: &str) -> Vec<StoreRecord> {
    match layout {
        Layout::LineBased => line_based::parse(text, company),
        Layout::Delimited => delimited::parse(text, company),
        Layout::Generic => generic::parse(text, company),
    }
}

/// Extract deduplicated store records from raw document text.
pub fn extract_records(raw: &str, company: &str) -> Extraction {
    let doc = Document::new(raw);
    let mut layout = doc.layout;
    let mut records = parse_layout(layout, &doc.text, company);

    if records.is_empty() && layout != Layout::Generic {
        debug!("{} layout produced no records, re-running as generic", layout);
        layout = Layout::Generic;
        records = generic::parse(&doc.text, company);
    }

    let raw_records = records.len();
    let records = dedup(records);
    debug!(
        "Extracted {} records ({} duplicates dropped) with {} layout",
        records.len(),
        raw_records - records.len(),
        layout
    );

    Extraction {
        layout,
        records,
        raw_records,
    }
}

/// Drop records whose `(company, name, address)` was already seen.
///
/// Stable: the first occurrence wins and relative order is preserved.
pub fn dedup(records: Vec<StoreRecord>) -> Vec<StoreRecord> {
    let mut seen: HashSet<(String, String, String)> = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| {
            let (company, name, address) = r.dedup_key();
            seen.insert((company.to_owned(), name.to_owned(), address.to_owned()))
        })
        .collect()
}

static RE_COMPANY_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d+年度?|\d+|株主優待|優待|案内|ご利用|ガイド|\.pdf|pdf|[_\-\s]").unwrap()
});

/// Derive a company label from a source file name.
///
/// Strips digits, year tokens, boilerplate words and the extension:
/// `クリエイト_株主優待_2024年度.pdf` → `クリエイト`. Falls back to the
/// raw file name when nothing is left.
pub fn company_label(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let label = RE_COMPANY_NOISE.replace_all(base, "");
    let label = label.trim();
    if label.is_empty() {
        base.to_string()
    } else {
        label.to_string()
    }
}
