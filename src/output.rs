//! Output types: store records and the per-source / per-batch reports.
//!
//! Everything here is `Serialize` so the CLI's `--json` mode and any host
//! application can hand the results straight to a front-end.

use crate::error::SourceError;
use crate::extract::Layout;
use serde::{Deserialize, Serialize};

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One store listing extracted from a booklet.
///
/// Extraction fills the textual fields; `lat`/`lng` are attached by
/// [`crate::geocode::Geocoder::geocode_records`] and `distance_km` by
/// [`crate::filter::StoreQuery::apply`]. Nothing else changes after
/// extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub name: String,
    pub address: String,
    pub tel: Option<String>,
    /// Short prefecture name (`東京`, `大阪`, `北海道`).
    pub pref: Option<String>,
    pub company: String,
    pub source_file: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub distance_km: Option<f64>,
}

impl StoreRecord {
    pub fn new(
        company: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            tel: None,
            pref: None,
            company: company.into(),
            source_file: None,
            lat: None,
            lng: None,
            distance_km: None,
        }
    }

    /// Identity used for deduplication.
    pub fn dedup_key(&self) -> (&str, &str, &str) {
        (&self.company, &self.name, &self.address)
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinate { lat, lng }),
            _ => None,
        }
    }

    pub fn set_coordinate(&mut self, coord: Option<Coordinate>) {
        self.lat = coord.map(|c| c.lat);
        self.lng = coord.map(|c| c.lng);
    }
}

/// Result of extracting a single source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Source file name as given (file name for paths, last URL segment for URLs).
    pub source_file: String,
    /// Company label derived from the file name.
    pub company: String,
    /// Layout the extractor dispatched to.
    pub layout: Layout,
    /// Deduplicated records, in document order.
    pub records: Vec<StoreRecord>,
    pub stats: ExtractionStats,
}

/// Statistics for a single extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_pages: usize,
    /// Non-whitespace characters in the text that was kept.
    pub text_chars: usize,
    /// `true` when the OCR candidate replaced the embedded text.
    pub used_ocr: bool,
    /// Records produced before deduplication.
    pub raw_records: usize,
    pub duplicates_removed: usize,
    pub duration_ms: u64,
}

/// Result of extracting many sources with per-source isolation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutput {
    /// Records from every successful source, deduplicated across sources.
    pub records: Vec<StoreRecord>,
    /// One report per source that produced records.
    pub sources: Vec<SourceReport>,
    /// Sources that failed or produced nothing.
    pub failures: Vec<SourceError>,
}

/// Short summary of one successful source inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub source_file: String,
    pub company: String,
    pub layout: Layout,
    pub record_count: usize,
    pub stats: ExtractionStats,
}

/// Counters for a bulk geocoding run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeStats {
    /// Distinct address strings looked up.
    pub unique_addresses: usize,
    /// Addresses answered by the cache (positive or negative).
    pub cache_hits: usize,
    /// Addresses that needed provider requests.
    pub fetched: usize,
    /// Addresses that ended with a coordinate.
    pub resolved: usize,
    /// Addresses that ended without a coordinate.
    pub unresolved: usize,
    /// Records annotated with a coordinate.
    pub records_located: usize,
}
