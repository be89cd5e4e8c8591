//! # yutai-map
//!
//! Extract store listings from Japanese shareholder-benefit (株主優待) PDF
//! booklets and geocode them.
//!
//! Booklets list the stores where benefit vouchers can be used, in layouts
//! that vary from company to company: prefecture-headed line lists, quoted
//! spreadsheet exports, or scanned pages with no text layer at all. This
//! crate reads the text, picks the right parser for the layout, and turns
//! every line into a [`StoreRecord`] with name, address, phone and
//! prefecture. A [`Geocoder`] then attaches coordinates through a cache and a
//! rate-limited provider.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Text      embedded text via pdfium (spawn_blocking)
//!  ├─ 3. OCR       vision-model transcription when the text layer is thin
//!  ├─ 4. Extract   classify layout → line-based / delimited / generic parser
//!  ├─ 5. Dedup     unique by (company, name, address)
//!  └─ 6. Geocode   cache → limiter → provider, progressive fallback
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use yutai_map::{extract_all, ExtractionConfig, GeocodeConfig, Geocoder, StoreQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let batch = extract_all(&["pdfs/クリエイト_株主優待.pdf"], &ExtractionConfig::default()).await?;
//!     let mut records = batch.records;
//!
//!     let geocoder = Geocoder::from_config(&GeocodeConfig::default()).await?;
//!     geocoder.geocode_records(&mut records).await;
//!
//!     if let Some(here) = geocoder.resolve_place("渋谷").await {
//!         for r in StoreQuery::new().origin(here).radius_km(3.0).apply(&records) {
//!             println!("{} {} {:.1}km", r.name, r.address, r.distance_km.unwrap_or_default());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `yutai` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `bundled` | off   | Embed the pdfium library in the binary |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! yutai-map = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod address;
pub mod collect;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod filter;
pub mod geocode;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use collect::{extract, extract_all, extract_from_bytes, extract_from_text, extract_sync};
pub use config::{
    CacheBackend, ExtractionConfig, ExtractionConfigBuilder, GeocodeConfig, GeocodeConfigBuilder,
    ProviderKind,
};
pub use error::{GeocodeError, SourceError, YutaiError};
pub use export::{export_csv_to_file, to_csv};
pub use extract::{company_label, extract_records, Layout};
pub use filter::{haversine_km, maps_search_url, prefectures, StoreQuery};
pub use geocode::{
    Capability, CacheLookup, GeocodeCache, GeocodeProvider, Geocoder, MemoryCache, RateLimiter,
    SqliteCache,
};
pub use output::{
    BatchOutput, Coordinate, ExtractionOutput, ExtractionStats, GeocodeStats, SourceReport,
    StoreRecord,
};
pub use pipeline::input::{discover_pdfs, resolve_source, PdfSource};
pub use progress::{NoopProgressCallback, ProgressCallback, YutaiProgressCallback};
