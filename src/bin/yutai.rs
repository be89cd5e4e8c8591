//! CLI binary for yutai-map.
//!
//! A thin shim over the library crate: maps flags to `ExtractionConfig` /
//! `GeocodeConfig`, runs the batch, then filters and prints the records.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use yutai_map::{
    discover_pdfs, export_csv_to_file, extract_all, BatchOutput, CacheBackend, ExtractionConfig,
    GeocodeConfig, Geocoder, ProgressCallback, ProviderKind, StoreQuery, StoreRecord,
    YutaiProgressCallback,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar reused for both phases: sources during extraction, unique
/// addresses during geocoding. Events may arrive out of order.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize, prefix: &'static str, unit: &str) {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  \
             [{{bar:42.green/238}}] {{pos:>4}}/{{len}} {unit}  \
             ⏱ {{elapsed_precise}}  ETA {{eta_precise}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix(prefix);
    }
}

impl YutaiProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_sources: usize) {
        self.activate_bar(total_sources, "Extracting", "PDFs");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {total_sources} booklets…"))
        ));
    }

    fn on_source_complete(&self, source: &str, record_count: usize) {
        self.bar.println(format!(
            "  {} {:<40}  {}",
            green("✓"),
            source,
            dim(&format!("{record_count:>5} stores")),
        ));
        self.bar.inc(1);
    }

    fn on_source_error(&self, source: &str, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {:<40}  {}", red("✗"), source, red(&msg)));
        self.bar.inc(1);
    }

    fn on_geocode_start(&self, unique_addresses: usize) {
        self.activate_bar(unique_addresses, "Geocoding", "addresses");
    }

    fn on_address_resolved(&self, address: &str, _found: bool) {
        self.bar.set_message(address.to_string());
        self.bar.inc(1);
    }

    fn on_geocode_complete(&self, resolved: usize, unresolved: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} addresses located{}",
            if unresolved == 0 { green("✔") } else { cyan("⚠") },
            bold(&resolved.to_string()),
            if unresolved == 0 {
                String::new()
            } else {
                format!("  ({} not found)", red(&unresolved.to_string()))
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every PDF under ./pdfs, printed as a table
  yutai

  # Specific booklets, saved as CSV
  yutai クリエイト_株主優待.pdf https://example.co.jp/ir/yutai.pdf --csv stores.csv

  # Geocode with a persistent cache and list stores within 2 km of Shibuya
  yutai --geocode --cache yutai-cache.db --near 渋谷 --radius 2

  # Google geocoding, Tokyo and Kanagawa only, JSON output
  yutai --geocode --provider google --pref 東京 --pref 神奈川 --json > stores.json

GEOCODING PROVIDERS:
  Provider     Key       Concurrency  Spacing   Fallback
  ─────────    ────────  ───────────  ────────  ─────────────────────────────
  nominatim    none      3            1100 ms   building → block → municipality
  google       required  10           100 ms    none

ENVIRONMENT VARIABLES:
  GOOGLE_MAPS_API_KEY     Google geocoding key
  YUTAI_PROVIDER          Geocoding provider (nominatim, google)
  YUTAI_CACHE             SQLite geocode cache path
  OPENAI_API_KEY          Vision model for OCR of scanned booklets (or ANTHROPIC_/GEMINI_)
  EDGEQUAKE_LLM_PROVIDER  Override OCR provider
  PDFIUM_LIB_PATH         Path to an existing libpdfium — skips auto-download
"#;

/// Extract and geocode store listings from shareholder-benefit PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "yutai",
    version,
    about = "Extract and geocode store listings from shareholder-benefit (株主優待) PDFs",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF paths or HTTP/HTTPS URLs.
    inputs: Vec<String>,

    /// Directory scanned for *.pdf files. Defaults to ./pdfs when no input is given.
    #[arg(long, env = "YUTAI_DIR")]
    dir: Option<PathBuf>,

    /// Attach coordinates to every record.
    #[arg(long, env = "YUTAI_GEOCODE")]
    geocode: bool,

    /// Geocoding provider: nominatim or google.
    #[arg(long, env = "YUTAI_PROVIDER", default_value = "nominatim")]
    provider: ProviderKind,

    /// API key for authenticated providers.
    #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// SQLite file used as a persistent geocode cache.
    #[arg(long, env = "YUTAI_CACHE")]
    cache: Option<PathBuf>,

    /// Sort by distance from this place (station, district or address). Implies --geocode.
    #[arg(long, env = "YUTAI_NEAR")]
    near: Option<String>,

    /// Keep only stores within this many kilometres of --near.
    #[arg(long, env = "YUTAI_RADIUS", requires = "near")]
    radius: Option<f64>,

    /// Keep only this prefecture (short form, repeatable).
    #[arg(long = "pref", env = "YUTAI_PREF", value_delimiter = ',')]
    prefs: Vec<String>,

    /// Keep stores whose name or address contains this text.
    #[arg(long, env = "YUTAI_KEYWORD")]
    keyword: Option<String>,

    /// Write the records to this CSV file.
    #[arg(long, env = "YUTAI_CSV")]
    csv: Option<PathBuf>,

    /// Print the batch result as JSON instead of a table.
    #[arg(long, env = "YUTAI_JSON")]
    json: bool,

    /// Never fall back to OCR.
    #[arg(long, env = "YUTAI_NO_OCR")]
    no_ocr: bool,

    /// Embedded text below this many characters triggers OCR.
    #[arg(long, env = "YUTAI_MIN_TEXT_CHARS", default_value_t = 200)]
    min_text_chars: usize,

    /// OCR language hint.
    #[arg(long, env = "YUTAI_OCR_LANG", default_value = "jpn+eng")]
    ocr_lang: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "YUTAI_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, env = "YUTAI_QUIET")]
    quiet: bool,

    /// Disable progress bars.
    #[arg(long, env = "YUTAI_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    ensure_pdfium(cli.quiet)?;

    // ── Collect inputs ───────────────────────────────────────────────────
    let mut inputs = cli.inputs.clone();
    let dir = match (&cli.dir, inputs.is_empty()) {
        (Some(d), _) => Some(d.clone()),
        (None, true) => Some(PathBuf::from("pdfs")),
        (None, false) => None,
    };
    if let Some(dir) = dir {
        let found = discover_pdfs(&dir)
            .with_context(|| format!("Failed to list PDFs in {}", dir.display()))?;
        inputs.extend(found.into_iter().map(|p| p.display().to_string()));
    }
    if inputs.is_empty() {
        anyhow::bail!("No PDF inputs given and none found");
    }

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else {
        None
    };

    // ── Extract ──────────────────────────────────────────────────────────
    let mut builder = ExtractionConfig::builder()
        .min_text_chars(cli.min_text_chars)
        .ocr_fallback(!cli.no_ocr)
        .ocr_language(cli.ocr_lang.clone());
    if let Some(cb) = progress.clone() {
        builder = builder.progress_callback(cb);
    }
    let extraction = builder.build().context("Invalid extraction configuration")?;

    let batch = extract_all(&inputs, &extraction)
        .await
        .context("Extraction failed")?;
    if !show_progress && !cli.quiet {
        for failure in &batch.failures {
            eprintln!("{} {}", red("✗"), failure);
        }
    }
    if !cli.quiet {
        eprintln!(
            "{} {} stores from {}/{} booklets",
            green("✔"),
            bold(&batch.records.len().to_string()),
            batch.sources.len(),
            inputs.len()
        );
    }

    // ── Geocode ──────────────────────────────────────────────────────────
    let BatchOutput {
        mut records,
        sources,
        failures,
    } = batch;
    let mut query = StoreQuery::new();
    for p in &cli.prefs {
        query = query.prefecture(p.trim());
    }
    if let Some(k) = &cli.keyword {
        query = query.keyword(k.clone());
    }

    if cli.geocode || cli.near.is_some() {
        let geocoder = build_geocoder(&cli, progress).await?;
        geocoder.geocode_records(&mut records).await;

        if let Some(place) = &cli.near {
            match geocoder.resolve_place(place).await {
                Some(origin) => {
                    query = query.origin(origin);
                    if let Some(km) = cli.radius {
                        query = query.radius_km(km);
                    }
                }
                None => anyhow::bail!("Could not locate '{place}'"),
            }
        }
    }

    let records = query.apply(&records);

    // ── Output ───────────────────────────────────────────────────────────
    if let Some(path) = &cli.csv {
        export_csv_to_file(&records, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!(
                "{}  {} rows  →  {}",
                green("✔"),
                records.len(),
                bold(&path.display().to_string())
            );
        }
    }

    if cli.json {
        let output = BatchOutput {
            records,
            sources,
            failures,
        };
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if cli.csv.is_none() {
        print_table(&records).context("Failed to write to stdout")?;
    }

    Ok(())
}

/// Make sure the pdfium shared library is present, downloading it on the
/// first run.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    #[cfg(feature = "bundled")]
    {
        let _ = quiet;
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_bundled())
            .context("Failed to extract bundled PDFium engine")?;
    }

    #[cfg(not(feature = "bundled"))]
    if !pdfium_auto::is_pdfium_cached() {
        if quiet {
            tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
                .context("Failed to download PDFium engine")?;
        } else {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(TICKS),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            tokio::task::block_in_place(|| {
                pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length().unwrap_or(0) != t {
                            bar.set_length(t);
                        }
                    }
                    bar.set_position(downloaded);
                }))
            })
            .context("Failed to download PDFium engine")?;
            dl_bar.finish_with_message("ready ✓");
        }
    }
    Ok(())
}

/// Map CLI args to a `Geocoder`.
async fn build_geocoder(cli: &Cli, progress: Option<ProgressCallback>) -> Result<Geocoder> {
    let mut builder = GeocodeConfig::builder().provider(cli.provider);
    if let Some(key) = &cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(path) = &cli.cache {
        builder = builder.cache(CacheBackend::Sqlite(path.clone()));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid geocoding configuration")?;
    Geocoder::from_config(&config)
        .await
        .context("Failed to set up geocoder")
}

fn print_table(records: &[StoreRecord]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for r in records {
        let distance = r
            .distance_km
            .map(|d| format!("{d:>6.2}km  "))
            .unwrap_or_default();
        writeln!(
            out,
            "{distance}{}  {}  {}  {}  {}",
            r.company,
            r.name,
            r.pref.as_deref().unwrap_or("-"),
            r.address,
            r.tel.as_deref().unwrap_or("-"),
        )?;
    }
    Ok(())
}
