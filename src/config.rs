//! Configuration types for extraction and geocoding.
//!
//! Extraction is controlled by [`ExtractionConfig`], geocoding by
//! [`GeocodeConfig`]. Both are built through builders so callers set only
//! what they care about and rely on documented defaults for the rest.

use crate::error::YutaiError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for reading booklets and extracting store records.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use yutai_map::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .min_text_chars(300)
///     .ocr_language("jpn")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Embedded text with fewer non-whitespace characters than this triggers
    /// the OCR fallback. Default: 200.
    pub min_text_chars: usize,

    /// Whether to attempt OCR when the embedded text is too thin. Default: true.
    pub ocr_fallback: bool,

    /// Language hint forwarded to the OCR stage (`"jpn+eng"` style). Default: `"jpn+eng"`.
    pub ocr_language: String,

    /// Vision model identifier used for OCR. If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed vision provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Number of pages transcribed concurrently during OCR. Default: 4.
    pub ocr_concurrency: usize,

    /// Maximum retry attempts on a transient OCR call failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Maximum rendered page dimension in pixels for OCR rasters. Default: 2000.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted booklets.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-OCR-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Optional per-source progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 200,
            ocr_fallback: true,
            ocr_language: "jpn+eng".to_string(),
            model: None,
            provider_name: None,
            provider: None,
            ocr_concurrency: 4,
            max_retries: 3,
            retry_backoff_ms: 500,
            max_rendered_pixels: 2000,
            password: None,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("min_text_chars", &self.min_text_chars)
            .field("ocr_fallback", &self.ocr_fallback)
            .field("ocr_language", &self.ocr_language)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("ocr_concurrency", &self.ocr_concurrency)
            .field("max_retries", &self.max_retries)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn ocr_fallback(mut self, v: bool) -> Self {
        self.config.ocr_fallback = v;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn ocr_concurrency(mut self, n: usize) -> Self {
        self.config.ocr_concurrency = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, YutaiError> {
        let c = &self.config;
        if c.ocr_language.trim().is_empty() {
            return Err(YutaiError::InvalidConfig(
                "OCR language hint must not be empty".into(),
            ));
        }
        if c.ocr_concurrency == 0 {
            return Err(YutaiError::InvalidConfig(
                "OCR concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Geocoding ────────────────────────────────────────────────────────────

/// Which external geocoding service to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenStreetMap Nominatim: free, unauthenticated, strict usage policy.
    #[default]
    Nominatim,
    /// Google Geocoding API: paid, requires an API key.
    Google,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Nominatim => "nominatim",
            ProviderKind::Google => "google",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = YutaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nominatim" | "osm" => Ok(ProviderKind::Nominatim),
            "google" => Ok(ProviderKind::Google),
            other => Err(YutaiError::InvalidConfig(format!(
                "unknown geocoding provider '{other}' (expected nominatim or google)"
            ))),
        }
    }
}

/// Where geocode results are cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheBackend {
    /// Process-lifetime map; use `MemoryCache::save`/`load` to carry it across runs.
    #[default]
    Memory,
    /// Durable SQLite table at the given path, created if absent.
    Sqlite(PathBuf),
}

/// Configuration for the geocoding stage.
///
/// # Example
/// ```rust
/// use yutai_map::{GeocodeConfig, ProviderKind};
///
/// let config = GeocodeConfig::builder()
///     .provider(ProviderKind::Google)
///     .api_key("AIza...")
///     .build()
///     .unwrap();
/// assert_eq!(config.effective_concurrency(), 10);
/// ```
#[derive(Clone)]
pub struct GeocodeConfig {
    /// Default: Nominatim.
    pub provider: ProviderKind,

    /// Credential for authenticated providers. Never logged.
    pub api_key: Option<String>,

    /// In-flight request ceiling. If None, uses the provider's default
    /// (3 for Nominatim, 10 for Google).
    pub concurrency: Option<usize>,

    /// Minimum spacing between request starts across all workers. If None,
    /// uses the provider's default (1100 ms for Nominatim, 100 ms for Google).
    pub min_interval_ms: Option<u64>,

    /// Per-request timeout in seconds, clamped to 1–60. Default: 10.
    pub request_timeout_secs: u64,

    /// Default: in-memory.
    pub cache: CacheBackend,

    /// User-Agent sent to the provider. Nominatim rejects requests without one.
    pub user_agent: String,

    /// Override the provider endpoint (self-hosted Nominatim, tests).
    pub base_url: Option<String>,

    /// Optional per-address progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: None,
            concurrency: None,
            min_interval_ms: None,
            request_timeout_secs: 10,
            cache: CacheBackend::default(),
            user_agent: format!("yutai-map/{}", env!("CARGO_PKG_VERSION")),
            base_url: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GeocodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeocodeConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("concurrency", &self.concurrency)
            .field("min_interval_ms", &self.min_interval_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("cache", &self.cache)
            .field("user_agent", &self.user_agent)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeocodeConfig {
    /// Create a new builder for `GeocodeConfig`.
    pub fn builder() -> GeocodeConfigBuilder {
        GeocodeConfigBuilder {
            config: Self::default(),
        }
    }

    /// In-flight ceiling after applying the provider default.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency
            .unwrap_or_else(|| crate::geocode::Capability::of(self.provider).default_concurrency())
    }

    /// Request spacing after applying the provider default.
    pub fn effective_min_interval(&self) -> Duration {
        self.min_interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| crate::geocode::Capability::of(self.provider).default_min_interval())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Builder for [`GeocodeConfig`].
#[derive(Debug)]
pub struct GeocodeConfigBuilder {
    config: GeocodeConfig,
}

impl GeocodeConfigBuilder {
    pub fn provider(mut self, kind: ProviderKind) -> Self {
        self.config.provider = kind;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = Some(n.max(1));
        self
    }

    pub fn min_interval_ms(mut self, ms: u64) -> Self {
        self.config.min_interval_ms = Some(ms);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.clamp(1, 60);
        self
    }

    pub fn cache(mut self, backend: CacheBackend) -> Self {
        self.config.cache = backend;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GeocodeConfig, YutaiError> {
        let c = &self.config;
        let has_key = c.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
        if c.provider == ProviderKind::Google && !has_key {
            return Err(YutaiError::ProviderNotConfigured {
                provider: c.provider.as_str().into(),
                hint: "Set GOOGLE_MAPS_API_KEY or pass --api-key.".into(),
            });
        }
        if c.user_agent.trim().is_empty() {
            return Err(YutaiError::InvalidConfig(
                "User-Agent must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.min_text_chars, 200);
        assert!(c.ocr_fallback);
        assert_eq!(c.ocr_language, "jpn+eng");
        assert_eq!(c.max_retries, 3);
    }

    #[test]
    fn extraction_rejects_empty_language() {
        let err = ExtractionConfig::builder().ocr_language("  ").build();
        assert!(matches!(err, Err(YutaiError::InvalidConfig(_))));
    }

    #[test]
    fn google_requires_api_key() {
        let err = GeocodeConfig::builder()
            .provider(ProviderKind::Google)
            .build();
        assert!(matches!(err, Err(YutaiError::ProviderNotConfigured { .. })));
    }

    #[test]
    fn provider_defaults_apply() {
        let free = GeocodeConfig::builder().build().expect("valid");
        assert_eq!(free.effective_concurrency(), 3);
        assert_eq!(free.effective_min_interval(), Duration::from_millis(1100));

        let paid = GeocodeConfig::builder()
            .provider(ProviderKind::Google)
            .api_key("k")
            .concurrency(4)
            .build()
            .expect("valid");
        assert_eq!(paid.effective_concurrency(), 4);
        assert_eq!(paid.effective_min_interval(), Duration::from_millis(100));
    }

    #[test]
    fn timeout_is_clamped() {
        let c = GeocodeConfig::builder()
            .request_timeout_secs(600)
            .build()
            .expect("valid");
        assert_eq!(c.request_timeout_secs, 60);
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let c = GeocodeConfig::builder()
            .provider(ProviderKind::Google)
            .api_key("secret-key")
            .build()
            .expect("valid");
        assert!(!format!("{c:?}").contains("secret-key"));
    }

    #[test]
    fn provider_kind_from_str() {
        assert_eq!("Google".parse::<ProviderKind>().ok(), Some(ProviderKind::Google));
        assert!("bing".parse::<ProviderKind>().is_err());
    }
}
