//! OCR fallback: page images → text through a vision LLM.
//!
//! ## Retry Strategy
//!
//! 429 / 503 responses are transient under concurrent load. Exponential
//! backoff (`retry_backoff_ms * 2^attempt`) keeps concurrent workers from
//! retrying in lockstep: with 500 ms base and 3 retries the waits are
//! 500 ms → 1 s → 2 s.

use crate::config::ExtractionConfig;
use crate::error::YutaiError;
use crate::prompts::ocr_prompt;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use std::io::Cursor;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

const OCR_MAX_TOKENS: usize = 4096;
const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// Encode a rasterised page as a base64 PNG for the vision API.
///
/// PNG keeps glyph edges crisp; JPEG artefacts around small kanji hurt
/// recognition.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page → {} bytes base64", b64.len());
    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

fn build_options() -> CompletionOptions {
    CompletionOptions {
        temperature: Some(0.0),
        max_tokens: Some(OCR_MAX_TOKENS),
        ..Default::default()
    }
}

/// Transcribe one page, retrying transient failures.
///
/// Returns the page text, or the last error message once retries are
/// exhausted.
pub async fn transcribe_page(
    provider: &Arc<dyn LLMProvider>,
    page_num: usize,
    image_data: ImageData,
    config: &ExtractionConfig,
) -> Result<String, String> {
    let messages = vec![
        ChatMessage::system(ocr_prompt(&config.ocr_language)),
        ChatMessage::user_with_images("", vec![image_data]),
    ];
    let options = build_options();
    let call_timeout = Duration::from_secs(config.api_timeout_secs.max(1));

    let mut last_err = String::from("no attempt made");
    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "OCR page {}: retry {}/{} after {}ms",
                page_num, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) => {
                debug!(
                    "OCR page {}: {} input tokens, {} output tokens",
                    page_num, response.prompt_tokens, response.completion_tokens
                );
                return Ok(response.content);
            }
            Ok(Err(e)) => {
                last_err = e.to_string();
                warn!("OCR page {}: attempt {} failed: {}", page_num, attempt + 1, last_err);
            }
            Err(_) => {
                last_err = format!("timed out after {}s", call_timeout.as_secs());
                warn!("OCR page {}: attempt {} {}", page_num, attempt + 1, last_err);
            }
        }
    }
    Err(last_err)
}

/// Transcribe every page concurrently and join the texts in page order.
///
/// Pages that fail after all retries contribute nothing.
pub async fn transcribe_document(
    provider: &Arc<dyn LLMProvider>,
    pages: Vec<(usize, DynamicImage)>,
    config: &ExtractionConfig,
) -> String {
    let total = pages.len();
    let mut results: Vec<(usize, Option<String>)> = stream::iter(pages)
        .map(|(idx, img)| async move {
            let page_num = idx + 1;
            let data = match encode_page(&img) {
                Ok(d) => d,
                Err(e) => {
                    warn!("OCR page {}: encode failed: {}", page_num, e);
                    return (idx, None);
                }
            };
            (idx, transcribe_page(provider, page_num, data, config).await.ok())
        })
        .buffer_unordered(config.ocr_concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|(idx, _)| *idx);
    let ok = results.iter().filter(|(_, t)| t.is_some()).count();
    info!("OCR transcribed {}/{} pages", ok, total);

    results
        .into_iter()
        .filter_map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, YutaiError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        YutaiError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the vision provider, from most-specific to least-specific:
///
/// 1. pre-built `config.provider`
/// 2. `config.provider_name` + `config.model`
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set
/// 4. `ProviderFactory::from_env` auto-detection
pub fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, YutaiError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_VISION_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| YutaiError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision model could be auto-detected for OCR.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --no-ocr.\n\
                Error: {}",
                e
            ),
        })?;
    Ok(llm_provider)
}
