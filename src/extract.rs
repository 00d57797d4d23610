//! End-to-end extraction entry points.
//!
//! A run is strictly sequential: read the document, extract its text, make
//! one model call (plus bounded retries), then flatten and write the table.
//! Document-stage errors stop the run before the model is contacted; the
//! model stage cannot fail; table-stage errors stop the run before anything
//! is written.

use crate::config::ExtractionConfig;
use crate::error::Pdf2CsvError;
use crate::output::{ExtractedText, ExtractionOutput, ExtractionStats, Table};
use crate::pipeline::input::{self, RawDocument};
use crate::pipeline::llm::{self, CompletionClient, ProviderClient};
use crate::pipeline::{table, text};
use edgequake_llm::{OpenAIProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Model used with a bare `endpoint` when none is configured.
pub const DEFAULT_ENDPOINT_MODEL: &str = "deepseek-r1-32b";

/// Model used with a named provider when none is configured.
pub const DEFAULT_PROVIDER_MODEL: &str = "gpt-4.1-nano";

/// Extract products from a PDF file or URL.
///
/// # Returns
/// `Ok(ExtractionOutput)` whenever the document could be read, including
/// when the model found nothing (`output.products` is then empty).
///
/// # Errors
/// - File not found / download failed
/// - Malformed or encrypted document, pdfium unavailable
/// - No model client could be configured
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2CsvError> {
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    let document = input::load_document(input_str, config.download_timeout_secs).await?;
    extract_from_document(&document, config).await
}

/// Extract products from PDF bytes already in memory.
///
/// This is the entry point for upload handlers: no temporary file is needed.
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2CsvError> {
    let document = RawDocument::from_bytes("<memory>", bytes.to_vec());
    extract_from_document(&document, config).await
}

/// Extract products from a loaded document.
pub async fn extract_from_document(
    document: &RawDocument,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2CsvError> {
    let total_start = Instant::now();

    // ── Step 1: Get/create client (fail fast on configuration) ───────────
    let client = resolve_client(config)?;

    // ── Step 2: Extract text ─────────────────────────────────────────────
    let extract_start = Instant::now();
    let extracted = text::extract_text(document, config.password.as_deref(), &config.pages).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} chars from {}/{} pages in {}ms",
        extracted.text.len(),
        extracted.pages_with_text,
        extracted.page_count,
        extract_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_text_extracted(extracted.page_count, extracted.text.len());
    }

    // ── Step 3: Ask the model ────────────────────────────────────────────
    let mut output = run_model_stage(client.as_ref(), &extracted, config).await;
    output.stats.extract_duration_ms = extract_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Extraction complete: {} products, {}ms total",
        output.stats.product_count, output.stats.total_duration_ms
    );
    Ok(output)
}

/// Run only the model stage over text obtained elsewhere.
///
/// Useful when the caller already has the text (OCR output, a `.txt`
/// export) or wants to re-prompt without re-reading the PDF.
pub async fn extract_from_text(
    extracted: &ExtractedText,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2CsvError> {
    let start = Instant::now();
    let client = resolve_client(config)?;
    let mut output = run_model_stage(client.as_ref(), extracted, config).await;
    output.stats.total_duration_ms = start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Extract products and write them as CSV to `output_path`.
///
/// # Errors
/// Everything [`extract`] returns, plus
/// [`Pdf2CsvError::EmptyOrInvalidData`] when no products were found (no file
/// is created) and [`Pdf2CsvError::OutputWriteFailed`].
pub async fn extract_to_csv(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<(ExtractionOutput, Table), Pdf2CsvError> {
    let output = extract(input_str, config).await?;
    let table = write_output(&output, output_path.as_ref(), config)?;
    Ok((output, table))
}

/// Write the products of a finished run to `path`.
pub fn write_output(
    output: &ExtractionOutput,
    path: &Path,
    config: &ExtractionConfig,
) -> Result<Table, Pdf2CsvError> {
    let table = table::build_table_from_records(&output.products)?;
    table::write_csv(&table, path)?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_table_written(path, table.row_count(), table.column_count());
    }
    Ok(table)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2CsvError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2CsvError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

/// Extract the document text without contacting any model.
///
/// Does not require an LLM provider or API key.
pub async fn inspect_text(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractedText, Pdf2CsvError> {
    let document = input::load_document(input_str.as_ref(), config.download_timeout_secs).await?;
    text::extract_text(&document, config.password.as_deref(), &config.pages).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_model_stage(
    client: &dyn CompletionClient,
    extracted: &ExtractedText,
    config: &ExtractionConfig,
) -> ExtractionOutput {
    let mut stats = ExtractionStats {
        page_count: extracted.page_count,
        pages_with_text: extracted.pages_with_text,
        text_chars: extracted.text.len(),
        ..Default::default()
    };

    if extracted.is_empty() {
        warn!("Document has no extractable text; skipping model call");
        if let Some(ref cb) = config.progress_callback {
            cb.on_products_parsed(0);
        }
        return ExtractionOutput {
            products: Vec::new(),
            stats,
        };
    }

    let outcome = llm::request_products(client, &extracted.text, config).await;
    stats.product_count = outcome.products.len();
    stats.prompt_tokens = outcome.prompt_tokens;
    stats.completion_tokens = outcome.completion_tokens;
    stats.model_attempts = outcome.attempts;
    stats.llm_duration_ms = outcome.duration_ms;

    ExtractionOutput {
        products: outcome.products,
        stats,
    }
}

/// Instantiate a named provider with the given model.
fn create_provider_client(
    provider_name: &str,
    model: &str,
    config: &ExtractionConfig,
) -> Result<Arc<dyn CompletionClient>, Pdf2CsvError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2CsvError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(ProviderClient::new(
        provider,
        format!("{provider_name}/{model}"),
        config,
    )))
}

/// Resolve the completion client, from most-specific to least-specific.
///
/// 1. **Pre-built client** (`config.client`) — used as-is (tests, custom transports).
/// 2. **Endpoint** (`config.endpoint`) — edgequake-llm OpenAI-compatible provider with
///    `config.api_key`, else `OPENAI_API_KEY`, else no credential.
/// 3. **Pre-built provider** (`config.provider`).
/// 4. **Named provider + model** (`config.provider_name`).
/// 5. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 6. **OpenAI key** present → OpenAI.
/// 7. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_client(config: &ExtractionConfig) -> Result<Arc<dyn CompletionClient>, Pdf2CsvError> {
    // 1) User-provided client takes priority
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }

    // 2) Explicit endpoint + credential
    if let Some(ref endpoint) = config.endpoint {
        let model = config.model.as_deref().unwrap_or(DEFAULT_ENDPOINT_MODEL);
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()))
            .unwrap_or_default();
        let provider = OpenAIProvider::compatible(api_key, endpoint.as_str()).with_model(model);
        return Ok(Arc::new(ProviderClient::new(
            Arc::new(provider),
            format!("{model}@{endpoint}"),
            config,
        )));
    }

    // 3) Pre-built edgequake-llm provider
    if let Some(ref provider) = config.provider {
        let label = config.model.clone().unwrap_or_else(|| "custom".to_string());
        return Ok(Arc::new(ProviderClient::new(Arc::clone(provider), label, config)));
    }

    // 4) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_PROVIDER_MODEL);
        return create_provider_client(name, model, config);
    }

    // 5) EDGEQUAKE_LLM_PROVIDER + EDGEQUAKE_MODEL when both set
    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider_client(&prov, &model, config);
        }
    }

    // 6) Prefer OpenAI when its key is present
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_PROVIDER_MODEL);
            return create_provider_client("openai", model, config);
        }
    }

    // 7) Whatever the factory can find
    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2CsvError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, pass --endpoint, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(ProviderClient::new(llm_provider, "auto", config)))
}
