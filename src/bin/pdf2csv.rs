//! CLI binary for edgequake-pdf2csv.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig`, runs the pipeline and reports the result.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2csv::pipeline::table::to_csv_string;
use edgequake_pdf2csv::{
    extract, inspect_text, write_output, ExtractionConfig, ExtractionProgressCallback,
    PageSelection, Pdf2CsvError, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows the run stage by stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Reading");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_text_extracted(&self, page_count: usize, text_chars: usize) {
        self.bar.println(format!(
            "  {} Text     {}",
            green("✓"),
            dim(&format!("{page_count} pages, {text_chars} chars")),
        ));
        self.bar.set_prefix("Extracting");
        self.bar.set_message("Waiting for the model…");
    }

    fn on_model_request(&self, attempt: u32) {
        if attempt > 1 {
            self.bar.set_message(format!("retry {}…", attempt - 1));
        }
    }

    fn on_products_parsed(&self, count: usize) {
        let mark = if count == 0 { red("✗") } else { green("✓") };
        self.bar.println(format!(
            "  {} Products {}",
            mark,
            dim(&format!("{count} found")),
        ));
        self.bar.set_prefix("Writing");
        self.bar.set_message("Building table…");
    }

    fn on_table_written(&self, path: &Path, rows: usize, columns: usize) {
        self.bar.println(format!(
            "  {} Table    {}  {}",
            green("✓"),
            dim(&format!("{rows} rows × {columns} columns")),
            dim(&path.display().to_string()),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract products into output.csv
  pdf2csv catalogue.pdf

  # Choose the output file and print the table as well
  pdf2csv catalogue.pdf -o products.csv --preview

  # Only the first three pages
  pdf2csv --pages 1-3 catalogue.pdf

  # Self-hosted OpenAI-compatible server
  pdf2csv --endpoint http://localhost:8000/v1 --model deepseek-r1-32b catalogue.pdf

  # Named provider
  pdf2csv --provider anthropic --model claude-sonnet-4-20250514 catalogue.pdf

  # Show the extracted text (no API key needed)
  pdf2csv --text-only catalogue.pdf

  # Products and stats as JSON, no CSV written
  pdf2csv --json catalogue.pdf > products.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (also used for --endpoint)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)

SETUP:
  1. Install pdfium or point PDFIUM_LIB_PATH at it
  2. Set API key:     export OPENAI_API_KEY=sk-...
  3. Extract:         pdf2csv catalogue.pdf -o products.csv
"#;

/// Extract product data from PDF files into CSV using an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2csv",
    version,
    about = "Extract product data from PDF files into CSV using an LLM",
    long_about = "Extract every product described in a PDF document (local file or URL) into a \
CSV table. The document text is sent to a language model which returns structured records; \
nested fields are flattened into columns. Supports OpenAI, Anthropic, Google Gemini and any \
OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// CSV file to write.
    #[arg(short, long, env = "PDF2CSV_OUTPUT", default_value = "output.csv")]
    output: PathBuf,

    /// LLM model ID (e.g. gpt-4.1-nano, deepseek-r1-32b).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Ignored when --endpoint is given."
    )]
    provider: Option<String>,

    /// OpenAI-compatible base URL (e.g. http://localhost:8000/v1).
    #[arg(long, env = "PDF2CSV_ENDPOINT")]
    endpoint: Option<String>,

    /// API key for --endpoint (falls back to OPENAI_API_KEY).
    #[arg(long, env = "PDF2CSV_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2CSV_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "PDF2CSV_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Retries of the model call on transport failure.
    #[arg(long, env = "PDF2CSV_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "PDF2CSV_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2CSV_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to a text file with a custom prompt; must contain {pdf_text}.
    #[arg(long, env = "PDF2CSV_PROMPT")]
    prompt_template: Option<PathBuf>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2CSV_PAGES", default_value = "all")]
    pages: String,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2CSV_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print products and stats as JSON instead of writing CSV.
    #[arg(long, env = "PDF2CSV_JSON")]
    json: bool,

    /// Also print the written table to stdout.
    #[arg(long)]
    preview: bool,

    /// Print the extracted text only, no model call.
    #[arg(long)]
    text_only: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2CSV_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level library logs while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.text_only;
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

    // ── Text-only mode ───────────────────────────────────────────────────
    if cli.text_only {
        let config = build_config(&cli, None).await?;
        let extracted = inspect_text(&cli.input, &config)
            .await
            .map_err(user_facing)?;

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(extracted.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !cli.quiet {
            eprintln!(
                "{}",
                dim(&format!(
                    "{}/{} pages with text, {} chars",
                    extracted.pages_with_text,
                    extracted.page_count,
                    extracted.text.len()
                ))
            );
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|cb| cb as Arc<dyn ExtractionProgressCallback>);
    let config = build_config(&cli, progress_cb).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    let result = extract(&cli.input, &config).await;
    let output = match result {
        Ok(output) => output,
        Err(e) => {
            if let Some(ref s) = spinner {
                s.finish();
            }
            return Err(user_facing(e));
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    let written = write_output(&output, &cli.output, &config);
    if let Some(ref s) = spinner {
        s.finish();
    }
    let table = written.map_err(user_facing)?;

    if cli.preview {
        let preview = to_csv_string(&table).context("Failed to render preview")?;
        print!("{preview}");
    }

    if !cli.quiet {
        eprintln!(
            "{} CSV file generated successfully  {}  →  {}",
            green("✔"),
            dim(&format!(
                "{} products × {} columns, {}ms",
                table.row_count(),
                table.column_count(),
                output.stats.total_duration_ms
            )),
            bold(&cli.output.display().to_string()),
        );
        if output.stats.prompt_tokens + output.stats.completion_tokens > 0 {
            eprintln!(
                "   {} tokens in  /  {} tokens out",
                dim(&output.stats.prompt_tokens.to_string()),
                dim(&output.stats.completion_tokens.to_string()),
            );
        }
    }

    Ok(())
}

/// Wrap a library error with the message the user sees first.
fn user_facing(e: Pdf2CsvError) -> anyhow::Error {
    let headline = if e.is_document_error() {
        format!(
            "{} Unable to read the PDF. Please ensure it's a valid, text-based PDF document.",
            red("✘")
        )
    } else if matches!(e, Pdf2CsvError::EmptyOrInvalidData { .. }) {
        format!(
            "{} Failed to generate CSV. No products were found in the document.",
            red("✘")
        )
    } else {
        format!("{} {}", red("✘"), cyan("Failed to generate CSV"))
    };
    anyhow::Error::new(e).context(headline)
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ExtractionConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .pages(pages);

    if let Some(ref path) = cli.prompt_template {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {:?}", path))?;
        builder = builder.prompt_template(template);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
