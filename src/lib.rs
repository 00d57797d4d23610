//! # edgequake-pdf2csv
//!
//! Extract structured product data from PDF documents into a CSV table
//! using a Large Language Model.
//!
//! ## Why this crate?
//!
//! Product catalogues and spec sheets arrive as PDFs whose layout varies
//! from vendor to vendor. Rather than writing one scraper per layout, this
//! crate pulls the plain text out of the document, asks a model to return
//! every product as a JSON record, and flattens those records into one
//! spreadsheet row each.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file or download from URL
//!  ├─ 2. Text     accumulate page text via pdfium (spawn_blocking)
//!  ├─ 3. Model    one prompt, bounded retries, JSON array recovered from the reply
//!  ├─ 4. Flatten  nested records → `a_b_c` columns
//!  └─ 5. Table    header from the first record, atomic CSV write
//! ```
//!
//! The model stage never fails: a reply with no usable JSON array is an
//! empty product list, which the table stage then refuses to write.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2csv::{extract_to_csv, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let config = ExtractionConfig::default();
//!     let (output, table) = extract_to_csv("catalogue.pdf", "output.csv", &config).await?;
//!     eprintln!("{} products, {} columns", output.stats.product_count, table.column_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2csv` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-pdf2csv = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! Text extraction binds the pdfium shared library at runtime. Set
//! `PDFIUM_LIB_PATH` to the library file (or the directory holding it);
//! otherwise the system library search path is used.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, PageSelection};
pub use error::{ModelCallError, Pdf2CsvError};
pub use extract::{
    extract, extract_from_bytes, extract_from_document, extract_from_text, extract_sync,
    extract_to_csv, inspect_text, resolve_client, write_output,
};
pub use output::{
    ExtractedText, ExtractionOutput, ExtractionStats, FlattenedRecord, ProductRecord, Table,
};
pub use pipeline::flatten::flatten;
pub use pipeline::llm::{parse_product_array, Completion, CompletionClient, CompletionFuture};
pub use pipeline::table::{build_table, write_table};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
