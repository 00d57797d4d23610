//! Result types produced by the extraction pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One product entry as returned by the model.
///
/// Expected keys are `product_name`, `product_attributes`, `features`,
/// `specifications` and `review_summary`, but nothing checks them: the
/// model's reply is accepted as long as it is valid JSON, and the flattening
/// and table stages cope with missing, extra or oddly-typed fields.
pub type ProductRecord = Value;

/// Single-level view of a [`ProductRecord`]: underscored key path → scalar.
pub type FlattenedRecord = Map<String, Value>;

/// Plain text accumulated page by page from a document.
///
/// An empty `text` means the document had no extractable text (scanned
/// pages, zero pages). That is a successful result, distinct from
/// [`crate::Pdf2CsvError::MalformedDocument`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Concatenated page texts, each followed by `\n`.
    pub text: String,
    /// Total pages in the document.
    pub page_count: usize,
    /// Pages that contributed non-empty text.
    pub pages_with_text: usize,
}

impl ExtractedText {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A rectangular table: one header, rows of exactly `header.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Timing and volume figures for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub page_count: usize,
    pub pages_with_text: usize,
    pub text_chars: usize,
    pub product_count: usize,
    /// 0 when the client does not report token usage.
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    /// Model calls made, retries included. 0 when the text was empty.
    pub model_attempts: u32,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a run produced before the table is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Products in the order the model listed them.
    pub products: Vec<ProductRecord>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
