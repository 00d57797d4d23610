//! Error types for the edgequake-pdf2csv library.
//!
//! Only the document stage and the table stage can fail a run. The model
//! stage never produces an error value: an unusable reply (no bracketed span,
//! or a span that is not valid JSON) and an exhausted retry budget both
//! resolve to an empty product list inside [`crate::pipeline::llm`], so a
//! single bad completion reports "no products found" instead of aborting.
//!
//! Every variant of [`Pdf2CsvError`] is therefore fatal for the run it
//! belongs to, and no partial table is ever written when one is returned.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2csv library.
#[derive(Debug, Error)]
pub enum Pdf2CsvError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Document errors ───────────────────────────────────────────────────
    /// The bytes are not a valid, parseable PDF.
    #[error("Unable to read the PDF: it may be corrupted or not a valid format ({detail})")]
    MalformedDocument { detail: String },

    /// Unexpected failure while reading document content.
    #[error("Unexpected error while extracting text: {detail}")]
    ExtractionError { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF")]
    WrongPassword,

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform, then either:\n\
  • place it on the system library search path, or\n\
  • set PDFIUM_LIB_PATH=/path/to/dir/containing/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Model errors ──────────────────────────────────────────────────────
    /// No model client could be constructed (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Table errors ──────────────────────────────────────────────────────
    /// Nothing to write: the product list is empty or not a list of records.
    #[error("No table written: {reason}")]
    EmptyOrInvalidData { reason: String },

    /// Could not create or write the output CSV file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure of a single model call.
///
/// Retried by [`crate::pipeline::llm`] and, once the retry budget is spent,
/// logged and swallowed: the product list for the run becomes empty.
#[derive(Debug, Clone, Error)]
pub enum ModelCallError {
    /// The request could not be sent or the connection dropped.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The endpoint answered, but not with a chat completion.
    #[error("unexpected response body: {0}")]
    InvalidBody(String),

    /// The call did not finish within the configured timeout.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider library reported an error.
    #[error("provider error: {0}")]
    Provider(String),
}

impl Pdf2CsvError {
    /// True for errors raised while turning the document into text.
    ///
    /// The CLI words these as "unable to read the PDF" and everything else
    /// as "failed to generate CSV".
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            Pdf2CsvError::MalformedDocument { .. }
                | Pdf2CsvError::ExtractionError { .. }
                | Pdf2CsvError::PasswordRequired
                | Pdf2CsvError::WrongPassword
                | Pdf2CsvError::PageOutOfRange { .. }
                | Pdf2CsvError::PdfiumBindingFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_document_display() {
        let e = Pdf2CsvError::MalformedDocument {
            detail: "missing %PDF header".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("corrupted"), "got: {msg}");
        assert!(msg.contains("missing %PDF header"), "got: {msg}");
    }

    #[test]
    fn extraction_error_carries_cause() {
        let e = Pdf2CsvError::ExtractionError {
            detail: "page 3: text layer unavailable".into(),
        };
        assert!(e.to_string().contains("page 3"));
    }

    #[test]
    fn empty_data_display() {
        let e = Pdf2CsvError::EmptyOrInvalidData {
            reason: "no products".into(),
        };
        assert!(e.to_string().contains("no products"));
    }

    #[test]
    fn document_errors_are_classified() {
        assert!(Pdf2CsvError::PasswordRequired.is_document_error());
        assert!(Pdf2CsvError::MalformedDocument { detail: String::new() }.is_document_error());
        assert!(!Pdf2CsvError::EmptyOrInvalidData { reason: String::new() }.is_document_error());
        assert!(!Pdf2CsvError::InvalidConfig("x".into()).is_document_error());
    }

    #[test]
    fn model_call_error_display() {
        let e = ModelCallError::Status {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(e.to_string(), "HTTP 503: overloaded");
        assert!(ModelCallError::Timeout { secs: 30 }.to_string().contains("30s"));
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = Pdf2CsvError::OutputWriteFailed {
            path: PathBuf::from("/tmp/out.csv"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert!(e.to_string().contains("/tmp/out.csv"));
        assert!(e.source().is_some());
    }
}
