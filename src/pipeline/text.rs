//! Text extraction: pull the plain-text layer out of every selected page.
//!
//! pdfium does the parsing. Its bindings hold process-global state and
//! block, so the work runs inside `spawn_blocking`. Pages that carry no text
//! (scans, blank separators) are skipped silently; a document with no text
//! at all is a successful, empty [`ExtractedText`].

use crate::config::PageSelection;
use crate::error::Pdf2CsvError;
use crate::output::ExtractedText;
use crate::pipeline::input::RawDocument;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// PDF header marker. The format allows up to 1 KiB of junk before it.
const PDF_MAGIC: &[u8] = b"%PDF";
const MAGIC_SEARCH_WINDOW: usize = 1024;

/// Extract the text of the selected pages of `document`.
///
/// # Errors
/// - [`Pdf2CsvError::MalformedDocument`] — not a PDF, or pdfium rejects its structure
/// - [`Pdf2CsvError::PasswordRequired`] / [`Pdf2CsvError::WrongPassword`]
/// - [`Pdf2CsvError::PageOutOfRange`] — the selection matches no page of a non-empty document
/// - [`Pdf2CsvError::ExtractionError`] — anything else pdfium reports, with its cause
pub async fn extract_text(
    document: &RawDocument,
    password: Option<&str>,
    pages: &PageSelection,
) -> Result<ExtractedText, Pdf2CsvError> {
    check_pdf_magic(&document.bytes)?;

    let bytes = document.bytes.clone();
    let password = password.map(|s| s.to_string());
    let pages = pages.clone();

    tokio::task::spawn_blocking(move || extract_text_blocking(&bytes, password.as_deref(), &pages))
        .await
        .map_err(|e| Pdf2CsvError::ExtractionError {
            detail: format!("Extraction task panicked: {}", e),
        })?
}

/// Reject input that cannot be a PDF before touching pdfium.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), Pdf2CsvError> {
    if bytes.is_empty() {
        return Err(Pdf2CsvError::MalformedDocument {
            detail: "document is empty".into(),
        });
    }
    let window = &bytes[..bytes.len().min(MAGIC_SEARCH_WINDOW)];
    if window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        Ok(())
    } else {
        let head: Vec<u8> = bytes.iter().take(4).copied().collect();
        Err(Pdf2CsvError::MalformedDocument {
            detail: format!("missing %PDF header (first bytes: {:?})", head),
        })
    }
}

/// Append each non-empty page text plus a newline to one accumulator.
pub fn accumulate_pages<I>(page_count: usize, page_texts: I) -> ExtractedText
where
    I: IntoIterator<Item = String>,
{
    let mut out = ExtractedText {
        page_count,
        ..Default::default()
    };
    for text in page_texts {
        if text.is_empty() {
            continue;
        }
        out.text.push_str(&text);
        out.text.push('\n');
        out.pages_with_text += 1;
    }
    out
}

/// 0-indexed pages to read for `selection`.
///
/// A zero-page document reads nothing whatever the selection; a selection
/// that matches no page of a non-empty document is
/// [`Pdf2CsvError::PageOutOfRange`].
pub fn select_pages(
    total_pages: usize,
    selection: &PageSelection,
) -> Result<Vec<usize>, Pdf2CsvError> {
    let indices = selection.to_indices(total_pages);
    if indices.is_empty() && total_pages > 0 {
        return Err(Pdf2CsvError::PageOutOfRange {
            page: selection.first_requested(),
            total: total_pages,
        });
    }
    Ok(indices)
}

/// Blocking implementation of text extraction.
fn extract_text_blocking(
    bytes: &[u8],
    password: Option<&str>,
    selection: &PageSelection,
) -> Result<ExtractedText, Pdf2CsvError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| map_load_error(e, password.is_some()))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let indices = select_pages(total_pages, selection)?;

    let mut texts = Vec::with_capacity(indices.len());
    for idx in indices {
        let page = pages
            .get(idx as u16)
            .map_err(|e| Pdf2CsvError::ExtractionError {
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;
        let text = page
            .text()
            .map_err(|e| Pdf2CsvError::ExtractionError {
                detail: format!("page {}: {:?}", idx + 1, e),
            })?
            .all();
        debug!("Page {}: {} chars", idx + 1, text.len());
        texts.push(text);
    }

    Ok(accumulate_pages(total_pages, texts))
}

/// Classify a pdfium load failure.
fn map_load_error(err: PdfiumError, password_given: bool) -> Pdf2CsvError {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            if password_given {
                Pdf2CsvError::WrongPassword
            } else {
                Pdf2CsvError::PasswordRequired
            }
        }
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError) => {
            Pdf2CsvError::MalformedDocument {
                detail: "pdfium could not parse the document structure".into(),
            }
        }
        other => Pdf2CsvError::ExtractionError {
            detail: format!("{:?}", other),
        },
    }
}

/// Bind to libpdfium: `PDFIUM_LIB_PATH` (file or directory) first, then the
/// system library search path.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2CsvError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => {
            let mut path = PathBuf::from(p);
            if path.is_dir() {
                path = path.join(Pdfium::pdfium_platform_library_name());
            }
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(&path)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| Pdf2CsvError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}
