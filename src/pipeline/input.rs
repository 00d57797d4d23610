//! Input resolution: turn a user-supplied path or URL into document bytes.
//!
//! pdfium can parse straight from a byte slice, so both local files and
//! downloads end up as an in-memory [`RawDocument`]. Format validation is
//! left to [`crate::pipeline::text`]; this stage only reports I/O problems.

use crate::error::Pdf2CsvError;
use std::path::PathBuf;
use tracing::{debug, info};

/// An uploaded or downloaded document, consumed once by the text stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Where the bytes came from (path or URL), for logs and messages.
    pub source: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn from_bytes(source: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source: source.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to document bytes.
///
/// URLs are downloaded with `timeout_secs` as the whole-request timeout;
/// anything else is read as a local file.
pub async fn load_document(input: &str, timeout_secs: u64) -> Result<RawDocument, Pdf2CsvError> {
    if input.trim().is_empty() {
        return Err(Pdf2CsvError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Read a local file, mapping I/O failures onto input errors.
async fn read_local(path_str: &str) -> Result<RawDocument, Pdf2CsvError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Pdf2CsvError::FileNotFound { path: path.clone() },
        std::io::ErrorKind::PermissionDenied => {
            Pdf2CsvError::PermissionDenied { path: path.clone() }
        }
        _ => Pdf2CsvError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })?;

    debug!("Read local document: {} ({} bytes)", path.display(), bytes.len());
    Ok(RawDocument::from_bytes(path_str, bytes))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<RawDocument, Pdf2CsvError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Pdf2CsvError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2CsvError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Pdf2CsvError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Pdf2CsvError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Pdf2CsvError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(RawDocument::from_bytes(url, bytes.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let err = load_document("/definitely/not/a/real/file.pdf", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2CsvError::FileNotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = load_document("   ", 5).await.unwrap_err();
        assert!(matches!(err, Pdf2CsvError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn local_file_bytes_are_returned_unchanged() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.4 not really").unwrap();
        let path = tmp.path().to_string_lossy().to_string();

        let doc = load_document(&path, 5).await.unwrap();
        assert_eq!(doc.bytes, b"%PDF-1.4 not really");
        assert_eq!(doc.source, path);
        assert_eq!(doc.len(), 19);
    }
}
