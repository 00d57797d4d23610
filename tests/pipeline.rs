//! Offline end-to-end tests through the public API.
//!
//! The model is replaced by a scripted `CompletionClient`, so these tests run
//! without network access, API keys or libpdfium.

use edgequake_pdf2csv::pipeline::text::accumulate_pages;
use edgequake_pdf2csv::{
    extract_from_bytes, extract_from_text, write_output, write_table, Completion,
    CompletionClient, CompletionFuture, ExtractedText, ExtractionConfig,
    ExtractionProgressCallback, ModelCallError, Pdf2CsvError,
};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replies with the scripted results in order, then repeats the last one.
struct StubClient {
    script: Mutex<Vec<Result<String, ModelCallError>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubClient {
    fn new(script: Vec<Result<String, ModelCallError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn replying(reply: &str) -> Arc<Self> {
        Self::new(vec![Ok(reply.to_string())])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionClient for StubClient {
    fn name(&self) -> &str {
        "stub"
    }

    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            }
        };
        Box::pin(async move { next.map(Completion::text) })
    }
}

#[derive(Default)]
struct Events {
    requests: AtomicUsize,
    parsed: Mutex<Option<usize>>,
    written: Mutex<Option<(usize, usize)>>,
}

impl ExtractionProgressCallback for Events {
    fn on_model_request(&self, _attempt: u32) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    fn on_products_parsed(&self, count: usize) {
        *self.parsed.lock().unwrap() = Some(count);
    }

    fn on_table_written(&self, _path: &Path, rows: usize, columns: usize) {
        *self.written.lock().unwrap() = Some((rows, columns));
    }
}

fn config(client: Arc<StubClient>) -> ExtractionConfig {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    ExtractionConfig::builder()
        .client(client)
        .retry_backoff_ms(1)
        .build()
        .unwrap()
}

fn catalogue_text() -> ExtractedText {
    accumulate_pages(
        2,
        vec![
            "Acme Phone X\nPrice: $499\nFeatures: 5G, OLED".to_string(),
            "Acme Tablet\nPrice: $299".to_string(),
        ],
    )
}

fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn catalogue_to_csv() {
    let reply = r#"Here are the products:
[
  {"product_name": "Acme Phone X", "price": "$499", "features": ["5G", "OLED"],
   "specifications": {"display": {"size": "6.1in"}, "battery": "4000mAh"}},
  {"product_name": "Acme Tablet", "price": "$299", "colour": "grey"}
]"#;
    let client = StubClient::replying(reply);
    let events = Arc::new(Events::default());
    let mut cfg = config(client.clone());
    cfg.progress_callback = Some(events.clone());

    let output = extract_from_text(&catalogue_text(), &cfg).await.unwrap();
    assert_eq!(output.products.len(), 2);
    assert_eq!(output.stats.page_count, 2);
    assert_eq!(output.stats.pages_with_text, 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.csv");
    let table = write_output(&output, &path, &cfg).unwrap();

    let rows = read_csv(&path);
    assert_eq!(
        rows[0],
        vec![
            "features",
            "price",
            "product_name",
            "specifications_battery",
            "specifications_display_size"
        ]
    );
    assert_eq!(rows[1], vec!["5G, OLED", "$499", "Acme Phone X", "4000mAh", "6.1in"]);
    // "colour" is not in the header; missing columns are empty.
    assert_eq!(rows[2], vec!["", "$299", "Acme Tablet", "", ""]);
    assert_eq!(table.row_count(), 2);

    assert_eq!(client.calls(), 1);
    assert_eq!(events.requests.load(Ordering::SeqCst), 1);
    assert_eq!(*events.parsed.lock().unwrap(), Some(2));
    assert_eq!(*events.written.lock().unwrap(), Some((2, 5)));
}

#[tokio::test]
async fn prompt_carries_document_text() {
    let client = StubClient::replying("[]");
    let cfg = config(client.clone());
    extract_from_text(&catalogue_text(), &cfg).await.unwrap();

    let prompts = client.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Acme Phone X\nPrice: $499"));
    assert!(prompts[0].contains("Acme Tablet"));
    assert!(!prompts[0].contains("{pdf_text}"));
}

#[tokio::test]
async fn unusable_reply_writes_nothing() {
    let client = StubClient::replying("Sorry, I could not find any products.");
    let cfg = config(client.clone());

    let output = extract_from_text(&catalogue_text(), &cfg).await.unwrap();
    assert!(output.products.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.csv");
    let err = write_output(&output, &path, &cfg).unwrap_err();
    assert!(matches!(err, Pdf2CsvError::EmptyOrInvalidData { .. }));
    assert!(!path.exists());
}

#[tokio::test]
async fn transport_failures_recover_to_empty_list() {
    let client = StubClient::new(vec![Err(ModelCallError::Transport(
        "connection refused".into(),
    ))]);
    let cfg = config(client.clone());

    let output = extract_from_text(&catalogue_text(), &cfg).await.unwrap();
    assert!(output.products.is_empty());
    // one call plus the default two retries
    assert_eq!(client.calls(), 3);
    assert_eq!(output.stats.model_attempts, 3);
}

#[tokio::test]
async fn transient_failure_then_success() {
    let client = StubClient::new(vec![
        Err(ModelCallError::Status {
            status: 503,
            body: "overloaded".into(),
        }),
        Ok(r#"[{"product_name": "Acme Phone X"}]"#.into()),
    ]);
    let cfg = config(client.clone());

    let output = extract_from_text(&catalogue_text(), &cfg).await.unwrap();
    assert_eq!(output.products, vec![json!({"product_name": "Acme Phone X"})]);
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn non_pdf_bytes_fail_before_model() {
    let client = StubClient::replying(r#"[{"product_name": "A"}]"#);
    let cfg = config(client.clone());

    let err = extract_from_bytes(b"PK\x03\x04 this is a zip file", &cfg)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2CsvError::MalformedDocument { .. }));
    assert!(err.is_document_error());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn empty_document_text_skips_model() {
    let client = StubClient::replying(r#"[{"product_name": "A"}]"#);
    let cfg = config(client.clone());

    let blank = accumulate_pages(3, vec![String::new(), String::new(), String::new()]);
    let output = extract_from_text(&blank, &cfg).await.unwrap();
    assert!(output.products.is_empty());
    assert_eq!(output.stats.page_count, 3);
    assert_eq!(client.calls(), 0);
}

#[test]
fn write_table_blocking_use() {
    // The table stage is synchronous; callers outside a runtime can mix it
    // with a blocking run of the async stages.
    let client = StubClient::replying(r#"[{"b": 2, "a": 1}]"#);
    let cfg = config(client);
    let output = tokio_test::block_on(extract_from_text(&catalogue_text(), &cfg)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    let data = serde_json::Value::Array(output.products);
    let table = write_table(&data, &path).unwrap();
    assert_eq!(table.header, vec!["a", "b"]);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n1,2\n");
}
