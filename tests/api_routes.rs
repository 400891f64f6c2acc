mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{FakeEngine, entries, test_config};
use http_body_util::BodyExt;
use smart_extract::{
    api::{ErrorResponse, app},
    config::Config,
    engine::{DocDiag, Engine, ExtractIn, ExtractOut},
    extract::Extractor,
    response::ExtractSmartResponse,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use tower::util::ServiceExt;

const BOUNDARY: &str = "smart-extract-test-boundary";

fn multipart_request(field: &str, filename: Option<&str>, data: &[u8]) -> Request<Body> {
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"{field}\"; filename=\"{name}\""),
        None => format!("form-data; name=\"{field}\""),
    };
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/extract-smart")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn router(cfg: &Config, engine: FakeEngine) -> Router {
    app(Extractor::new(cfg, engine))
}

async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_endpoint() {
    let root = tempfile::tempdir().unwrap();
    let resp = router(&test_config(root.path()), FakeEngine::ok())
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "smart-extract");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn extract_smart_returns_slides() {
    let root = tempfile::tempdir().unwrap();
    let resp = router(&test_config(root.path()), FakeEngine::ok())
        .oneshot(multipart_request("file", Some("deck.pdf"), b"%PDF-1.7"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: ExtractSmartResponse = body_json(resp).await;
    assert_eq!(body.filename, "deck.pdf");
    assert_eq!(body.slides.len(), 2);
    assert_eq!(body.slides[1].page_number, 2);
    assert_eq!(body.slides[1].vision_candidates.len(), 1);
    assert!(entries(root.path()).is_empty());
}

#[tokio::test]
async fn response_schema_field_names() {
    let root = tempfile::tempdir().unwrap();
    let resp = router(&test_config(root.path()), FakeEngine::ok())
        .oneshot(multipart_request("file", Some("deck.pdf"), b"%PDF-1.7"))
        .await
        .unwrap();

    let body: serde_json::Value = body_json(resp).await;
    let cand = &body["slides"][1]["vision_candidates"][0];
    assert!(body["slides"][0]["markdown_content"].is_string());
    assert!(cand["ref_id"].is_string());
    assert!(cand["base64_image"].is_string());
    assert_eq!(cand["width"], 300);
    assert_eq!(cand["height"], 300);
}

#[tokio::test]
async fn missing_file_field_is_bad_request() {
    let root = tempfile::tempdir().unwrap();
    let resp = router(&test_config(root.path()), FakeEngine::ok())
        .oneshot(multipart_request("document", Some("deck.pdf"), b"%PDF"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = body_json(resp).await;
    assert!(body.error.contains("no file"));
}

#[tokio::test]
async fn unsupported_extension_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let resp = router(&test_config(root.path()), FakeEngine::ok())
        .oneshot(multipart_request("file", Some("photo.jpg"), b"\xff\xd8"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(entries(root.path()).is_empty());
}

#[tokio::test]
async fn disabled_pptx_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = test_config(root.path());
    cfg.formats.enable_pptx = false;
    let resp = router(&cfg, FakeEngine::ok())
        .oneshot(multipart_request("file", Some("deck.pptx"), b"PK"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = test_config(root.path());
    cfg.server.max_upload_bytes = 4;
    let resp = router(&cfg, FakeEngine::ok())
        .oneshot(multipart_request("file", Some("deck.pdf"), b"%PDF-1.7"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn conversion_failure_is_server_error_and_cleans_up() {
    let root = tempfile::tempdir().unwrap();
    let resp = router(&test_config(root.path()), FakeEngine::failing("docling exploded"))
        .oneshot(multipart_request("file", Some("deck.pdf"), b"%PDF-1.7"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = body_json(resp).await;
    assert_eq!(body.error, "document conversion failed");
    assert!(!body.error.contains("docling exploded"));
    assert!(!body.error.contains(&root.path().display().to_string()));
    assert!(entries(root.path()).is_empty());
}

/// Sleeps through each conversion and records how many overlap.
struct SlowEngine {
    delay: Duration,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Engine for SlowEngine {
    fn doctor(&self) -> anyhow::Result<DocDiag> {
        anyhow::bail!("not used")
    }

    fn extract(&self, _req: &ExtractIn) -> anyhow::Result<ExtractOut> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(ExtractOut {
            ok: true,
            pages: vec![],
            warnings: vec![],
            error: None,
        })
    }
}

#[tokio::test]
async fn disconnected_client_keeps_conversion_slot() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = test_config(root.path());
    cfg.server.max_concurrent_conversions = 1;
    let peak = Arc::new(AtomicUsize::new(0));
    let engine = SlowEngine {
        delay: Duration::from_millis(600),
        running: Arc::new(AtomicUsize::new(0)),
        peak: Arc::clone(&peak),
    };
    let router = app(Extractor::new(&cfg, engine));

    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        router
            .clone()
            .oneshot(multipart_request("file", Some("a.pdf"), b"%PDF-1.7")),
    )
    .await;
    assert!(abandoned.is_err(), "first request should still be converting");

    let resp = router
        .oneshot(multipart_request("file", Some("b.pdf"), b"%PDF-1.7"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}
