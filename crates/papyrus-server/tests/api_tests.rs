//! HTTP API integration tests.
//!
//! Each test builds its own router over an in-memory session store, a stub
//! completion provider and a stub extractor that treats the uploaded bytes
//! after the `%PDF-` marker as the document text.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use papyrus_core::{ChatRequest, ChatResponse, Message, Role};
use papyrus_document::{ExtractError, ExtractResult, TextExtractor};
use papyrus_llm::{LLMError, LLMProvider, ProviderMetadata};
use papyrus_server::{create_router, AppState};
use papyrus_session::SessionStore;

// =============================================================================
// Helpers
// =============================================================================

const BOUNDARY: &str = "papyrus-test-boundary";

#[derive(Clone, Copy)]
enum Reply {
    Text(&'static str),
    Fail,
    Hang,
}

/// Completion stub: replays scripted replies, then repeats the fallback.
struct StubProvider {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    requests: Mutex<Vec<ChatRequest>>,
    metadata: ProviderMetadata,
}

impl StubProvider {
    fn new(replies: Vec<Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
            metadata: ProviderMetadata {
                id: "stub".to_string(),
                name: "Stub".to_string(),
            },
        })
    }

    fn always(reply: Reply) -> Arc<Self> {
        Self::new(Vec::new(), reply)
    }

    fn last_system_prompt(&self) -> String {
        let requests = self.requests.lock().unwrap();
        let request = requests.last().expect("no completion requests recorded");
        assert_eq!(request.messages[0].role, Role::System);
        request.messages[0].text().to_string()
    }
}

#[async_trait]
impl LLMProvider for StubProvider {
    fn provider_id(&self) -> &str {
        "stub"
    }

    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn chat(&self, request: ChatRequest) -> papyrus_llm::Result<ChatResponse> {
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(self.fallback);
        match reply {
            Reply::Text(text) => Ok(ChatResponse::new("stub-1", "stub-model", Message::assistant(text))),
            Reply::Fail => Err(LLMError::Api {
                status: 502,
                message: "upstream unavailable".to_string(),
            }),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LLMError::Network("unreachable".to_string()))
            }
        }
    }

    async fn validate(&self) -> papyrus_llm::Result<()> {
        Ok(())
    }
}

/// Text after the `%PDF-` marker is returned as a single page.
struct StubExtractor;

impl TextExtractor for StubExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> ExtractResult<Vec<String>> {
        let body = bytes
            .strip_prefix(b"%PDF-")
            .ok_or(ExtractError::UnsupportedType)?;
        Ok(vec![String::from_utf8_lossy(body).into_owned()])
    }
}

fn make_state(provider: Arc<StubProvider>, timeout: Duration) -> Arc<AppState> {
    Arc::new(
        AppState::new(
            Arc::new(SessionStore::default()),
            provider,
            Arc::new(StubExtractor),
            None,
            "stub-model",
            timeout,
        )
        .with_max_upload_bytes(1024),
    )
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::delete(uri).body(Body::empty()).unwrap()
}

/// Build a multipart upload with an optional session id field.
fn upload_request(session_id: Option<&str>, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(session_id) = session_id {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"session_id\"\r\n\r\n{session_id}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// =============================================================================
// Root
// =============================================================================

#[tokio::test]
async fn test_root_reports_running() {
    let app = create_router(make_state(StubProvider::always(Reply::Text("ok")), Duration::from_secs(5)));

    let (status, json) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"message": "Backend is running"}));
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn test_chat_fresh_session() {
    let state = make_state(StubProvider::always(Reply::Text("hi there")), Duration::from_secs(5));
    let app = create_router(Arc::clone(&state));

    let (status, json) = send(&app, post_json("/chat", r#"{"message":"hello","session_id":"t1"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], "hi there");
    assert_eq!(json["session_id"], "t1");

    let session = state.sessions().snapshot("t1").await.unwrap();
    assert_eq!(session.conversation.len(), 2);
    assert_eq!(session.conversation[0].role, Role::User);
    assert_eq!(session.conversation[0].text(), "hello");
    assert_eq!(session.conversation[1].role, Role::Assistant);
    assert_eq!(session.conversation[1].text(), "hi there");
}

#[tokio::test]
async fn test_chat_defaults_session_id() {
    let state = make_state(StubProvider::always(Reply::Text("ok")), Duration::from_secs(5));
    let app = create_router(Arc::clone(&state));

    let (status, json) = send(&app, post_json("/chat", r#"{"message":"hello","has_file":true}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session_id"], "default");
    assert!(state.sessions().contains("default"));
}

#[tokio::test]
async fn test_chat_malformed_body_is_422() {
    let app = create_router(make_state(StubProvider::always(Reply::Text("ok")), Duration::from_secs(5)));

    let (status, json) = send(&app, post_json("/chat", r#"{"session_id":"t1"}"#)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["detail"].is_string());

    let (status, _) = send(&app, post_json("/chat", "not json")).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_chat_upstream_failure_is_500() {
    let provider = StubProvider::new(vec![Reply::Text("first reply")], Reply::Fail);
    let state = make_state(provider, Duration::from_secs(5));
    let app = create_router(Arc::clone(&state));

    let (status, _) = send(&app, post_json("/chat", r#"{"message":"one","session_id":"t1"}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, post_json("/chat", r#"{"message":"two","session_id":"t1"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["detail"].as_str().unwrap().contains("upstream unavailable"));

    // 失败轮次只留下用户消息
    let session = state.sessions().snapshot("t1").await.unwrap();
    assert_eq!(session.conversation.len(), 3);
    assert_eq!(session.conversation[2].role, Role::User);
    assert_eq!(session.conversation[2].text(), "two");
}

#[tokio::test]
async fn test_chat_timeout_is_500() {
    let state = make_state(StubProvider::always(Reply::Hang), Duration::from_millis(100));
    let app = create_router(state);

    let (status, json) = send(&app, post_json("/chat", r#"{"message":"hello","session_id":"slow"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["detail"].as_str().unwrap().contains("timed out"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_chats_same_session_serialized() {
    const N: usize = 16;
    let state = make_state(StubProvider::always(Reply::Text("ack")), Duration::from_secs(5));
    let app = create_router(Arc::clone(&state));

    let mut handles = Vec::new();
    for i in 0..N {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let body = format!(r#"{{"message":"m{i}","session_id":"busy"}}"#);
            send(&app, post_json("/chat", &body)).await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let session = state.sessions().snapshot("busy").await.unwrap();
    assert_eq!(session.conversation.len(), 2 * N);
    for pair in session.conversation.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
    }
}

// =============================================================================
// Files
// =============================================================================

#[tokio::test]
async fn test_upload_then_chat_includes_document() {
    let provider = StubProvider::always(Reply::Text("Revenue was $5M."));
    let state = make_state(Arc::clone(&provider), Duration::from_secs(5));
    let app = create_router(state);

    let (status, json) = send(
        &app,
        upload_request(Some("t2"), "report.pdf", b"%PDF-Q3 revenue: $5M"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "File report.pdf uploaded and processed.");
    assert_eq!(json["filename"], "report.pdf");
    assert_eq!(json["session_id"], "t2");

    let (status, json) = send(&app, get("/files/t2")).await;
    assert_eq!(status, StatusCode::OK);
    let files = json["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["filename"], "report.pdf");
    assert!(files[0]["upload_time"].as_f64().unwrap() > 0.0);

    let (status, json) = send(&app, post_json("/chat", r#"{"message":"What was revenue?","session_id":"t2"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], "Revenue was $5M.");

    let prompt = provider.last_system_prompt();
    assert!(prompt.contains("report.pdf"));
    assert!(prompt.contains("Q3 revenue: $5M"));
}

#[tokio::test]
async fn test_upload_defaults_session_id() {
    let state = make_state(StubProvider::always(Reply::Text("ok")), Duration::from_secs(5));
    let app = create_router(Arc::clone(&state));

    let (status, json) = send(&app, upload_request(None, "a.pdf", b"%PDF-aaa")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session_id"], "default");
    assert_eq!(state.chat.list_documents("default").await.len(), 1);
}

#[tokio::test]
async fn test_upload_non_pdf_is_500_and_not_recorded() {
    let state = make_state(StubProvider::always(Reply::Text("ok")), Duration::from_secs(5));
    let app = create_router(Arc::clone(&state));

    let (status, json) = send(&app, upload_request(Some("t2"), "notes.txt", b"plain text")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .starts_with("Failed to upload or process file:"));

    let (_, json) = send(&app, get("/files/t2")).await;
    assert_eq!(json["files"], serde_json::json!([]));
}

#[tokio::test]
async fn test_upload_missing_file_field_is_400() {
    let app = create_router(make_state(StubProvider::always(Reply::Text("ok")), Duration::from_secs(5)));

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"session_id\"\r\n\r\nt2\r\n--{BOUNDARY}--\r\n"
    );
    let req = Request::post("/upload")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();

    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].is_string());
}

#[tokio::test]
async fn test_upload_without_multipart_body_is_400() {
    let state = make_state(StubProvider::always(Reply::Text("ok")), Duration::from_secs(5));
    let app = create_router(Arc::clone(&state));

    let (status, json) = send(&app, post_json("/upload", r#"{"session_id":"t2"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].is_string());
    assert!(!state.sessions().contains("t2"));
}

#[tokio::test]
async fn test_upload_over_cap_is_413() {
    let state = make_state(StubProvider::always(Reply::Text("ok")), Duration::from_secs(5));
    let app = create_router(Arc::clone(&state));

    // 超过配置上限，但在 multipart 余量之内
    let mut content = b"%PDF-".to_vec();
    content.extend(std::iter::repeat(b'x').take(2048));
    let (status, json) = send(&app, upload_request(Some("big"), "big.pdf", &content)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json["detail"].as_str().unwrap().contains("1024"));

    // 超过整个请求体上限
    let mut content = b"%PDF-".to_vec();
    content.extend(std::iter::repeat(b'x').take(256 * 1024));
    let (status, _) = send(&app, upload_request(Some("big"), "huge.pdf", &content)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    assert!(state.chat.list_documents("big").await.is_empty());
}

#[tokio::test]
async fn test_list_unknown_session_is_empty() {
    let state = make_state(StubProvider::always(Reply::Text("ok")), Duration::from_secs(5));
    let app = create_router(Arc::clone(&state));

    let (status, json) = send(&app, get("/files/nobody")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"files": []}));
    assert!(!state.sessions().contains("nobody"));
}

#[tokio::test]
async fn test_clear_files() {
    let provider = StubProvider::always(Reply::Text("ok"));
    let state = make_state(Arc::clone(&provider), Duration::from_secs(5));
    let app = create_router(state);

    // 未知会话也返回成功
    let (status, json) = send(&app, delete("/files/t3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "All files cleared for session t3");

    send(&app, upload_request(Some("t3"), "a.pdf", b"%PDF-alpha")).await;
    send(&app, upload_request(Some("t3"), "b.pdf", b"%PDF-beta")).await;
    let (_, json) = send(&app, get("/files/t3")).await;
    assert_eq!(json["files"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, delete("/files/t3")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = send(&app, get("/files/t3")).await;
    assert_eq!(json["files"], serde_json::json!([]));

    send(&app, post_json("/chat", r#"{"message":"anything left?","session_id":"t3"}"#)).await;
    assert_eq!(provider.last_system_prompt(), "You are a helpful assistant.");
}

#[tokio::test]
async fn test_sessions_isolated() {
    let provider = StubProvider::always(Reply::Text("ok"));
    let state = make_state(Arc::clone(&provider), Duration::from_secs(5));
    let app = create_router(state);

    send(&app, upload_request(Some("s1"), "secret.pdf", b"%PDF-s1 only")).await;
    send(&app, post_json("/chat", r#"{"message":"hello","session_id":"s2"}"#)).await;

    assert!(!provider.last_system_prompt().contains("s1 only"));
    let (_, json) = send(&app, get("/files/s2")).await;
    assert_eq!(json["files"], serde_json::json!([]));
}
