//! [`GatewayServer`] – JSON-over-HTTP procedure gateway.
//!
//! Listens on `0.0.0.0:7977` (configurable via
//! [`GatewayServer::with_port`]). Each connection carries one request;
//! the body is JSON in, the response is JSON out.
//!
//! # Endpoints
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | POST | `/remember` | store a memory |
//! | POST | `/recall` | ranked recall |
//! | POST | `/feel` | blend emotional deltas |
//! | POST | `/process_text` | lexical affect + blend |
//! | GET  | `/state` | combined cognitive state |
//! | POST | `/see` | ingest a base64 image payload |
//! | GET  | `/vision/status` | vision counters |
//! | POST | `/vision/memories` | ranked visual memories |
//! | POST | `/vision/processed` | mark a record processed |
//! | POST | `/graph/block` | add a content block |
//! | GET  | `/graph/block/{id}` | fetch a block |
//! | POST | `/graph/connect` | connect two blocks |
//! | GET  | `/graph/stats` | block/connection counts |

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use mnema_store::CognitiveStore;
use mnema_types::MnemaError;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

/// Default TCP port for the gateway.
pub const DEFAULT_PORT: u16 = 7977;

/// Largest accepted request, headers included. Base64 inflates image
/// payloads by a third, so this admits images of roughly 12 MB.
const MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

/// Lightweight single-request-per-connection JSON server over a
/// [`CognitiveStore`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use mnema_gateway::GatewayServer;
/// use mnema_store::CognitiveStore;
///
/// #[tokio::main]
/// async fn main() -> std::io::Result<()> {
///     let store = Arc::new(CognitiveStore::new());
///     GatewayServer::new(store).run().await
/// }
/// ```
pub struct GatewayServer {
    store: Arc<CognitiveStore>,
    port: u16,
}

impl GatewayServer {
    /// Create a server over `store` on the [`DEFAULT_PORT`].
    pub fn new(store: Arc<CognitiveStore>) -> Self {
        Self {
            store,
            port: DEFAULT_PORT,
        }
    }

    /// Override the listening port (builder-style).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Return the configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Start the accept loop. Runs until the process exits.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(port = self.port, "gateway listening");

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let store = Arc::clone(&self.store);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, store).await {
                            tracing::warn!(%peer, error = %e, "client connection failed");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-connection handler
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_connection(
    mut stream: TcpStream,
    store: Arc<CognitiveStore>,
) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    // Read until the blank line ending the headers.
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(()); // peer went away mid-request
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        if buf.len() > MAX_REQUEST_BYTES {
            return write_response(&mut stream, 431, &json!({"error": "headers too large"})).await;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    if content_length > MAX_REQUEST_BYTES {
        return write_response(&mut stream, 413, &json!({"error": "request body too large"})).await;
    }

    // Read the remainder of the body.
    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[body_start..buf.len().min(body_start + content_length)])
        .into_owned();

    let (status, payload) = dispatch(&method, &path, &body, &store);
    write_response(&mut stream, status, &payload).await
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn write_response(stream: &mut TcpStream, status: u16, payload: &Value) -> std::io::Result<()> {
    let body = payload.to_string();
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        409 => "Conflict",
        413 => "Payload Too Large",
        422 => "Unprocessable Entity",
        431 => "Request Header Fields Too Large",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Request shapes
// ─────────────────────────────────────────────────────────────────────────────

fn default_importance() -> f64 {
    0.5
}

#[derive(Deserialize)]
struct RememberRequest {
    content: String,
    #[serde(default)]
    layer: String,
    #[serde(default = "default_importance")]
    importance: f64,
    #[serde(default)]
    emotional_tag: Option<String>,
}

#[derive(Deserialize)]
struct RecallRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    layer: String,
    #[serde(default)]
    limit: i64,
    #[serde(default)]
    min_importance: f64,
}

#[derive(Deserialize)]
struct FeelRequest {
    emotions: BTreeMap<String, f64>,
    #[serde(default)]
    trigger: String,
}

#[derive(Deserialize)]
struct ProcessTextRequest {
    text: String,
}

#[derive(Deserialize)]
struct SeeRequest {
    /// Base64-encoded image bytes.
    data: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default = "default_importance")]
    importance: f64,
    #[serde(default)]
    store_in_memory: bool,
}

#[derive(Deserialize)]
struct VisualMemoriesRequest {
    #[serde(default)]
    limit: i64,
    #[serde(default)]
    min_importance: f64,
    #[serde(default)]
    recent_only: bool,
}

#[derive(Deserialize)]
struct MarkProcessedRequest {
    id: Uuid,
}

#[derive(Deserialize)]
struct AddBlockRequest {
    content: String,
    #[serde(default)]
    kind: String,
}

#[derive(Deserialize)]
struct ConnectRequest {
    from: u64,
    to: u64,
    weight: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Route one request to the store and shape the JSON reply.
///
/// Pure with respect to the transport: takes the parsed method, path and
/// body, returns the status code and response payload.
pub(crate) fn dispatch(
    method: &str,
    path: &str,
    body: &str,
    store: &CognitiveStore,
) -> (u16, Value) {
    let now = Utc::now();
    match (method, path) {
        ("POST", "/remember") => with_request(body, |req: RememberRequest| {
            store
                .remember(&req.content, &req.layer, req.importance, req.emotional_tag, now)
                .map(|entry| json!(entry))
        }),
        ("POST", "/recall") => with_request(body, |req: RecallRequest| {
            store
                .recall(&req.query, &req.layer, req.limit, req.min_importance)
                .map(|hits| json!({ "count": hits.len(), "hits": hits }))
        }),
        ("POST", "/feel") => with_request(body, |req: FeelRequest| {
            let deltas: Vec<(String, f64)> = req.emotions.into_iter().collect();
            store.feel(&deltas, &req.trigger, now).map(|(dominant, intensity)| {
                json!({ "dominant": dominant, "intensity": intensity })
            })
        }),
        ("POST", "/process_text") => with_request(body, |req: ProcessTextRequest| {
            Ok(json!(store.process_text(&req.text, now)))
        }),
        ("GET", "/state") => (200, json!(store.cognitive_state(now))),
        ("POST", "/see") => with_request(body, |req: SeeRequest| {
            let Ok(data) = BASE64.decode(req.data.as_bytes()) else {
                return Err(MnemaError::DecodeError("invalid base64 payload".to_string()));
            };
            Ok(json!(store.see(
                &data,
                req.description,
                req.context,
                req.importance,
                req.store_in_memory,
                now,
            )))
        }),
        ("GET", "/vision/status") => (200, json!(store.vision_status())),
        ("POST", "/vision/memories") => with_request(body, |req: VisualMemoriesRequest| {
            store
                .visual_memories(req.limit, req.min_importance, req.recent_only)
                .map(|records| json!({ "count": records.len(), "memories": records }))
        }),
        ("POST", "/vision/processed") => with_request(body, |req: MarkProcessedRequest| {
            Ok(json!({ "marked": store.mark_processed(req.id) }))
        }),
        ("POST", "/graph/block") => with_request(body, |req: AddBlockRequest| {
            Ok(json!({ "id": store.add_block(&req.content, &req.kind).0 }))
        }),
        ("POST", "/graph/connect") => with_request(body, |req: ConnectRequest| {
            store
                .connect(req.from, req.to, req.weight)
                .map(|()| json!({ "connected": true }))
        }),
        ("GET", "/graph/stats") => (200, json!(store.graph_stats())),
        ("GET", path) if path.starts_with("/graph/block/") => {
            let raw = &path["/graph/block/".len()..];
            match raw.parse::<u64>() {
                Ok(id) => reply(store.get_block(id).map(|block| json!(block))),
                Err(_) => (400, json!({ "error": format!("invalid block id {raw:?}") })),
            }
        }
        _ => (404, json!({ "error": format!("no route {method} {path}") })),
    }
}

/// Parse the body, run the handler, shape the reply.
fn with_request<R, F>(body: &str, handler: F) -> (u16, Value)
where
    R: for<'de> Deserialize<'de>,
    F: FnOnce(R) -> Result<Value, MnemaError>,
{
    match serde_json::from_str::<R>(body) {
        Ok(request) => reply(handler(request)),
        Err(e) => (400, json!({ "error": format!("malformed request: {e}") })),
    }
}

fn reply(result: Result<Value, MnemaError>) -> (u16, Value) {
    match result {
        Ok(payload) => (200, payload),
        Err(error) => (error_status(&error), json!({ "error": error.to_string() })),
    }
}

fn error_status(error: &MnemaError) -> u16 {
    match error {
        MnemaError::NotFound(_) => 404,
        MnemaError::InvalidInput(_) | MnemaError::EmptyInput => 400,
        MnemaError::DecodeError(_) => 422,
        MnemaError::CapacityExceeded(_) => 409,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> CognitiveStore {
        CognitiveStore::new()
    }

    fn gif_base64() -> String {
        let mut data = b"GIF89a".to_vec();
        data.extend_from_slice(&100u16.to_le_bytes());
        data.extend_from_slice(&50u16.to_le_bytes());
        data.push(0);
        BASE64.encode(data)
    }

    // ── server constructor ──────────────────────────────────────────────────

    #[test]
    fn default_port_is_7977() {
        let server = GatewayServer::new(Arc::new(make_store()));
        assert_eq!(server.port(), DEFAULT_PORT);
    }

    #[test]
    fn with_port_overrides_default() {
        let server = GatewayServer::new(Arc::new(make_store())).with_port(9999);
        assert_eq!(server.port(), 9999);
    }

    // ── memory routes ───────────────────────────────────────────────────────

    #[test]
    fn remember_then_recall_over_dispatch() {
        let store = make_store();
        let (status, entry) = dispatch(
            "POST",
            "/remember",
            r#"{"content":"gateway smoke memory","importance":0.8}"#,
            &store,
        );
        assert_eq!(status, 200);
        assert_eq!(entry["layer"], "working");

        let (status, found) = dispatch(
            "POST",
            "/recall",
            r#"{"query":"smoke"}"#,
            &store,
        );
        assert_eq!(status, 200);
        assert_eq!(found["count"], 1);
        assert_eq!(found["hits"][0]["entry"]["id"], entry["id"]);
    }

    #[test]
    fn remember_empty_content_is_400() {
        let store = make_store();
        let (status, payload) = dispatch("POST", "/remember", r#"{"content":""}"#, &store);
        assert_eq!(status, 400);
        assert!(payload["error"].is_string());
    }

    #[test]
    fn recall_negative_limit_is_400() {
        let store = make_store();
        let (status, _) = dispatch("POST", "/recall", r#"{"query":"x","limit":-2}"#, &store);
        assert_eq!(status, 400);
    }

    #[test]
    fn malformed_json_is_400() {
        let store = make_store();
        let (status, _) = dispatch("POST", "/remember", "not json", &store);
        assert_eq!(status, 400);
    }

    #[test]
    fn unknown_route_is_404() {
        let store = make_store();
        let (status, _) = dispatch("GET", "/nope", "", &store);
        assert_eq!(status, 404);
    }

    // ── emotion routes ──────────────────────────────────────────────────────

    #[test]
    fn feel_reports_dominant_emotion() {
        let store = make_store();
        let (status, payload) = dispatch(
            "POST",
            "/feel",
            r#"{"emotions":{"joy":1.5},"trigger":"shipped"}"#,
            &store,
        );
        assert_eq!(status, 200);
        assert_eq!(payload["dominant"], "joy");
        assert!((payload["intensity"].as_f64().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn feel_unknown_emotion_is_400() {
        let store = make_store();
        let (status, _) = dispatch("POST", "/feel", r#"{"emotions":{"zeal":0.5}}"#, &store);
        assert_eq!(status, 400);
    }

    #[test]
    fn state_reports_all_engines() {
        let store = make_store();
        dispatch("POST", "/remember", r#"{"content":"one memory"}"#, &store);
        let (status, payload) = dispatch("GET", "/state", "", &store);
        assert_eq!(status, 200);
        assert_eq!(payload["memories"], 1);
        assert!(payload["emotion"]["intensities"].is_array());
    }

    // ── graph routes ────────────────────────────────────────────────────────

    #[test]
    fn graph_block_lifecycle_over_dispatch() {
        let store = make_store();
        let (_, a) = dispatch("POST", "/graph/block", r#"{"content":"a","kind":"text"}"#, &store);
        let (_, b) = dispatch("POST", "/graph/block", r#"{"content":"b","kind":"code"}"#, &store);

        let connect = format!(
            r#"{{"from":{},"to":{},"weight":0.8}}"#,
            a["id"], b["id"]
        );
        let (status, _) = dispatch("POST", "/graph/connect", &connect, &store);
        assert_eq!(status, 200);

        let (status, stats) = dispatch("GET", "/graph/stats", "", &store);
        assert_eq!(status, 200);
        assert_eq!(stats["blocks"], 2);
        assert_eq!(stats["connections"], 1);

        let path = format!("/graph/block/{}", a["id"]);
        let (status, block) = dispatch("GET", &path, "", &store);
        assert_eq!(status, 200);
        assert_eq!(block["content"], "a");
    }

    #[test]
    fn connect_to_missing_block_is_404() {
        let store = make_store();
        let (_, a) = dispatch("POST", "/graph/block", r#"{"content":"a","kind":""}"#, &store);
        let connect = format!(r#"{{"from":{},"to":999,"weight":0.8}}"#, a["id"]);
        let (status, _) = dispatch("POST", "/graph/connect", &connect, &store);
        assert_eq!(status, 404);

        let (_, stats) = dispatch("GET", "/graph/stats", "", &store);
        assert_eq!(stats["connections"], 0);
    }

    #[test]
    fn bad_block_id_in_path_is_400() {
        let store = make_store();
        let (status, _) = dispatch("GET", "/graph/block/xyz", "", &store);
        assert_eq!(status, 400);
    }

    // ── vision routes ───────────────────────────────────────────────────────

    #[test]
    fn see_ingests_base64_payload() {
        let store = make_store();
        let body = format!(
            r#"{{"data":"{}","description":"test card","store_in_memory":true}}"#,
            gif_base64()
        );
        let (status, payload) = dispatch("POST", "/see", &body, &store);
        assert_eq!(status, 200);
        assert_eq!(payload["success"], true);
        assert_eq!(payload["analysis"]["format"], "gif");
        assert!(payload["memory_entry"].is_string());
    }

    #[test]
    fn see_invalid_base64_is_422() {
        let store = make_store();
        let (status, _) = dispatch("POST", "/see", r#"{"data":"%%%%"}"#, &store);
        assert_eq!(status, 422);
    }

    #[test]
    fn see_bad_media_is_structured_not_an_error_status() {
        let store = make_store();
        let body = format!(r#"{{"data":"{}"}}"#, BASE64.encode(b"not an image"));
        let (status, payload) = dispatch("POST", "/see", &body, &store);
        assert_eq!(status, 200);
        assert_eq!(payload["success"], false);
        assert!(payload["error"].is_string());
    }

    #[test]
    fn vision_status_and_memories_round_trip() {
        let store = make_store();
        let body = format!(r#"{{"data":"{}"}}"#, gif_base64());
        let (_, outcome) = dispatch("POST", "/see", &body, &store);

        let (status, vision) = dispatch("GET", "/vision/status", "", &store);
        assert_eq!(status, 200);
        assert_eq!(vision["stats"]["total_received"], 1);

        let (status, memories) = dispatch("POST", "/vision/memories", "{}", &store);
        assert_eq!(status, 200);
        assert_eq!(memories["count"], 1);

        let mark = format!(r#"{{"id":{}}}"#, outcome["id"]);
        let (status, marked) = dispatch("POST", "/vision/processed", &mark, &store);
        assert_eq!(status, 200);
        assert_eq!(marked["marked"], true);
    }

    // ── request framing helpers ─────────────────────────────────────────────

    #[test]
    fn header_end_is_found() {
        assert_eq!(
            find_header_end(b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}"),
            Some(34)
        );
        assert_eq!(find_header_end(b"partial headers\r\n"), None);
    }
}
