//! In-process stand-in for the journaling backend, used by the HTTP tests.
//!
//! Recordings are kept as raw JSON so tests can seed any payload shape. The
//! handlers imitate the real backend closely enough for the client workflows:
//! uploads create entries, finalize re-derives segments and PII from the
//! edited text, and errors carry a `detail` message.

use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::api::ApiClient;

/// Name the stub's fake detector flags as PII.
pub const STUB_PII_NAME: &str = "Alice";

#[derive(Debug, Clone, Default)]
pub struct UploadInfo {
    pub file_name: Option<String>,
    pub mime: Option<String>,
    pub language: Option<String>,
    pub size: usize,
}

#[derive(Debug, Default)]
struct Inner {
    recordings: Vec<Value>,
    wrap_list: bool,
    calls: Vec<String>,
    settings: serde_json::Map<String, Value>,
    configured: bool,
    setup_broken: bool,
    upload_html_failure: bool,
    omit_created_id: bool,
    next_id: u32,
    last_created_id: Option<String>,
    last_upload: Option<UploadInfo>,
    last_pii_sync: Option<Value>,
}

impl Inner {
    fn find(&self, id: &str) -> Option<&Value> {
        self.recordings
            .iter()
            .find(|r| r["recording_id"].as_str() == Some(id))
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.recordings
            .iter_mut()
            .find(|r| r["recording_id"].as_str() == Some(id))
    }

    fn create(&mut self, mut record: Value) -> String {
        self.next_id += 1;
        let id = format!("{:012x}", 0xabc000 + self.next_id);
        record["recording_id"] = json!(id);
        record["created_at"] = json!("2024-03-05T10:00:00");
        self.recordings.push(record);
        self.last_created_id = Some(id.clone());
        id
    }
}

fn default_settings() -> serde_json::Map<String, Value> {
    let mut map = serde_json::Map::new();
    map.insert("LANGUAGE".into(), json!("en"));
    map.insert("WHISPER_MODEL".into(), json!("small"));
    map.insert("DEVICE".into(), json!("cpu"));
    map
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"detail": "Recording not found"})),
    )
        .into_response()
}

/// Char-offset PII spans for every occurrence of [`STUB_PII_NAME`].
fn detect_names(id: &str, text: &str) -> Vec<Value> {
    let chars: Vec<char> = text.chars().collect();
    let needle: Vec<char> = STUB_PII_NAME.chars().collect();
    let mut hits = Vec::new();
    let mut i = 0;
    while i + needle.len() <= chars.len() {
        if chars[i..i + needle.len()] == needle[..] {
            hits.push(json!({
                "recording_id": id,
                "start_char": i,
                "end_char": i + needle.len(),
                "label": "NAME",
                "preview": STUB_PII_NAME,
            }));
            i += needle.len();
        } else {
            i += 1;
        }
    }
    hits
}

type Shared = Arc<Mutex<Inner>>;

/// A running stub backend bound to an ephemeral localhost port.
#[derive(Clone)]
pub struct StubBackend {
    base_url: String,
    state: Shared,
}

impl StubBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(Inner {
            settings: default_settings(),
            configured: true,
            ..Default::default()
        }));

        let app = Router::new()
            .route("/api/recordings", get(list_recordings))
            .route(
                "/api/recordings/:id",
                get(get_recording).delete(delete_recording),
            )
            .route("/api/recordings/:id/meta", axum::routing::patch(update_meta))
            .route("/api/recordings/:id/audio", delete(delete_audio))
            .route(
                "/api/recordings/:id/transcript",
                get(get_transcript).delete(delete_transcripts),
            )
            .route("/api/recordings/:id/transcript/edited", put(save_edited))
            .route("/api/recordings/:id/segments", delete(delete_segments))
            .route("/api/recordings/:id/pii", put(sync_pii))
            .route("/api/recordings/upload", post(upload))
            .route("/api/recordings/text", post(create_text))
            .route("/api/recordings/finalize", post(finalize))
            .route("/api/audio/:id", get(download_audio))
            .route("/api/settings", get(get_settings))
            .route("/api/settings/update", post(update_settings))
            .route("/api/settings/reset", post(reset_settings))
            .route("/api/search/semantic", post(search))
            .route("/api/setup/status", get(setup_status))
            .route("/api/setup/run", post(run_setup))
            .layer(middleware::from_fn_with_state(state.clone(), record_call))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(self.base_url.clone()).unwrap()
    }

    pub fn add_recording(&self, record: Value) {
        self.state.lock().unwrap().recordings.push(record);
    }

    pub fn recording(&self, id: &str) -> Option<Value> {
        self.state.lock().unwrap().find(id).cloned()
    }

    pub fn set_wrap_list(&self, wrap: bool) {
        self.state.lock().unwrap().wrap_list = wrap;
    }

    pub fn set_configured(&self, configured: bool) {
        self.state.lock().unwrap().configured = configured;
    }

    pub fn break_setup_status(&self) {
        self.state.lock().unwrap().setup_broken = true;
    }

    pub fn fail_uploads_with_html(&self) {
        self.state.lock().unwrap().upload_html_failure = true;
    }

    pub fn omit_created_id(&self) {
        self.state.lock().unwrap().omit_created_id = true;
    }

    pub fn last_created_id(&self) -> Option<String> {
        self.state.lock().unwrap().last_created_id.clone()
    }

    pub fn last_upload(&self) -> Option<UploadInfo> {
        self.state.lock().unwrap().last_upload.clone()
    }

    pub fn last_pii_sync(&self) -> Option<Value> {
        self.state.lock().unwrap().last_pii_sync.clone()
    }

    /// `METHOD /path` of every request received, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

/// URL of a localhost port nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn record_call(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let call = format!("{} {}", request.method(), request.uri().path());
    state.lock().unwrap().calls.push(call);
    next.run(request).await
}

async fn list_recordings(State(state): State<Shared>) -> Response {
    let inner = state.lock().unwrap();
    let list = Value::Array(inner.recordings.clone());
    if inner.wrap_list {
        Json(json!({ "recordings": list })).into_response()
    } else {
        Json(list).into_response()
    }
}

async fn get_recording(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    match state.lock().unwrap().find(&id) {
        Some(record) => Json(record.clone()).into_response(),
        None => not_found(),
    }
}

async fn delete_recording(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut inner = state.lock().unwrap();
    let before = inner.recordings.len();
    inner
        .recordings
        .retain(|r| r["recording_id"].as_str() != Some(id.as_str()));
    if inner.recordings.len() == before {
        return not_found();
    }
    Json(json!({"status": "deleted"})).into_response()
}

async fn update_meta(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = state.lock().unwrap();
    let Some(record) = inner.find_mut(&id) else {
        return not_found();
    };
    if let Some(title) = body.get("title") {
        record["title"] = title.clone();
    }
    if let Some(tags) = body.get("tags") {
        record["tags"] = tags.clone();
    }
    Json(json!({"title": record["title"], "tags": record["tags"]})).into_response()
}

async fn delete_audio(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut inner = state.lock().unwrap();
    let Some(record) = inner.find_mut(&id) else {
        return not_found();
    };
    record["has_audio"] = json!(false);
    Json(json!({"status": "deleted"})).into_response()
}

#[derive(serde::Deserialize)]
struct VersionQuery {
    version: Option<String>,
}

async fn get_transcript(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Query(query): Query<VersionQuery>,
) -> Response {
    let inner = state.lock().unwrap();
    let Some(record) = inner.find(&id) else {
        return not_found();
    };
    let version = query.version.unwrap_or_else(|| "original".to_string());
    match record["transcripts"][version.as_str()].as_str() {
        Some(text) if !text.is_empty() => {
            Json(json!({"text": text, "version": version})).into_response()
        }
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Transcript not found"})),
        )
            .into_response(),
    }
}

async fn delete_transcripts(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Query(query): Query<VersionQuery>,
) -> Response {
    let mut inner = state.lock().unwrap();
    let Some(record) = inner.find_mut(&id) else {
        return not_found();
    };
    if query.version.as_deref() != Some("all") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Unsupported version"})),
        )
            .into_response();
    }
    record["transcripts"] = json!({});
    Json(json!({"status": "deleted"})).into_response()
}

async fn save_edited(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = state.lock().unwrap();
    let Some(record) = inner.find_mut(&id) else {
        return not_found();
    };
    if !record["transcripts"].is_object() {
        record["transcripts"] = json!({});
    }
    record["transcripts"]["edited"] = body["text"].clone();
    Json(json!({"status": "saved"})).into_response()
}

async fn delete_segments(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut inner = state.lock().unwrap();
    let Some(record) = inner.find_mut(&id) else {
        return not_found();
    };
    record["segments"] = json!([]);
    Json(json!({"status": "deleted"})).into_response()
}

async fn sync_pii(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = state.lock().unwrap();
    inner.last_pii_sync = Some(body.clone());
    let Some(record) = inner.find_mut(&id) else {
        return not_found();
    };
    record["pii_edited"] = body["findings"].clone();
    Json(json!({"status": "ok"})).into_response()
}

async fn upload(State(state): State<Shared>, mut multipart: Multipart) -> Response {
    let mut info = UploadInfo::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            info.file_name = field.file_name().map(str::to_string);
            info.mime = field.content_type().map(str::to_string);
            info.size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        } else if name == "language" {
            info.language = field.text().await.ok();
        }
    }

    let mut inner = state.lock().unwrap();
    if inner.upload_html_failure {
        return (StatusCode::INTERNAL_SERVER_ERROR, "<html>boom</html>").into_response();
    }
    let title = info.file_name.clone().unwrap_or_default();
    inner.last_upload = Some(info);
    let id = inner.create(json!({
        "title": title,
        "has_audio": true,
        "transcripts": {"original": "Transcribed audio."},
    }));
    if inner.omit_created_id {
        return Json(json!({"status": "ok"})).into_response();
    }
    Json(json!({ "recording_id": id })).into_response()
}

async fn create_text(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut inner = state.lock().unwrap();
    let id = inner.create(json!({
        "title": body["title"],
        "tags": body["tags"],
        "has_audio": false,
        "transcripts": {"original": body["text"]},
    }));
    Json(json!({ "recording_id": id })).into_response()
}

async fn finalize(State(state): State<Shared>, mut multipart: Multipart) -> Response {
    let mut id = String::new();
    let mut edited = String::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let value = field.text().await.unwrap_or_default();
        match name.as_str() {
            "recording_id" => id = value,
            "edited_transcript" => edited = value,
            _ => {}
        }
    }

    let mut inner = state.lock().unwrap();
    let Some(record) = inner.find_mut(&id) else {
        return not_found();
    };
    let pii = detect_names(&id, &edited);
    let redacted = edited.replace(STUB_PII_NAME, "[NAME]");
    if !record["transcripts"].is_object() {
        record["transcripts"] = json!({});
    }
    record["transcripts"]["edited"] = json!(edited);
    record["transcripts"]["redacted"] = json!(redacted);
    record["segments"] = json!([{"label": "reflection", "text": edited}]);
    record["pii_edited"] = Value::Array(pii);
    Json(json!({"status": "saved"})).into_response()
}

async fn download_audio(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let inner = state.lock().unwrap();
    match inner.find(&id) {
        Some(record) if record["has_audio"].as_bool() == Some(true) => {
            b"RIFF-stub-audio".to_vec().into_response()
        }
        _ => not_found(),
    }
}

async fn get_settings(State(state): State<Shared>) -> Response {
    let inner = state.lock().unwrap();
    Json(json!({ "settings": inner.settings })).into_response()
}

async fn update_settings(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut inner = state.lock().unwrap();
    match body.get("settings").and_then(Value::as_object) {
        Some(settings) => {
            inner.settings = settings.clone();
            Json(json!({"status": "ok"})).into_response()
        }
        None => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"msg": "settings required"}]})),
        )
            .into_response(),
    }
}

async fn reset_settings(State(state): State<Shared>) -> Response {
    state.lock().unwrap().settings = default_settings();
    Json(json!({"status": "ok"})).into_response()
}

async fn search(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let inner = state.lock().unwrap();
    let query = body["query"].as_str().unwrap_or_default().to_lowercase();
    let hits: Vec<Value> = inner
        .recordings
        .iter()
        .filter_map(|r| {
            let text = r["transcripts"]["original"].as_str()?;
            text.to_lowercase().contains(&query).then(|| {
                json!({
                    "recording_id": r["recording_id"],
                    "segment_id": 0,
                    "score": 0.9,
                    "label": "reflection",
                    "text": text,
                })
            })
        })
        .collect();
    Json(json!({ "hits": hits })).into_response()
}

async fn setup_status(State(state): State<Shared>) -> Response {
    let inner = state.lock().unwrap();
    if inner.setup_broken {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "setup check failed"})),
        )
            .into_response();
    }
    Json(json!({
        "is_configured": inner.configured,
        "system_info": {"suggested_device": "cpu"},
        "current_config": {
            "data_dir": "/data",
            "config_dir": "/config",
            "language": "en",
            "whisper_model": "small",
            "device": "cpu"
        }
    }))
    .into_response()
}

async fn run_setup(State(state): State<Shared>, Json(_config): Json<Value>) -> Response {
    state.lock().unwrap().configured = true;
    Json(json!({"message": "Setup complete", "status": "ok"})).into_response()
}
