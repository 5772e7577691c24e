//! Typed client with one method per backend operation.
//!
//! Every method issues exactly one HTTP request. Nothing is cached and
//! nothing is retried; callers refetch when they need fresh state.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{extract_detail, ApiError};
use super::requests::{
    AudioUpload, CreateTextEntry, PiiSync, SaveEditedTranscript, SemanticSearchQuery,
    SettingsUpdate, UpdateMeta,
};
use super::responses::{
    Acknowledgement, CreatedResponse, MetaUpdated, RecordingList, SearchResults,
    SettingsEnvelope, TranscriptText,
};
use crate::types::{
    EngineSettings, PiiHit, Recording, SemanticHit, SetupConfig, SetupStatus, TranscriptVersion,
};
use crate::validation::{validate_recording_id, validate_text};

/// Default backend address.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Timeout for the settings probe used by status monitoring.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Client for the journaling backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL (trailing slashes ignored).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self::with_http(http, base_url))
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "API request");
        self.http.request(method, url)
    }

    /// Send a request and turn non-success statuses into [`ApiError::Status`]
    /// with the server's `detail` or `fallback` as message.
    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            let err = ApiError::from(e);
            warn!(error = %err, "API request failed");
            err
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), "API response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_detail(&body).unwrap_or_else(|| fallback.to_string());
        warn!(status = status.as_u16(), %message, "Backend rejected request");
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(request, fallback).await?;
        Self::decode(response).await
    }

    fn recording_path(id: &str, suffix: &str) -> Result<String, ApiError> {
        validate_recording_id(id)?;
        Ok(format!("/api/recordings/{}{}", id, suffix))
    }

    // === Recordings ===

    pub async fn list_recordings(&self) -> Result<Vec<Recording>, ApiError> {
        let list: RecordingList = self
            .send_json(
                self.request(Method::GET, "/api/recordings"),
                "Failed to load recordings",
            )
            .await?;
        Ok(list.into_vec())
    }

    pub async fn get_recording(&self, id: &str) -> Result<Recording, ApiError> {
        let path = Self::recording_path(id, "")?;
        self.send_json(self.request(Method::GET, &path), "Failed to load recording")
            .await
    }

    pub async fn update_meta(&self, id: &str, meta: &UpdateMeta) -> Result<MetaUpdated, ApiError> {
        let path = Self::recording_path(id, "/meta")?;
        let response = self
            .send(
                self.request(Method::PATCH, &path).json(meta),
                "Failed to update recording",
            )
            .await?;
        // Older backends answer with an empty body; echo what was sent.
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes).unwrap_or_else(|_| MetaUpdated {
            title: meta.title.clone(),
            tags: meta.tags.clone(),
        }))
    }

    pub async fn delete_recording(&self, id: &str) -> Result<(), ApiError> {
        let path = Self::recording_path(id, "")?;
        self.send(self.request(Method::DELETE, &path), "Delete failed")
            .await?;
        Ok(())
    }

    pub async fn delete_audio(&self, id: &str) -> Result<(), ApiError> {
        let path = Self::recording_path(id, "/audio")?;
        self.send(self.request(Method::DELETE, &path), "Failed to delete audio")
            .await?;
        Ok(())
    }

    /// Delete every transcript version.
    pub async fn delete_transcripts(&self, id: &str) -> Result<(), ApiError> {
        let path = Self::recording_path(id, "/transcript")?;
        self.send(
            self.request(Method::DELETE, &path)
                .query(&[("version", "all")]),
            "Failed to delete transcripts",
        )
        .await?;
        Ok(())
    }

    pub async fn delete_segments(&self, id: &str) -> Result<(), ApiError> {
        let path = Self::recording_path(id, "/segments")?;
        self.send(self.request(Method::DELETE, &path), "Failed to delete segments")
            .await?;
        Ok(())
    }

    // === Entry creation ===

    /// Upload an audio file and return the new recording ID.
    pub async fn upload_audio(&self, upload: &AudioUpload) -> Result<String, ApiError> {
        upload.validate()?;

        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime)?;
        let form = Form::new()
            .part("file", part)
            .text("language", upload.language.clone());

        let created: CreatedResponse = self
            .send_json(
                self.request(Method::POST, "/api/recordings/upload")
                    .multipart(form),
                "Upload failed.",
            )
            .await?;
        created_id(created, "Upload succeeded, but server returned no recording_id.")
    }

    /// Create a written entry and return the new recording ID.
    pub async fn create_text_entry(&self, entry: &CreateTextEntry) -> Result<String, ApiError> {
        validate_text(&entry.text)?;

        let created: CreatedResponse = self
            .send_json(
                self.request(Method::POST, "/api/recordings/text").json(entry),
                "Failed to save entry.",
            )
            .await?;
        created_id(created, "Entry saved, but server returned no recording_id.")
    }

    // === Transcripts ===

    /// Fetch one transcript version. A missing transcript reads as empty text.
    pub async fn get_transcript(
        &self,
        id: &str,
        version: TranscriptVersion,
    ) -> Result<String, ApiError> {
        let path = Self::recording_path(id, "/transcript")?;
        let request = self
            .request(Method::GET, &path)
            .query(&[("version", version.as_str())]);
        match self.send_json::<TranscriptText>(request, "Failed to load transcript").await {
            Ok(transcript) => Ok(transcript.text),
            Err(e) if e.is_not_found() => {
                debug!(id, %version, "Transcript not found, using empty text");
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn save_edited_transcript(&self, id: &str, text: &str) -> Result<(), ApiError> {
        let path = Self::recording_path(id, "/transcript/edited")?;
        self.send(
            self.request(Method::PUT, &path)
                .json(&SaveEditedTranscript { text }),
            "Save failed",
        )
        .await?;
        Ok(())
    }

    /// Store the edited text and have the backend re-run segmentation,
    /// PII detection and redaction on it.
    pub async fn finalize(&self, id: &str, edited_text: &str) -> Result<Acknowledgement, ApiError> {
        validate_recording_id(id)?;
        let form = Form::new()
            .text("recording_id", id.to_string())
            .text("edited_transcript", edited_text.to_string());
        let response = self
            .send(
                self.request(Method::POST, "/api/recordings/finalize")
                    .multipart(form),
                "Finalize failed",
            )
            .await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }

    /// Replace the stored PII list wholesale.
    pub async fn sync_pii(&self, id: &str, hits: &[PiiHit]) -> Result<(), ApiError> {
        let path = Self::recording_path(id, "/pii")?;
        let body = PiiSync::from_hits(id, hits);
        self.send(
            self.request(Method::PUT, &path).json(&body),
            "Failed to update PII",
        )
        .await?;
        Ok(())
    }

    // === Audio ===

    pub async fn download_audio(&self, id: &str) -> Result<Vec<u8>, ApiError> {
        validate_recording_id(id)?;
        let path = format!("/api/audio/{}", id);
        let response = self
            .send(self.request(Method::GET, &path), "Failed to download audio")
            .await?;
        Ok(response.bytes().await?.to_vec())
    }

    // === Settings ===

    pub async fn get_settings(&self) -> Result<EngineSettings, ApiError> {
        let envelope: SettingsEnvelope = self
            .send_json(
                self.request(Method::GET, "/api/settings"),
                "Failed to load settings",
            )
            .await?;
        Ok(envelope.into_settings())
    }

    pub async fn update_settings(&self, settings: &EngineSettings) -> Result<(), ApiError> {
        self.send(
            self.request(Method::POST, "/api/settings/update")
                .json(&SettingsUpdate { settings }),
            "Failed to save settings",
        )
        .await?;
        Ok(())
    }

    pub async fn reset_settings(&self) -> Result<(), ApiError> {
        self.send(
            self.request(Method::POST, "/api/settings/reset"),
            "Failed to reset settings",
        )
        .await?;
        Ok(())
    }

    /// Liveness probe used by status monitoring.
    pub async fn ping_settings(&self, timeout: Duration) -> Result<(), ApiError> {
        let request = self.request(Method::GET, "/api/settings").timeout(timeout);
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: response.status().as_u16(),
                message: "Backend unhealthy".to_string(),
            })
        }
    }

    // === Search ===

    pub async fn semantic_search(
        &self,
        query: &SemanticSearchQuery,
    ) -> Result<Vec<SemanticHit>, ApiError> {
        let results: SearchResults = self
            .send_json(
                self.request(Method::POST, "/api/search/semantic").json(query),
                "Search failed",
            )
            .await?;
        Ok(results.into_vec())
    }

    // === Setup ===

    pub async fn setup_status(&self) -> Result<SetupStatus, ApiError> {
        self.send_json(
            self.request(Method::GET, "/api/setup/status"),
            "Failed to load setup status",
        )
        .await
    }

    /// Setup status with a short timeout, for status monitoring.
    pub async fn probe_setup_status(&self, timeout: Duration) -> Result<SetupStatus, ApiError> {
        self.send_json(
            self.request(Method::GET, "/api/setup/status").timeout(timeout),
            "Failed to load setup status",
        )
        .await
    }

    pub async fn run_setup(&self, config: &SetupConfig) -> Result<Acknowledgement, ApiError> {
        self.send_json(
            self.request(Method::POST, "/api/setup/run").json(config),
            "Setup failed",
        )
        .await
    }
}

fn created_id(created: CreatedResponse, missing: &str) -> Result<String, ApiError> {
    created
        .recording_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Incomplete(missing.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{unreachable_url, StubBackend};

    #[tokio::test]
    async fn test_list_accepts_both_shapes() {
        let stub = StubBackend::start().await;
        stub.add_recording(serde_json::json!({"recording_id": "aaa111", "title": "One"}));
        let client = stub.client();

        let list = client.list_recordings().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].display_title(), "One");

        stub.set_wrap_list(true);
        let list = client.list_recordings().await.unwrap();
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn test_status_error_uses_detail() {
        let stub = StubBackend::start().await;
        let err = stub.client().get_recording("missing1").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Recording not found");
    }

    #[tokio::test]
    async fn test_status_error_falls_back_without_detail() {
        let stub = StubBackend::start().await;
        stub.fail_uploads_with_html();
        let upload = AudioUpload::new("a.wav", "audio/wav", vec![0; 8], "en");
        let err = stub.client().upload_audio(&upload).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "Upload failed.");
    }

    #[tokio::test]
    async fn test_upload_returns_recording_id() {
        let stub = StubBackend::start().await;
        let upload = AudioUpload::new("memo.wav", "audio/wav", vec![1, 2, 3], "en");
        let id = stub.client().upload_audio(&upload).await.unwrap();

        assert_eq!(id, stub.last_created_id().unwrap());
        let uploaded = stub.last_upload().unwrap();
        assert_eq!(uploaded.file_name.as_deref(), Some("memo.wav"));
        assert_eq!(uploaded.language.as_deref(), Some("en"));
        assert_eq!(uploaded.size, 3);
    }

    #[tokio::test]
    async fn test_invalid_upload_never_reaches_network() {
        let stub = StubBackend::start().await;
        let upload = AudioUpload::new("photo.png", "image/png", vec![0; 4], "en");
        let err = stub.client().upload_audio(&upload).await.unwrap_err();

        assert!(matches!(err, ApiError::Invalid(_)));
        assert_eq!(stub.request_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_without_id_is_an_error() {
        let stub = StubBackend::start().await;
        stub.omit_created_id();
        let upload = AudioUpload::new("memo.wav", "audio/wav", vec![1], "en");
        let err = stub.client().upload_audio(&upload).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Upload succeeded, but server returned no recording_id."
        );
    }

    #[tokio::test]
    async fn test_text_entry() {
        let stub = StubBackend::start().await;
        let client = stub.client();

        let err = client
            .create_text_entry(&CreateTextEntry::new("   ", "en"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Invalid(_)));

        let id = client
            .create_text_entry(&CreateTextEntry::new("Slept well.", "en"))
            .await
            .unwrap();
        let rec = client.get_recording(&id).await.unwrap();
        assert_eq!(rec.transcripts.original.as_deref(), Some("Slept well."));
    }

    #[tokio::test]
    async fn test_missing_transcript_reads_empty() {
        let stub = StubBackend::start().await;
        stub.add_recording(serde_json::json!({
            "recording_id": "abc123",
            "transcripts": {"original": "hello"}
        }));
        let client = stub.client();

        let original = client
            .get_transcript("abc123", TranscriptVersion::Original)
            .await
            .unwrap();
        assert_eq!(original, "hello");

        let edited = client
            .get_transcript("abc123", TranscriptVersion::Edited)
            .await
            .unwrap();
        assert_eq!(edited, "");
    }

    #[tokio::test]
    async fn test_invalid_id_rejected_locally() {
        let stub = StubBackend::start().await;
        let err = stub.client().get_recording("../secrets").await.unwrap_err();
        assert!(matches!(err, ApiError::Invalid(_)));
        assert_eq!(stub.request_count(), 0);
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let stub = StubBackend::start().await;
        let client = stub.client();

        let mut settings = client.get_settings().await.unwrap();
        assert_eq!(settings.get_display("LANGUAGE").as_deref(), Some("en"));

        settings.assign("LANGUAGE=nl");
        client.update_settings(&settings).await.unwrap();
        let reloaded = client.get_settings().await.unwrap();
        assert_eq!(reloaded.get_display("LANGUAGE").as_deref(), Some("nl"));

        client.reset_settings().await.unwrap();
        let reset = client.get_settings().await.unwrap();
        assert_eq!(reset.get_display("LANGUAGE").as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let client = ApiClient::new(unreachable_url().await).unwrap();
        let err = client.list_recordings().await.unwrap_err();
        assert!(err.is_unreachable());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://127.0.0.1:8000/").unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }
}
