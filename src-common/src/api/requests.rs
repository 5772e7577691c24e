//! Request bodies sent to the backend.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{EngineSettings, PiiHit};
use crate::validation::{mime_from_path, validate_audio_file, ValidationError};

/// Language sent with uploads when none is configured.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Partial metadata update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl UpdateMeta {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.tags.is_none()
    }
}

/// An audio file ready for multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub language: String,
}

impl AudioUpload {
    pub fn new(
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
            language: language.into(),
        }
    }

    /// Load a file from disk, inferring the MIME type from its extension.
    ///
    /// The type and size are checked against the file metadata before the
    /// contents are read.
    pub fn from_path(path: &Path, language: &str) -> Result<Self, UploadFileError> {
        let mime = mime_from_path(path);
        let size = std::fs::metadata(path)?.len();
        validate_audio_file(mime, size)?;

        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        Ok(Self::new(file_name, mime, bytes, language))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_audio_file(&self.mime, self.size())
    }
}

/// Failure to prepare a file for upload.
#[derive(Debug)]
pub enum UploadFileError {
    Io(std::io::Error),
    Invalid(ValidationError),
}

impl std::fmt::Display for UploadFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadFileError::Io(e) => write!(f, "Could not read file: {}", e),
            UploadFileError::Invalid(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for UploadFileError {}

impl From<std::io::Error> for UploadFileError {
    fn from(e: std::io::Error) -> Self {
        UploadFileError::Io(e)
    }
}

impl From<ValidationError> for UploadFileError {
    fn from(e: ValidationError) -> Self {
        UploadFileError::Invalid(e)
    }
}

/// A written journal entry. The backend runs segmentation and PII detection
/// on it like on a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTextEntry {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub language: String,
    pub run_segmentation: bool,
    pub run_pii: bool,
}

impl CreateTextEntry {
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            title: None,
            tags: None,
            language: language.into(),
            run_segmentation: true,
            run_pii: true,
        }
    }

    /// Blank titles and empty tag lists are dropped.
    pub fn with_meta(mut self, title: Option<String>, tags: Vec<String>) -> Self {
        self.title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self.tags = if tags.is_empty() { None } else { Some(tags) };
        self
    }
}

/// Wire form of one PII finding in a wholesale replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiFinding {
    pub recording_id: String,
    pub start_char: usize,
    pub end_char: usize,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Body of the PII replacement endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiSync {
    pub findings: Vec<PiiFinding>,
}

impl PiiSync {
    /// Build the payload from a hit list. Hits without a character range
    /// cannot be stored against a transcript and are skipped.
    pub fn from_hits(recording_id: &str, hits: &[PiiHit]) -> Self {
        let findings = hits
            .iter()
            .filter_map(|hit| {
                let (start_char, end_char) = hit.range()?;
                Some(PiiFinding {
                    recording_id: hit
                        .recording_id
                        .clone()
                        .unwrap_or_else(|| recording_id.to_string()),
                    start_char,
                    end_char,
                    label: hit.label.clone().unwrap_or_else(|| "PII".to_string()),
                    preview: hit.preview.clone().or_else(|| hit.text.clone()),
                })
            })
            .collect();
        Self { findings }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SaveEditedTranscript<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SettingsUpdate<'a> {
    pub settings: &'a EngineSettings,
}

/// Semantic search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticSearchQuery {
    pub query: String,
    pub top_k: u32,
    pub min_score: f64,
    pub per_recording_cap: u32,
}

impl SemanticSearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: 8,
            min_score: 0.25,
            per_recording_cap: 2,
        }
    }
}
