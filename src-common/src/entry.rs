//! Entry creation and the transcript editor workflow.
//!
//! Every creation path (file upload, microphone recording, written text)
//! ends with the new recording ID and the editor view to continue in.

use serde::Serialize;
use tracing::info;

use crate::api::{ApiClient, ApiError, AudioUpload, CreateTextEntry};
use crate::routes::Route;
use crate::types::TranscriptVersion;
use crate::validation::validate_text;

/// How a new entry is produced.
#[derive(Debug, Clone)]
pub enum EntrySource {
    /// An existing audio file
    File(AudioUpload),
    /// Audio captured from the microphone
    Recording(AudioUpload),
    /// Written text
    Text(CreateTextEntry),
}

impl EntrySource {
    fn kind(&self) -> &'static str {
        match self {
            EntrySource::File(_) => "file",
            EntrySource::Recording(_) => "recording",
            EntrySource::Text(_) => "text",
        }
    }
}

/// A newly created entry and where to go next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryCreated {
    pub recording_id: String,
    pub route: Route,
}

impl EntryCreated {
    pub fn new(recording_id: String) -> Self {
        let route = Route::Editor(recording_id.clone());
        Self {
            recording_id,
            route,
        }
    }
}

/// Create an entry. Validation failures are reported before any request.
pub async fn create_entry(client: &ApiClient, source: &EntrySource) -> Result<EntryCreated, ApiError> {
    let recording_id = match source {
        EntrySource::File(upload) | EntrySource::Recording(upload) => {
            client.upload_audio(upload).await?
        }
        EntrySource::Text(entry) => client.create_text_entry(entry).await?,
    };
    info!(id = %recording_id, kind = source.kind(), "Entry created");
    Ok(EntryCreated::new(recording_id))
}

/// Text to edit: the edited transcript, or the original when nothing has
/// been edited yet.
pub async fn load_editor_text(client: &ApiClient, id: &str) -> Result<String, ApiError> {
    let edited = client.get_transcript(id, TranscriptVersion::Edited).await?;
    if !edited.trim().is_empty() {
        return Ok(edited);
    }
    client.get_transcript(id, TranscriptVersion::Original).await
}

/// What to do with the editor text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    /// Store the text as the edited transcript
    SaveDraft,
    /// Store and re-run backend processing on it
    Finalize,
}

/// Submit editor text and return the detail view to show afterwards.
pub async fn submit_editor(
    client: &ApiClient,
    id: &str,
    text: &str,
    action: EditorAction,
) -> Result<Route, ApiError> {
    validate_text(text)?;
    match action {
        EditorAction::SaveDraft => client.save_edited_transcript(id, text).await?,
        EditorAction::Finalize => {
            client.finalize(id, text).await?;
        }
    }
    info!(id, ?action, "Editor text submitted");
    Ok(Route::Recording(id.to_string()))
}
