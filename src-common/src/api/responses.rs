//! Response envelopes returned by the backend.
//!
//! Several endpoints answer either with a bare value or with the value
//! wrapped in an object; the untagged enums here accept both so callers only
//! ever see the inner value.

use serde::{Deserialize, Serialize};

use crate::types::{null_as_default, EngineSettings, Recording, SemanticHit};

/// `GET /api/recordings`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RecordingList {
    Bare(Vec<Recording>),
    Wrapped {
        #[serde(default, deserialize_with = "null_as_default")]
        recordings: Vec<Recording>,
    },
}

impl RecordingList {
    pub fn into_vec(self) -> Vec<Recording> {
        match self {
            RecordingList::Bare(list) | RecordingList::Wrapped { recordings: list } => list,
        }
    }
}

/// `GET /api/settings`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum SettingsEnvelope {
    Wrapped { settings: EngineSettings },
    Bare(EngineSettings),
}

impl SettingsEnvelope {
    pub fn into_settings(self) -> EngineSettings {
        match self {
            SettingsEnvelope::Wrapped { settings } | SettingsEnvelope::Bare(settings) => settings,
        }
    }
}

/// `POST /api/search/semantic`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum SearchResults {
    Bare(Vec<SemanticHit>),
    Wrapped {
        #[serde(default, deserialize_with = "null_as_default")]
        hits: Vec<SemanticHit>,
    },
}

impl SearchResults {
    pub fn into_vec(self) -> Vec<SemanticHit> {
        match self {
            SearchResults::Bare(hits) | SearchResults::Wrapped { hits } => hits,
        }
    }
}

/// Upload and text-entry creation both answer with the new ID.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CreatedResponse {
    #[serde(default)]
    pub recording_id: Option<String>,
}

/// Metadata as echoed back after a PATCH.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaUpdated {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// One transcript version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptText {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Generic `{status, message}` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_list_shapes() {
        let bare: RecordingList = serde_json::from_str(r#"[{"recording_id": "a"}]"#).unwrap();
        assert_eq!(bare.into_vec()[0].recording_id, "a");

        let wrapped: RecordingList =
            serde_json::from_str(r#"{"recordings": [{"id": "b"}, {"id": "c"}]}"#).unwrap();
        assert_eq!(wrapped.into_vec().len(), 2);

        let empty: RecordingList = serde_json::from_str(r#"{"recordings": null}"#).unwrap();
        assert!(empty.into_vec().is_empty());
    }

    #[test]
    fn test_settings_envelope_shapes() {
        let wrapped: SettingsEnvelope =
            serde_json::from_str(r#"{"settings": {"LANGUAGE": "en"}}"#).unwrap();
        assert_eq!(
            wrapped.into_settings().get_display("LANGUAGE").as_deref(),
            Some("en")
        );

        let bare: SettingsEnvelope = serde_json::from_str(r#"{"DEVICE": "cpu"}"#).unwrap();
        assert_eq!(bare.into_settings().get_display("DEVICE").as_deref(), Some("cpu"));
    }

    #[test]
    fn test_search_results_shapes() {
        let bare: SearchResults =
            serde_json::from_str(r#"[{"recording_id": "a", "segment_id": 1, "score": 0.5}]"#).unwrap();
        assert_eq!(bare.into_vec()[0].segment_id, 1);

        let wrapped: SearchResults = serde_json::from_str(r#"{"hits": []}"#).unwrap();
        assert!(wrapped.into_vec().is_empty());
    }
}
