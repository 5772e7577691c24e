//! Shared record types mirrored from the journaling backend.
//!
//! The backend is the source of truth for all of these; the client only holds
//! transient copies. Every field is lenient on the way in (missing or `null`
//! becomes the default) so that downstream code never has to branch on the
//! shape of a payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::format::parse_timestamp;

/// Deserialize `null` as `T::default()`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Named transcript variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptVersion {
    /// Output of the transcription engine
    #[default]
    Original,
    /// User-edited text
    Edited,
    /// Text with PII replaced
    Redacted,
}

impl TranscriptVersion {
    pub const ALL: [TranscriptVersion; 3] = [
        TranscriptVersion::Original,
        TranscriptVersion::Edited,
        TranscriptVersion::Redacted,
    ];

    /// Wire name, also used in download file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptVersion::Original => "original",
            TranscriptVersion::Edited => "edited",
            TranscriptVersion::Redacted => "redacted",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "original" => Some(TranscriptVersion::Original),
            "edited" => Some(TranscriptVersion::Edited),
            "redacted" => Some(TranscriptVersion::Redacted),
            _ => None,
        }
    }
}

impl std::fmt::Display for TranscriptVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Up to three named text variants of a transcript.
///
/// `text` only appears in list payloads that embed a single transcript string
/// instead of the named variants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptBlob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redacted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl TranscriptBlob {
    pub fn get(&self, version: TranscriptVersion) -> Option<&str> {
        let value = match version {
            TranscriptVersion::Original => &self.original,
            TranscriptVersion::Edited => &self.edited,
            TranscriptVersion::Redacted => &self.redacted,
        };
        value.as_deref().filter(|s| !s.is_empty())
    }

    pub fn has(&self, version: TranscriptVersion) -> bool {
        self.get(version).is_some()
    }

    /// Versions with non-empty text, in display order.
    pub fn available(&self) -> Vec<TranscriptVersion> {
        TranscriptVersion::ALL
            .into_iter()
            .filter(|v| self.has(*v))
            .collect()
    }

    /// Tab shown first: edited when present, otherwise original.
    pub fn preferred(&self) -> TranscriptVersion {
        if self.has(TranscriptVersion::Edited) {
            TranscriptVersion::Edited
        } else {
            TranscriptVersion::Original
        }
    }
}

/// Accepts either the named-variant object or a bare transcript string.
fn transcript_blob<'de, D>(deserializer: D) -> Result<TranscriptBlob, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Blob(TranscriptBlob),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => TranscriptBlob {
            text: Some(text),
            ..Default::default()
        },
        Some(Raw::Blob(blob)) => blob,
        None => TranscriptBlob::default(),
    })
}

/// A detected (or manually tagged) PII span.
///
/// `start_char`/`end_char` are character offsets into exactly one transcript
/// version, forming the half-open range `[start_char, end_char)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PiiHit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_char: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_char: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_id: Option<String>,
}

impl PiiHit {
    /// Hit with a character range and label.
    pub fn ranged(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start_char: Some(start),
            end_char: Some(end),
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// The `[start, end)` range, if both offsets are present.
    pub fn range(&self) -> Option<(usize, usize)> {
        match (self.start_char, self.end_char) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    pub fn label_or_default(&self) -> &str {
        self.label
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or("Detected PII")
    }
}

/// A labeled sub-span of a transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingSegment {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub start_s: Option<f64>,
    #[serde(default)]
    pub end_s: Option<f64>,
}

/// A word aligned to the audio with its recognition probability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedWord {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub prob: Option<f64>,
    #[serde(default)]
    pub start_s: Option<f64>,
    #[serde(default)]
    pub end_s: Option<f64>,
}

/// Recognition confidence statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechConfidence {
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub median: Option<f64>,
    #[serde(default)]
    pub std: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub low_count: Option<u64>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub low: Vec<AlignedWord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechPause {
    #[serde(default)]
    pub avg_pause_s: Option<f64>,
    #[serde(default)]
    pub max_pause_s: Option<f64>,
    #[serde(default)]
    pub total_silence_s: Option<f64>,
    #[serde(default)]
    pub pause_count: Option<u64>,
}

/// A filler occurrence; older payloads store the bare phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillerHit {
    Phrase(String),
    Detailed {
        #[serde(default)]
        phrase: Option<String>,
    },
}

impl FillerHit {
    pub fn phrase(&self) -> Option<&str> {
        match self {
            FillerHit::Phrase(p) => Some(p.as_str()),
            FillerHit::Detailed { phrase } => phrase.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechFillers {
    #[serde(default)]
    pub count: Option<u64>,
    /// Share of words that are fillers, 0..1
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hits: Vec<FillerHit>,
}

/// Speech-analysis blob computed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechAnalysis {
    #[serde(default)]
    pub confidence: Option<SpeechConfidence>,
    #[serde(default)]
    pub pause: Option<SpeechPause>,
    #[serde(default)]
    pub fillers: Option<SpeechFillers>,
}

/// Prosody measured over one sentence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProsodyPoint {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentence_id: i64,
    #[serde(default)]
    pub segment_id: Option<i64>,
    #[serde(default)]
    pub speaking_rate_wpm: Option<f64>,
    /// Share of the sentence spent silent, 0..1
    #[serde(default)]
    pub pause_ratio: Option<f64>,
    #[serde(default)]
    pub rms_mean: Option<f64>,
}

/// A journal entry as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    #[serde(default, alias = "id", deserialize_with = "null_as_default")]
    pub recording_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub has_audio: Option<bool>,
    /// Legacy audio reference, only consulted when `has_audio` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, alias = "transcript", deserialize_with = "transcript_blob")]
    pub transcripts: TranscriptBlob,
    #[serde(default, deserialize_with = "null_as_default")]
    pub segments: Vec<RecordingSegment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pii: Vec<PiiHit>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pii_original: Vec<PiiHit>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pii_edited: Vec<PiiHit>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pii_summary: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub aligned_words: Vec<AlignedWord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prosody: Vec<ProsodyPoint>,
    #[serde(default)]
    pub speech: Option<SpeechAnalysis>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub search_text: Option<String>,
}

impl Recording {
    pub fn has_original(&self) -> bool {
        self.transcripts.has(TranscriptVersion::Original)
    }

    pub fn has_edited(&self) -> bool {
        self.transcripts.has(TranscriptVersion::Edited)
    }

    pub fn has_redacted(&self) -> bool {
        self.transcripts.has(TranscriptVersion::Redacted)
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio.unwrap_or_else(|| match &self.audio {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        })
    }

    /// Title, or the id when the title is missing or blank.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.recording_id)
    }

    pub fn created_at_local(&self) -> Option<DateTime<Local>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    /// Hits against the original transcript; older payloads only carry `pii`.
    pub fn original_pii(&self) -> &[PiiHit] {
        if self.pii_original.is_empty() {
            &self.pii
        } else {
            &self.pii_original
        }
    }

    /// Hits for a transcript tab. The redacted tab never shows any.
    pub fn pii_for(&self, version: TranscriptVersion) -> &[PiiHit] {
        match version {
            TranscriptVersion::Original => self.original_pii(),
            TranscriptVersion::Edited => &self.pii_edited,
            TranscriptVersion::Redacted => &[],
        }
    }
}

/// Flat engine configuration, replaced wholesale on save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineSettings(pub BTreeMap<String, Value>);

impl EngineSettings {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Value rendered for display; strings lose their quotes.
    pub fn get_display(&self, key: &str) -> Option<String> {
        self.0.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Set from a `KEY=VALUE` assignment. The value is read as JSON when it
    /// parses (numbers, booleans, null), otherwise kept as a string.
    pub fn assign(&mut self, assignment: &str) -> Option<String> {
        let (key, raw) = assignment.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let raw = raw.trim();
        let value = serde_json::from_str::<Value>(raw)
            .ok()
            .filter(|v| !v.is_object() && !v.is_array())
            .unwrap_or_else(|| Value::String(raw.to_string()));
        self.0.insert(key.to_string(), value);
        Some(key.to_string())
    }

    /// Shallow merge: keys in `other` overwrite keys here.
    pub fn merge(&mut self, other: EngineSettings) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// First-run configuration submitted to the setup endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupConfig {
    #[serde(default)]
    pub data_dir: String,
    #[serde(default)]
    pub config_dir: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub whisper_model: String,
    #[serde(default)]
    pub device: String,
}

/// Response of the setup status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupStatus {
    #[serde(default)]
    pub is_configured: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub system_info: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_config: SetupConfig,
}

impl SetupStatus {
    /// Device the backend recommends, falling back to CPU.
    pub fn suggested_device(&self) -> &str {
        self.system_info
            .get("suggested_device")
            .and_then(Value::as_str)
            .unwrap_or("cpu")
    }
}

/// One semantic-search match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticHit {
    #[serde(default)]
    pub recording_id: String,
    #[serde(default)]
    pub segment_id: i64,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub start_s: Option<f64>,
    #[serde(default)]
    pub end_s: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_tolerates_nulls() {
        let json = r#"{
            "recording_id": "rec1",
            "title": null,
            "tags": null,
            "transcripts": null,
            "segments": null,
            "pii": null,
            "speech": null
        }"#;
        let rec: Recording = serde_json::from_str(json).unwrap();
        assert_eq!(rec.recording_id, "rec1");
        assert!(rec.tags.is_empty());
        assert!(rec.segments.is_empty());
        assert!(!rec.has_original());
        assert_eq!(rec.display_title(), "rec1");
    }

    #[test]
    fn test_transcript_presence_ignores_empty_strings() {
        let json = r#"{"recording_id": "r", "transcripts": {"original": "hi", "edited": ""}}"#;
        let rec: Recording = serde_json::from_str(json).unwrap();
        assert!(rec.has_original());
        assert!(!rec.has_edited());
        assert_eq!(rec.transcripts.available(), vec![TranscriptVersion::Original]);
        assert_eq!(rec.transcripts.preferred(), TranscriptVersion::Original);
    }

    #[test]
    fn test_bare_transcript_string() {
        let json = r#"{"recording_id": "r", "transcript": "plain text"}"#;
        let rec: Recording = serde_json::from_str(json).unwrap();
        assert_eq!(rec.transcripts.text.as_deref(), Some("plain text"));
    }

    #[test]
    fn test_has_audio_falls_back_to_audio_field() {
        let rec: Recording = serde_json::from_str(r#"{"id": "a", "audio": "audio/a.wav"}"#).unwrap();
        assert_eq!(rec.recording_id, "a");
        assert!(rec.has_audio());

        let rec: Recording =
            serde_json::from_str(r#"{"id": "a", "has_audio": false, "audio": "x"}"#).unwrap();
        assert!(!rec.has_audio());
    }

    #[test]
    fn test_original_pii_falls_back() {
        let mut rec = Recording::default();
        rec.pii = vec![PiiHit::ranged(0, 4, "NAME")];
        assert_eq!(rec.original_pii().len(), 1);
        assert!(rec.pii_for(TranscriptVersion::Redacted).is_empty());

        rec.pii_original = vec![PiiHit::ranged(1, 2, "A"), PiiHit::ranged(3, 4, "B")];
        assert_eq!(rec.pii_for(TranscriptVersion::Original).len(), 2);
    }

    #[test]
    fn test_filler_hit_shapes() {
        let hits: Vec<FillerHit> = serde_json::from_str(r#"["uh", {"phrase": "you know"}, {}]"#).unwrap();
        assert_eq!(hits[0].phrase(), Some("uh"));
        assert_eq!(hits[1].phrase(), Some("you know"));
        assert_eq!(hits[2].phrase(), None);
    }

    #[test]
    fn test_settings_assign() {
        let mut settings = EngineSettings::default();
        assert_eq!(settings.assign("LANGUAGE=nl").as_deref(), Some("LANGUAGE"));
        assert_eq!(settings.assign("SEGMENTATION_MIN_SIZE = 3").as_deref(), Some("SEGMENTATION_MIN_SIZE"));
        assert!(settings.assign("novalue").is_none());
        assert!(settings.assign("=x").is_none());

        assert_eq!(settings.get("LANGUAGE"), Some(&Value::String("nl".into())));
        assert_eq!(settings.get("SEGMENTATION_MIN_SIZE"), Some(&Value::from(3)));
        assert_eq!(settings.get_display("LANGUAGE").as_deref(), Some("nl"));
    }

    #[test]
    fn test_settings_merge_is_shallow() {
        let mut base: EngineSettings =
            serde_json::from_str(r#"{"LANGUAGE": "en", "DEVICE": "cpu"}"#).unwrap();
        let patch: EngineSettings = serde_json::from_str(r#"{"DEVICE": "cuda"}"#).unwrap();
        base.merge(patch);
        assert_eq!(base.get_display("DEVICE").as_deref(), Some("cuda"));
        assert_eq!(base.get_display("LANGUAGE").as_deref(), Some("en"));
    }

    #[test]
    fn test_transcript_version_parse() {
        assert_eq!(TranscriptVersion::parse("Edited"), Some(TranscriptVersion::Edited));
        assert_eq!(TranscriptVersion::parse("bogus"), None);
        assert_eq!(TranscriptVersion::Redacted.to_string(), "redacted");
    }

    #[test]
    fn test_setup_status_suggested_device() {
        let status: SetupStatus = serde_json::from_str(
            r#"{"is_configured": false, "system_info": {"suggested_device": "cuda"}, "current_config": null}"#,
        )
        .unwrap();
        assert!(!status.is_configured);
        assert_eq!(status.suggested_device(), "cuda");
        assert_eq!(SetupStatus::default().suggested_device(), "cpu");
    }
}
