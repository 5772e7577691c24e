//! Client-side validation applied before anything reaches the network.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// Recording IDs are short hex tokens on the backend; anything that could
/// escape a URL path segment is rejected.
static RECORDING_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]{1,128}$").unwrap());

/// Maximum accepted upload size in megabytes.
pub const MAX_UPLOAD_MB: u64 = 200;

/// Maximum accepted upload size in bytes.
pub const MAX_UPLOAD_BYTES: u64 = MAX_UPLOAD_MB * 1024 * 1024;

/// MIME used when the extension is not a known audio format.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Validation error types.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// MIME type does not start with `audio/`
    NotAudio { mime: String },
    /// File exceeds [`MAX_UPLOAD_BYTES`]
    FileTooLarge { size_mb: f64, max_mb: u64 },
    /// Text entry or transcript is empty after trimming
    EmptyText,
    /// Recording ID contains characters outside the allowed set
    InvalidRecordingId(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NotAudio { .. } => write!(f, "That doesn't look like an audio file."),
            ValidationError::FileTooLarge { size_mb, max_mb } => {
                write!(f, "File is too large ({:.1}MB). Max is {}MB.", size_mb, max_mb)
            }
            ValidationError::EmptyText => write!(f, "Please write something first."),
            ValidationError::InvalidRecordingId(id) => write!(f, "Invalid recording ID: {}", id),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate an audio file before upload.
///
/// The MIME type must start with `audio/` and the size must not exceed
/// [`MAX_UPLOAD_BYTES`].
pub fn validate_audio_file(mime: &str, size_bytes: u64) -> Result<(), ValidationError> {
    if !mime.starts_with("audio/") {
        return Err(ValidationError::NotAudio {
            mime: mime.to_string(),
        });
    }
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size_mb: size_bytes as f64 / (1024.0 * 1024.0),
            max_mb: MAX_UPLOAD_MB,
        });
    }
    Ok(())
}

/// Validate free text (text entries, edited transcripts).
pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    Ok(())
}

/// Validate a recording ID before it is placed in a URL path.
pub fn validate_recording_id(id: &str) -> Result<(), ValidationError> {
    if !RECORDING_ID_PATTERN.is_match(id) {
        return Err(ValidationError::InvalidRecordingId(id.to_string()));
    }
    Ok(())
}

/// Infer an audio MIME type from a file extension.
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("flac") => "audio/flac",
        Some("aac") => "audio/aac",
        Some("opus") => "audio/opus",
        _ => FALLBACK_MIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_audio_within_limit() {
        assert!(validate_audio_file("audio/mp3", 50 * 1024 * 1024).is_ok());
        assert!(validate_audio_file("audio/mpeg", 50 * 1024 * 1024).is_ok());
        assert!(validate_audio_file("audio/wav", MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn test_rejects_non_audio() {
        let err = validate_audio_file("image/png", 10).unwrap_err();
        assert_eq!(err.to_string(), "That doesn't look like an audio file.");
        assert!(validate_audio_file("", 10).is_err());
    }

    #[test]
    fn test_rejects_oversized() {
        let err = validate_audio_file("audio/wav", 201 * 1024 * 1024).unwrap_err();
        assert_eq!(err.to_string(), "File is too large (201.0MB). Max is 200MB.");
    }

    #[test]
    fn test_validate_text() {
        assert!(validate_text("hello").is_ok());
        assert_eq!(validate_text("  \n\t"), Err(ValidationError::EmptyText));
    }

    #[test]
    fn test_validate_recording_id() {
        assert!(validate_recording_id("a1b2c3d4e5f6").is_ok());
        assert!(validate_recording_id("rec_2024-01").is_ok());

        assert!(validate_recording_id("").is_err());
        assert!(validate_recording_id("../etc").is_err());
        assert!(validate_recording_id("a/b").is_err());
        assert!(validate_recording_id("id?version=all").is_err());
    }

    #[test]
    fn test_mime_from_path() {
        assert_eq!(mime_from_path(Path::new("memo.MP3")), "audio/mpeg");
        assert_eq!(mime_from_path(Path::new("a/b/c.wav")), "audio/wav");
        assert_eq!(mime_from_path(Path::new("notes.txt")), FALLBACK_MIME);
        assert_eq!(mime_from_path(Path::new("noext")), FALLBACK_MIME);
    }
}
