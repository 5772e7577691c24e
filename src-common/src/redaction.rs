//! PII review and in-place redaction of transcript text.
//!
//! All offsets are character (Unicode scalar) offsets, the same unit the
//! backend uses when it stores `start_char`/`end_char`. The pure functions
//! here compute the local result of an edit; [`RedactionSession`] applies a
//! series of edits and hands the outcome back to the backend, whose response
//! then replaces the local state.

use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::types::{PiiHit, Recording, TranscriptVersion};

/// Label given to spans tagged by hand.
pub const MANUAL_LABEL: &str = "MANUAL";

/// Error type for redaction edits.
#[derive(Debug, Clone, PartialEq)]
pub enum RedactionError {
    /// Range is inverted or extends past the end of the text
    InvalidRange { start: usize, end: usize, len: usize },
    /// Hit carries no character offsets
    NotRanged,
    /// Selected text is empty or whitespace only
    EmptySelection,
    /// No hit at the given index
    HitNotFound(usize),
}

impl std::fmt::Display for RedactionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedactionError::InvalidRange { start, end, len } => write!(
                f,
                "Invalid range {}..{} for text of {} characters",
                start, end, len
            ),
            RedactionError::NotRanged => write!(f, "PII entry has no character range"),
            RedactionError::EmptySelection => write!(f, "Selection is empty"),
            RedactionError::HitNotFound(index) => write!(f, "No PII entry #{}", index),
        }
    }
}

impl std::error::Error for RedactionError {}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte position of a char offset; offsets past the end map to `text.len()`.
fn byte_offset(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

fn check_range(text: &str, start: usize, end: usize) -> Result<(), RedactionError> {
    let len = char_len(text);
    if start > end || end > len {
        return Err(RedactionError::InvalidRange { start, end, len });
    }
    Ok(())
}

/// Characters `[start, end)` of `text`. Inverted or out-of-range spans give
/// the empty string.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    &text[byte_offset(text, start)..byte_offset(text, end)]
}

/// Move every hit that starts at or after `edit_end` by `delta`.
///
/// Hits before the edit and hits overlapping it are returned unchanged.
pub fn shift_offsets(hits: &[PiiHit], edit_start: usize, edit_end: usize, delta: isize) -> Vec<PiiHit> {
    debug_assert!(edit_start <= edit_end);
    let shift = |offset: usize| (offset as isize + delta).max(0) as usize;
    hits.iter()
        .map(|hit| match hit.start_char {
            Some(start) if start >= edit_end => PiiHit {
                start_char: Some(shift(start)),
                end_char: hit.end_char.map(shift),
                ..hit.clone()
            },
            _ => hit.clone(),
        })
        .collect()
}

/// Result of replacing a span.
#[derive(Debug, Clone, PartialEq)]
pub struct Redaction {
    pub text: String,
    pub hits: Vec<PiiHit>,
    /// Change in length, in characters
    pub delta: isize,
}

/// Replace the span covered by `target` with `replacement`.
///
/// Every hit with the same range as `target` is dropped and hits after the
/// span are shifted by the change in length.
pub fn obfuscate(
    text: &str,
    hits: &[PiiHit],
    target: &PiiHit,
    replacement: &str,
) -> Result<Redaction, RedactionError> {
    let (start, end) = target.range().ok_or(RedactionError::NotRanged)?;
    check_range(text, start, end)?;

    let delta = char_len(replacement) as isize - (end - start) as isize;
    let (head_end, tail_start) = (byte_offset(text, start), byte_offset(text, end));
    let mut new_text = String::with_capacity(text.len() + replacement.len());
    new_text.push_str(&text[..head_end]);
    new_text.push_str(replacement);
    new_text.push_str(&text[tail_start..]);

    let remaining: Vec<PiiHit> = hits
        .iter()
        .filter(|h| h.range() != Some((start, end)))
        .cloned()
        .collect();

    Ok(Redaction {
        text: new_text,
        hits: shift_offsets(&remaining, start, end, delta),
        delta,
    })
}

/// Drop the first hit equal to `target`. The text is not touched.
pub fn delete_hit(hits: &[PiiHit], target: &PiiHit) -> Vec<PiiHit> {
    let mut out = hits.to_vec();
    if let Some(pos) = out.iter().position(|h| h == target) {
        out.remove(pos);
    }
    out
}

/// Build a manual hit for the selection `[start, end)`.
///
/// The offsets keep any surrounding whitespace of the selection; only the
/// preview is trimmed.
pub fn tag_selection(
    text: &str,
    start: usize,
    end: usize,
    recording_id: &str,
) -> Result<PiiHit, RedactionError> {
    check_range(text, start, end)?;
    let selected = char_slice(text, start, end).trim();
    if selected.is_empty() {
        return Err(RedactionError::EmptySelection);
    }
    Ok(PiiHit {
        preview: Some(selected.to_string()),
        recording_id: Some(recording_id.to_string()),
        ..PiiHit::ranged(start, end, MANUAL_LABEL)
    })
}

/// Char range of the `nth` (0-based) occurrence of `needle`.
pub fn find_occurrence(text: &str, needle: &str, nth: usize) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    let (byte_start, _) = text.match_indices(needle).nth(nth)?;
    let start = text[..byte_start].chars().count();
    Some((start, start + char_len(needle)))
}

/// A run of transcript text, highlighted when it falls inside a PII span.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment<'a> {
    pub text: &'a str,
    pub label: Option<&'a str>,
}

/// Split `text` into plain and highlighted fragments.
///
/// Ranged hits are clamped to the text, sorted by start and merged where they
/// touch or overlap; a merged run keeps the label of its first hit. The
/// redacted version is never highlighted. Concatenating the fragments always
/// yields `text`.
pub fn highlight<'a>(text: &'a str, hits: &'a [PiiHit], version: TranscriptVersion) -> Vec<Fragment<'a>> {
    if text.is_empty() {
        return Vec::new();
    }
    if version == TranscriptVersion::Redacted {
        return vec![Fragment { text, label: None }];
    }

    let len = char_len(text);
    let mut ranges: Vec<(usize, usize, &str)> = hits
        .iter()
        .filter_map(|h| {
            let (start, end) = h.range()?;
            let (start, end) = (start.min(len), end.min(len));
            (start < end).then_some((start, end, h.label_or_default()))
        })
        .collect();
    ranges.sort_by_key(|r| r.0);

    let mut merged: Vec<(usize, usize, &str)> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.0 <= last.1 => last.1 = last.1.max(range.1),
            _ => merged.push(range),
        }
    }

    let mut fragments = Vec::with_capacity(merged.len() * 2 + 1);
    let mut cursor = 0;
    for (start, end, label) in merged {
        if start > cursor {
            fragments.push(Fragment {
                text: char_slice(text, cursor, start),
                label: None,
            });
        }
        fragments.push(Fragment {
            text: char_slice(text, start, end),
            label: Some(label),
        });
        cursor = end;
    }
    if cursor < len {
        fragments.push(Fragment {
            text: char_slice(text, cursor, len),
            label: None,
        });
    }
    fragments
}

/// Editable PII state of one recording.
///
/// Edits apply locally; [`commit`](Self::commit) persists them and replaces
/// the local state with what the backend returns.
#[derive(Debug, Clone)]
pub struct RedactionSession {
    recording_id: String,
    text: String,
    hits: Vec<PiiHit>,
    text_changed: bool,
    hits_changed: bool,
}

impl RedactionSession {
    pub fn new(recording_id: impl Into<String>, text: impl Into<String>, hits: Vec<PiiHit>) -> Self {
        Self {
            recording_id: recording_id.into(),
            text: text.into(),
            hits,
            text_changed: false,
            hits_changed: false,
        }
    }

    /// Start from the edited transcript, or the original when none exists.
    pub fn from_recording(recording: &Recording) -> Self {
        let version = recording.transcripts.preferred();
        let text = recording.transcripts.get(version).unwrap_or_default();
        Self::new(
            recording.recording_id.clone(),
            text,
            recording.pii_for(version).to_vec(),
        )
    }

    pub async fn load(client: &ApiClient, id: &str) -> Result<Self, ApiError> {
        let recording = client.get_recording(id).await?;
        Ok(Self::from_recording(&recording))
    }

    pub fn recording_id(&self) -> &str {
        &self.recording_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn hits(&self) -> &[PiiHit] {
        &self.hits
    }

    pub fn is_dirty(&self) -> bool {
        self.text_changed || self.hits_changed
    }

    fn hit(&self, index: usize) -> Result<PiiHit, RedactionError> {
        self.hits
            .get(index)
            .cloned()
            .ok_or(RedactionError::HitNotFound(index))
    }

    /// Remove a hit, leaving the text as it is.
    pub fn delete(&mut self, index: usize) -> Result<PiiHit, RedactionError> {
        let target = self.hit(index)?;
        self.hits = delete_hit(&self.hits, &target);
        self.hits_changed = true;
        Ok(target)
    }

    /// Tag `[start, end)` as manual PII.
    pub fn tag(&mut self, start: usize, end: usize) -> Result<PiiHit, RedactionError> {
        let hit = tag_selection(&self.text, start, end, &self.recording_id)?;
        self.hits.push(hit.clone());
        self.hits_changed = true;
        Ok(hit)
    }

    /// Replace the text under a hit. Returns the change in length.
    pub fn obfuscate(&mut self, index: usize, replacement: &str) -> Result<isize, RedactionError> {
        let target = self.hit(index)?;
        let redaction = obfuscate(&self.text, &self.hits, &target, replacement)?;
        self.text = redaction.text;
        self.hits = redaction.hits;
        self.text_changed = true;
        self.hits_changed = true;
        Ok(redaction.delta)
    }

    /// Persist the edits and reload.
    ///
    /// The hit list is always synced. Changed text is also saved as the
    /// edited transcript and finalized, which re-runs segmentation and PII
    /// detection on the backend.
    pub async fn commit(&mut self, client: &ApiClient) -> Result<Recording, ApiError> {
        let id = self.recording_id.clone();
        info!(id = %id, hits = self.hits.len(), text_changed = self.text_changed, "Committing PII edits");

        client.sync_pii(&id, &self.hits).await?;
        if self.text_changed {
            client.save_edited_transcript(&id, &self.text).await?;
            client.finalize(&id, &self.text).await?;
        }

        let recording = client.get_recording(&id).await?;
        debug!(id = %id, "Reloaded recording after commit");
        *self = Self::from_recording(&recording);
        Ok(recording)
    }
}
