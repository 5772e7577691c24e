//! Client-side search, filtering and sorting of the recordings list.
//!
//! The list is fetched once; [`LibraryIndex`] precomputes what every query
//! needs so that re-running [`LibraryIndex::apply`] with a new
//! [`LibraryQuery`] is cheap. There is no pagination and no backend-side
//! filtering.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::Recording;

/// Transcript-state filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    /// Has an original and neither an edited nor a redacted transcript
    Original,
    Edited,
    Redacted,
}

/// Audio-presence filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFilter {
    #[default]
    All,
    Audio,
    NoAudio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Newest,
    Oldest,
    /// Alphabetical by title, or ID when untitled
    Title,
}

/// Error for filter values that do not parse.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownOption {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl std::fmt::Display for UnknownOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Unknown {} '{}' (expected one of: {})",
            self.kind, self.value, self.expected
        )
    }
}

impl std::error::Error for UnknownOption {}

impl FromStr for StatusFilter {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "original" => Ok(StatusFilter::Original),
            "edited" => Ok(StatusFilter::Edited),
            "redacted" => Ok(StatusFilter::Redacted),
            _ => Err(UnknownOption {
                kind: "status",
                value: s.to_string(),
                expected: "all, original, edited, redacted",
            }),
        }
    }
}

impl FromStr for AudioFilter {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "all" => Ok(AudioFilter::All),
            "audio" | "yes" => Ok(AudioFilter::Audio),
            "no_audio" | "none" | "no" => Ok(AudioFilter::NoAudio),
            _ => Err(UnknownOption {
                kind: "audio filter",
                value: s.to_string(),
                expected: "all, audio, no-audio",
            }),
        }
    }
}

impl FromStr for SortMode {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" => Ok(SortMode::Newest),
            "oldest" => Ok(SortMode::Oldest),
            "title" => Ok(SortMode::Title),
            _ => Err(UnknownOption {
                kind: "sort mode",
                value: s.to_string(),
                expected: "newest, oldest, title",
            }),
        }
    }
}

/// The full set of list filters. The default matches everything, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub audio: AudioFilter,
    /// Inclusive, from 00:00:00.000 local time
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Inclusive, until 23:59:59.999 local time
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// Every tag must be present on a recording (exact match)
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sort: SortMode,
}

impl LibraryQuery {
    /// Number of non-default settings; a non-default sort counts as one.
    pub fn active_filter_count(&self) -> usize {
        [
            !self.query.trim().is_empty(),
            self.status != StatusFilter::All,
            self.audio != AudioFilter::All,
            self.sort != SortMode::Newest,
            self.from.is_some(),
            self.to.is_some(),
            !self.tags.is_empty(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    /// Toggle a tag in the selection.
    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
        } else {
            self.tags.push(tag.to_string());
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Lowercased text searched by free-text queries: title, ID, tags, the
/// backend's search text and any transcript text embedded in the list.
fn searchable_text(rec: &Recording) -> String {
    let chunks: Vec<&str> = [rec.title.as_deref(), Some(rec.recording_id.as_str())]
        .into_iter()
        .chain(rec.tags.iter().map(|t| Some(t.as_str())))
        .chain([rec.search_text.as_deref(), rec.transcripts.text.as_deref()])
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    chunks.join("\n").to_lowercase()
}

struct IndexedRecording<'a> {
    rec: &'a Recording,
    has_original: bool,
    has_edited: bool,
    has_redacted: bool,
    has_audio: bool,
    created: Option<DateTime<Local>>,
    /// Milliseconds since the epoch, 0 when unknown
    created_ms: i64,
    searchable: String,
    sort_title: String,
}

impl IndexedRecording<'_> {
    fn passes_status(&self, status: StatusFilter) -> bool {
        match status {
            StatusFilter::All => true,
            StatusFilter::Edited => self.has_edited,
            StatusFilter::Redacted => self.has_redacted,
            StatusFilter::Original => self.has_original && !self.has_edited && !self.has_redacted,
        }
    }

    fn passes_audio(&self, audio: AudioFilter) -> bool {
        match audio {
            AudioFilter::All => true,
            AudioFilter::Audio => self.has_audio,
            AudioFilter::NoAudio => !self.has_audio,
        }
    }

    /// Recordings without a usable creation date pass any date range.
    fn passes_dates(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
        let Some(created) = self.created else {
            return true;
        };
        let day = created.date_naive();
        from.map_or(true, |f| day >= f) && to.map_or(true, |t| day <= t)
    }

    fn passes_tags(&self, tags: &[String]) -> bool {
        tags.iter().all(|t| self.rec.tags.contains(t))
    }
}

/// Precomputed view over a fetched recordings list.
pub struct LibraryIndex<'a> {
    entries: Vec<IndexedRecording<'a>>,
}

impl<'a> LibraryIndex<'a> {
    pub fn new(recordings: &'a [Recording]) -> Self {
        let entries = recordings
            .iter()
            .map(|rec| {
                let created = rec.created_at_local();
                IndexedRecording {
                    rec,
                    has_original: rec.has_original(),
                    has_edited: rec.has_edited(),
                    has_redacted: rec.has_redacted(),
                    has_audio: rec.has_audio(),
                    created,
                    created_ms: created.map(|c| c.timestamp_millis()).unwrap_or(0),
                    searchable: searchable_text(rec),
                    sort_title: rec
                        .title
                        .as_deref()
                        .filter(|t| !t.is_empty())
                        .unwrap_or(&rec.recording_id)
                        .to_lowercase(),
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Filter and sort. Ties keep list order.
    pub fn apply(&self, query: &LibraryQuery) -> Vec<&'a Recording> {
        let needle = query.query.trim().to_lowercase();

        let mut matched: Vec<&IndexedRecording<'a>> = self
            .entries
            .iter()
            .filter(|e| needle.is_empty() || e.searchable.contains(&needle))
            .filter(|e| e.passes_dates(query.from, query.to))
            .filter(|e| e.passes_status(query.status))
            .filter(|e| e.passes_audio(query.audio))
            .filter(|e| e.passes_tags(&query.tags))
            .collect();

        match query.sort {
            SortMode::Newest => matched.sort_by(|a, b| b.created_ms.cmp(&a.created_ms)),
            SortMode::Oldest => matched.sort_by(|a, b| a.created_ms.cmp(&b.created_ms)),
            SortMode::Title => matched.sort_by(|a, b| a.sort_title.cmp(&b.sort_title)),
        }

        matched.into_iter().map(|e| e.rec).collect()
    }

    /// Every distinct tag, trimmed and sorted case-insensitively.
    pub fn all_tags(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .entries
            .iter()
            .flat_map(|e| e.rec.tags.iter())
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        let mut tags: Vec<String> = set.into_iter().map(str::to_string).collect();
        tags.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
        tags
    }
}
