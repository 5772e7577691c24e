//! Aggregate statistics over the whole journal.

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::Recording;

/// Number of filler phrases kept in the ranking.
pub const TOP_FILLERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayActivity {
    pub date: NaiveDate,
    /// Short label, e.g. `Mar 5`
    pub label: String,
    pub count: u64,
}

/// Mean recognition confidence of one recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidencePoint {
    /// First six characters of the ID followed by `...`
    pub id: String,
    /// Whole percent
    pub confidence: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_recordings: usize,
    pub total_hours: f64,
    /// Sum of aligned word counts
    pub total_words: u64,
    /// Mean of the per-recording mean confidence, 0 when none is known
    pub avg_confidence: f64,
    /// Most frequent filler phrase, `None` when no fillers were found
    pub most_used_filler: Option<String>,
    pub top_fillers: Vec<NamedCount>,
    /// Recordings per local calendar day, oldest first
    pub activity: Vec<DayActivity>,
    pub confidence: Vec<ConfidencePoint>,
    /// PII counts by label, most frequent first
    pub pii: Vec<NamedCount>,
}

/// Add `amount` to `name`, keeping first-seen order for stable ranking.
fn bump(counts: &mut Vec<NamedCount>, name: &str, amount: u64) {
    match counts.iter_mut().find(|c| c.name == name) {
        Some(entry) => entry.value += amount,
        None => counts.push(NamedCount {
            name: name.to_string(),
            value: amount,
        }),
    }
}

fn short_id(id: &str) -> String {
    let head: String = id.chars().take(6).collect();
    format!("{}...", head)
}

impl DashboardStats {
    pub fn from_recordings(recordings: &[Recording]) -> Self {
        let mut total_seconds = 0.0;
        let mut total_words = 0;
        let mut confidence_sum = 0.0;
        let mut confidence = Vec::new();
        let mut fillers: Vec<NamedCount> = Vec::new();
        let mut pii: Vec<NamedCount> = Vec::new();
        let mut days: std::collections::BTreeMap<NaiveDate, u64> = Default::default();

        for rec in recordings {
            if let Some(duration) = rec.duration.filter(|d| d.is_finite()) {
                total_seconds += duration;
            }

            let speech = rec.speech.as_ref();
            if let Some(stats) = speech.and_then(|s| s.confidence.as_ref()) {
                if let Some(mean) = stats.mean.filter(|m| m.is_finite()) {
                    confidence_sum += mean;
                    confidence.push(ConfidencePoint {
                        id: short_id(&rec.recording_id),
                        confidence: (mean * 100.0).round().max(0.0) as u32,
                    });
                }
                total_words += stats.count.unwrap_or(0);
            }

            if let Some(filler_stats) = speech.and_then(|s| s.fillers.as_ref()) {
                for hit in &filler_stats.hits {
                    let phrase = hit
                        .phrase()
                        .filter(|p| !p.is_empty())
                        .map(str::to_lowercase)
                        .unwrap_or_else(|| "unknown".to_string());
                    bump(&mut fillers, &phrase, 1);
                }
            }

            if let Some(created) = rec.created_at_local() {
                *days.entry(created.date_naive()).or_default() += 1;
            }

            for (label, count) in &rec.pii_summary {
                bump(&mut pii, label, *count);
            }
        }

        fillers.sort_by(|a, b| b.value.cmp(&a.value));
        fillers.truncate(TOP_FILLERS);
        pii.sort_by(|a, b| b.value.cmp(&a.value));

        let avg_confidence = if confidence.is_empty() {
            0.0
        } else {
            confidence_sum / confidence.len() as f64
        };

        Self {
            total_recordings: recordings.len(),
            total_hours: total_seconds / 3600.0,
            total_words,
            avg_confidence,
            most_used_filler: fillers.first().map(|f| f.name.clone()),
            top_fillers: fillers,
            activity: days
                .into_iter()
                .map(|(date, count)| DayActivity {
                    date,
                    label: date.format("%b %-d").to_string(),
                    count,
                })
                .collect(),
            confidence,
            pii,
        }
    }
}
