//! Per-recording speech insights: confidence, pauses, filler words and
//! prosody.

use serde::Serialize;

use crate::format::{fmt_num, fmt_pct01, fmt_seconds, MISSING};
use crate::types::{AlignedWord, ProsodyPoint, SpeechAnalysis};

/// Words recognised with a probability below this are flagged.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Shown low-confidence words before the list is cut off.
pub const MAX_LOW_WORDS: usize = 30;

/// Shown filler hits before the list is cut off.
pub const MAX_FILLER_HITS: usize = 40;

/// Words whose probability is known and below `threshold`.
pub fn low_confidence_words(words: &[AlignedWord], threshold: f64) -> Vec<&AlignedWord> {
    words
        .iter()
        .filter(|w| w.prob.is_some_and(|p| p < threshold))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightSection {
    pub title: &'static str,
    pub rows: Vec<(&'static str, String)>,
}

/// Display-ready summary of a speech-analysis blob.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechReport {
    pub sections: Vec<InsightSection>,
    /// `word (0.42)` entries, capped at [`MAX_LOW_WORDS`]
    pub low_words: Vec<String>,
    pub low_words_total: usize,
    /// Filler phrases in order of occurrence, capped at [`MAX_FILLER_HITS`]
    pub filler_hits: Vec<String>,
    pub filler_hits_total: usize,
}

impl SpeechReport {
    /// Build the report. Low-confidence words come from the backend's list
    /// when present, otherwise from `aligned_words`.
    pub fn new(speech: &SpeechAnalysis, aligned_words: &[AlignedWord]) -> Self {
        let conf = speech.confidence.clone().unwrap_or_default();
        let pause = speech.pause.clone().unwrap_or_default();
        let fillers = speech.fillers.clone().unwrap_or_default();

        let sections = vec![
            InsightSection {
                title: "Confidence",
                rows: vec![
                    ("Mean", fmt_num(conf.mean, 3)),
                    ("Median", fmt_num(conf.median, 3)),
                    ("Std", fmt_num(conf.std, 3)),
                    ("Min", fmt_num(conf.min, 3)),
                    ("Max", fmt_num(conf.max, 3)),
                ],
            },
            InsightSection {
                title: "Pauses",
                rows: vec![
                    ("Average pause", fmt_seconds(pause.avg_pause_s)),
                    ("Longest pause", fmt_seconds(pause.max_pause_s)),
                    ("Total silence", fmt_seconds(pause.total_silence_s)),
                ],
            },
            InsightSection {
                title: "Fillers",
                rows: vec![
                    (
                        "Count",
                        fillers
                            .count
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| MISSING.to_string()),
                    ),
                    ("Share of words", fmt_pct01(fillers.percent)),
                ],
            },
        ];

        let threshold = conf.threshold.unwrap_or(LOW_CONFIDENCE_THRESHOLD);
        let low: Vec<&AlignedWord> = if conf.low.is_empty() {
            low_confidence_words(aligned_words, threshold)
        } else {
            conf.low.iter().collect()
        };
        let low_words = low
            .iter()
            .take(MAX_LOW_WORDS)
            .map(|w| format!("{} ({})", w.word, fmt_num(w.prob, 2)))
            .collect();

        let phrases: Vec<&str> = fillers.hits.iter().filter_map(|h| h.phrase()).collect();

        Self {
            sections,
            low_words,
            low_words_total: low.len(),
            filler_hits: phrases
                .iter()
                .take(MAX_FILLER_HITS)
                .map(|p| p.to_string())
                .collect(),
            filler_hits_total: phrases.len(),
        }
    }
}

/// Mean of the finite values, `None` when there are none.
fn finite_mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = values
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Averages over the per-sentence prosody entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProsodySummary {
    pub sentences: usize,
    pub avg_speaking_rate_wpm: Option<f64>,
    /// 0..1
    pub avg_pause_ratio: Option<f64>,
}

impl ProsodySummary {
    pub fn new(points: &[ProsodyPoint]) -> Self {
        Self {
            sentences: points.len(),
            avg_speaking_rate_wpm: finite_mean(points.iter().map(|p| p.speaking_rate_wpm)),
            avg_pause_ratio: finite_mean(points.iter().map(|p| p.pause_ratio)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sentences == 0
    }

    pub fn section(&self) -> InsightSection {
        InsightSection {
            title: "Prosody",
            rows: vec![
                (
                    "Speaking rate",
                    self.avg_speaking_rate_wpm
                        .map(|wpm| format!("{:.0} wpm", wpm))
                        .unwrap_or_else(|| MISSING.to_string()),
                ),
                (
                    "Pause ratio",
                    self.avg_pause_ratio
                        .map(|r| format!("{:.0}%", r * 100.0))
                        .unwrap_or_else(|| MISSING.to_string()),
                ),
                ("Sentences", self.sentences.to_string()),
            ],
        }
    }
}
