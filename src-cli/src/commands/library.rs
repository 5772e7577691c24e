//! Browsing the journal: list, show, transcripts, downloads, metadata,
//! deletion, search and analytics.

use std::path::{Path, PathBuf};

use reflect_common::analytics::DashboardStats;
use reflect_common::api::{SemanticSearchQuery, UpdateMeta};
use reflect_common::entry::load_editor_text;
use reflect_common::format::{
    fmt_pct01, format_clock, format_date_time, normalize_tags_from_string, truncate, MISSING,
};
use reflect_common::insights::{InsightSection, ProsodySummary, SpeechReport};
use reflect_common::library::{LibraryIndex, LibraryQuery};
use reflect_common::{Recording, TranscriptVersion};
use serde_json::json;

use super::editor::render_highlighted;
use super::{expand_path, print_json, Context};
use crate::colors;
use crate::exit_codes::ExitCode;
use crate::DeleteTarget;

const TITLE_WIDTH: usize = 40;
const TEXT_WIDTH: usize = 70;

/// Most processed transcript state of a recording.
fn transcript_state(rec: &Recording) -> &'static str {
    if rec.has_redacted() {
        "redacted"
    } else if rec.has_edited() {
        "edited"
    } else if rec.has_original() {
        "original"
    } else {
        MISSING
    }
}

/// List recordings matching the filters.
pub async fn list(ctx: &Context, query: &LibraryQuery) -> ExitCode {
    let recordings = match ctx.client.list_recordings().await {
        Ok(recordings) => recordings,
        Err(e) => return ctx.api_error(&e),
    };
    let index = LibraryIndex::new(&recordings);
    let matched = index.apply(query);

    if ctx.json {
        return print_json(&matched);
    }

    if matched.is_empty() {
        if !ctx.quiet {
            let msg = if index.is_empty() {
                "No entries yet. Create one with 'reflect upload', 'reflect record' or 'reflect write'."
            } else {
                "No entries match these filters."
            };
            println!("{}", colors::dim(msg));
        }
        return ExitCode::Success;
    }

    let id_width = matched
        .iter()
        .map(|r| r.recording_id.len())
        .max()
        .unwrap_or(2)
        .max(2);
    let date_width = 18;
    let state_width = 8;

    println!(
        "{}  {}  {}  {}  {}  {}",
        colors::pad_left("ID", id_width, colors::header),
        colors::pad_left("CREATED", date_width, colors::header),
        colors::pad_left("STATUS", state_width, colors::header),
        colors::pad_left("AUDIO", 5, colors::header),
        colors::pad_left("TITLE", TITLE_WIDTH, colors::header),
        colors::header("TAGS")
    );
    println!(
        "{}  {}  {}  {}  {}  {}",
        "-".repeat(id_width),
        "-".repeat(date_width),
        "-".repeat(state_width),
        "-".repeat(5),
        "-".repeat(TITLE_WIDTH),
        "-".repeat(4)
    );

    for rec in &matched {
        let tags: Vec<String> = rec.tags.iter().map(|t| colors::tag(t)).collect();
        println!(
            "{}  {:<date_width$}  {}  {}  {:<TITLE_WIDTH$}  {}",
            colors::pad_left(&rec.recording_id, id_width, colors::number),
            format_date_time(rec.created_at.as_deref()),
            colors::pad_left(transcript_state(rec), state_width, colors::transcript_state),
            colors::pad_left(if rec.has_audio() { "yes" } else { "no" }, 5, colors::dim),
            truncate(rec.display_title(), TITLE_WIDTH),
            tags.join(" ")
        );
    }

    if !ctx.quiet {
        println!();
        let filters = query.active_filter_count();
        let mut summary = format!("{} of {} entries", matched.len(), index.len());
        if filters > 0 {
            summary.push_str(&format!(
                " ({} filter{} active)",
                filters,
                if filters == 1 { "" } else { "s" }
            ));
        }
        println!("{}", colors::dim(&summary));

        let all_tags = index.all_tags();
        if !all_tags.is_empty() {
            let tags: Vec<String> = all_tags.iter().map(|t| colors::tag(t)).collect();
            println!("{} {}", colors::dim("Tags:"), tags.join(" "));
        }
    }
    ExitCode::Success
}

fn print_field(label: &str, value: &str) {
    println!("{} {}", colors::bold(&format!("{:<10}", label)), value);
}

/// Show one recording with transcript, segments, PII and speech insights.
pub async fn show(ctx: &Context, id: &str) -> ExitCode {
    let rec = match ctx.client.get_recording(id).await {
        Ok(rec) => rec,
        Err(e) => return ctx.api_error(&e),
    };

    if ctx.json {
        return print_json(&rec);
    }

    println!("{}", colors::header(rec.display_title()));
    print_field("ID:", &colors::number(&rec.recording_id));
    print_field("Created:", &format_date_time(rec.created_at.as_deref()));
    print_field(
        "Duration:",
        &rec.duration
            .filter(|d| d.is_finite())
            .map(format_clock)
            .unwrap_or_else(|| MISSING.to_string()),
    );
    print_field("Audio:", &colors::yes_no(rec.has_audio()));
    if !rec.tags.is_empty() {
        let tags: Vec<String> = rec.tags.iter().map(|t| colors::tag(t)).collect();
        print_field("Tags:", &tags.join(" "));
    }
    let versions: Vec<String> = rec
        .transcripts
        .available()
        .iter()
        .map(|v| colors::transcript_state(v.as_str()))
        .collect();
    print_field(
        "Versions:",
        &if versions.is_empty() {
            MISSING.to_string()
        } else {
            versions.join(", ")
        },
    );

    let version = rec.transcripts.preferred();
    if let Some(text) = rec.transcripts.get(version) {
        println!();
        println!("{}", colors::header(&format!("TRANSCRIPT ({})", version)));
        println!("{}", render_highlighted(text, rec.pii_for(version), version));
    }

    if !rec.segments.is_empty() {
        println!();
        println!("{}", colors::header("SEGMENTS"));
        for segment in &rec.segments {
            let time = match (segment.start_s, segment.end_s) {
                (Some(start), Some(end)) => format!("{}-{}", format_clock(start), format_clock(end)),
                _ => MISSING.to_string(),
            };
            println!(
                "  {}  {}  {}",
                colors::pad_left(&time, 11, colors::dim),
                colors::pad_left(segment.label.as_deref().unwrap_or("segment"), 14, colors::bold),
                truncate(segment.text.as_deref().unwrap_or_default(), TEXT_WIDTH)
            );
        }
    }

    if !rec.pii_summary.is_empty() {
        println!();
        println!("{}", colors::header("PII"));
        for (label, count) in &rec.pii_summary {
            println!("  {:<14}  {}", label, colors::number(&count.to_string()));
        }
    }

    if let Some(speech) = &rec.speech {
        let report = SpeechReport::new(speech, &rec.aligned_words);
        for section in &report.sections {
            print_section(section);
        }
        if !report.low_words.is_empty() {
            println!();
            println!(
                "{} {}",
                colors::header("LOW CONFIDENCE WORDS"),
                colors::dim(&format!("({})", report.low_words_total))
            );
            println!("  {}", report.low_words.join(", "));
        }
        if !report.filler_hits.is_empty() {
            println!();
            println!(
                "{} {}",
                colors::header("FILLERS"),
                colors::dim(&format!("({})", report.filler_hits_total))
            );
            println!("  {}", report.filler_hits.join(", "));
        }
    }

    let prosody = ProsodySummary::new(&rec.prosody);
    if !prosody.is_empty() {
        print_section(&prosody.section());
    }
    ExitCode::Success
}

fn print_section(section: &InsightSection) {
    println!();
    println!("{}", colors::header(&section.title.to_uppercase()));
    for (label, value) in &section.rows {
        println!("  {:<14}  {}", label, value);
    }
}

/// Print one transcript version, or the edited/original text by default.
pub async fn transcript(ctx: &Context, id: &str, version: Option<TranscriptVersion>) -> ExitCode {
    let text = match version {
        Some(v) => ctx.client.get_transcript(id, v).await,
        None => load_editor_text(&ctx.client, id).await,
    };
    let text = match text {
        Ok(text) => text,
        Err(e) => return ctx.api_error(&e),
    };

    if ctx.json {
        return print_json(&json!({
            "recording_id": id,
            "version": version.map(|v| v.as_str()),
            "text": text,
        }));
    }

    if text.trim().is_empty() {
        let which = version.map(|v| v.as_str()).unwrap_or("a");
        return ctx.fail(
            format!("Entry {} has no {} transcript.", id, which),
            ExitCode::NotFound,
        );
    }
    println!("{}", text);
    ExitCode::Success
}

/// `{id}_{version}.txt`, the name transcript downloads are saved under.
fn transcript_file_name(id: &str, version: TranscriptVersion) -> String {
    format!("{}_{}.txt", id, version)
}

/// `{id}.{ext}`, using the extension of the stored audio path when known.
fn audio_file_name(rec: &Recording) -> String {
    let ext = rec
        .audio
        .as_ref()
        .and_then(|a| a.as_str())
        .and_then(|p| Path::new(p).extension())
        .and_then(|e| e.to_str())
        .unwrap_or("wav");
    format!("{}.{}", rec.recording_id, ext)
}

fn write_file(ctx: &Context, path: &Path, bytes: &[u8]) -> Result<(), ExitCode> {
    std::fs::write(path, bytes).map_err(|e| {
        ctx.fail(
            format!("Could not write {}: {}", path.display(), e),
            ExitCode::GeneralError,
        )
    })?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved download");
    Ok(())
}

/// Save audio, one transcript, or every available transcript.
pub async fn download(
    ctx: &Context,
    id: &str,
    version: Option<TranscriptVersion>,
    audio: bool,
    output: Option<String>,
) -> ExitCode {
    let rec = match ctx.client.get_recording(id).await {
        Ok(rec) => rec,
        Err(e) => return ctx.api_error(&e),
    };

    // (path, bytes written)
    let mut saved: Vec<(PathBuf, usize)> = Vec::new();

    if audio {
        if !rec.has_audio() {
            return ctx.fail(format!("Entry {} has no audio.", id), ExitCode::NotFound);
        }
        let bytes = match ctx.client.download_audio(id).await {
            Ok(bytes) => bytes,
            Err(e) => return ctx.api_error(&e),
        };
        let path = output
            .as_deref()
            .map(expand_path)
            .unwrap_or_else(|| PathBuf::from(audio_file_name(&rec)));
        if let Err(code) = write_file(ctx, &path, &bytes) {
            return code;
        }
        saved.push((path, bytes.len()));
    } else if let Some(version) = version {
        let Some(text) = rec.transcripts.get(version) else {
            return ctx.fail(
                format!("Entry {} has no {} transcript.", id, version),
                ExitCode::NotFound,
            );
        };
        let path = output
            .as_deref()
            .map(expand_path)
            .unwrap_or_else(|| PathBuf::from(transcript_file_name(id, version)));
        if let Err(code) = write_file(ctx, &path, text.as_bytes()) {
            return code;
        }
        saved.push((path, text.len()));
    } else {
        // Every available version into the output directory
        let dir = output
            .as_deref()
            .map(expand_path)
            .unwrap_or_else(|| PathBuf::from("."));
        if let Err(e) = std::fs::create_dir_all(&dir) {
            return ctx.fail(
                format!("Could not create {}: {}", dir.display(), e),
                ExitCode::GeneralError,
            );
        }
        for version in rec.transcripts.available() {
            let Some(text) = rec.transcripts.get(version) else {
                continue;
            };
            let path = dir.join(transcript_file_name(id, version));
            if let Err(code) = write_file(ctx, &path, text.as_bytes()) {
                return code;
            }
            saved.push((path, text.len()));
        }
        if saved.is_empty() {
            return ctx.fail(
                format!("Entry {} has no transcripts.", id),
                ExitCode::NotFound,
            );
        }
    }

    if ctx.json {
        let files: Vec<_> = saved
            .iter()
            .map(|(path, bytes)| json!({ "path": path, "bytes": bytes }))
            .collect();
        return print_json(&files);
    }
    if !ctx.quiet {
        for (path, bytes) in &saved {
            println!(
                "{} {} {}",
                colors::success("Saved"),
                colors::path(&path.display().to_string()),
                colors::dim(&format!("({} bytes)", bytes))
            );
        }
    }
    ExitCode::Success
}

/// Update title and/or tags.
pub async fn meta(ctx: &Context, id: &str, title: Option<String>, tags: Option<String>) -> ExitCode {
    let update = UpdateMeta {
        title,
        tags: tags.as_deref().map(normalize_tags_from_string),
    };
    if update.is_empty() {
        return ctx.fail("Nothing to update. Pass --title and/or --tags.", ExitCode::InvalidArguments);
    }

    match ctx.client.update_meta(id, &update).await {
        Ok(updated) => {
            if ctx.json {
                return print_json(&updated);
            }
            if !ctx.quiet {
                println!("{}", colors::success("Details saved."));
                if let Some(title) = &updated.title {
                    print_field("Title:", title);
                }
                if let Some(tags) = &updated.tags {
                    let tags: Vec<String> = tags.iter().map(|t| colors::tag(t)).collect();
                    print_field("Tags:", &tags.join(" "));
                }
            }
            ExitCode::Success
        }
        Err(e) => ctx.api_error(&e),
    }
}

/// Delete an entry, its audio, its transcripts or its segments.
pub async fn delete(ctx: &Context, id: &str, target: DeleteTarget) -> ExitCode {
    let (result, done) = match target {
        DeleteTarget::All => (ctx.client.delete_recording(id).await, "Entry deleted."),
        DeleteTarget::Audio => (ctx.client.delete_audio(id).await, "Audio deleted."),
        DeleteTarget::Transcripts => (
            ctx.client.delete_transcripts(id).await,
            "Transcripts deleted.",
        ),
        DeleteTarget::Segments => (ctx.client.delete_segments(id).await, "Segments deleted."),
    };

    match result {
        Ok(()) => {
            if ctx.json {
                return print_json(&json!({ "recording_id": id, "deleted": format!("{:?}", target).to_lowercase() }));
            }
            if !ctx.quiet {
                println!("{}", colors::success(done));
            }
            ExitCode::Success
        }
        Err(e) => ctx.api_error(&e),
    }
}

/// Semantic search across transcripts.
pub async fn search(ctx: &Context, query: &str, top_k: u32) -> ExitCode {
    if query.trim().is_empty() {
        return ctx.fail("Search query is empty.", ExitCode::InvalidArguments);
    }
    let mut request = SemanticSearchQuery::new(query.trim());
    request.top_k = top_k.max(1);

    let hits = match ctx.client.semantic_search(&request).await {
        Ok(hits) => hits,
        Err(e) => return ctx.api_error(&e),
    };

    if ctx.json {
        return print_json(&hits);
    }
    if hits.is_empty() {
        if !ctx.quiet {
            println!("{}", colors::dim("No matches."));
        }
        return ExitCode::Success;
    }

    let id_width = hits
        .iter()
        .map(|h| h.recording_id.len())
        .max()
        .unwrap_or(9)
        .max(9);
    println!(
        "{}  {}  {}  {}  {}",
        colors::pad_left("SCORE", 5, colors::header),
        colors::pad_left("RECORDING", id_width, colors::header),
        colors::pad_left("LABEL", 14, colors::header),
        colors::pad_left("TIME", 5, colors::header),
        colors::header("TEXT")
    );
    println!(
        "{}  {}  {}  {}  {}",
        "-".repeat(5),
        "-".repeat(id_width),
        "-".repeat(14),
        "-".repeat(5),
        "-".repeat(4)
    );
    for hit in &hits {
        println!(
            "{:<5.2}  {}  {:<14}  {:<5}  {}",
            hit.score,
            colors::pad_left(&hit.recording_id, id_width, colors::number),
            truncate(&hit.label, 14),
            hit.start_s.map(format_clock).unwrap_or_else(|| MISSING.to_string()),
            truncate(hit.text.trim(), TEXT_WIDTH)
        );
    }
    ExitCode::Success
}

fn bar(value: u64, max: u64, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let len = ((value as f64 / max as f64) * width as f64).round() as usize;
    "#".repeat(len.max(1))
}

/// Journal-wide statistics.
pub async fn analytics(ctx: &Context) -> ExitCode {
    let recordings = match ctx.client.list_recordings().await {
        Ok(recordings) => recordings,
        Err(e) => return ctx.api_error(&e),
    };
    let stats = DashboardStats::from_recordings(&recordings);

    if ctx.json {
        return print_json(&stats);
    }

    println!("{}", colors::header("OVERVIEW"));
    println!("  {:<16}  {}", "Entries", stats.total_recordings);
    println!("  {:<16}  {:.1}", "Hours recorded", stats.total_hours);
    println!("  {:<16}  {}", "Words", stats.total_words);
    println!(
        "  {:<16}  {}",
        "Avg confidence",
        if stats.confidence.is_empty() {
            MISSING.to_string()
        } else {
            fmt_pct01(Some(stats.avg_confidence))
        }
    );
    println!(
        "  {:<16}  {}",
        "Top filler",
        stats.most_used_filler.as_deref().unwrap_or(MISSING)
    );

    if !stats.top_fillers.is_empty() {
        println!();
        println!("{}", colors::header("FILLERS"));
        for filler in &stats.top_fillers {
            println!("  {:<16}  {}", filler.name, filler.value);
        }
    }

    if !stats.activity.is_empty() {
        println!();
        println!("{}", colors::header("ACTIVITY"));
        let max = stats.activity.iter().map(|d| d.count).max().unwrap_or(0);
        for day in &stats.activity {
            println!(
                "  {:<16}  {:>3}  {}",
                day.date.format("%d %b %Y").to_string(),
                day.count,
                colors::info(&bar(day.count, max, 30))
            );
        }
    }

    if !stats.confidence.is_empty() {
        println!();
        println!("{}", colors::header("CONFIDENCE"));
        for point in &stats.confidence {
            println!("  {:<16}  {:>3}%", point.id, point.confidence);
        }
    }

    if !stats.pii.is_empty() {
        println!();
        println!("{}", colors::header("PII"));
        for entry in &stats.pii {
            println!("  {:<16}  {}", entry.name, entry.value);
        }
    }
    ExitCode::Success
}
