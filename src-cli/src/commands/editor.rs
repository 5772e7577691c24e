//! Transcript editing and PII review.

use reflect_common::entry::{load_editor_text, submit_editor, EditorAction};
use reflect_common::format::truncate;
use reflect_common::redaction::{char_slice, find_occurrence, highlight, RedactionError, RedactionSession};
use reflect_common::{PiiHit, Recording, TranscriptVersion};
use serde_json::json;

use super::{print_json, read_text_arg, Context};
use crate::colors;
use crate::exit_codes::ExitCode;
use crate::PiiAction;

/// Transcript text with PII spans styled for the terminal.
pub fn render_highlighted(text: &str, hits: &[PiiHit], version: TranscriptVersion) -> String {
    highlight(text, hits, version)
        .iter()
        .map(|fragment| match fragment.label {
            Some(_) => colors::pii(fragment.text),
            None => fragment.text.to_string(),
        })
        .collect()
}

/// Save new editor text, optionally finalizing it.
pub async fn edit(
    ctx: &Context,
    id: &str,
    file: Option<String>,
    text: Option<String>,
    finalize: bool,
) -> ExitCode {
    let text = match read_text_arg(text, file) {
        Ok(text) => text,
        Err(msg) => return ctx.fail(msg, ExitCode::InvalidArguments),
    };
    let action = if finalize {
        EditorAction::Finalize
    } else {
        EditorAction::SaveDraft
    };
    submit(ctx, id, &text, action).await
}

/// Finalize whatever the editor currently holds.
pub async fn finalize(ctx: &Context, id: &str) -> ExitCode {
    let text = match load_editor_text(&ctx.client, id).await {
        Ok(text) => text,
        Err(e) => return ctx.api_error(&e),
    };
    submit(ctx, id, &text, EditorAction::Finalize).await
}

async fn submit(ctx: &Context, id: &str, text: &str, action: EditorAction) -> ExitCode {
    if action == EditorAction::Finalize {
        ctx.note(&colors::dim("Finalizing, re-running segmentation and PII detection..."));
    }
    let next = match submit_editor(&ctx.client, id, text, action).await {
        Ok(route) => route,
        Err(e) => return ctx.api_error(&e),
    };

    if ctx.json {
        return print_json(&json!({
            "recording_id": id,
            "finalized": action == EditorAction::Finalize,
            "next": next,
        }));
    }
    if !ctx.quiet {
        let done = match action {
            EditorAction::SaveDraft => "Draft saved.",
            EditorAction::Finalize => "Transcript finalized.",
        };
        println!("{}", colors::success(done));
        println!("{}", colors::dim(&format!("View it with 'reflect show {}'.", id)));
    }
    ExitCode::Success
}

pub async fn pii(ctx: &Context, action: PiiAction) -> ExitCode {
    match action {
        PiiAction::List { id, version } => list(ctx, &id, version).await,
        PiiAction::Delete { id, index } => {
            edit_session(ctx, &id, index, |session, i| {
                let removed = session.delete(i)?;
                Ok(format!("Removed {}.", describe(&removed)))
            })
            .await
        }
        PiiAction::Tag {
            id,
            start,
            end,
            matching,
            nth,
        } => {
            edit_session(ctx, &id, 1, move |session, _| {
                let (start, end) = match (&matching, start, end) {
                    (Some(needle), _, _) => find_occurrence(session.text(), needle, nth as usize - 1)
                        .ok_or_else(|| EditFailure::NoMatch(needle.clone(), nth))?,
                    (None, Some(start), Some(end)) => (start, end),
                    _ => return Err(RedactionError::EmptySelection.into()),
                };
                let hit = session.tag(start, end)?;
                Ok(format!("Tagged {}.", describe(&hit)))
            })
            .await
        }
        PiiAction::Obfuscate {
            id,
            index,
            replacement,
        } => {
            edit_session(ctx, &id, index, |session, i| {
                let target = session.hits().get(i).cloned();
                session.obfuscate(i, &replacement)?;
                let what = target.as_ref().map(describe).unwrap_or_default();
                Ok(format!("Replaced {} with \"{}\".", what, replacement))
            })
            .await
        }
    }
}

/// Why a single PII edit could not be applied.
enum EditFailure {
    Redaction(RedactionError),
    /// `--match` text (and occurrence number) not found
    NoMatch(String, u64),
}

impl From<RedactionError> for EditFailure {
    fn from(e: RedactionError) -> Self {
        EditFailure::Redaction(e)
    }
}

/// `LABEL "text" (start..end)`
fn describe(hit: &PiiHit) -> String {
    let text = hit
        .preview
        .as_deref()
        .or(hit.text.as_deref())
        .unwrap_or_default();
    match hit.range() {
        Some((start, end)) => format!("{} \"{}\" ({}..{})", hit.label_or_default(), text, start, end),
        None => format!("{} \"{}\"", hit.label_or_default(), text),
    }
}

/// Load the PII session, apply one edit and commit it.
///
/// `number` is the 1-based finding number shown by `reflect pii list`.
async fn edit_session<F>(ctx: &Context, id: &str, number: u64, apply: F) -> ExitCode
where
    F: FnOnce(&mut RedactionSession, usize) -> Result<String, EditFailure>,
{
    let mut session = match RedactionSession::load(&ctx.client, id).await {
        Ok(session) => session,
        Err(e) => return ctx.api_error(&e),
    };

    let index = number.saturating_sub(1) as usize;
    let message = match apply(&mut session, index) {
        Ok(message) => message,
        Err(EditFailure::Redaction(RedactionError::HitNotFound(_))) => {
            return ctx.fail(
                format!("No PII finding #{}. See 'reflect pii list {}'.", number, id),
                ExitCode::NotFound,
            );
        }
        Err(EditFailure::Redaction(e)) => {
            let code = ExitCode::from(&e);
            return ctx.fail(e, code);
        }
        Err(EditFailure::NoMatch(needle, nth)) => {
            return ctx.fail(
                format!("Occurrence {} of \"{}\" not found in the transcript.", nth, needle),
                ExitCode::InvalidArguments,
            );
        }
    };

    let recording = match session.commit(&ctx.client).await {
        Ok(recording) => recording,
        Err(e) => return ctx.api_error(&e),
    };

    if ctx.json {
        return print_json(&json!({
            "recording_id": id,
            "message": message,
            "hits": session.hits(),
        }));
    }
    if !ctx.quiet {
        println!("{}", colors::success(&message));
        let count = recording.pii_for(recording.transcripts.preferred()).len();
        println!("{}", colors::dim(&format!("{} PII finding(s) now.", count)));
    }
    ExitCode::Success
}

/// The version whose findings `pii list` numbers.
///
/// PII edits always load the preferred version (edited, else original), so
/// numbered findings must come from that version too. The redacted version
/// carries no findings and can always be shown.
fn listed_version(rec: &Recording, requested: Option<TranscriptVersion>) -> Result<TranscriptVersion, String> {
    let preferred = rec.transcripts.preferred();
    match requested {
        None => Ok(preferred),
        Some(v) if v == preferred || v == TranscriptVersion::Redacted => Ok(v),
        Some(v) => Err(format!(
            "PII of entry {} is reviewed on the {} transcript, not the {} one. Omit --version or pass --version {}.",
            rec.recording_id, preferred, v, preferred
        )),
    }
}

async fn list(ctx: &Context, id: &str, version: Option<TranscriptVersion>) -> ExitCode {
    let rec = match ctx.client.get_recording(id).await {
        Ok(rec) => rec,
        Err(e) => return ctx.api_error(&e),
    };
    let version = match listed_version(&rec, version) {
        Ok(version) => version,
        Err(msg) => return ctx.fail(msg, ExitCode::InvalidArguments),
    };
    let text = rec.transcripts.get(version).unwrap_or_default();
    let hits = rec.pii_for(version);

    if ctx.json {
        return print_json(&json!({
            "recording_id": id,
            "version": version,
            "hits": hits,
        }));
    }

    if text.is_empty() {
        return ctx.fail(
            format!("Entry {} has no {} transcript.", id, version),
            ExitCode::NotFound,
        );
    }

    println!("{}", colors::header(&format!("TRANSCRIPT ({})", version)));
    println!("{}", render_highlighted(text, hits, version));
    println!();

    if version == TranscriptVersion::Redacted {
        println!("{}", colors::dim("PII is not marked in the redacted transcript."));
        return ExitCode::Success;
    }
    if hits.is_empty() {
        println!("{}", colors::dim("No PII found."));
        return ExitCode::Success;
    }

    println!(
        "{}  {}  {}  {}",
        colors::pad_left("#", 3, colors::header),
        colors::pad_left("LABEL", 14, colors::header),
        colors::pad_left("RANGE", 11, colors::header),
        colors::header("TEXT")
    );
    println!("{}  {}  {}  {}", "-".repeat(3), "-".repeat(14), "-".repeat(11), "-".repeat(4));
    for (i, hit) in hits.iter().enumerate() {
        let (range, span) = match hit.range() {
            Some((start, end)) => (format!("{}..{}", start, end), char_slice(text, start, end)),
            None => ("-".to_string(), ""),
        };
        let shown = if span.is_empty() {
            hit.preview.as_deref().or(hit.text.as_deref()).unwrap_or_default()
        } else {
            span
        };
        println!(
            "{}  {:<14}  {:<11}  {}",
            colors::pad_left(&(i + 1).to_string(), 3, colors::number),
            truncate(hit.label_or_default(), 14),
            range,
            truncate(shown, 50)
        );
    }
    ExitCode::Success
}
