//! Creating entries: audio upload, written text and microphone recording.

use reflect_common::api::{AudioUpload, CreateTextEntry};
use reflect_common::entry::{create_entry, EntryCreated, EntrySource};
use reflect_common::format::normalize_tags_from_string;

use super::{expand_path, print_json, read_text_arg, Context};
use crate::colors;
use crate::exit_codes::ExitCode;

async fn submit(ctx: &Context, source: EntrySource) -> ExitCode {
    let created = match create_entry(&ctx.client, &source).await {
        Ok(created) => created,
        Err(e) => return ctx.api_error(&e),
    };
    report_created(ctx, &created)
}

fn report_created(ctx: &Context, created: &EntryCreated) -> ExitCode {
    if ctx.json {
        return print_json(created);
    }
    if ctx.quiet {
        // Scripts can capture the ID
        println!("{}", created.recording_id);
        return ExitCode::Success;
    }
    println!(
        "{} {}",
        colors::success("Entry created:"),
        colors::number(&created.recording_id)
    );
    println!(
        "{}",
        colors::dim(&format!(
            "Review the transcript with 'reflect transcript {0}' and correct it with 'reflect edit {0} --file <path>'.",
            created.recording_id
        ))
    );
    ExitCode::Success
}

/// Upload an audio file.
pub async fn upload(ctx: &Context, file: &str, language: Option<String>) -> ExitCode {
    let path = expand_path(file);
    let upload = match AudioUpload::from_path(&path, &ctx.language(language)) {
        Ok(upload) => upload,
        Err(e) => {
            let code = ExitCode::from(&e);
            return ctx.fail(e, code);
        }
    };

    if ctx.verbose {
        ctx.note(&colors::dim(&format!(
            "Uploading {} ({}, {} bytes)",
            path.display(),
            upload.mime,
            upload.size()
        )));
    }
    submit(ctx, EntrySource::File(upload)).await
}

/// Create a written entry.
pub async fn write(
    ctx: &Context,
    text: Option<String>,
    file: Option<String>,
    title: Option<String>,
    tags: Option<String>,
    language: Option<String>,
) -> ExitCode {
    let text = match read_text_arg(text, file) {
        Ok(text) => text,
        Err(msg) => return ctx.fail(msg, ExitCode::InvalidArguments),
    };
    let title = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let tags = tags
        .as_deref()
        .map(normalize_tags_from_string)
        .unwrap_or_default();

    let entry = CreateTextEntry::new(text, ctx.language(language)).with_meta(title, tags);
    submit(ctx, EntrySource::Text(entry)).await
}

/// Record from the default input device, then upload.
#[cfg(feature = "microphone")]
pub async fn record(ctx: &Context, duration: Option<u64>, language: Option<String>) -> ExitCode {
    let show_progress = !ctx.quiet && !ctx.json && colors::is_interactive();
    ctx.note(&colors::dim("Recording. Press Ctrl+C to stop."));

    let audio = match crate::microphone::record(duration, show_progress).await {
        Ok(audio) => audio,
        Err(e) => return ctx.fail(e, ExitCode::GeneralError),
    };
    ctx.note(&colors::dim(&format!(
        "Captured {:.1}s, uploading...",
        audio.duration_secs
    )));

    let upload = audio.into_upload(&ctx.language(language));
    submit(ctx, EntrySource::Recording(upload)).await
}

#[cfg(not(feature = "microphone"))]
pub async fn record(ctx: &Context, _duration: Option<u64>, _language: Option<String>) -> ExitCode {
    ctx.fail(
        "This build has no microphone support. Rebuild with '--features microphone', or record elsewhere and use 'reflect upload'.",
        ExitCode::GeneralError,
    )
}
