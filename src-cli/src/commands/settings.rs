//! Engine settings.

use reflect_common::EngineSettings;

use super::{print_json, Context};
use crate::colors;
use crate::exit_codes::ExitCode;
use crate::SettingsAction;

pub async fn run(ctx: &Context, action: SettingsAction) -> ExitCode {
    match action {
        SettingsAction::Show => show(ctx).await,
        SettingsAction::Set { assignments } => set(ctx, &assignments).await,
        SettingsAction::Reset => reset(ctx).await,
    }
}

fn print_settings(settings: &EngineSettings) {
    let width = settings.iter().map(|(k, _)| k.len()).max().unwrap_or(3).max(3);
    println!(
        "{}  {}",
        colors::pad_left("KEY", width, colors::header),
        colors::header("VALUE")
    );
    println!("{}  {}", "-".repeat(width), "-".repeat(5));
    for (key, _) in settings.iter() {
        println!(
            "{:<width$}  {}",
            key,
            settings.get_display(key).unwrap_or_default()
        );
    }
}

async fn show(ctx: &Context) -> ExitCode {
    let settings = match ctx.client.get_settings().await {
        Ok(settings) => settings,
        Err(e) => return ctx.api_error(&e),
    };
    if ctx.json {
        return print_json(&settings);
    }
    if settings.is_empty() {
        if !ctx.quiet {
            println!("{}", colors::dim("The backend reported no settings."));
        }
        return ExitCode::Success;
    }
    print_settings(&settings);
    ExitCode::Success
}

/// Parse `KEY=VALUE` assignments into a settings patch.
fn parse_assignments(assignments: &[String]) -> Result<(EngineSettings, Vec<String>), String> {
    let mut patch = EngineSettings::default();
    let mut keys = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        match patch.assign(assignment) {
            Some(key) => keys.push(key),
            None => return Err(format!("Expected KEY=VALUE, got '{}'.", assignment)),
        }
    }
    Ok((patch, keys))
}

/// Assigned keys the backend does not report yet.
fn unknown_keys<'a>(current: &EngineSettings, keys: &'a [String]) -> Vec<&'a str> {
    keys.iter()
        .filter(|key| current.get(key).is_none())
        .map(String::as_str)
        .collect()
}

async fn set(ctx: &Context, assignments: &[String]) -> ExitCode {
    let (patch, keys) = match parse_assignments(assignments) {
        Ok(parsed) => parsed,
        Err(msg) => return ctx.fail(msg, ExitCode::InvalidArguments),
    };

    let mut settings = match ctx.client.get_settings().await {
        Ok(settings) => settings,
        Err(e) => return ctx.api_error(&e),
    };
    for key in unknown_keys(&settings, &keys) {
        tracing::debug!(key = %key, "Setting is not known to the backend yet");
        ctx.warn(&format!(
            "'{}' is not a current setting; it will be added as a new key.",
            key
        ));
    }
    settings.merge(patch);

    if let Err(e) = ctx.client.update_settings(&settings).await {
        return ctx.api_error(&e);
    }

    if ctx.json {
        return print_json(&settings);
    }
    if !ctx.quiet {
        println!("{}", colors::success("Settings saved."));
        for key in &keys {
            println!(
                "  {} = {}",
                colors::bold(key),
                settings.get_display(key).unwrap_or_default()
            );
        }
    }
    ExitCode::Success
}

async fn reset(ctx: &Context) -> ExitCode {
    if let Err(e) = ctx.client.reset_settings().await {
        return ctx.api_error(&e);
    }
    // Show what the defaults are
    let settings = match ctx.client.get_settings().await {
        Ok(settings) => settings,
        Err(e) => return ctx.api_error(&e),
    };
    if ctx.json {
        return print_json(&settings);
    }
    if !ctx.quiet {
        println!("{}", colors::success("Settings reset to defaults."));
        if !settings.is_empty() {
            print_settings(&settings);
        }
    }
    ExitCode::Success
}
