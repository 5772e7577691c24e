//! CLI command implementations.
//!
//! Every command prints its result (a table, or pretty JSON with `--json`)
//! and returns an [`ExitCode`]. Errors go to stderr unless `--quiet` is set.

pub mod editor;
pub mod entry;
pub mod library;
pub mod settings;
pub mod system;

use std::fmt::Display;
use std::path::PathBuf;

use reflect_common::config::ClientConfig;
use reflect_common::routes::{guard_route, GuardDecision, Route};
use reflect_common::status::{self, ServerStatus};
use reflect_common::{ApiClient, ApiError};
use serde::Serialize;

use crate::colors;
use crate::exit_codes::ExitCode;

/// Shared state for one command invocation.
pub struct Context {
    pub client: ApiClient,
    pub config: ClientConfig,
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
}

impl Context {
    /// Report an error and return its exit code.
    pub fn fail(&self, err: impl Display, code: ExitCode) -> ExitCode {
        if !self.quiet {
            eprintln!("{}", colors::error(&err.to_string()));
        }
        code
    }

    /// Print a warning to stderr unless quiet.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", colors::warning(msg));
        }
    }

    pub fn api_error(&self, e: &ApiError) -> ExitCode {
        self.fail(e, ExitCode::from(e))
    }

    /// Print a line of human-readable progress, unless quiet or in JSON mode.
    pub fn note(&self, msg: &str) {
        if !self.quiet && !self.json {
            println!("{}", msg);
        }
    }

    pub fn language(&self, flag: Option<String>) -> String {
        flag.filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.config.default_language.clone())
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("{}", colors::error(&format!("Failed to encode output: {}", e)));
            ExitCode::GeneralError
        }
    }
}

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

/// Text from `--text`, or the contents of `--file`.
pub fn read_text_arg(text: Option<String>, file: Option<String>) -> Result<String, String> {
    match (text, file) {
        (Some(text), _) => Ok(text),
        (None, Some(file)) => {
            let path = expand_path(&file);
            std::fs::read_to_string(&path)
                .map_err(|e| format!("Could not read {}: {}", path.display(), e))
        }
        (None, None) => Err("Provide --text or --file.".to_string()),
    }
}

/// Check the backend before running a command that acts on `route`.
///
/// An offline backend fails fast. An unconfigured backend sends the user to
/// `reflect setup run`; a configured one turns `setup run` into a no-op
/// unless reconfiguration was requested.
pub async fn guard(ctx: &Context, route: &Route, reconfigure: bool) -> Result<(), ExitCode> {
    let status = status::probe(&ctx.client, ctx.config.status_timeout()).await;
    tracing::debug!(%status, route = %route, "Checked backend before command");

    if status == ServerStatus::Down {
        return Err(ctx.fail(
            format!("Backend at {} is offline.", ctx.client.base_url()),
            ExitCode::BackendUnreachable,
        ));
    }

    match guard_route(status, route, reconfigure) {
        GuardDecision::Stay => Ok(()),
        GuardDecision::Redirect(Route::Setup) => Err(ctx.fail(
            "The backend has not been set up yet. Run 'reflect setup run' first.",
            ExitCode::SetupRequired,
        )),
        GuardDecision::Redirect(_) => {
            if ctx.json {
                print_json(&serde_json::json!({"status": "already_configured"}));
            } else {
                ctx.note(&colors::info(
                    "The backend is already set up. Use --reconfigure to run setup again.",
                ));
            }
            Err(ExitCode::Success)
        }
    }
}
