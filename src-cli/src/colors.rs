//! Terminal color support for CLI output.
//!
//! Provides colorful output when running interactively, with automatic
//! detection to disable colors when output is piped or redirected.

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use reflect_common::status::ServerStatus;

/// Pad a string to a minimum width (left-aligned), then apply a color function.
/// This correctly handles ANSI escape codes by padding before colorizing.
pub fn pad_left<F>(msg: &str, width: usize, color_fn: F) -> String
where
    F: FnOnce(&str) -> String,
{
    let padded = format!("{:<width$}", msg);
    color_fn(&padded)
}

/// Check if stdout is a terminal (interactive mode).
pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal()
}

/// Check if stderr is a terminal (interactive mode).
pub fn is_stderr_interactive() -> bool {
    std::io::stderr().is_terminal()
}

/// Style for error messages.
pub fn error(msg: &str) -> String {
    if is_stderr_interactive() {
        format!("{} {}", "error:".red().bold(), msg)
    } else {
        format!("error: {}", msg)
    }
}

/// Style for warning messages.
pub fn warning(msg: &str) -> String {
    if is_stderr_interactive() {
        format!("{} {}", "warning:".yellow().bold(), msg)
    } else {
        format!("warning: {}", msg)
    }
}

/// Style for success messages.
pub fn success(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.green())
    } else {
        msg.to_string()
    }
}

pub fn info(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.cyan())
    } else {
        msg.to_string()
    }
}

/// Style for dim/secondary text.
pub fn dim(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.dimmed())
    } else {
        msg.to_string()
    }
}

pub fn bold(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.bold())
    } else {
        msg.to_string()
    }
}

/// Style for header text (bold + color).
pub fn header(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.bold().blue())
    } else {
        msg.to_string()
    }
}

/// Style for the live recording indicator.
pub fn recording(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.red().bold())
    } else {
        msg.to_string()
    }
}

/// Style for file paths.
pub fn path(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.underline())
    } else {
        msg.to_string()
    }
}

/// Style for recording IDs and counts.
pub fn number(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.cyan())
    } else {
        msg.to_string()
    }
}

/// Style for a detected PII span inside a transcript.
///
/// Without a terminal the span is bracketed so it stays visible in plain text.
pub fn pii(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.black().on_yellow())
    } else {
        format!("[{}]", msg)
    }
}

/// Style for tags.
pub fn tag(msg: &str) -> String {
    if is_interactive() {
        format!("{}", format!("#{}", msg).magenta())
    } else {
        format!("#{}", msg)
    }
}

/// Style for "yes" indicator.
pub fn yes() -> String {
    if is_interactive() {
        format!("{}", "yes".green())
    } else {
        "yes".to_string()
    }
}

/// Style for "no" indicator.
pub fn no() -> String {
    if is_interactive() {
        format!("{}", "no".dimmed())
    } else {
        "no".to_string()
    }
}

pub fn yes_no(value: bool) -> String {
    if value {
        yes()
    } else {
        no()
    }
}

/// Format elapsed recording time with color.
pub fn elapsed_time(mins: u64, secs: u64) -> String {
    let time_str = format!("{:02}:{:02}", mins, secs);
    if is_interactive() {
        format!("{}", time_str.yellow().bold())
    } else {
        time_str
    }
}

/// Format a server status with appropriate color.
pub fn server_status(status: ServerStatus) -> String {
    let label = status.to_string();
    if !is_interactive() {
        return label;
    }

    match status {
        ServerStatus::Up {
            configured: Some(false),
        } => format!("{}", label.yellow()),
        ServerStatus::Up { .. } => format!("{}", label.green()),
        ServerStatus::Down => format!("{}", label.red().bold()),
        ServerStatus::Unknown => format!("{}", label.dimmed()),
    }
}

/// Format a transcript state label (`original`, `edited`, `redacted`).
pub fn transcript_state(state: &str) -> String {
    if !is_interactive() {
        return state.to_string();
    }

    match state {
        "edited" => format!("{}", state.green()),
        "redacted" => format!("{}", state.yellow()),
        _ => format!("{}", state.dimmed()),
    }
}
