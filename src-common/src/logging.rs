//! Log directory resolution for the terminal client.

use std::path::PathBuf;

/// Application name used for the per-user directories.
pub const APP_NAME: &str = "reflect";

/// File name prefix for the daily-rolling CLI log (`reflect-cli.2026-10-18`).
pub const CLI_LOG_PREFIX: &str = "reflect-cli.log";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Returns the platform-appropriate directory for log files.
///
/// | Platform | Directory |
/// |----------|-----------|
/// | Linux | `$XDG_STATE_HOME/reflect/logs` or `~/.local/state/reflect/logs` |
/// | macOS | `~/Library/Logs/reflect` |
/// | Windows | `%LOCALAPPDATA%\reflect\reflect\logs` |
///
/// Without a resolvable home directory the logs go under the temp dir.
pub fn log_dir() -> PathBuf {
    let Some(base) = project_dirs() else {
        return std::env::temp_dir().join(APP_NAME).join("logs");
    };

    #[cfg(target_os = "linux")]
    {
        base.state_dir()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| base.data_local_dir().join("state"))
            .join("logs")
    }

    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/reflect -> ~/Library/Logs/reflect
        let library = base
            .data_local_dir()
            .parent()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| base.data_local_dir().to_path_buf());
        library.join("Logs").join(APP_NAME)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        base.data_local_dir().join("logs")
    }
}

/// Creates the log directory if needed and returns it.
pub fn ensure_log_dir() -> Result<PathBuf, std::io::Error> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
