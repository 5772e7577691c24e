//! REFLECT Command-Line Interface
//!
//! A terminal client for the REFLECT audio journal backend: browse and
//! filter entries, edit transcripts, review PII, create new entries and
//! manage engine settings from scripts or the shell.

mod colors;
mod commands;
mod exit_codes;
#[cfg(feature = "microphone")]
mod microphone;

use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use exit_codes::ExitCode;
use reflect_common::config::{self, API_URL_ENV};
use reflect_common::library::{AudioFilter, LibraryQuery, SortMode, StatusFilter};
use reflect_common::logging;
use reflect_common::routes::Route;
use reflect_common::{ApiClient, TranscriptVersion};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use commands::Context;

/// REFLECT - Audio Journal CLI
#[derive(Parser, Debug)]
#[command(name = "reflect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (overrides REFLECT_API_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show whether the backend is online and set up
    Status {
        /// Keep polling and print every change
        #[arg(long)]
        watch: bool,
    },
    /// First-run backend setup
    Setup {
        #[command(subcommand)]
        action: SetupAction,
    },
    /// List journal entries
    List(ListArgs),
    /// Show one entry with its transcripts, segments and insights
    Show {
        /// Recording ID
        id: String,
    },
    /// Print a transcript
    Transcript {
        /// Recording ID
        id: String,

        /// original, edited or redacted (default: edited, else original)
        #[arg(long, value_parser = parse_version)]
        version: Option<TranscriptVersion>,
    },
    /// Replace the edited transcript
    #[command(group(ArgGroup::new("source").required(true).args(["file", "text"])))]
    Edit {
        /// Recording ID
        id: String,

        /// Read the new text from a file
        #[arg(long)]
        file: Option<String>,

        /// New transcript text
        #[arg(long)]
        text: Option<String>,

        /// Re-run segmentation and PII detection on the new text
        #[arg(long)]
        finalize: bool,
    },
    /// Finalize the current transcript
    Finalize {
        /// Recording ID
        id: String,
    },
    /// Update title and tags
    Meta {
        /// Recording ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// Comma-separated tags (replaces the existing tags)
        #[arg(long)]
        tags: Option<String>,
    },
    /// Delete an entry or parts of it
    Delete {
        /// Recording ID
        id: String,

        /// What to delete
        #[arg(value_enum, default_value_t = DeleteTarget::All)]
        target: DeleteTarget,
    },
    /// Review and edit detected personal information
    Pii {
        #[command(subcommand)]
        action: PiiAction,
    },
    /// Upload an audio file as a new entry
    Upload {
        /// Audio file path
        file: String,

        /// Transcription language
        #[arg(long)]
        language: Option<String>,
    },
    /// Create a written entry
    #[command(group(ArgGroup::new("source").required(true).args(["file", "text"])))]
    Write {
        /// Entry text
        #[arg(long)]
        text: Option<String>,

        /// Read the entry text from a file
        #[arg(long)]
        file: Option<String>,

        /// Entry title
        #[arg(long)]
        title: Option<String>,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,

        /// Processing language
        #[arg(long)]
        language: Option<String>,
    },
    /// Record from the microphone and upload the result
    Record {
        /// Stop automatically after this many seconds (default: until Ctrl+C)
        #[arg(long, value_name = "SECONDS")]
        duration: Option<u64>,

        /// Transcription language
        #[arg(long)]
        language: Option<String>,
    },
    /// Save a transcript or the audio of an entry
    Download {
        /// Recording ID
        id: String,

        /// Transcript version to save
        #[arg(long, value_parser = parse_version, conflicts_with = "audio")]
        version: Option<TranscriptVersion>,

        /// Save the audio instead of a transcript
        #[arg(long)]
        audio: bool,

        /// Output path (default: derived from the ID)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show or change engine settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Semantic search over all transcripts
    Search {
        /// What to look for
        query: String,

        /// Maximum number of hits
        #[arg(long, default_value_t = 8)]
        top_k: u32,
    },
    /// Journal-wide statistics
    Analytics,
    /// Manage the local client configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Case-insensitive text search over title, ID, tags and transcript
    #[arg(long)]
    query: Option<String>,

    /// all, original, edited or redacted
    #[arg(long, default_value = "all")]
    status: StatusFilter,

    /// all, audio or no-audio
    #[arg(long, default_value = "all")]
    audio: AudioFilter,

    /// Earliest creation date (YYYY-MM-DD, inclusive)
    #[arg(long, value_name = "DATE")]
    from: Option<NaiveDate>,

    /// Latest creation date (YYYY-MM-DD, inclusive)
    #[arg(long, value_name = "DATE")]
    to: Option<NaiveDate>,

    /// Only entries with this tag (repeatable, all must match)
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// newest, oldest or title
    #[arg(long, default_value = "newest")]
    sort: SortMode,
}

impl ListArgs {
    pub fn query(&self) -> LibraryQuery {
        LibraryQuery {
            query: self.query.clone().unwrap_or_default(),
            status: self.status,
            audio: self.audio,
            from: self.from,
            to: self.to,
            tags: self.tags.clone(),
            sort: self.sort,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SetupAction {
    /// Show setup state, system information and current configuration
    Status,
    /// Configure the backend
    Run {
        /// Directory for recordings and transcripts
        #[arg(long)]
        data_dir: Option<String>,

        /// Directory for engine configuration
        #[arg(long)]
        config_dir: Option<String>,

        /// Default transcription language
        #[arg(long)]
        language: Option<String>,

        /// Whisper model name
        #[arg(long)]
        model: Option<String>,

        /// Inference device (default: the backend's suggestion)
        #[arg(long)]
        device: Option<String>,

        /// Run setup even though the backend is already configured
        #[arg(long)]
        reconfigure: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum PiiAction {
    /// Show the transcript with PII highlighted and the numbered findings
    List {
        /// Recording ID
        id: String,

        /// Transcript version to show: the reviewed one (edited, else
        /// original) or redacted
        #[arg(long, value_parser = parse_version)]
        version: Option<TranscriptVersion>,
    },
    /// Remove a finding without changing the text
    Delete {
        /// Recording ID
        id: String,

        /// Finding number from 'reflect pii list'
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        index: u64,
    },
    /// Mark a span of the transcript as personal information
    #[command(group(ArgGroup::new("span").required(true).args(["start", "matching"])))]
    Tag {
        /// Recording ID
        id: String,

        /// Start character offset
        #[arg(long, requires = "end")]
        start: Option<usize>,

        /// End character offset (exclusive)
        #[arg(long, requires = "start")]
        end: Option<usize>,

        /// Tag an occurrence of this text instead of giving offsets
        #[arg(long = "match", value_name = "TEXT")]
        matching: Option<String>,

        /// Which occurrence of --match to tag
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        nth: u64,
    },
    /// Replace the text of a finding
    Obfuscate {
        /// Recording ID
        id: String,

        /// Finding number from 'reflect pii list'
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        index: u64,

        /// Replacement text
        #[arg(long = "with", default_value = "[REDACTED]")]
        replacement: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Print the current engine settings
    Show,
    /// Change one or more settings
    Set {
        /// KEY=VALUE assignments
        #[arg(required = true, value_name = "KEY=VALUE")]
        assignments: Vec<String>,
    },
    /// Restore the engine defaults
    Reset,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Store the backend URL
    SetUrl {
        /// Backend base URL, e.g. http://127.0.0.1:8000
        url: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    /// The whole entry
    All,
    /// Only the audio file
    Audio,
    /// All transcript versions
    Transcripts,
    /// Only the segmentation
    Segments,
}

fn parse_version(s: &str) -> Result<TranscriptVersion, String> {
    TranscriptVersion::parse(s)
        .ok_or_else(|| format!("unknown version '{}' (expected original, edited or redacted)", s))
}

impl Commands {
    /// The client view a command acts on, for the setup guard. Commands that
    /// work without a configured backend return `None`.
    fn route(&self) -> Option<(Route, bool)> {
        let route = match self {
            Commands::Status { .. }
            | Commands::Config { .. }
            | Commands::Version
            | Commands::Setup {
                action: SetupAction::Status,
            } => return None,
            Commands::Setup {
                action: SetupAction::Run { reconfigure, .. },
            } => return Some((Route::Setup, *reconfigure)),
            Commands::List(_) => Route::Recordings,
            Commands::Show { id }
            | Commands::Transcript { id, .. }
            | Commands::Meta { id, .. }
            | Commands::Delete { id, .. }
            | Commands::Download { id, .. } => Route::Recording(id.clone()),
            Commands::Pii { action } => match action {
                PiiAction::List { id, .. }
                | PiiAction::Delete { id, .. }
                | PiiAction::Tag { id, .. }
                | PiiAction::Obfuscate { id, .. } => Route::Recording(id.clone()),
            },
            Commands::Edit { id, .. } | Commands::Finalize { id } => Route::Editor(id.clone()),
            Commands::Upload { .. } | Commands::Write { .. } | Commands::Record { .. } => {
                Route::Upload
            }
            Commands::Settings { .. } => Route::Settings,
            Commands::Search { .. } => Route::Home,
            Commands::Analytics => Route::Analytics,
        };
        Some((route, false))
    }
}

/// Install the tracing subscriber.
///
/// stderr only carries warnings unless `--verbose` is given, so log lines do
/// not interleave with command output. The daily log file records `info` and
/// above (or `RUST_LOG`).
fn init_logging(verbose: bool, quiet: bool) -> Option<WorkerGuard> {
    let env = std::env::var("RUST_LOG").ok();
    let stderr_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let stderr_filter = env
        .as_deref()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(stderr_level));
    let file_filter = env
        .as_deref()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let (file_layer, guard) = match logging::ensure_log_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, logging::CLI_LOG_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(colors::is_stderr_interactive())
                .with_target(false)
                .with_filter(stderr_filter),
        )
        .with(file_layer)
        .init();

    guard
}

fn main() {
    let cli = Cli::parse();
    let log_guard = init_logging(cli.verbose, cli.quiet);

    // Build the async runtime
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", colors::error(&format!("Failed to start runtime: {}", e)));
            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    };

    let exit_code = runtime.block_on(run(cli));
    tracing::debug!(code = exit_code.as_i32(), "Exiting");
    // process::exit skips destructors; flush the log file first
    drop(runtime);
    drop(log_guard);
    std::process::exit(exit_code.as_i32());
}

async fn run(cli: Cli) -> ExitCode {
    let config = config::load_config();

    // Commands that never talk to the backend
    match &cli.command {
        Commands::Version => {
            commands::system::version(cli.json);
            return ExitCode::Success;
        }
        Commands::Config { action } => {
            return commands::system::manage_config(action, config, cli.json, cli.quiet);
        }
        _ => {}
    }

    let env_url = std::env::var(API_URL_ENV).ok();
    let base_url = match config::resolve_base_url(cli.api_url.as_deref(), env_url.as_deref(), &config) {
        Ok(url) => url,
        Err(e) => {
            if !cli.quiet {
                eprintln!("{}", colors::error(&e.to_string()));
            }
            return ExitCode::InvalidArguments;
        }
    };
    let client = match ApiClient::new(base_url) {
        Ok(client) => client,
        Err(e) => {
            if !cli.quiet {
                eprintln!("{}", colors::error(&e.to_string()));
            }
            return ExitCode::GeneralError;
        }
    };

    let ctx = Context {
        client,
        config,
        json: cli.json,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    if let Some((route, reconfigure)) = cli.command.route() {
        if let Err(code) = commands::guard(&ctx, &route, reconfigure).await {
            return code;
        }
    }

    match cli.command {
        Commands::Status { watch } => commands::system::status(&ctx, watch).await,
        Commands::Setup { action } => match action {
            SetupAction::Status => commands::system::setup_status(&ctx).await,
            SetupAction::Run {
                data_dir,
                config_dir,
                language,
                model,
                device,
                reconfigure: _,
            } => {
                commands::system::setup_run(&ctx, data_dir, config_dir, language, model, device)
                    .await
            }
        },
        Commands::List(args) => commands::library::list(&ctx, &args.query()).await,
        Commands::Show { id } => commands::library::show(&ctx, &id).await,
        Commands::Transcript { id, version } => {
            commands::library::transcript(&ctx, &id, version).await
        }
        Commands::Edit {
            id,
            file,
            text,
            finalize,
        } => commands::editor::edit(&ctx, &id, file, text, finalize).await,
        Commands::Finalize { id } => commands::editor::finalize(&ctx, &id).await,
        Commands::Meta { id, title, tags } => {
            commands::library::meta(&ctx, &id, title, tags).await
        }
        Commands::Delete { id, target } => commands::library::delete(&ctx, &id, target).await,
        Commands::Pii { action } => commands::editor::pii(&ctx, action).await,
        Commands::Upload { file, language } => {
            commands::entry::upload(&ctx, &file, language).await
        }
        Commands::Write {
            text,
            file,
            title,
            tags,
            language,
        } => commands::entry::write(&ctx, text, file, title, tags, language).await,
        Commands::Record { duration, language } => {
            commands::entry::record(&ctx, duration, language).await
        }
        Commands::Download {
            id,
            version,
            audio,
            output,
        } => commands::library::download(&ctx, &id, version, audio, output).await,
        Commands::Settings { action } => commands::settings::run(&ctx, action).await,
        Commands::Search { query, top_k } => commands::library::search(&ctx, &query, top_k).await,
        Commands::Analytics => commands::library::analytics(&ctx).await,
        Commands::Config { .. } | Commands::Version => ExitCode::Success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    /// Verify the CLI definition is valid
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    /// Test parsing 'list' with no filters
    #[test]
    fn parse_list_defaults() {
        let cli = Cli::try_parse_from(["reflect", "list"]).unwrap();
        assert!(!cli.json);
        assert!(!cli.quiet);
        assert!(!cli.verbose);
        match cli.command {
            Commands::List(args) => assert_eq!(args.query(), LibraryQuery::default()),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    /// Test parsing 'list' with every filter set
    #[test]
    fn parse_list_with_filters() {
        let cli = Cli::try_parse_from([
            "reflect", "list", "--query", "walk", "--status", "edited", "--audio", "no-audio",
            "--from", "2024-03-01", "--to", "2024-03-31", "--tag", "work", "--tag", "morning",
            "--sort", "title",
        ])
        .unwrap();
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        let query = args.query();
        assert_eq!(query.query, "walk");
        assert_eq!(query.status, StatusFilter::Edited);
        assert_eq!(query.audio, AudioFilter::NoAudio);
        assert_eq!(query.from, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(query.to, NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(query.tags, vec!["work", "morning"]);
        assert_eq!(query.sort, SortMode::Title);
    }

    /// Test that a malformed date is rejected
    #[test]
    fn parse_list_rejects_bad_date() {
        assert!(Cli::try_parse_from(["reflect", "list", "--from", "03/01/2024"]).is_err());
        assert!(Cli::try_parse_from(["reflect", "list", "--status", "draft"]).is_err());
    }

    /// Test parsing global flags after the subcommand
    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "reflect", "status", "--json", "-q", "--api-url", "http://10.0.0.2:8000",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(cli.quiet);
        assert_eq!(cli.api_url.as_deref(), Some("http://10.0.0.2:8000"));
        assert!(matches!(cli.command, Commands::Status { watch: false }));
    }

    /// Test parsing 'transcript' with a version
    #[test]
    fn parse_transcript_version() {
        let cli = Cli::try_parse_from(["reflect", "transcript", "abc", "--version", "Redacted"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Transcript {
                version: Some(TranscriptVersion::Redacted),
                ..
            }
        ));
        assert!(Cli::try_parse_from(["reflect", "transcript", "abc", "--version", "final"]).is_err());
    }

    /// Test that 'edit' needs exactly one text source
    #[test]
    fn parse_edit_requires_source() {
        assert!(Cli::try_parse_from(["reflect", "edit", "abc"]).is_err());
        assert!(Cli::try_parse_from(["reflect", "edit", "abc", "--text", "a", "--file", "b"]).is_err());

        let cli = Cli::try_parse_from(["reflect", "edit", "abc", "--text", "new", "--finalize"]).unwrap();
        match cli.command {
            Commands::Edit { text, finalize, .. } => {
                assert_eq!(text.as_deref(), Some("new"));
                assert!(finalize);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    /// Test parsing 'delete' targets
    #[test]
    fn parse_delete_targets() {
        let cli = Cli::try_parse_from(["reflect", "delete", "abc"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Delete {
                target: DeleteTarget::All,
                ..
            }
        ));
        let cli = Cli::try_parse_from(["reflect", "delete", "abc", "segments"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Delete {
                target: DeleteTarget::Segments,
                ..
            }
        ));
    }

    /// Test parsing 'pii tag' by offsets and by match
    #[test]
    fn parse_pii_tag() {
        let cli = Cli::try_parse_from(["reflect", "pii", "tag", "abc", "--start", "6", "--end", "11"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Pii {
                action: PiiAction::Tag {
                    start: Some(6),
                    end: Some(11),
                    matching: None,
                    ..
                }
            }
        ));

        let cli = Cli::try_parse_from(["reflect", "pii", "tag", "abc", "--match", "Alice", "--nth", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Pii {
                action: PiiAction::Tag { nth: 2, .. }
            }
        ));

        assert!(Cli::try_parse_from(["reflect", "pii", "tag", "abc"]).is_err());
        assert!(Cli::try_parse_from(["reflect", "pii", "tag", "abc", "--start", "6"]).is_err());
    }

    /// Test that finding numbers start at 1
    #[test]
    fn parse_pii_index_is_one_based() {
        assert!(Cli::try_parse_from(["reflect", "pii", "delete", "abc", "0"]).is_err());
        let cli = Cli::try_parse_from(["reflect", "pii", "obfuscate", "abc", "2", "--with", "[X]"]).unwrap();
        match cli.command {
            Commands::Pii {
                action: PiiAction::Obfuscate { index, replacement, .. },
            } => {
                assert_eq!(index, 2);
                assert_eq!(replacement, "[X]");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    /// Test that 'download' rejects --version together with --audio
    #[test]
    fn parse_download_conflict() {
        assert!(Cli::try_parse_from(["reflect", "download", "abc", "--audio", "--version", "edited"]).is_err());
        let cli = Cli::try_parse_from(["reflect", "download", "abc", "--audio", "-o", "out.wav"]).unwrap();
        assert!(matches!(cli.command, Commands::Download { audio: true, .. }));
    }

    /// Test parsing 'settings set' with several assignments
    #[test]
    fn parse_settings_set() {
        let cli = Cli::try_parse_from(["reflect", "settings", "set", "a=1", "b=two"]).unwrap();
        match cli.command {
            Commands::Settings {
                action: SettingsAction::Set { assignments },
            } => assert_eq!(assignments, vec!["a=1", "b=two"]),
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Cli::try_parse_from(["reflect", "settings", "set"]).is_err());
    }

    /// Test the views used by the setup guard
    #[test]
    fn command_routes() {
        let route = |args: &[&str]| Cli::try_parse_from(args.iter().copied()).unwrap().command.route();
        assert_eq!(route(&["reflect", "status"]), None);
        assert_eq!(route(&["reflect", "setup", "status"]), None);
        assert_eq!(
            route(&["reflect", "setup", "run", "--reconfigure"]),
            Some((Route::Setup, true))
        );
        assert_eq!(route(&["reflect", "list"]), Some((Route::Recordings, false)));
        assert_eq!(
            route(&["reflect", "edit", "abc", "--text", "x"]),
            Some((Route::Editor("abc".into()), false))
        );
        assert_eq!(route(&["reflect", "upload", "a.wav"]), Some((Route::Upload, false)));
    }
}
