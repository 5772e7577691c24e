//! Backend status, first-run setup, local configuration and version.

use chrono::Local;
use reflect_common::config::{self, ClientConfig};
use reflect_common::status::{ServerStatus, StatusMonitor};
use reflect_common::SetupConfig;
use serde::Serialize;
use serde_json::Value;

use super::{print_json, Context};
use crate::colors;
use crate::exit_codes::ExitCode;
use crate::ConfigAction;

#[derive(Serialize)]
struct StatusReport<'a> {
    api_url: &'a str,
    #[serde(flatten)]
    status: ServerStatus,
}

fn print_status(ctx: &Context, status: ServerStatus, timestamped: bool) {
    if ctx.json {
        let report = StatusReport {
            api_url: ctx.client.base_url(),
            status,
        };
        // One object per line so `--watch` output can be streamed
        match serde_json::to_string(&report) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("{}", colors::error(&e.to_string())),
        }
        return;
    }

    let prefix = if timestamped {
        format!("{} ", colors::dim(&Local::now().format("[%H:%M:%S]").to_string()))
    } else {
        String::new()
    };
    println!(
        "{}{} {}",
        prefix,
        colors::bold("Backend:"),
        colors::server_status(status)
    );
    if !timestamped && ctx.verbose {
        println!("{} {}", colors::bold("URL:"), colors::path(ctx.client.base_url()));
    }
    if status.configured() == Some(false) {
        println!("Run 'reflect setup run' to finish setting up the backend.");
    }
}

/// Probe the backend once, or keep watching it until Ctrl+C.
pub async fn status(ctx: &Context, watch: bool) -> ExitCode {
    let mut monitor = StatusMonitor::new(
        ctx.client.clone(),
        ctx.config.poll_interval(),
        ctx.config.status_timeout(),
    );

    if !watch {
        let status = monitor.check_now().await;
        print_status(ctx, status, false);
        return if status == ServerStatus::Down {
            ExitCode::BackendUnreachable
        } else {
            ExitCode::Success
        };
    }

    let mut updates = monitor.subscribe();
    monitor.start();
    ctx.note(&colors::dim(&format!(
        "Watching {} every {}s. Press Ctrl+C to stop.",
        ctx.client.base_url(),
        ctx.config.poll_interval().as_secs()
    )));

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = *updates.borrow_and_update();
                if status != ServerStatus::Unknown {
                    print_status(ctx, status, true);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    monitor.stop();
    ExitCode::Success
}

fn value_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => reflect_common::format::MISSING.to_string(),
        other => other.to_string(),
    }
}

/// Show setup state and the backend's system information.
pub async fn setup_status(ctx: &Context) -> ExitCode {
    let status = match ctx.client.setup_status().await {
        Ok(status) => status,
        Err(e) => return ctx.api_error(&e),
    };

    if ctx.json {
        return print_json(&status);
    }

    println!(
        "{} {}",
        colors::bold("Configured:"),
        colors::yes_no(status.is_configured)
    );
    println!(
        "{} {}",
        colors::bold("Suggested device:"),
        status.suggested_device()
    );

    if !status.system_info.is_empty() {
        println!();
        println!("{}", colors::header("SYSTEM"));
        let width = status.system_info.keys().map(String::len).max().unwrap_or(0);
        for (key, value) in &status.system_info {
            println!("  {:<width$}  {}", key, value_display(value));
        }
    }

    let current = &status.current_config;
    println!();
    println!("{}", colors::header("CURRENT CONFIGURATION"));
    for (label, value) in [
        ("data_dir", &current.data_dir),
        ("config_dir", &current.config_dir),
        ("language", &current.language),
        ("whisper_model", &current.whisper_model),
        ("device", &current.device),
    ] {
        let shown = if value.is_empty() {
            colors::dim(reflect_common::format::MISSING)
        } else {
            value.clone()
        };
        println!("  {:<13}  {}", label, shown);
    }
    ExitCode::Success
}

/// Merge flags over the backend's current configuration.
fn setup_config(
    current: SetupConfig,
    suggested_device: &str,
    data_dir: Option<String>,
    config_dir: Option<String>,
    language: Option<String>,
    model: Option<String>,
    device: Option<String>,
) -> SetupConfig {
    let mut config = SetupConfig {
        data_dir: data_dir.unwrap_or(current.data_dir),
        config_dir: config_dir.unwrap_or(current.config_dir),
        language: language.unwrap_or(current.language),
        whisper_model: model.unwrap_or(current.whisper_model),
        device: device.unwrap_or(current.device),
    };
    if config.device.trim().is_empty() {
        config.device = suggested_device.to_string();
    }
    config
}

/// Submit the first-run configuration.
pub async fn setup_run(
    ctx: &Context,
    data_dir: Option<String>,
    config_dir: Option<String>,
    language: Option<String>,
    model: Option<String>,
    device: Option<String>,
) -> ExitCode {
    let status = match ctx.client.setup_status().await {
        Ok(status) => status,
        Err(e) if e.is_unreachable() => return ctx.api_error(&e),
        Err(e) => {
            tracing::warn!(error = %e, "Setup status unavailable, starting from empty configuration");
            Default::default()
        }
    };

    let config = setup_config(
        status.current_config.clone(),
        status.suggested_device(),
        data_dir,
        config_dir,
        language,
        model,
        device,
    );

    ctx.note(&colors::dim("Running setup, this can take a while..."));
    match ctx.client.run_setup(&config).await {
        Ok(ack) => {
            if ctx.json {
                return print_json(&serde_json::json!({ "config": config, "result": ack }));
            }
            let message = ack
                .message
                .unwrap_or_else(|| "Setup complete.".to_string());
            if !ctx.quiet {
                println!("{}", colors::success(&message));
            }
            ExitCode::Success
        }
        Err(e) => ctx.api_error(&e),
    }
}

/// `reflect config show|path|set-url`.
pub fn manage_config(action: &ConfigAction, mut config: ClientConfig, json: bool, quiet: bool) -> ExitCode {
    let fail = |msg: String, code: ExitCode| {
        if !quiet {
            eprintln!("{}", colors::error(&msg));
        }
        code
    };

    match action {
        ConfigAction::Show => {
            if json {
                return print_json(&config);
            }
            println!("{} {}", colors::bold("API URL:"), config.api_base_url);
            println!(
                "{} {}s",
                colors::bold("Status poll interval:"),
                config.status_poll_interval_secs
            );
            println!(
                "{} {}s",
                colors::bold("Status timeout:"),
                config.status_timeout_secs
            );
            println!(
                "{} {}",
                colors::bold("Default language:"),
                config.default_language
            );
            if let Ok(url) = std::env::var(config::API_URL_ENV) {
                println!(
                    "{}",
                    colors::dim(&format!("{} is set and overrides the URL: {}", config::API_URL_ENV, url))
                );
            }
            ExitCode::Success
        }
        ConfigAction::Path => match config::get_config_path() {
            Ok(path) => {
                if json {
                    print_json(&serde_json::json!({ "path": path }))
                } else {
                    println!("{}", path.display());
                    ExitCode::Success
                }
            }
            Err(e) => fail(e.to_string(), ExitCode::GeneralError),
        },
        ConfigAction::SetUrl { url } => {
            if let Err(e) = config.set_api_url(url) {
                return fail(e.to_string(), ExitCode::InvalidArguments);
            }
            match config::save_config(&config) {
                Ok(path) => {
                    if json {
                        print_json(&serde_json::json!({
                            "api_base_url": config.api_base_url,
                            "path": path,
                        }))
                    } else {
                        if !quiet {
                            println!(
                                "{} {}",
                                colors::success("Saved backend URL"),
                                config.api_base_url
                            );
                            println!("{}", colors::dim(&path.display().to_string()));
                        }
                        ExitCode::Success
                    }
                }
                Err(e) => fail(e.to_string(), ExitCode::GeneralError),
            }
        }
    }
}

/// Show version information.
pub fn version(json: bool) {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        println!(r#"{{"version": "{}"}}"#, version);
    } else {
        println!("{} {}", colors::bold("reflect"), version);
    }
}
