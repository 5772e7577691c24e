//! Backend reachability and setup-state monitoring.
//!
//! A [`StatusMonitor`] is an explicitly started and stopped service: it probes
//! the backend on an interval and publishes the result through a
//! `tokio::sync::watch` channel that any number of consumers can subscribe to.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, PROBE_TIMEOUT};

/// Default interval between probes.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Last known backend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ServerStatus {
    /// No probe has completed yet
    #[default]
    Unknown,
    /// Backend answered; `configured` is `None` when setup state is unknown
    Up { configured: Option<bool> },
    /// Backend unreachable, timed out or answered with an error
    Down,
}

impl ServerStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, ServerStatus::Up { .. })
    }

    pub fn configured(&self) -> Option<bool> {
        match self {
            ServerStatus::Up { configured } => *configured,
            _ => None,
        }
    }

    /// Short label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            ServerStatus::Unknown => "unknown",
            ServerStatus::Up {
                configured: Some(false),
            } => "online (setup required)",
            ServerStatus::Up { .. } => "online",
            ServerStatus::Down => "offline",
        }
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Probe the backend once.
///
/// The settings endpoint decides up/down. The configured flag comes from the
/// setup endpoint; a failure there leaves it unknown instead of marking the
/// backend down.
pub async fn probe(client: &ApiClient, timeout: Duration) -> ServerStatus {
    if let Err(e) = client.ping_settings(timeout).await {
        debug!(error = %e, "Status probe failed");
        return ServerStatus::Down;
    }
    let configured = match client.probe_setup_status(timeout).await {
        Ok(status) => Some(status.is_configured),
        Err(e) => {
            debug!(error = %e, "Setup status unavailable");
            None
        }
    };
    ServerStatus::Up { configured }
}

/// Publish `status`, logging only when it differs from the current value.
fn publish(sender: &watch::Sender<ServerStatus>, status: ServerStatus) {
    sender.send_if_modified(|current| {
        if *current == status {
            return false;
        }
        match status {
            ServerStatus::Down => warn!(from = %current, "Backend went offline"),
            _ => info!(from = %current, to = %status, "Backend status changed"),
        }
        *current = status;
        true
    });
}

/// Periodic backend prober.
pub struct StatusMonitor {
    client: ApiClient,
    interval: Duration,
    timeout: Duration,
    sender: watch::Sender<ServerStatus>,
    task: Option<JoinHandle<()>>,
}

impl StatusMonitor {
    pub fn new(client: ApiClient, interval: Duration, timeout: Duration) -> Self {
        let (sender, _) = watch::channel(ServerStatus::Unknown);
        Self {
            client,
            interval,
            timeout,
            sender,
            task: None,
        }
    }

    /// Monitor with the default 10 s interval and 3 s probe timeout.
    pub fn with_defaults(client: ApiClient) -> Self {
        Self::new(client, POLL_INTERVAL, PROBE_TIMEOUT)
    }

    /// Start polling: one probe immediately, then one per interval.
    /// Calling `start` on a running monitor does nothing.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let client = self.client.clone();
        let sender = self.sender.clone();
        let timeout = self.timeout;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        debug!(interval = ?self.interval, "Starting status monitor");
        self.task = Some(tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let status = probe(&client, timeout).await;
                publish(&sender, status);
            }
        }));
    }

    /// Stop polling. The last published status stays readable.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Stopping status monitor");
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> ServerStatus {
        *self.sender.borrow()
    }

    /// Probe once outside the schedule and publish the result.
    pub async fn check_now(&self) -> ServerStatus {
        let status = probe(&self.client, self.timeout).await;
        publish(&self.sender, status);
        status
    }
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
