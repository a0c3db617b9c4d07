//! Service health watcher.
//!
//! Same polling discipline as the job tracker (fixed cadence, pause on
//! background, one immediate poll on foreground) pointed at `/health`
//! instead of a job. Unbounded: liveness is watched for as long as the
//! host cares, so there is no timeout outcome.

use std::time::Duration;

use reqwest::Client;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::scheduler::{PollAction, PollScheduler, DEFAULT_POLL_INTERVAL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    Healthy,
    Unhealthy { reason: String },
}

/// Polls the API health endpoint and reports transitions.
pub struct HealthWatcher {
    client: Client,
    base_url: String,
    poll_interval: Duration,
}

impl HealthWatcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Watch until the event receiver is dropped. Only health state
    /// *changes* are reported; a steadily healthy service produces one
    /// event.
    pub async fn watch(
        &self,
        mut visibility: watch::Receiver<bool>,
        events: mpsc::Sender<HealthEvent>,
    ) {
        let mut scheduler = PollScheduler::unbounded();
        scheduler.start();
        if !*visibility.borrow_and_update() {
            scheduler.on_visibility(false);
        }

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut watch_open = true;
        let mut last_healthy: Option<bool> = None;

        loop {
            let action = tokio::select! {
                _ = interval.tick() => scheduler.on_tick(),
                changed = visibility.changed(), if watch_open => match changed {
                    Ok(()) => {
                        let visible = *visibility.borrow_and_update();
                        let action = scheduler.on_visibility(visible);
                        if action == PollAction::Poll {
                            interval.reset();
                        }
                        action
                    }
                    Err(_) => {
                        watch_open = false;
                        PollAction::Hold
                    }
                },
            };

            if action != PollAction::Poll {
                continue;
            }

            let (healthy, reason) = self.check().await;
            if last_healthy == Some(healthy) {
                continue;
            }
            last_healthy = Some(healthy);

            let event = if healthy {
                debug!("Service healthy");
                HealthEvent::Healthy
            } else {
                let reason = reason.unwrap_or_else(|| "health check failed".to_string());
                warn!("Service unhealthy: {reason}");
                HealthEvent::Unhealthy { reason }
            };
            if events.send(event).await.is_err() {
                return;
            }
        }
    }

    async fn check(&self) -> (bool, Option<String>) {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => (true, None),
            Ok(response) => (false, Some(format!("status {}", response.status().as_u16()))),
            Err(e) => (false, Some(e.to_string())),
        }
    }
}
