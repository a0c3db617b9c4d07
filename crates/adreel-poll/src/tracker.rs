//! Job status tracker.
//!
//! Drives the poll scheduler against `GET /api/jobs/{id}/status` and
//! forwards progress to the caller over a channel. Terminal outcomes
//! (`Completed`, `Failed`, `TimedOut`) are delivered exactly once and
//! end the tracking task.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use adreel_models::{Cost, EditStage, JobId};

use crate::error::{PollError, PollResult};
use crate::scheduler::{PollAction, PollScheduler, DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL};

/// Progress and outcome events for one tracked job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    Progress {
        stage: EditStage,
        progress_pct: u8,
        cost: Cost,
    },
    Completed {
        cost: Cost,
    },
    Failed {
        message: String,
        cost: Cost,
    },
    /// Poll budget exhausted. The job may still be running server-side.
    TimedOut,
}

impl TrackEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TrackEvent::Progress { .. })
    }
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl TrackerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobStatusView {
    stage: EditStage,
    progress_pct: u8,
    cost: Cost,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    detail: String,
}

/// Polls one job's status until a terminal outcome.
pub struct JobTracker {
    client: Client,
    config: TrackerConfig,
}

impl JobTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Track `job_id` until it completes, fails, or the poll budget runs
    /// out. `visibility` carries host foreground state; polling pauses
    /// entirely while it is `false` and resumes with one immediate poll
    /// when it flips back. Events go out on `events`; tracking stops if
    /// the receiver is dropped.
    pub async fn track(
        &self,
        job_id: &JobId,
        mut visibility: watch::Receiver<bool>,
        events: mpsc::Sender<TrackEvent>,
    ) -> PollResult<()> {
        let mut scheduler = PollScheduler::new(Some(self.config.max_polls));
        scheduler.start();
        if !*visibility.borrow_and_update() {
            scheduler.on_visibility(false);
        }

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut watch_open = true;

        loop {
            let action = tokio::select! {
                _ = interval.tick() => scheduler.on_tick(),
                changed = visibility.changed(), if watch_open => match changed {
                    Ok(()) => {
                        let visible = *visibility.borrow_and_update();
                        let action = scheduler.on_visibility(visible);
                        if action == PollAction::Poll {
                            // Foreground poll restarts the cadence.
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

            match action {
                PollAction::Hold => continue,
                PollAction::TimedOut => {
                    debug!(job_id = %job_id, polls = scheduler.polls_issued(), "Poll budget exhausted");
                    events.send(TrackEvent::TimedOut).await.ok();
                    return Ok(());
                }
                PollAction::Poll => {
                    let view = match self.fetch_status(job_id).await {
                        Ok(view) => view,
                        Err(e) if e.is_transient() => {
                            warn!(job_id = %job_id, "Status poll failed: {e}");
                            continue;
                        }
                        Err(e) => {
                            warn!(job_id = %job_id, "Status poll failed permanently: {e}");
                            return Err(e);
                        }
                    };

                    if view.stage.is_terminal() {
                        if scheduler.finish() {
                            let event = match view.stage {
                                EditStage::Completed => TrackEvent::Completed { cost: view.cost },
                                _ => TrackEvent::Failed {
                                    message: view
                                        .error_message
                                        .unwrap_or_else(|| "edit job failed".to_string()),
                                    cost: view.cost,
                                },
                            };
                            events.send(event).await.ok();
                        }
                        return Ok(());
                    }

                    let sent = events
                        .send(TrackEvent::Progress {
                            stage: view.stage,
                            progress_pct: view.progress_pct,
                            cost: view.cost,
                        })
                        .await;
                    if sent.is_err() {
                        // Nobody is listening anymore.
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn fetch_status(&self, job_id: &JobId) -> PollResult<JobStatusView> {
        let url = format!("{}/api/jobs/{}/status", self.config.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map(|b| b.detail)
                .unwrap_or_default();
            return Err(PollError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}
