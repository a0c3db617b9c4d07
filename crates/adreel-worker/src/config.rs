//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

/// Configuration for the edit worker pool.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum jobs processed concurrently
    pub max_concurrent_jobs: usize,

    /// Hard wall-clock limit for one pipeline run
    pub job_timeout: Duration,

    /// How long to wait for in-flight jobs on shutdown
    pub shutdown_timeout: Duration,

    /// Scratch directory for the final render
    pub work_dir: PathBuf,

    /// ffmpeg binary used for the final render
    pub ffmpeg_path: String,

    /// Edit lease TTL; renewed alongside the heartbeat
    pub lease_ttl: Duration,

    /// Heartbeat and lease-renewal interval
    pub heartbeat_interval: Duration,

    /// Consumer name within the queue's consumer group
    pub consumer_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            job_timeout: Duration::from_secs(900),
            shutdown_timeout: Duration::from_secs(30),
            work_dir: PathBuf::from("/tmp/adreel"),
            ffmpeg_path: "ffmpeg".to_string(),
            lease_ttl: Duration::from_secs(120),
            heartbeat_interval: Duration::from_secs(30),
            consumer_name: format!("worker-{}", Uuid::new_v4()),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: env_parse("WORKER_MAX_CONCURRENT_JOBS", defaults.max_concurrent_jobs),
            job_timeout: Duration::from_secs(env_parse("WORKER_JOB_TIMEOUT_SECS", 900)),
            shutdown_timeout: Duration::from_secs(env_parse("WORKER_SHUTDOWN_TIMEOUT_SECS", 30)),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            lease_ttl: Duration::from_secs(env_parse("EDIT_LEASE_TTL_SECS", 120)),
            heartbeat_interval: Duration::from_secs(env_parse("WORKER_HEARTBEAT_INTERVAL_SECS", 30)),
            consumer_name: std::env::var("WORKER_CONSUMER_NAME").unwrap_or(defaults.consumer_name),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
