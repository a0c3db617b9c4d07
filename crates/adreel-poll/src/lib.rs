//! Client-side status synchronization.
//!
//! The server never pushes; callers poll. This crate holds the caller's
//! half of that protocol: a visibility-aware poll scheduler, a job
//! tracker that turns status polls into a stream of progress and
//! outcome events, and a health watcher reusing the same discipline.

pub mod error;
pub mod health;
pub mod scheduler;
pub mod tracker;

pub use error::{PollError, PollResult};
pub use health::{HealthEvent, HealthWatcher};
pub use scheduler::{PollAction, PollScheduler, SchedulerState, DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL};
pub use tracker::{JobTracker, TrackEvent, TrackerConfig};
