//! HTTP API for campaign scene editing.
//!
//! Surfaces the submission, polling and read endpoints over the
//! campaign store, the job queue and object storage, plus the stale-job
//! detector that recovers work from crashed workers.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{EditService, StaleJobDetector};
pub use state::AppState;
