//! Business logic services.

pub mod edit;
pub mod stale_job_detector;

pub use edit::EditService;
pub use stale_job_detector::StaleJobDetector;
