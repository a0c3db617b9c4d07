//! Edit-job queue and transient job status store.
//!
//! The queue carries accepted edit requests from the API to the worker
//! pool over Redis Streams. The status store holds the TTL'd
//! [`JobStatusSnapshot`](adreel_models::JobStatusSnapshot) rows that
//! back the polling endpoint, plus the worker heartbeat and the
//! cancellation flag.
//!
//! There is deliberately no redelivery or dead-letter path: a failed
//! pipeline is never retried automatically (regeneration is billable
//! and non-deterministic), so a failed job is surfaced and the caller
//! resubmits.

pub mod error;
pub mod job;
pub mod queue;
pub mod status;

pub use error::{QueueError, QueueResult};
pub use job::EditJobRequest;
pub use queue::{JobQueue, JobSink, QueueConfig};
pub use status::{JobStatusStore, MemoryStatusStore, RedisStatusStore, JOB_STATUS_TTL_SECS};
