//! Campaign persistence.
//!
//! One JSON document per campaign behind the [`CampaignStore`] trait,
//! plus the per-campaign edit lease that serializes edits. Two
//! implementations: Redis for deployment, in-memory for tests and
//! local development. Lease semantics are identical in both.

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::{DbError, DbResult};
pub use memory::MemoryCampaignStore;
pub use redis_store::RedisCampaignStore;
pub use store::CampaignStore;
