//! Request handlers.

pub mod campaigns;
pub mod edits;
pub mod health;
pub mod jobs;

pub use campaigns::*;
pub use edits::*;
pub use health::*;
pub use jobs::*;
