//! Cache statistics and maintenance routes.

pub mod cleanup;
pub mod stats;

pub use cleanup::{CleanupResponse, CleanupStatusResponse};
pub use stats::{StatsParams, StatsResponse};
