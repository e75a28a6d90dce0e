//! musicboxd server library
//!
//! Track and artist logs with preset and custom tags, backed by SQLite and
//! served over HTTP.

pub mod config;
pub mod error;
pub mod identity;
pub mod logs;
pub mod outcome;
pub mod search;
pub mod server;
pub mod sqlite_persistence;
pub mod store;
pub mod tags;

#[cfg(test)]
mod test_support;

// Re-export commonly used types for convenience
pub use error::ServiceError;
pub use outcome::{Degradation, Outcome};
pub use server::{run_server, RequestsLoggingLevel};
pub use store::SqliteStore;
