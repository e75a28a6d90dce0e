//! Track and artist logs and the tags attached to them.
//!
//! Both log families share one read path ([`resolve_tags`]) and one write
//! path ([`write_log`]), instantiated through [`LogFamily`].

mod aggregator;
mod family;
mod log_book;
mod log_manager;
mod models;
mod writer;

pub use aggregator::resolve_tags;
pub use family::{ArtistLogs, LogFamily, TrackLogs};
pub use log_book::LogBook;
pub use log_manager::LogManager;
pub use models::{
    ArtistLog, AssociatedTag, LogPayload, LogWithAssociations, NewArtistLog, NewTrackLog,
    PageRange, TaggedLog, TrackLog, DEFAULT_ARTIST_SOURCE,
};
pub use writer::write_log;

use crate::tags::TagRef;
use anyhow::Result;
use async_trait::async_trait;

/// Persistence for one log family. Every method is a single round trip.
#[async_trait]
pub trait LogStore<F: LogFamily>: Send + Sync {
    /// One page of the owner's logs, newest first, each with its association
    /// rows in insertion order and preset names already embedded.
    async fn fetch_page(
        &self,
        owner_id: &str,
        range: PageRange,
    ) -> Result<Vec<LogWithAssociations<F::Log>>>;

    /// Inserts the row and returns it as stored.
    async fn insert_log(&self, owner_id: &str, new_log: &F::NewLog) -> Result<F::Log>;

    /// Inserts all association rows for `log_id` or none of them.
    async fn insert_associations(&self, owner_id: &str, log_id: i64, tags: &[TagRef])
        -> Result<()>;

    /// Returns false when no row of the owner had this id.
    async fn delete_log(&self, owner_id: &str, log_id: i64) -> Result<bool>;

    async fn owns_log(&self, owner_id: &str, log_id: i64) -> Result<bool>;
}
