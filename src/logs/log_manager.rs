use super::family::{ArtistLogs, TrackLogs};
use super::log_book::LogBook;
use super::models::{
    ArtistLog, LogPayload, NewArtistLog, NewTrackLog, PageRange, TaggedLog, TrackLog,
};
use super::LogStore;
use crate::error::ServiceError;
use crate::identity::{IdentityProvider, OwnerClaim};
use crate::outcome::Outcome;
use crate::tags::TagStore;
use std::sync::Arc;

/// Entry point for both log families.
pub struct LogManager {
    tracks: LogBook<TrackLogs>,
    artists: LogBook<ArtistLogs>,
}

impl LogManager {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        tags: Arc<dyn TagStore>,
        track_store: Arc<dyn LogStore<TrackLogs>>,
        artist_store: Arc<dyn LogStore<ArtistLogs>>,
    ) -> Self {
        Self {
            tracks: LogBook::new(identity.clone(), tags.clone(), track_store),
            artists: LogBook::new(identity, tags, artist_store),
        }
    }

    pub fn tracks(&self) -> &LogBook<TrackLogs> {
        &self.tracks
    }

    pub fn artists(&self) -> &LogBook<ArtistLogs> {
        &self.artists
    }

    pub async fn log_track(
        &self,
        claim: &OwnerClaim,
        payload: LogPayload<NewTrackLog>,
    ) -> Result<Outcome<TrackLog>, ServiceError> {
        self.tracks.write(claim, payload).await
    }

    pub async fn log_artist(
        &self,
        claim: &OwnerClaim,
        payload: LogPayload<NewArtistLog>,
    ) -> Result<Outcome<ArtistLog>, ServiceError> {
        self.artists.write(claim, payload).await
    }

    pub async fn list_logs_with_tags(
        &self,
        claim: &OwnerClaim,
        range: PageRange,
    ) -> Result<Outcome<Vec<TaggedLog<TrackLog>>>, ServiceError> {
        self.tracks.list_with_tags(claim, range).await
    }

    pub async fn list_artist_logs_with_tags(
        &self,
        claim: &OwnerClaim,
        range: PageRange,
    ) -> Result<Outcome<Vec<TaggedLog<ArtistLog>>>, ServiceError> {
        self.artists.list_with_tags(claim, range).await
    }

    pub async fn delete_log(&self, claim: &OwnerClaim, log_id: i64) -> Result<bool, ServiceError> {
        self.tracks.delete(claim, log_id).await
    }

    pub async fn delete_artist_log(
        &self,
        claim: &OwnerClaim,
        log_id: i64,
    ) -> Result<bool, ServiceError> {
        self.artists.delete(claim, log_id).await
    }
}
