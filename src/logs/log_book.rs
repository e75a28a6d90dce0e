use super::aggregator::resolve_tags;
use super::family::LogFamily;
use super::models::{LogPayload, PageRange, TaggedLog};
use super::writer::write_log;
use super::LogStore;
use crate::error::ServiceError;
use crate::identity::{require_identity, IdentityProvider, OwnerClaim};
use crate::outcome::Outcome;
use crate::tags::{TagRef, TagStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Caller-facing operations for one log family. The caller's identity is
/// resolved again on every call.
pub struct LogBook<F: LogFamily> {
    identity: Arc<dyn IdentityProvider>,
    tags: Arc<dyn TagStore>,
    store: Arc<dyn LogStore<F>>,
}

impl<F: LogFamily> LogBook<F> {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        tags: Arc<dyn TagStore>,
        store: Arc<dyn LogStore<F>>,
    ) -> Self {
        Self {
            identity,
            tags,
            store,
        }
    }

    pub async fn write(
        &self,
        claim: &OwnerClaim,
        payload: LogPayload<F::NewLog>,
    ) -> Result<Outcome<F::Log>, ServiceError> {
        let owner = require_identity(self.identity.as_ref(), claim, "log music").await?;
        write_log(self.store.as_ref(), &owner, payload).await
    }

    pub async fn list_with_tags(
        &self,
        claim: &OwnerClaim,
        range: PageRange,
    ) -> Result<Outcome<Vec<TaggedLog<F::Log>>>, ServiceError> {
        let owner = require_identity(self.identity.as_ref(), claim, "view your logs").await?;
        let page = self.store.fetch_page(&owner.id, range).await.map_err(|err| {
            ServiceError::store_rejected(&err, &format!("Failed to fetch {} logs", F::NAME))
        })?;
        debug!(
            "Fetched {} {} logs for {} (limit {}, offset {})",
            page.len(),
            F::NAME,
            owner.id,
            range.limit,
            range.offset
        );
        Ok(resolve_tags(page, &owner.id, self.tags.as_ref()).await)
    }

    /// Deletes one of the caller's logs. Returns false when the caller has
    /// no log with this id.
    pub async fn delete(&self, claim: &OwnerClaim, log_id: i64) -> Result<bool, ServiceError> {
        let owner = require_identity(self.identity.as_ref(), claim, "delete logs").await?;
        let deleted = self.store.delete_log(&owner.id, log_id).await.map_err(|err| {
            ServiceError::store_rejected(&err, &format!("Failed to delete {} log", F::NAME))
        })?;
        if deleted {
            info!("User {} deleted {} log {}", owner.id, F::NAME, log_id);
        } else {
            debug!("User {} has no {} log {} to delete", owner.id, F::NAME, log_id);
        }
        Ok(deleted)
    }

    /// Tags an existing log of the caller. Unlike the tagging step of
    /// [`Self::write`], a failure here fails the call.
    pub async fn attach_tags(
        &self,
        claim: &OwnerClaim,
        log_id: i64,
        preset_tag_ids: &[i64],
        custom_tag_ids: &[i64],
    ) -> Result<(), ServiceError> {
        let owner = require_identity(self.identity.as_ref(), claim, "tag logs").await?;
        let tags = TagRef::from_lists(preset_tag_ids, custom_tag_ids);
        if tags.is_empty() {
            return Ok(());
        }
        let owned = self.store.owns_log(&owner.id, log_id).await.map_err(|err| {
            ServiceError::store_rejected(&err, &format!("Failed to fetch {} log", F::NAME))
        })?;
        if !owned {
            return Err(ServiceError::NotFound(format!(
                "No {} log with id {}",
                F::NAME,
                log_id
            )));
        }
        self.store
            .insert_associations(&owner.id, log_id, &tags)
            .await
            .map_err(|err| ServiceError::store_rejected(&err, "Failed to add tags"))?;
        info!(
            "User {} attached {} tags to {} log {}",
            owner.id,
            tags.len(),
            F::NAME,
            log_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::{ArtistLogs, NewArtistLog, NewTrackLog, TrackLog, TrackLogs};
    use crate::outcome::Degradation;
    use crate::test_support::{FakeIdentityProvider, FakeLogStore, FakeTagStore, TEST_TOKEN};
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture<F: LogFamily> {
        book: LogBook<F>,
        identity: Arc<FakeIdentityProvider>,
        tags: Arc<FakeTagStore>,
        store: Arc<FakeLogStore<F>>,
    }

    fn fixture<F: LogFamily>() -> Fixture<F>
    where
        FakeLogStore<F>: LogStore<F> + Default,
    {
        let identity = Arc::new(FakeIdentityProvider::signed_in());
        let tags = Arc::new(FakeTagStore::default());
        let store = Arc::new(FakeLogStore::<F>::default());
        Fixture {
            book: LogBook::new(identity.clone(), tags.clone(), store.clone()),
            identity,
            tags,
            store,
        }
    }

    fn claim() -> OwnerClaim {
        OwnerClaim::from(TEST_TOKEN)
    }

    fn track_at(track_id: &str, minutes: i64) -> LogPayload<NewTrackLog> {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        LogPayload::untagged(NewTrackLog {
            track_id: track_id.to_string(),
            logged_at: Some(base + Duration::minutes(minutes)),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn write_without_identity_inserts_nothing() {
        let f = fixture::<TrackLogs>();
        let err = f
            .book
            .write(&OwnerClaim::Anonymous, track_at("t1", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(_)));
        assert_eq!(f.store.insert_log_calls(), 0);
    }

    #[tokio::test]
    async fn revoked_token_is_caught_on_the_next_call() {
        let f = fixture::<TrackLogs>();
        f.book.write(&claim(), track_at("t1", 0)).await.unwrap();

        f.identity.revoke();
        let err = f.book.write(&claim(), track_at("t2", 1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(_)));
        assert_eq!(f.store.insert_log_calls(), 1);
        assert_eq!(f.identity.calls(), 2);
    }

    #[tokio::test]
    async fn pages_are_disjoint_and_newest_first() {
        let f = fixture::<TrackLogs>();
        for (i, id) in ["t0", "t1", "t2", "t3", "t4"].iter().enumerate() {
            f.book.write(&claim(), track_at(id, i as i64)).await.unwrap();
        }

        let first = f
            .book
            .list_with_tags(&claim(), PageRange::new(2, 0))
            .await
            .unwrap();
        let second = f
            .book
            .list_with_tags(&claim(), PageRange::new(2, 2))
            .await
            .unwrap();
        let ids = |page: &Outcome<Vec<TaggedLog<TrackLog>>>| -> Vec<String> {
            page.data.iter().map(|t| t.log.track_id.clone()).collect()
        };
        assert_eq!(ids(&first), vec!["t4", "t3"]);
        assert_eq!(ids(&second), vec!["t2", "t1"]);
    }

    #[tokio::test]
    async fn listing_makes_at_most_two_round_trips() {
        let f = fixture::<TrackLogs>();
        let mine = f.tags.add_custom_tag(FakeIdentityProvider::USER_ID, "Mine");
        for i in 0..5 {
            let mut payload = track_at("t", i);
            payload.preset_tag_ids = vec![1];
            payload.custom_tag_ids = vec![mine];
            f.book.write(&claim(), payload).await.unwrap();
        }

        let page = f
            .book
            .list_with_tags(&claim(), PageRange::new(10, 0))
            .await
            .unwrap();
        assert_eq!(page.data.len(), 5);
        assert_eq!(f.store.fetch_calls(), 1);
        assert_eq!(f.tags.lookup_calls(), 1);
        assert!(page.data.iter().all(|t| t.tags.len() == 2));
    }

    #[tokio::test]
    async fn failed_fetch_surfaces_store_message() {
        let f = fixture::<ArtistLogs>();
        f.store.fail_fetches("no such table: artist_logs");
        let err = f
            .book
            .list_with_tags(&claim(), PageRange::new(10, 0))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::StoreRejected("no such table: artist_logs".to_string())
        );
        assert_eq!(f.tags.lookup_calls(), 0);
    }

    #[tokio::test]
    async fn artist_logs_share_the_degraded_write_path() {
        let f = fixture::<ArtistLogs>();
        f.store.fail_associations("boom");
        let payload = LogPayload {
            log: NewArtistLog {
                artist_id: "a1".to_string(),
                artist_name: "Band".to_string(),
                genre: None,
                genres: Some(vec!["rock".to_string()]),
                liked: true,
                favorite: false,
                notes: None,
                source: "lastfm".to_string(),
                logged_at: None,
            },
            preset_tag_ids: vec![],
            custom_tag_ids: vec![3],
        };
        let outcome = f.book.write(&claim(), payload).await.unwrap();
        assert_eq!(outcome.data.artist_name, "Band");
        assert!(matches!(
            outcome.warnings.as_slice(),
            [Degradation::TagAttachmentFailed { .. }]
        ));
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_went_away() {
        let f = fixture::<TrackLogs>();
        let log = f.book.write(&claim(), track_at("t1", 0)).await.unwrap().data;
        assert!(f.book.delete(&claim(), log.id).await.unwrap());
        assert!(!f.book.delete(&claim(), log.id).await.unwrap());
    }

    #[tokio::test]
    async fn attach_tags_to_unknown_log_is_not_found() {
        let f = fixture::<TrackLogs>();
        let err = f
            .book
            .attach_tags(&claim(), 42, &[1], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(f.store.association_calls(), 0);
    }

    #[tokio::test]
    async fn attach_tags_failure_is_an_error() {
        let f = fixture::<TrackLogs>();
        let log = f.book.write(&claim(), track_at("t1", 0)).await.unwrap().data;
        f.store.fail_associations("constraint failed");
        let err = f
            .book
            .attach_tags(&claim(), log.id, &[], &[5])
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::StoreRejected("constraint failed".to_string()));
    }
}
