//! In-memory collaborators with call counters for unit tests.

use crate::identity::{Identity, IdentityProvider, OwnerClaim};
use crate::logs::{
    ArtistLog, ArtistLogs, AssociatedTag, LogFamily, LogStore, LogWithAssociations, NewArtistLog,
    NewTrackLog, PageRange, TrackLog, TrackLogs,
};
use crate::tags::{CustomTag, PresetTag, ResolvedTag, TagRef, TagStore};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub const TEST_TOKEN: &str = "test-token";

pub struct FakeIdentityProvider {
    revoked: AtomicBool,
    calls: AtomicUsize,
}

impl FakeIdentityProvider {
    pub const USER_ID: &'static str = "user-1";

    pub fn signed_in() -> Self {
        Self {
            revoked: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn identity() -> Identity {
        Identity {
            id: Self::USER_ID.to_string(),
            email: "listener@example.com".to_string(),
        }
    }

    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn current_user(&self, claim: &OwnerClaim) -> Result<Option<Identity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let valid = claim.token().map(|t| t.as_str()) == Some(TEST_TOKEN)
            && !self.revoked.load(Ordering::SeqCst);
        Ok(valid.then(Self::identity))
    }
}

#[derive(Default)]
struct TagState {
    custom: Vec<CustomTag>,
    next_id: i64,
    lookup_error: Option<String>,
    preset_error: Option<String>,
    looked_up: Vec<Vec<i64>>,
}

#[derive(Default)]
pub struct FakeTagStore {
    state: Mutex<TagState>,
    inserts: AtomicUsize,
}

impl FakeTagStore {
    pub fn add_custom_tag(&self, owner_id: &str, name: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id + 100;
        state.custom.push(CustomTag {
            id,
            name: name.to_string(),
            owner_user_id: owner_id.to_string(),
        });
        id
    }

    pub fn remove_custom_tag(&self, id: i64) {
        self.state.lock().unwrap().custom.retain(|t| t.id != id);
    }

    pub fn fail_lookups(&self, message: &str) {
        self.state.lock().unwrap().lookup_error = Some(message.to_string());
    }

    pub fn fail_preset_listing(&self, message: &str) {
        self.state.lock().unwrap().preset_error = Some(message.to_string());
    }

    pub fn lookup_calls(&self) -> usize {
        self.state.lock().unwrap().looked_up.len()
    }

    pub fn looked_up_ids(&self) -> Vec<Vec<i64>> {
        self.state.lock().unwrap().looked_up.clone()
    }

    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TagStore for FakeTagStore {
    async fn list_preset_tags(&self) -> Result<Vec<PresetTag>> {
        match &self.state.lock().unwrap().preset_error {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(Vec::new()),
        }
    }

    async fn list_custom_tags(&self, owner_id: &str) -> Result<Vec<CustomTag>> {
        let state = self.state.lock().unwrap();
        let mut tags: Vec<CustomTag> = state
            .custom
            .iter()
            .filter(|t| t.owner_user_id == owner_id)
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn insert_custom_tag(&self, owner_id: &str, name: &str) -> Result<CustomTag> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let id = self.add_custom_tag(owner_id, name);
        Ok(CustomTag {
            id,
            name: name.to_string(),
            owner_user_id: owner_id.to_string(),
        })
    }

    async fn lookup_custom_tags(&self, owner_id: &str, ids: &[i64]) -> Result<Vec<ResolvedTag>> {
        let mut state = self.state.lock().unwrap();
        state.looked_up.push(ids.to_vec());
        if let Some(message) = &state.lookup_error {
            return Err(anyhow!("{}", message));
        }
        Ok(state
            .custom
            .iter()
            .filter(|t| t.owner_user_id == owner_id && ids.contains(&t.id))
            .cloned()
            .map(ResolvedTag::from)
            .collect())
    }
}

/// Builds stored rows for a family so one fake store serves both.
pub trait FakeRows: LogFamily {
    fn materialize(id: i64, owner_id: &str, new_log: &Self::NewLog) -> Self::Log;
    fn logged_at(log: &Self::Log) -> DateTime<Utc>;
}

impl FakeRows for TrackLogs {
    fn materialize(id: i64, owner_id: &str, new_log: &NewTrackLog) -> TrackLog {
        TrackLog {
            id,
            user_id: owner_id.to_string(),
            track_id: new_log.track_id.clone(),
            track_name: new_log.track_name.clone(),
            artist_name: new_log.artist_name.clone(),
            genre: new_log.genre.clone(),
            rating: new_log.rating,
            liked: new_log.liked,
            favorite: new_log.favorite,
            notes: new_log.notes.clone(),
            logged_at: new_log.logged_at.unwrap_or_else(Utc::now),
        }
    }

    fn logged_at(log: &TrackLog) -> DateTime<Utc> {
        log.logged_at
    }
}

impl FakeRows for ArtistLogs {
    fn materialize(id: i64, owner_id: &str, new_log: &NewArtistLog) -> ArtistLog {
        ArtistLog {
            id,
            user_id: owner_id.to_string(),
            artist_id: new_log.artist_id.clone(),
            artist_name: new_log.artist_name.clone(),
            genre: new_log.genre.clone(),
            genres: new_log.genres.clone(),
            liked: new_log.liked,
            favorite: new_log.favorite,
            notes: new_log.notes.clone(),
            source: new_log.source.clone(),
            logged_at: new_log.logged_at.unwrap_or_else(Utc::now),
        }
    }

    fn logged_at(log: &ArtistLog) -> DateTime<Utc> {
        log.logged_at
    }
}

struct LogState<F: LogFamily> {
    rows: Vec<(String, F::Log)>,
    associations: HashMap<i64, Vec<TagRef>>,
    next_id: i64,
    insert_error: Option<String>,
    association_error: Option<String>,
    fetch_error: Option<String>,
}

pub struct FakeLogStore<F: LogFamily> {
    state: Mutex<LogState<F>>,
    inserts: AtomicUsize,
    association_inserts: AtomicUsize,
    deletes: AtomicUsize,
    fetches: AtomicUsize,
}

impl<F: LogFamily> Default for FakeLogStore<F> {
    fn default() -> Self {
        Self {
            state: Mutex::new(LogState {
                rows: Vec::new(),
                associations: HashMap::new(),
                next_id: 0,
                insert_error: None,
                association_error: None,
                fetch_error: None,
            }),
            inserts: AtomicUsize::new(0),
            association_inserts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }
}

impl<F: LogFamily> FakeLogStore<F> {
    pub fn fail_inserts(&self, message: &str) {
        self.state.lock().unwrap().insert_error = Some(message.to_string());
    }

    pub fn fail_associations(&self, message: &str) {
        self.state.lock().unwrap().association_error = Some(message.to_string());
    }

    pub fn fail_fetches(&self, message: &str) {
        self.state.lock().unwrap().fetch_error = Some(message.to_string());
    }

    pub fn associations_for(&self, log_id: i64) -> Vec<TagRef> {
        self.state
            .lock()
            .unwrap()
            .associations
            .get(&log_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }

    pub fn insert_log_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn association_calls(&self) -> usize {
        self.association_inserts.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F: FakeRows> LogStore<F> for FakeLogStore<F> {
    async fn fetch_page(
        &self,
        owner_id: &str,
        range: PageRange,
    ) -> Result<Vec<LogWithAssociations<F::Log>>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.fetch_error {
            return Err(anyhow!("{}", message));
        }
        let mut owned: Vec<&F::Log> = state
            .rows
            .iter()
            .filter(|(owner, _)| owner == owner_id)
            .map(|(_, log)| log)
            .collect();
        owned.sort_by(|a, b| {
            F::logged_at(b)
                .cmp(&F::logged_at(a))
                .then(F::log_id(b).cmp(&F::log_id(a)))
        });
        Ok(owned
            .into_iter()
            .skip(range.offset)
            .take(range.limit)
            .map(|log| LogWithAssociations {
                log: log.clone(),
                associations: state
                    .associations
                    .get(&F::log_id(log))
                    .map(|tags| {
                        tags.iter()
                            .map(|tag| match tag {
                                TagRef::Preset(id) => AssociatedTag::Preset(ResolvedTag {
                                    id: *id,
                                    name: format!("preset-{}", id),
                                }),
                                TagRef::Custom(id) => AssociatedTag::Custom(*id),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn insert_log(&self, owner_id: &str, new_log: &F::NewLog) -> Result<F::Log> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.insert_error {
            return Err(anyhow!("{}", message));
        }
        state.next_id += 1;
        let log = F::materialize(state.next_id, owner_id, new_log);
        state.rows.push((owner_id.to_string(), log.clone()));
        Ok(log)
    }

    async fn insert_associations(
        &self,
        _owner_id: &str,
        log_id: i64,
        tags: &[TagRef],
    ) -> Result<()> {
        self.association_inserts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.association_error {
            return Err(anyhow!("{}", message));
        }
        state
            .associations
            .entry(log_id)
            .or_default()
            .extend_from_slice(tags);
        Ok(())
    }

    async fn delete_log(&self, owner_id: &str, log_id: i64) -> Result<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let before = state.rows.len();
        state
            .rows
            .retain(|(owner, log)| !(owner == owner_id && F::log_id(log) == log_id));
        let deleted = state.rows.len() != before;
        if deleted {
            state.associations.remove(&log_id);
        }
        Ok(deleted)
    }

    async fn owns_log(&self, owner_id: &str, log_id: i64) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .rows
            .iter()
            .any(|(owner, log)| owner == owner_id && F::log_id(log) == log_id))
    }
}
