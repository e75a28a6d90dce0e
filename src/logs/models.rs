use crate::tags::ResolvedTag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One listen of one track by one user. Logging the same track again
/// creates another row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackLog {
    pub id: i64,
    pub user_id: String,
    pub track_id: String,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<u8>,
    pub liked: bool,
    pub favorite: bool,
    pub notes: Option<String>,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTrackLog {
    pub track_id: String,
    #[serde(default, alias = "track")]
    pub track_name: Option<String>,
    #[serde(default, alias = "artist")]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub notes: Option<String>,
    /// Server time is used when absent.
    #[serde(default)]
    pub logged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistLog {
    pub id: i64,
    pub user_id: String,
    pub artist_id: String,
    pub artist_name: String,
    pub genre: Option<String>,
    pub genres: Option<Vec<String>>,
    pub liked: bool,
    pub favorite: bool,
    pub notes: Option<String>,
    pub source: String,
    pub logged_at: DateTime<Utc>,
}

pub const DEFAULT_ARTIST_SOURCE: &str = "lastfm";

fn default_artist_source() -> String {
    DEFAULT_ARTIST_SOURCE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArtistLog {
    pub artist_id: String,
    pub artist_name: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_artist_source")]
    pub source: String,
    #[serde(default)]
    pub logged_at: Option<DateTime<Utc>>,
}

/// What a caller submits to create a log: the row itself plus the initial
/// tags, kept as two lists because they land in different columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPayload<N> {
    #[serde(flatten)]
    pub log: N,
    #[serde(default, alias = "tagIds")]
    pub preset_tag_ids: Vec<i64>,
    #[serde(default, alias = "customTagIds")]
    pub custom_tag_ids: Vec<i64>,
}

impl<N> LogPayload<N> {
    pub fn untagged(log: N) -> Self {
        LogPayload {
            log,
            preset_tag_ids: Vec::new(),
            custom_tag_ids: Vec::new(),
        }
    }
}

/// An association row as returned together with its log. Preset names come
/// embedded from the same query; custom tags are still bare ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssociatedTag {
    Preset(ResolvedTag),
    Custom(i64),
}

/// A log row and its association rows, in the order the store returned them.
#[derive(Debug, Clone, PartialEq)]
pub struct LogWithAssociations<L> {
    pub log: L,
    pub associations: Vec<AssociatedTag>,
}

/// A log row with every resolvable tag attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedLog<L> {
    #[serde(flatten)]
    pub log: L,
    pub tags: Vec<ResolvedTag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub limit: usize,
    pub offset: usize,
}

impl PageRange {
    pub fn new(limit: usize, offset: usize) -> Self {
        PageRange { limit, offset }
    }
}
