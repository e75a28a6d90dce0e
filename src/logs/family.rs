use super::models::{ArtistLog, NewArtistLog, NewTrackLog, TrackLog};
use serde::Serialize;
use std::fmt::Debug;

/// One of the parallel kinds of log that share the same tagging shape.
/// Everything that differs between them is described here; the read and
/// write paths are written once against this trait.
pub trait LogFamily: Send + Sync + 'static {
    type Log: Clone + Debug + Serialize + Send + Sync + 'static;
    type NewLog: Debug + Send + Sync + 'static;

    /// Short name used in messages and metric labels.
    const NAME: &'static str;
    const LOG_TABLE: &'static str;
    const ASSOCIATION_TABLE: &'static str;

    fn log_id(log: &Self::Log) -> i64;

    /// Rejects payloads the store would refuse anyway, with a readable message.
    fn validate(new_log: &Self::NewLog) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy)]
pub struct TrackLogs;

impl LogFamily for TrackLogs {
    type Log = TrackLog;
    type NewLog = NewTrackLog;

    const NAME: &'static str = "track";
    const LOG_TABLE: &'static str = "track_logs";
    const ASSOCIATION_TABLE: &'static str = "track_log_tags";

    fn log_id(log: &TrackLog) -> i64 {
        log.id
    }

    fn validate(new_log: &NewTrackLog) -> Result<(), String> {
        if new_log.track_id.trim().is_empty() {
            return Err("track_id must not be empty".to_string());
        }
        match new_log.rating {
            Some(rating) if !(1..=5).contains(&rating) => {
                Err(format!("rating must be between 1 and 5, got {}", rating))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArtistLogs;

impl LogFamily for ArtistLogs {
    type Log = ArtistLog;
    type NewLog = NewArtistLog;

    const NAME: &'static str = "artist";
    const LOG_TABLE: &'static str = "artist_logs";
    const ASSOCIATION_TABLE: &'static str = "artist_log_tags";

    fn log_id(log: &ArtistLog) -> i64 {
        log.id
    }

    fn validate(new_log: &NewArtistLog) -> Result<(), String> {
        if new_log.artist_id.trim().is_empty() {
            return Err("artist_id must not be empty".to_string());
        }
        if new_log.artist_name.trim().is_empty() {
            return Err("artist_name must not be empty".to_string());
        }
        Ok(())
    }
}
