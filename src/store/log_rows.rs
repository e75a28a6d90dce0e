//! Row mapping for each log family.

use super::sqlite_store::{format_timestamp, parse_timestamp};
use crate::logs::{ArtistLog, ArtistLogs, LogFamily, NewArtistLog, NewTrackLog, TrackLog, TrackLogs};
use chrono::Utc;
use rusqlite::{params, types::Type, Connection, Row};

/// What the SQLite store needs to know about a family beyond its table names.
pub trait SqliteLogFamily: LogFamily {
    /// Columns of the log table, in declaration order.
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row) -> rusqlite::Result<Self::Log>;

    /// Inserts the row and returns its id.
    fn insert(conn: &Connection, owner_id: &str, new_log: &Self::NewLog) -> rusqlite::Result<i64>;
}

fn logged_at(row: &Row) -> rusqlite::Result<chrono::DateTime<Utc>> {
    let raw: String = row.get("logged_at")?;
    parse_timestamp(&raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Text, err.into())
    })
}

impl SqliteLogFamily for TrackLogs {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "track_id",
        "track_name",
        "artist_name",
        "genre",
        "rating",
        "liked",
        "favorite",
        "notes",
        "logged_at",
    ];

    fn from_row(row: &Row) -> rusqlite::Result<TrackLog> {
        Ok(TrackLog {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            track_id: row.get("track_id")?,
            track_name: row.get("track_name")?,
            artist_name: row.get("artist_name")?,
            genre: row.get("genre")?,
            rating: row.get("rating")?,
            liked: row.get("liked")?,
            favorite: row.get("favorite")?,
            notes: row.get("notes")?,
            logged_at: logged_at(row)?,
        })
    }

    fn insert(conn: &Connection, owner_id: &str, new_log: &NewTrackLog) -> rusqlite::Result<i64> {
        let logged_at = format_timestamp(&new_log.logged_at.unwrap_or_else(Utc::now));
        conn.execute(
            "INSERT INTO track_logs
                (user_id, track_id, track_name, artist_name, genre, rating, liked, favorite, notes, logged_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                owner_id,
                new_log.track_id,
                new_log.track_name,
                new_log.artist_name,
                new_log.genre,
                new_log.rating,
                new_log.liked,
                new_log.favorite,
                new_log.notes,
                logged_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl SqliteLogFamily for ArtistLogs {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "artist_id",
        "artist_name",
        "genre",
        "genres",
        "liked",
        "favorite",
        "notes",
        "source",
        "logged_at",
    ];

    fn from_row(row: &Row) -> rusqlite::Result<ArtistLog> {
        let genres: Option<String> = row.get("genres")?;
        let genres = genres
            .map(|raw| serde_json::from_str::<Vec<String>>(&raw))
            .transpose()
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, err.into()))?;
        Ok(ArtistLog {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            artist_id: row.get("artist_id")?,
            artist_name: row.get("artist_name")?,
            genre: row.get("genre")?,
            genres,
            liked: row.get("liked")?,
            favorite: row.get("favorite")?,
            notes: row.get("notes")?,
            source: row.get("source")?,
            logged_at: logged_at(row)?,
        })
    }

    fn insert(conn: &Connection, owner_id: &str, new_log: &NewArtistLog) -> rusqlite::Result<i64> {
        let logged_at = format_timestamp(&new_log.logged_at.unwrap_or_else(Utc::now));
        let genres = new_log
            .genres
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| rusqlite::Error::ToSqlConversionFailure(err.into()))?;
        conn.execute(
            "INSERT INTO artist_logs
                (user_id, artist_id, artist_name, genre, genres, liked, favorite, notes, source, logged_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                owner_id,
                new_log.artist_id,
                new_log.artist_name,
                new_log.genre,
                genres,
                new_log.liked,
                new_log.favorite,
                new_log.notes,
                new_log.source,
                logged_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
