//! Schema of the musicboxd database.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const PRESET_TAG_FK: ForeignKey = ForeignKey {
    foreign_table: "preset_tags",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const CUSTOM_TAG_FK: ForeignKey = ForeignKey {
    foreign_table: "custom_tags",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TRACK_LOG_FK: ForeignKey = ForeignKey {
    foreign_table: "track_logs",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ARTIST_LOG_FK: ForeignKey = ForeignKey {
    foreign_table: "artist_logs",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// Exactly one of the two tag references is set on every association row.
pub const ONE_TAG_REFERENCE_CHECK: &str = "(tag_id IS NULL) <> (user_tag_id IS NULL)";

// =============================================================================
// Version 1 - users, tags, track logs
// =============================================================================

const USERS_TABLE_V1: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true), // UUID
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created_at",
            &SqlType::Text,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
    checks: &[],
};

const AUTH_TOKENS_TABLE_V1: Table = Table {
    name: "auth_tokens",
    columns: &[
        sqlite_column!("value", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!(
            "created_at",
            &SqlType::Text,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used_at", &SqlType::Text),
    ],
    indices: &[("idx_auth_tokens_user_id", "user_id")],
    unique_constraints: &[],
    checks: &[],
};

const PRESET_TAGS_TABLE_V1: Table = Table {
    name: "preset_tags",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Text,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[&["category", "name"]],
    checks: &[],
};

const CUSTOM_TAGS_TABLE_V1: Table = Table {
    name: "custom_tags",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "owner_user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!(
            "created_at",
            &SqlType::Text,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_custom_tags_owner", "owner_user_id, name")],
    unique_constraints: &[],
    checks: &[],
};

const TRACK_LOGS_TABLE_V1: Table = Table {
    name: "track_logs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("track_id", &SqlType::Text, non_null = true),
        sqlite_column!("track_name", &SqlType::Text),
        sqlite_column!("artist_name", &SqlType::Text),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("rating", &SqlType::Integer),
        sqlite_column!(
            "liked",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "favorite",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("notes", &SqlType::Text),
        sqlite_column!(
            "logged_at",
            &SqlType::Text,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_track_logs_user_logged_at", "user_id, logged_at DESC")],
    unique_constraints: &[],
    checks: &["rating IS NULL OR rating BETWEEN 1 AND 5"],
};

const TRACK_LOG_TAGS_TABLE_V1: Table = Table {
    name: "track_log_tags",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "log_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TRACK_LOG_FK)
        ),
        sqlite_column!("tag_id", &SqlType::Integer, foreign_key = Some(&PRESET_TAG_FK)),
        sqlite_column!(
            "user_tag_id",
            &SqlType::Integer,
            foreign_key = Some(&CUSTOM_TAG_FK)
        ),
    ],
    indices: &[("idx_track_log_tags_log_id", "log_id")],
    unique_constraints: &[],
    checks: &[ONE_TAG_REFERENCE_CHECK],
};

// =============================================================================
// Version 2 - artist logs
// =============================================================================

const ARTIST_LOGS_TABLE_V2: Table = Table {
    name: "artist_logs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("artist_id", &SqlType::Text, non_null = true),
        sqlite_column!("artist_name", &SqlType::Text, non_null = true),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("genres", &SqlType::Text), // JSON array
        sqlite_column!(
            "liked",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "favorite",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("notes", &SqlType::Text),
        sqlite_column!(
            "source",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'lastfm'")
        ),
        sqlite_column!(
            "logged_at",
            &SqlType::Text,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_artist_logs_user_logged_at", "user_id, logged_at DESC")],
    unique_constraints: &[],
    checks: &[],
};

const ARTIST_LOG_TAGS_TABLE_V2: Table = Table {
    name: "artist_log_tags",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "log_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_LOG_FK)
        ),
        sqlite_column!("tag_id", &SqlType::Integer, foreign_key = Some(&PRESET_TAG_FK)),
        sqlite_column!(
            "user_tag_id",
            &SqlType::Integer,
            foreign_key = Some(&CUSTOM_TAG_FK)
        ),
    ],
    indices: &[("idx_artist_log_tags_log_id", "log_id")],
    unique_constraints: &[],
    checks: &[ONE_TAG_REFERENCE_CHECK],
};

fn migrate_v1_to_v2(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    ARTIST_LOGS_TABLE_V2.create(conn)?;
    ARTIST_LOG_TAGS_TABLE_V2.create(conn)?;
    Ok(())
}

// =============================================================================
// Versioned Schema Definition
// =============================================================================

pub const MUSICBOXD_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[
            USERS_TABLE_V1,
            AUTH_TOKENS_TABLE_V1,
            PRESET_TAGS_TABLE_V1,
            CUSTOM_TAGS_TABLE_V1,
            TRACK_LOGS_TABLE_V1,
            TRACK_LOG_TAGS_TABLE_V1,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[
            USERS_TABLE_V1,
            AUTH_TOKENS_TABLE_V1,
            PRESET_TAGS_TABLE_V1,
            CUSTOM_TAGS_TABLE_V1,
            TRACK_LOGS_TABLE_V1,
            TRACK_LOG_TAGS_TABLE_V1,
            ARTIST_LOGS_TABLE_V2,
            ARTIST_LOG_TAGS_TABLE_V2,
        ],
        migration: Some(migrate_v1_to_v2),
    },
];
