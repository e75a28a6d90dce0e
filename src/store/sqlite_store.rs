use super::log_rows::SqliteLogFamily;
use super::schema::MUSICBOXD_VERSIONED_SCHEMAS;
use crate::identity::{AuthToken, AuthTokenValue, Identity, IdentityProvider, OwnerClaim, UserStore};
use crate::logs::{AssociatedTag, LogStore, LogWithAssociations, PageRange};
use crate::sqlite_persistence::open_versioned_db;
use crate::tags::{CustomTag, PresetTag, ResolvedTag, TagRef, TagStore};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub(super) fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(super) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Single-file store backing users, both tag catalogs and both log families.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path, MUSICBOXD_VERSIONED_SCHEMAS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    /// Adds a preset tag, or returns the existing one with the same
    /// category and name.
    pub fn add_preset_tag(&self, category: &str, name: &str) -> Result<PresetTag> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO preset_tags (category, name) VALUES (?1, ?2)",
            params![category, name],
        )?;
        if inserted > 0 {
            info!("Added preset tag {}/{}", category, name);
        }
        let tag = conn.query_row(
            "SELECT id, name, category, created_at FROM preset_tags WHERE category = ?1 AND name = ?2",
            params![category, name],
            row_to_preset_tag,
        )?;
        Ok(tag)
    }

    fn user_by_token(conn: &Connection, token: &AuthTokenValue) -> Result<Option<Identity>> {
        let identity = conn
            .query_row(
                "SELECT u.id, u.email FROM auth_tokens t JOIN users u ON u.id = t.user_id WHERE t.value = ?1",
                params![token.as_str()],
                |row| {
                    Ok(Identity {
                        id: row.get(0)?,
                        email: row.get(1)?,
                    })
                },
            )
            .optional()?;
        if identity.is_some() {
            conn.execute(
                "UPDATE auth_tokens SET last_used_at = ?1 WHERE value = ?2",
                params![format_timestamp(&Utc::now()), token.as_str()],
            )?;
        }
        Ok(identity)
    }
}

fn row_to_preset_tag(row: &rusqlite::Row) -> rusqlite::Result<PresetTag> {
    let created_at: String = row.get(3)?;
    Ok(PresetTag {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        created_at: parse_timestamp(&created_at).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, err.into())
        })?,
    })
}

fn row_to_identity(row: &rusqlite::Row) -> rusqlite::Result<Identity> {
    Ok(Identity {
        id: row.get(0)?,
        email: row.get(1)?,
    })
}

#[async_trait]
impl TagStore for SqliteStore {
    async fn list_preset_tags(&self) -> Result<Vec<PresetTag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, category, created_at FROM preset_tags ORDER BY category, name, id",
        )?;
        let tags = stmt
            .query_map([], row_to_preset_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    async fn list_custom_tags(&self, owner_id: &str) -> Result<Vec<CustomTag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, owner_user_id FROM custom_tags WHERE owner_user_id = ?1 ORDER BY name, id",
        )?;
        let tags = stmt
            .query_map(params![owner_id], |row| {
                Ok(CustomTag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    owner_user_id: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    async fn insert_custom_tag(&self, owner_id: &str, name: &str) -> Result<CustomTag> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO custom_tags (name, owner_user_id) VALUES (?1, ?2)",
            params![name, owner_id],
        )?;
        Ok(CustomTag {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            owner_user_id: owner_id.to_string(),
        })
    }

    async fn lookup_custom_tags(&self, owner_id: &str, ids: &[i64]) -> Result<Vec<ResolvedTag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, name FROM custom_tags WHERE owner_user_id = ? AND id IN ({})",
            placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let bindings: Vec<rusqlite::types::Value> = std::iter::once(owner_id.to_string().into())
            .chain(ids.iter().map(|id| (*id).into()))
            .collect();
        let tags = stmt
            .query_map(params_from_iter(bindings), |row| {
                Ok(ResolvedTag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }
}

/// SQLite takes a negative LIMIT as unbounded and a negative OFFSET as 0,
/// so sizes past `i64::MAX` saturate instead of wrapping.
fn sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl<F: SqliteLogFamily> LogStore<F> for SqliteStore {
    async fn fetch_page(
        &self,
        owner_id: &str,
        range: PageRange,
    ) -> Result<Vec<LogWithAssociations<F::Log>>> {
        let columns = F::COLUMNS
            .iter()
            .map(|c| format!("l.{}", c))
            .collect::<Vec<_>>()
            .join(", ");
        // One page of logs with their association rows and preset names
        // embedded; rows of a log are adjacent and in insertion order.
        let sql = format!(
            "SELECT {columns}, a.tag_id AS assoc_tag_id, p.name AS assoc_preset_name,
                    a.user_tag_id AS assoc_user_tag_id
             FROM (SELECT * FROM {logs} WHERE user_id = ?1
                   ORDER BY logged_at DESC, id DESC LIMIT ?2 OFFSET ?3) l
             LEFT JOIN {assoc} a ON a.log_id = l.id
             LEFT JOIN preset_tags p ON p.id = a.tag_id
             ORDER BY l.logged_at DESC, l.id DESC, a.id",
            columns = columns,
            logs = F::LOG_TABLE,
            assoc = F::ASSOCIATION_TABLE,
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![
            owner_id,
            sql_count(range.limit),
            sql_count(range.offset)
        ])?;

        let mut page: Vec<LogWithAssociations<F::Log>> = Vec::new();
        while let Some(row) = rows.next()? {
            let log_id: i64 = row.get("id")?;
            let is_new_log = page.last().map(|entry| F::log_id(&entry.log)) != Some(log_id);
            if is_new_log {
                page.push(LogWithAssociations {
                    log: F::from_row(row)?,
                    associations: Vec::new(),
                });
            }
            let tag_id: Option<i64> = row.get("assoc_tag_id")?;
            let preset_name: Option<String> = row.get("assoc_preset_name")?;
            let user_tag_id: Option<i64> = row.get("assoc_user_tag_id")?;
            let association = match (tag_id, preset_name, user_tag_id) {
                (Some(id), Some(name), None) => AssociatedTag::Preset(ResolvedTag { id, name }),
                (None, _, Some(id)) => AssociatedTag::Custom(id),
                (None, None, None) => continue,
                other => {
                    warn!("Skipping malformed {} row: {:?}", F::ASSOCIATION_TABLE, other);
                    continue;
                }
            };
            if let Some(entry) = page.last_mut() {
                entry.associations.push(association);
            }
        }
        Ok(page)
    }

    async fn insert_log(&self, owner_id: &str, new_log: &F::NewLog) -> Result<F::Log> {
        let conn = self.conn()?;
        let id = F::insert(&conn, owner_id, new_log)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            F::COLUMNS.join(", "),
            F::LOG_TABLE
        );
        let log = conn.query_row(&sql, params![id], |row| F::from_row(row))?;
        Ok(log)
    }

    async fn insert_associations(
        &self,
        owner_id: &str,
        log_id: i64,
        tags: &[TagRef],
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let owned: bool = tx.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1 AND user_id = ?2)",
                F::LOG_TABLE
            ),
            params![log_id, owner_id],
            |row| row.get(0),
        )?;
        if !owned {
            bail!("{} log {} not found", F::NAME, log_id);
        }

        let preset_sql = format!(
            "INSERT INTO {} (log_id, tag_id) VALUES (?1, ?2)",
            F::ASSOCIATION_TABLE
        );
        // Only the owner's custom tags can be attached.
        let custom_sql = format!(
            "INSERT INTO {} (log_id, user_tag_id)
             SELECT ?1, id FROM custom_tags WHERE id = ?2 AND owner_user_id = ?3",
            F::ASSOCIATION_TABLE
        );
        for tag in tags {
            match tag {
                TagRef::Preset(id) => {
                    tx.execute(&preset_sql, params![log_id, id])
                        .with_context(|| format!("Failed to attach preset tag {}", id))?;
                }
                TagRef::Custom(id) => {
                    let inserted = tx.execute(&custom_sql, params![log_id, id, owner_id])?;
                    if inserted == 0 {
                        bail!("Custom tag {} not found", id);
                    }
                }
            }
        }
        tx.commit()?;
        debug!("Attached {} tags to {} log {}", tags.len(), F::NAME, log_id);
        Ok(())
    }

    async fn delete_log(&self, owner_id: &str, log_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1 AND user_id = ?2", F::LOG_TABLE),
            params![log_id, owner_id],
        )?;
        Ok(deleted > 0)
    }

    async fn owns_log(&self, owner_id: &str, log_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let owned = conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1 AND user_id = ?2)",
                F::LOG_TABLE
            ),
            params![log_id, owner_id],
            |row| row.get(0),
        )?;
        Ok(owned)
    }
}

#[async_trait]
impl IdentityProvider for SqliteStore {
    async fn current_user(&self, claim: &OwnerClaim) -> Result<Option<Identity>> {
        let Some(token) = claim.token() else {
            return Ok(None);
        };
        let conn = self.conn()?;
        Self::user_by_token(&conn, token)
    }
}

impl UserStore for SqliteStore {
    fn create_user(&self, email: &str) -> Result<Identity> {
        let conn = self.conn()?;
        let identity = Identity {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.trim().to_string(),
        };
        conn.execute(
            "INSERT INTO users (id, email) VALUES (?1, ?2)",
            params![identity.id, identity.email],
        )
        .with_context(|| format!("Failed to create user {}", identity.email))?;
        info!("Created user {} ({})", identity.id, identity.email);
        Ok(identity)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let conn = self.conn()?;
        let identity = conn
            .query_row(
                "SELECT id, email FROM users WHERE email = ?1",
                params![email.trim()],
                row_to_identity,
            )
            .optional()?;
        Ok(identity)
    }

    fn list_users(&self) -> Result<Vec<Identity>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, email FROM users ORDER BY email")?;
        let users = stmt
            .query_map([], row_to_identity)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    fn issue_auth_token(&self, user_id: &str) -> Result<AuthToken> {
        let conn = self.conn()?;
        let token = AuthToken {
            user_id: user_id.to_string(),
            value: AuthTokenValue::generate(),
            created: Utc::now(),
            last_used: None,
        };
        conn.execute(
            "INSERT INTO auth_tokens (value, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![
                token.value.as_str(),
                token.user_id,
                format_timestamp(&token.created)
            ],
        )
        .with_context(|| format!("Failed to issue token for user {}", user_id))?;
        Ok(token)
    }

    fn revoke_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn()?;
        let existing = conn
            .query_row(
                "SELECT user_id, created_at, last_used_at FROM auth_tokens WHERE value = ?1",
                params![token.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((user_id, created, last_used)) = existing else {
            return Ok(None);
        };
        conn.execute(
            "DELETE FROM auth_tokens WHERE value = ?1",
            params![token.as_str()],
        )?;
        Ok(Some(AuthToken {
            user_id,
            value: token.clone(),
            created: parse_timestamp(&created)?,
            last_used: last_used.as_deref().map(parse_timestamp).transpose()?,
        }))
    }
}
