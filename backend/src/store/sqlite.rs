//! SQLite-backed member store.
//!
//! Owns the profiles table plus the three append-only ledgers (api_usage,
//! admin_logs, download_logs). All timestamps are stored as RFC3339 text
//! in UTC so range filters can compare lexicographically.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::models::{
    AuditEntry, DownloadLog, Profile, ProfileStats, ProfileUpdate, RecentSignup, Tier,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

/// Ordering columns accepted by [`MemberStore::list_profiles`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Email,
    Name,
    Role,
    LastLogin,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created_at" => Some(SortField::CreatedAt),
            "email" => Some(SortField::Email),
            "name" => Some(SortField::Name),
            "role" => Some(SortField::Role),
            "last_login" => Some(SortField::LastLogin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Email => "email",
            SortField::Name => "name",
            SortField::Role => "role",
            SortField::LastLogin => "last_login",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Filter, sort and pagination parameters for the member listing.
#[derive(Debug, Clone)]
pub struct ProfileQuery {
    pub search: Option<String>,
    pub role: Option<Tier>,
    pub sort: SortField,
    pub order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl Default for ProfileQuery {
    fn default() -> Self {
        Self {
            search: None,
            role: None,
            sort: SortField::CreatedAt,
            order: SortOrder::Desc,
            page: 1,
            limit: 50,
        }
    }
}

const PROFILE_COLUMNS: &str =
    "id, email, name, role, is_approved, newsletter_opt_in, created_at, updated_at, last_login";

/// SQLite-backed store for profiles and activity ledgers.
pub struct MemberStore {
    conn: Mutex<Connection>,
}

impl MemberStore {
    /// Create a new store, creating the database file and schema if needed.
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        // Extract path from URL like "sqlite:./data/members.db" or use as-is
        let db_path = database_url
            .strip_prefix("sqlite:")
            .unwrap_or(database_url);

        // Create parent directory if needed
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(db_path).map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                name TEXT,
                role TEXT NOT NULL DEFAULT 'free',
                is_approved INTEGER NOT NULL DEFAULT 1,
                newsletter_opt_in INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_login TEXT
            )",
            [],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS api_usage (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                endpoint TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES profiles(id)
            )",
            [],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS admin_logs (
                id TEXT PRIMARY KEY,
                admin_id TEXT NOT NULL,
                action TEXT NOT NULL,
                target_user_id TEXT,
                details TEXT NOT NULL DEFAULT '{}',
                ip_address TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS download_logs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_type TEXT,
                ip_address TEXT,
                user_agent TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        // Create indexes
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_profiles_created_at ON profiles(created_at)",
            [],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_api_usage_window
             ON api_usage(user_id, endpoint, created_at)",
            [],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_admin_logs_created_at ON admin_logs(created_at)",
            [],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_download_logs_created_at
             ON download_logs(created_at)",
            [],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        tracing::info!("Member store initialized at {}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "INSERT INTO profiles (id, email, name, role, is_approved, newsletter_opt_in,
                                   created_at, updated_at, last_login)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                profile.id,
                profile.email,
                profile.name,
                profile.role.as_str(),
                profile.is_approved as i64,
                profile.newsletter_opt_in as i64,
                profile.created_at.to_rfc3339(),
                profile.updated_at.to_rfc3339(),
                profile.last_login.map(|t| t.to_rfc3339()),
            ],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        get_profile_locked(&conn, user_id)
    }

    /// Look up a profile by email. The email column collates without case,
    /// so `User@Example.com` and `user@example.com` are the same account.
    pub fn get_profile_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.query_row(
            &format!("SELECT {} FROM profiles WHERE email = ?1", PROFILE_COLUMNS),
            params![email],
            profile_from_row,
        )
        .optional()
        .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    /// Record a successful login.
    pub fn touch_last_login(&self, user_id: &str) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE profiles SET last_login = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, user_id],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Apply a partial update and return the new row, or `None` when the
    /// user does not exist. An empty update still bumps `updated_at`.
    pub fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(role) = update.role {
            sets.push("role = ?");
            values.push(Value::from(role.as_str().to_string()));
        }
        if let Some(approved) = update.is_approved {
            sets.push("is_approved = ?");
            values.push(Value::from(approved as i64));
        }
        if let Some(flag) = update.newsletter_opt_in {
            sets.push("newsletter_opt_in = ?");
            values.push(Value::from(flag as i64));
        }
        sets.push("updated_at = ?");
        values.push(Value::from(Utc::now().to_rfc3339()));
        values.push(Value::from(user_id.to_string()));

        let sql = format!("UPDATE profiles SET {} WHERE id = ?", sets.join(", "));
        let affected = conn
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        if affected == 0 {
            return Ok(None);
        }
        get_profile_locked(&conn, user_id)
    }

    /// Delete a profile along with its usage and download history. Admin
    /// log entries referencing the user are kept.
    pub fn delete_profile(&self, user_id: &str) -> Result<bool, StoreError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        tx.execute("DELETE FROM api_usage WHERE user_id = ?1", params![user_id])
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        tx.execute(
            "DELETE FROM download_logs WHERE user_id = ?1",
            params![user_id],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        let deleted = tx
            .execute("DELETE FROM profiles WHERE id = ?1", params![user_id])
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        tx.commit()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(deleted > 0)
    }

    /// Filtered, sorted, paginated member listing plus the total count of
    /// rows matching the filter.
    pub fn list_profiles(&self, query: &ProfileQuery) -> Result<(Vec<Profile>, u64), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            clauses.push("(name LIKE ? OR email LIKE ?)");
            values.push(Value::from(pattern.clone()));
            values.push(Value::from(pattern));
        }
        if let Some(role) = query.role {
            clauses.push("role = ?");
            values.push(Value::from(role.as_str().to_string()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM profiles{}", where_sql),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let page = query.page.max(1);
        let limit = query.limit.max(1);
        let offset = (page as i64 - 1) * limit as i64;
        values.push(Value::from(limit as i64));
        values.push(Value::from(offset));

        let sql = format!(
            "SELECT {} FROM profiles{} ORDER BY {} {} LIMIT ? OFFSET ?",
            PROFILE_COLUMNS,
            where_sql,
            query.sort.as_str(),
            query.order.as_str(),
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        let profiles = stmt
            .query_map(params_from_iter(values.iter()), profile_from_row)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok((profiles, total as u64))
    }

    /// Append one usage ledger row.
    pub fn insert_usage(
        &self,
        user_id: &str,
        endpoint: &str,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "INSERT INTO api_usage (id, user_id, endpoint, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uuid::Uuid::new_v4().to_string(),
                user_id,
                endpoint,
                metadata.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Count usage rows for one user and endpoint since `since`.
    pub fn count_usage_since(
        &self,
        user_id: &str,
        endpoint: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM api_usage
                 WHERE user_id = ?1 AND endpoint = ?2 AND created_at >= ?3",
                params![user_id, endpoint, since.to_rfc3339()],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(count as u64)
    }

    pub fn insert_admin_log(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "INSERT INTO admin_logs (id, admin_id, action, target_user_id, details,
                                     ip_address, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.admin_id,
                entry.action,
                entry.target_user_id,
                entry.details.to_string(),
                entry.ip_address,
                entry.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub fn recent_admin_logs(&self, limit: u32) -> Result<Vec<AuditEntry>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT id, admin_id, action, target_user_id, details, ip_address, created_at
                 FROM admin_logs ORDER BY created_at DESC LIMIT ?1",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let entries = stmt
            .query_map(params![limit], |row| {
                let details: String = row.get(4)?;
                Ok(AuditEntry {
                    id: row.get(0)?,
                    admin_id: row.get(1)?,
                    action: row.get(2)?,
                    target_user_id: row.get(3)?,
                    details: serde_json::from_str(&details).unwrap_or(serde_json::Value::Null),
                    ip_address: row.get(5)?,
                    created_at: parse_timestamp(&row.get::<_, String>(6)?),
                })
            })
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(entries)
    }

    pub fn insert_download_log(&self, log: &DownloadLog) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "INSERT INTO download_logs (id, user_id, file_name, file_type, ip_address,
                                        user_agent, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                log.id,
                log.user_id,
                log.file_name,
                log.file_type,
                log.ip_address,
                log.user_agent,
                log.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub fn count_downloads_since(&self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM download_logs WHERE created_at >= ?1",
                params![since.to_rfc3339()],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(count as u64)
    }

    /// Most downloaded files since `since`, as (file_name, count) pairs.
    pub fn top_downloads(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<(String, u64)>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT file_name, COUNT(*) AS downloads FROM download_logs
                 WHERE created_at >= ?1
                 GROUP BY file_name ORDER BY downloads DESC, file_name ASC LIMIT ?2",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map(params![since.to_rfc3339(), limit], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(rows)
    }

    /// Usage event counts per endpoint since `since`.
    pub fn usage_by_endpoint(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(String, u64)>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT endpoint, COUNT(*) AS calls FROM api_usage
                 WHERE created_at >= ?1
                 GROUP BY endpoint ORDER BY calls DESC, endpoint ASC",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map(params![since.to_rfc3339()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(rows)
    }

    /// Aggregate membership counters.
    pub fn profile_stats(&self) -> Result<ProfileStats, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let now = Utc::now();
        let week_ago = (now - Duration::days(7)).to_rfc3339();
        let today_start = now.date_naive().and_time(NaiveTime::MIN).and_utc().to_rfc3339();

        let total_users: i64 = conn
            .query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut free_users = 0u64;
        let mut builder_users = 0u64;
        let mut admin_users = 0u64;
        {
            let mut stmt = conn
                .prepare("SELECT role, COUNT(*) FROM profiles GROUP BY role")
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
            for row in rows {
                let (role, count) = row.map_err(|e| StoreError::DatabaseError(e.to_string()))?;
                match Tier::from_db(&role) {
                    Tier::Free => free_users += count as u64,
                    Tier::Builder => builder_users += count as u64,
                    Tier::Admin => admin_users += count as u64,
                }
            }
        }

        let newsletter_subscribers: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM profiles WHERE newsletter_opt_in = 1",
                [],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let active_users_7d: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM profiles WHERE last_login >= ?1",
                params![week_ago],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let signups_today: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM profiles WHERE created_at >= ?1",
                params![today_start],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let signups_7d: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM profiles WHERE created_at >= ?1",
                params![week_ago],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(ProfileStats {
            total_users: total_users as u64,
            free_users,
            builder_users,
            admin_users,
            newsletter_subscribers: newsletter_subscribers as u64,
            active_users_7d: active_users_7d as u64,
            signups_today: signups_today as u64,
            signups_7d: signups_7d as u64,
        })
    }

    /// Daily signup counts for the trailing `days` days, oldest first.
    /// Days with no signups are present with a zero count.
    pub fn signup_trend(&self, days: i64) -> Result<Vec<(String, u64)>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let now = Utc::now();
        let start_day = (now - Duration::days(days - 1))
            .format("%Y-%m-%d")
            .to_string();

        let mut counts: HashMap<String, u64> = HashMap::new();
        {
            let mut stmt = conn
                .prepare(
                    "SELECT substr(created_at, 1, 10) AS day, COUNT(*) FROM profiles
                     WHERE substr(created_at, 1, 10) >= ?1 GROUP BY day",
                )
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
            let rows = stmt
                .query_map(params![start_day], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
            for row in rows {
                let (day, count) = row.map_err(|e| StoreError::DatabaseError(e.to_string()))?;
                counts.insert(day, count as u64);
            }
        }

        let mut trend = Vec::with_capacity(days as usize);
        for offset in (0..days).rev() {
            let day = (now - Duration::days(offset)).format("%Y-%m-%d").to_string();
            let count = counts.get(&day).copied().unwrap_or(0);
            trend.push((day, count));
        }

        Ok(trend)
    }

    /// Most recent signups since `since`, newest first.
    pub fn recent_signups(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<RecentSignup>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT created_at, role FROM profiles
                 WHERE created_at >= ?1 ORDER BY created_at DESC LIMIT ?2",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map(params![since.to_rfc3339(), limit], |row| {
                let role: String = row.get(1)?;
                Ok(RecentSignup {
                    created_at: parse_timestamp(&row.get::<_, String>(0)?),
                    role: Tier::from_db(&role),
                })
            })
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(rows)
    }
}

fn get_profile_locked(conn: &Connection, user_id: &str) -> Result<Option<Profile>, StoreError> {
    conn.query_row(
        &format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS),
        params![user_id],
        profile_from_row,
    )
    .optional()
    .map_err(|e| StoreError::DatabaseError(e.to_string()))
}

fn profile_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let role: String = row.get(3)?;
    Ok(Profile {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: Tier::from_db(&role),
        is_approved: row.get::<_, i64>(4)? != 0,
        newsletter_opt_in: row.get::<_, i64>(5)? != 0,
        created_at: parse_timestamp(&row.get::<_, String>(6)?),
        updated_at: parse_timestamp(&row.get::<_, String>(7)?),
        last_login: row
            .get::<_, Option<String>>(8)?
            .map(|value| parse_timestamp(&value)),
    })
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
