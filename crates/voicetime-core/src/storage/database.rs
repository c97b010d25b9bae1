//! SQLite-based voice time storage.
//!
//! Provides persistent storage for:
//! - Per-member voice records (accumulated seconds, open session start)
//! - Role threshold rules
//! - Key-value store for small pieces of application state
//!
//! Table and column names match databases written by earlier deployments of
//! the bot, so an existing `voice_times.db` can be opened in place.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, Offset, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use super::config::DatabaseConfig;
use super::{data_dir, migrations, ThresholdStore, TimeStore};
use crate::error::{DatabaseError, Result};
use crate::{MemberId, RoleId};

/// One member's voice time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceRecord {
    pub member_id: MemberId,
    /// Confirmed time across all closed sessions.
    pub accumulated_seconds: f64,
    /// Set while the member is connected to any voice channel.
    pub open_session_start: Option<DateTime<Utc>>,
}

impl VoiceRecord {
    pub fn new(member_id: MemberId) -> Self {
        Self {
            member_id,
            accumulated_seconds: 0.0,
            open_session_start: None,
        }
    }

    pub fn in_session(&self) -> bool {
        self.open_session_start.is_some()
    }

    /// Seconds elapsed in the open session at `at`, or zero without one.
    pub fn open_elapsed_at(&self, at: DateTime<Utc>) -> f64 {
        self.open_session_start
            .map(|start| elapsed_seconds(start, at))
            .unwrap_or(0.0)
    }

    /// Accumulated time plus the open session, as of `at`.
    pub fn total_at(&self, at: DateTime<Utc>) -> f64 {
        self.accumulated_seconds + self.open_elapsed_at(at)
    }

    /// The record with a session opened at `at`. Accumulated time is kept.
    pub fn opened_at(&self, at: DateTime<Utc>) -> Self {
        Self {
            member_id: self.member_id,
            accumulated_seconds: self.accumulated_seconds,
            open_session_start: Some(at),
        }
    }

    /// The record with its open session folded into accumulated time.
    pub fn closed_at(&self, at: DateTime<Utc>) -> Self {
        Self {
            member_id: self.member_id,
            accumulated_seconds: self.total_at(at),
            open_session_start: None,
        }
    }
}

/// Elapsed seconds between two wall-clock instants, clamped at zero so a
/// clock moved backwards never subtracts time.
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = (end - start).num_milliseconds();
    (millis as f64 / 1000.0).max(0.0)
}

/// A role rule: grant `role_id` once a member has `required_minutes` of voice time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRecord {
    pub id: i64,
    pub role_id: RoleId,
    pub required_minutes: f64,
}

impl ThresholdRecord {
    pub fn required_seconds(&self) -> f64 {
        self.required_minutes * 60.0
    }

    pub fn is_satisfied_by(&self, total_seconds: f64) -> bool {
        total_seconds >= self.required_seconds()
    }
}

/// SQLite database for voice records and thresholds.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database configured in `config`, defaulting to
    /// `<data_dir>/voice_times.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unusable or the database
    /// cannot be opened or migrated.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let path = match &config.path {
            Some(path) => path.clone(),
            None => data_dir()?.join("voice_times.db"),
        };
        let db = Self::open_at(&path, Duration::from_millis(config.busy_timeout_ms))?;
        Ok(db)
    }

    /// Open (or create) a database file at `path`.
    ///
    /// `busy_timeout` bounds how long a write waits for another writer before
    /// failing with [`DatabaseError::Locked`].
    pub fn open_at(path: &Path, busy_timeout: Duration) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(busy_timeout)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        migrations::migrate(&self.conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    fn read_record(
        conn: &Connection,
        member_id: MemberId,
    ) -> Result<Option<VoiceRecord>, DatabaseError> {
        let row = conn
            .query_row(
                "SELECT total_time, join_time FROM voice_times WHERE user_id = ?1",
                params![to_sql_id(member_id)],
                |row| {
                    Ok((
                        row.get::<_, Option<f64>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                    ))
                },
            )
            .optional()?;

        let Some((total_time, join_time)) = row else {
            return Ok(None);
        };

        let open_session_start = match join_time {
            Some(raw) => Some(parse_timestamp(&raw).ok_or_else(|| {
                DatabaseError::CorruptRecord {
                    member_id,
                    message: format!("unreadable join_time '{raw}'"),
                }
            })?),
            None => None,
        };

        Ok(Some(VoiceRecord {
            member_id,
            // Older rows may carry NULL totals for members who never left.
            accumulated_seconds: total_time.unwrap_or(0.0),
            open_session_start,
        }))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a value from the kv store.
    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl TimeStore for Database {
    fn voice_record(&self, member_id: MemberId) -> Result<Option<VoiceRecord>, DatabaseError> {
        Self::read_record(&self.conn, member_id)
    }

    fn update_record(
        &self,
        member_id: MemberId,
        apply: &mut dyn FnMut(Option<&VoiceRecord>) -> Option<VoiceRecord>,
    ) -> Result<Option<VoiceRecord>, DatabaseError> {
        // IMMEDIATE takes the write lock before the read, so another
        // connection cannot slip a write in between.
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let current = Self::read_record(&tx, member_id)?;

        let next = apply(current.as_ref()).map(|mut record| {
            record.member_id = member_id;
            record
        });

        if let Some(record) = &next {
            tx.execute(
                "INSERT INTO voice_times (user_id, total_time, join_time) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                    total_time = excluded.total_time,
                    join_time = excluded.join_time",
                params![
                    to_sql_id(member_id),
                    record.accumulated_seconds,
                    record.open_session_start.map(|at| at.to_rfc3339()),
                ],
            )?;
        }
        tx.commit()?;
        Ok(next)
    }

    fn delete_record(&self, member_id: MemberId) -> Result<bool, DatabaseError> {
        let removed = self.conn.execute(
            "DELETE FROM voice_times WHERE user_id = ?1",
            params![to_sql_id(member_id)],
        )?;
        Ok(removed > 0)
    }

    fn delete_all_records(&self) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute("DELETE FROM voice_times", [])?)
    }
}

impl ThresholdStore for Database {
    fn thresholds(&self) -> Result<Vec<ThresholdRecord>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, role_id, required_time FROM role_thresholds ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(ThresholdRecord {
                id: row.get(0)?,
                role_id: from_sql_id(row.get(1)?),
                required_minutes: row.get(2)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn insert_threshold(
        &self,
        role_id: RoleId,
        required_minutes: f64,
    ) -> Result<ThresholdRecord, DatabaseError> {
        self.conn.execute(
            "INSERT INTO role_thresholds (role_id, required_time) VALUES (?1, ?2)",
            params![to_sql_id(role_id), required_minutes],
        )?;
        Ok(ThresholdRecord {
            id: self.conn.last_insert_rowid(),
            role_id,
            required_minutes,
        })
    }

    fn delete_thresholds(&self, role_id: RoleId) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute(
            "DELETE FROM role_thresholds WHERE role_id = ?1",
            params![to_sql_id(role_id)],
        )?)
    }
}

// Snowflakes use 63 bits, so the round trip through SQLite's i64 is lossless.
fn to_sql_id(id: u64) -> i64 {
    id as i64
}

fn from_sql_id(id: i64) -> u64 {
    id as u64
}

/// Parse a stored join timestamp.
///
/// Accepts RFC 3339 and the offset-less ISO 8601 form written by older
/// deployments, which recorded the host's local wall-clock time.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_timestamp_in(raw, &Local)
}

fn parse_timestamp_in<Tz: TimeZone>(raw: &str, zone: &Tz) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    match zone.from_local_datetime(&naive).earliest() {
        Some(dt) => Some(dt.with_timezone(&Utc)),
        // Skipped by a DST jump: apply the offset in force at that instant.
        None => {
            let offset = zone.offset_from_utc_datetime(&naive).fix();
            let shift = chrono::Duration::seconds(i64::from(offset.local_minus_utc()));
            naive.checked_sub_signed(shift).map(|utc| utc.and_utc())
        }
    }
}
