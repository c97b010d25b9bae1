mod config;
pub mod database;
pub mod migrations;

pub use config::{BroadcastConfig, Config, DatabaseConfig, DiscordConfig, NotificationsConfig};
pub use database::{Database, ThresholdRecord, VoiceRecord};

use std::path::PathBuf;

use crate::error::{ConfigError, DatabaseError};
use crate::{MemberId, RoleId};

/// Returns the voicetime data directory.
///
/// Resolution order: `VOICETIME_DATA_DIR` if set, otherwise
/// `~/.config/voicetime[-dev]/` based on VOICETIME_ENV.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("VOICETIME_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("VOICETIME_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("voicetime-dev")
            } else {
                base_dir.join("voicetime")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}

/// Durable per-member voice records.
///
/// Implementations must run [`TimeStore::update_record`] as one atomic
/// read-modify-write so that two notifications for the same member cannot
/// interleave.
pub trait TimeStore {
    /// Read a member's record without modifying it.
    fn voice_record(&self, member_id: MemberId) -> Result<Option<VoiceRecord>, DatabaseError>;

    /// Atomically read the member's record, pass it to `apply`, and persist
    /// whatever `apply` returns. Returning `None` leaves the store untouched.
    ///
    /// Returns the record that was written, if any.
    fn update_record(
        &self,
        member_id: MemberId,
        apply: &mut dyn FnMut(Option<&VoiceRecord>) -> Option<VoiceRecord>,
    ) -> Result<Option<VoiceRecord>, DatabaseError>;

    /// Remove a member's record. Returns whether one existed.
    fn delete_record(&self, member_id: MemberId) -> Result<bool, DatabaseError>;

    /// Remove every voice record. Returns the number removed.
    fn delete_all_records(&self) -> Result<usize, DatabaseError>;
}

/// Durable set of role threshold rules.
pub trait ThresholdStore {
    /// All threshold records in insertion order.
    fn thresholds(&self) -> Result<Vec<ThresholdRecord>, DatabaseError>;

    /// Insert a new record; duplicates are accepted.
    fn insert_threshold(
        &self,
        role_id: RoleId,
        required_minutes: f64,
    ) -> Result<ThresholdRecord, DatabaseError>;

    /// Delete every record for `role_id`. Returns the number removed.
    fn delete_thresholds(&self, role_id: RoleId) -> Result<usize, DatabaseError>;
}
