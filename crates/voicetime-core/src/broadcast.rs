//! Periodic broadcast of an operator-configured message.
//!
//! The broadcaster keeps no timer of its own. An external scheduler calls
//! [`Broadcaster::tick`] as often as it likes; a message is posted only once
//! the configured interval has passed since the last post, which is kept in
//! the kv table.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoreError, Result};
use crate::platform::RoleSink;
use crate::storage::{BroadcastConfig, Database};

const LAST_SENT_KEY: &str = "broadcast.last_sent_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BroadcastOutcome {
    /// No channel or message configured.
    Disabled,
    NotDue { next_at: DateTime<Utc> },
    Sent { at: DateTime<Utc> },
}

pub struct Broadcaster<'a> {
    db: &'a Database,
    sink: &'a dyn RoleSink,
    config: &'a BroadcastConfig,
}

impl<'a> Broadcaster<'a> {
    pub fn new(db: &'a Database, sink: &'a dyn RoleSink, config: &'a BroadcastConfig) -> Self {
        Self { db, sink, config }
    }

    pub fn last_sent_at(&self) -> Result<Option<DateTime<Utc>>> {
        let raw = self.db.kv_get(LAST_SENT_KEY)?;
        Ok(raw
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    /// Post the message if it is due at `now`.
    ///
    /// # Errors
    /// Returns an error if the post fails; the last-sent time is only
    /// recorded after a successful post, so the next tick retries.
    pub fn tick(&self, now: DateTime<Utc>) -> Result<BroadcastOutcome> {
        let (Some(channel_id), Some(message)) = (self.config.channel_id, &self.config.message)
        else {
            return Ok(BroadcastOutcome::Disabled);
        };
        let period = interval(self.config.interval_hours)?;

        if let Some(last) = self.last_sent_at()? {
            // An interval reaching past the end of representable time never elapses.
            if let Some(next_at) = last.checked_add_signed(period) {
                if now < next_at {
                    return Ok(BroadcastOutcome::NotDue { next_at });
                }
            } else {
                return Ok(BroadcastOutcome::NotDue {
                    next_at: DateTime::<Utc>::MAX_UTC,
                });
            }
        }

        self.sink.send_channel_message(channel_id, message)?;
        self.db.kv_set(LAST_SENT_KEY, &now.to_rfc3339())?;
        tracing::info!(channel_id, "broadcast message posted");
        Ok(BroadcastOutcome::Sent { at: now })
    }
}

fn interval(hours: u64) -> Result<Duration> {
    let invalid = |message: &str| {
        CoreError::Config(ConfigError::InvalidValue {
            key: "broadcast.interval_hours".into(),
            message: message.into(),
        })
    };
    if hours == 0 {
        return Err(invalid("must be at least 1"));
    }
    i64::try_from(hours)
        .ok()
        .and_then(Duration::try_hours)
        .ok_or_else(|| invalid("is too large"))
}

/// Forget the last post so the next tick sends immediately.
pub fn reset_schedule(db: &Database) -> Result<()> {
    db.kv_delete(LAST_SENT_KEY)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::DryRunSink;
    use chrono::TimeZone;

    fn configured() -> BroadcastConfig {
        BroadcastConfig {
            channel_id: Some(321),
            message: Some("Hop in voice!".into()),
            interval_hours: 12,
        }
    }

    #[test]
    fn unconfigured_broadcast_is_disabled() {
        let db = Database::open_memory().unwrap();
        let config = BroadcastConfig::default();
        let outcome = Broadcaster::new(&db, &DryRunSink, &config)
            .tick(Utc::now())
            .unwrap();
        assert_eq!(outcome, BroadcastOutcome::Disabled);
    }

    #[test]
    fn sends_once_per_interval() {
        let db = Database::open_memory().unwrap();
        let config = configured();
        let broadcaster = Broadcaster::new(&db, &DryRunSink, &config);
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        assert_eq!(broadcaster.tick(t0).unwrap(), BroadcastOutcome::Sent { at: t0 });
        assert_eq!(
            broadcaster.tick(t0 + Duration::hours(11)).unwrap(),
            BroadcastOutcome::NotDue {
                next_at: t0 + Duration::hours(12)
            }
        );
        let t12 = t0 + Duration::hours(12);
        assert_eq!(broadcaster.tick(t12).unwrap(), BroadcastOutcome::Sent { at: t12 });
    }

    #[test]
    fn huge_interval_never_comes_due() {
        let db = Database::open_memory().unwrap();
        let config = BroadcastConfig {
            interval_hours: 10_000_000_000,
            ..configured()
        };
        let broadcaster = Broadcaster::new(&db, &DryRunSink, &config);
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        assert_eq!(broadcaster.tick(t0).unwrap(), BroadcastOutcome::Sent { at: t0 });
        assert!(matches!(
            broadcaster.tick(t0 + Duration::hours(1)).unwrap(),
            BroadcastOutcome::NotDue { .. }
        ));
    }

    #[test]
    fn out_of_range_interval_is_a_config_error() {
        let db = Database::open_memory().unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        for hours in [0, u64::MAX] {
            let config = BroadcastConfig {
                interval_hours: hours,
                ..configured()
            };
            let err = Broadcaster::new(&db, &DryRunSink, &config)
                .tick(t0)
                .unwrap_err();
            assert!(matches!(
                err,
                CoreError::Config(ConfigError::InvalidValue { .. })
            ));
        }
    }

    #[test]
    fn reset_makes_next_tick_due() {
        let db = Database::open_memory().unwrap();
        let config = configured();
        let broadcaster = Broadcaster::new(&db, &DryRunSink, &config);
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        broadcaster.tick(t0).unwrap();
        reset_schedule(&db).unwrap();
        assert!(matches!(
            broadcaster.tick(t0 + Duration::hours(1)).unwrap(),
            BroadcastOutcome::Sent { .. }
        ));
    }
}
