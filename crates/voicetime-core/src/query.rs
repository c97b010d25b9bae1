//! Read-only voice time queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::TimeStore;
use crate::MemberId;

/// A member's total as of a query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeReport {
    pub member_id: MemberId,
    pub seconds: f64,
    /// Whether a session is open at query time.
    pub in_session: bool,
    /// False when the member has never been seen; `seconds` is then zero.
    pub has_record: bool,
}

pub struct SessionQueryService<'a, S: TimeStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TimeStore + ?Sized> SessionQueryService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Current total including any open session. Never writes.
    pub fn current_total(&self, member_id: MemberId, at: DateTime<Utc>) -> Result<TimeReport> {
        let report = match self.store.voice_record(member_id)? {
            Some(record) => TimeReport {
                member_id,
                seconds: record.total_at(at),
                in_session: record.in_session(),
                has_record: true,
            },
            None => TimeReport {
                member_id,
                seconds: 0.0,
                in_session: false,
                has_record: false,
            },
        };
        Ok(report)
    }
}
