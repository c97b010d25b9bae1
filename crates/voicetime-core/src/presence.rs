//! Presence tracking.
//!
//! Converts voice-connectivity changes into durable session state:
//!
//! ```text
//! disconnected --join--> connected (open_session_start = at)
//! connected --leave--> disconnected (accumulated += at - start, evaluate thresholds)
//! ```
//!
//! Each transition is one transactional read-modify-write of the member's
//! record. Changes that keep the connectivity state (channel moves) never
//! touch the store.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, Result};
use crate::events::{Event, Transition, VoiceStateChange};
use crate::storage::{ThresholdStore, TimeStore, VoiceRecord};
use crate::thresholds::ThresholdEvaluator;
use crate::MemberId;

/// What a single presence change did.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceOutcome {
    pub transition: Transition,
    pub events: Vec<Event>,
}

pub struct PresenceTracker<'a, T: TimeStore + ?Sized, R: ThresholdStore + ?Sized> {
    store: &'a T,
    evaluator: ThresholdEvaluator<'a, R>,
}

impl<'a, T: TimeStore + ?Sized, R: ThresholdStore + ?Sized> PresenceTracker<'a, T, R> {
    pub fn new(store: &'a T, evaluator: ThresholdEvaluator<'a, R>) -> Self {
        Self { store, evaluator }
    }

    /// Apply one voice-connectivity change.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written. Platform
    /// failures during threshold evaluation are reported as events; the
    /// accrued time is already persisted by then.
    pub fn on_presence_change(&self, change: &VoiceStateChange) -> Result<PresenceOutcome> {
        let transition = change.transition();
        let events = match transition {
            Transition::Joined => self.open_session(change.member_id, change.at)?,
            Transition::Left => self.close_session(change.member_id, change.at)?,
            Transition::Ignored => {
                tracing::debug!(member_id = change.member_id, "connectivity unchanged, ignoring");
                Vec::new()
            }
        };
        Ok(PresenceOutcome { transition, events })
    }

    fn open_session(&self, member_id: MemberId, at: DateTime<Utc>) -> Result<Vec<Event>> {
        let written = self.store.update_record(member_id, &mut |current| {
            let base = current.cloned().unwrap_or_else(|| VoiceRecord::new(member_id));
            Some(base.opened_at(at))
        })?;

        let accumulated_seconds = written.map(|r| r.accumulated_seconds).unwrap_or(0.0);
        tracing::info!(member_id, accumulated_seconds, "voice session opened");
        Ok(vec![Event::SessionOpened {
            member_id,
            accumulated_seconds,
            at,
        }])
    }

    fn close_session(&self, member_id: MemberId, at: DateTime<Utc>) -> Result<Vec<Event>> {
        let mut elapsed_seconds = 0.0;
        let written = self.store.update_record(member_id, &mut |current| {
            let current = current?;
            if !current.in_session() {
                return None;
            }
            elapsed_seconds = current.open_elapsed_at(at);
            Some(current.closed_at(at))
        })?;

        let Some(record) = written else {
            tracing::debug!(member_id, "leave without open session, ignoring");
            return Ok(vec![Event::LeaveIgnored { member_id, at }]);
        };

        let total_seconds = record.accumulated_seconds;
        tracing::info!(member_id, elapsed_seconds, total_seconds, "voice session closed");

        let mut events = vec![Event::SessionClosed {
            member_id,
            elapsed_seconds,
            total_seconds,
            at,
        }];

        match self.evaluator.evaluate(member_id, total_seconds) {
            Ok(evaluation) => events.extend(evaluation.events),
            Err(CoreError::Platform(e)) => {
                tracing::warn!(member_id, "threshold evaluation failed: {e}");
                events.push(Event::EvaluationFailed {
                    member_id,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
        Ok(events)
    }
}
