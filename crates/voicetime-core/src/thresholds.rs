//! Threshold evaluation.
//!
//! Given a member's fresh total, decides which roles they now qualify for and
//! requests the grants. Grants are idempotent against roles the member
//! already holds; failures are reported and forgotten, so the next
//! evaluation retries them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};
use crate::events::Event;
use crate::platform::RoleSink;
use crate::storage::{NotificationsConfig, ThresholdRecord, ThresholdStore};
use crate::{MemberId, RoleId};

/// How congratulatory messages are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPolicy {
    /// No messages, grants only.
    Silent,
    /// One message per granted role.
    PerRole,
    /// One message per satisfied threshold record of a granted role.
    PerThreshold,
}

impl From<&NotificationsConfig> for NotificationPolicy {
    fn from(config: &NotificationsConfig) -> Self {
        match (config.enabled, config.per_threshold) {
            (false, _) => NotificationPolicy::Silent,
            (true, true) => NotificationPolicy::PerThreshold,
            (true, false) => NotificationPolicy::PerRole,
        }
    }
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Roles granted in this pass, in threshold order.
    pub granted: Vec<RoleId>,
    pub events: Vec<Event>,
}

pub struct ThresholdEvaluator<'a, S: ThresholdStore + ?Sized> {
    store: &'a S,
    sink: &'a dyn RoleSink,
    policy: NotificationPolicy,
}

impl<'a, S: ThresholdStore + ?Sized> ThresholdEvaluator<'a, S> {
    pub fn new(store: &'a S, sink: &'a dyn RoleSink, policy: NotificationPolicy) -> Self {
        Self {
            store,
            sink,
            policy,
        }
    }

    /// Grant every role whose threshold `total_seconds` satisfies and the
    /// member does not hold yet.
    ///
    /// # Errors
    /// Returns an error if thresholds cannot be read or the member's current
    /// roles cannot be fetched. Individual grant and message failures are
    /// reported as events instead.
    pub fn evaluate(&self, member_id: MemberId, total_seconds: f64) -> Result<Evaluation> {
        let satisfied: Vec<ThresholdRecord> = self
            .store
            .thresholds()?
            .into_iter()
            .filter(|t| t.is_satisfied_by(total_seconds))
            .collect();

        let mut evaluation = Evaluation::default();
        if satisfied.is_empty() {
            return Ok(evaluation);
        }

        let held: HashSet<RoleId> = self.sink.member_roles(member_id)?.into_iter().collect();
        // Roles already attempted in this pass, with the name used for messages
        // when the grant succeeded.
        let mut attempted: Vec<(RoleId, Option<String>)> = Vec::new();

        for threshold in &satisfied {
            let role_id = threshold.role_id;
            if held.contains(&role_id) {
                continue;
            }

            if let Some((_, outcome)) = attempted.iter().find(|(id, _)| *id == role_id) {
                // Second record for a role granted in this pass.
                if let (Some(role_name), NotificationPolicy::PerThreshold) = (outcome, self.policy)
                {
                    self.notify(member_id, threshold, role_name, &mut evaluation.events);
                }
                continue;
            }

            let role_name = self.grant(member_id, threshold, &mut evaluation.events);
            if let Some(name) = &role_name {
                evaluation.granted.push(role_id);
                if self.policy != NotificationPolicy::Silent {
                    self.notify(member_id, threshold, name, &mut evaluation.events);
                }
            }
            attempted.push((role_id, role_name));
        }

        Ok(evaluation)
    }

    /// Returns the role name on success.
    fn grant(
        &self,
        member_id: MemberId,
        threshold: &ThresholdRecord,
        events: &mut Vec<Event>,
    ) -> Option<String> {
        let role_id = threshold.role_id;
        let attempt = self.sink.role_name(role_id).and_then(|name| {
            let name = name.ok_or(PlatformError::RoleMissing(role_id))?;
            self.sink.add_role(member_id, role_id)?;
            Ok(name)
        });

        match attempt {
            Ok(role_name) => {
                tracing::info!(
                    member_id,
                    role_id,
                    required_minutes = threshold.required_minutes,
                    "granted role"
                );
                events.push(Event::RoleGranted {
                    member_id,
                    role_id,
                    role_name: role_name.clone(),
                    required_minutes: threshold.required_minutes,
                });
                Some(role_name)
            }
            Err(e) => {
                tracing::warn!(member_id, role_id, sink = self.sink.name(), "role grant failed: {e}");
                events.push(Event::GrantFailed {
                    member_id,
                    role_id,
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    fn notify(
        &self,
        member_id: MemberId,
        threshold: &ThresholdRecord,
        role_name: &str,
        events: &mut Vec<Event>,
    ) {
        let content = grant_message(role_name, threshold.required_minutes);
        match self.sink.send_direct_message(member_id, &content) {
            Ok(()) => events.push(Event::MemberNotified {
                member_id,
                role_id: threshold.role_id,
                required_minutes: threshold.required_minutes,
            }),
            Err(e) => {
                tracing::warn!(member_id, role_id = threshold.role_id, "grant notification failed: {e}");
                events.push(Event::NotificationFailed {
                    member_id,
                    role_id: threshold.role_id,
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Congratulatory direct message for a granted role.
pub fn grant_message(role_name: &str, required_minutes: f64) -> String {
    format!(
        "Congrats! You've been given the **{role_name}** role for spending {required_minutes} minutes in voice chat!"
    )
}
