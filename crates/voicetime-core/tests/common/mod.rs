//! Shared helpers for voicetime-core integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use voicetime_core::{ChannelId, MemberId, PlatformError, RoleId, RoleSink, VoiceStateChange};

/// In-memory platform that remembers every grant and message.
///
/// Granted roles become held roles, like on the real platform.
#[derive(Default)]
pub struct RecordingSink {
    pub roles: Mutex<HashMap<MemberId, Vec<RoleId>>>,
    pub grants: Mutex<Vec<(MemberId, RoleId)>>,
    pub messages: Mutex<Vec<(MemberId, String)>>,
    pub refuse: Vec<RoleId>,
}

impl RecordingSink {
    pub fn holding(member_id: MemberId, roles: &[RoleId]) -> Self {
        let sink = Self::default();
        sink.roles.lock().unwrap().insert(member_id, roles.to_vec());
        sink
    }

    pub fn grant_count(&self) -> usize {
        self.grants.lock().unwrap().len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl RoleSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn member_roles(&self, member_id: MemberId) -> Result<Vec<RoleId>, PlatformError> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&member_id)
            .cloned()
            .unwrap_or_default())
    }

    fn role_name(&self, role_id: RoleId) -> Result<Option<String>, PlatformError> {
        Ok(Some(format!("Role{role_id}")))
    }

    fn add_role(&self, member_id: MemberId, role_id: RoleId) -> Result<(), PlatformError> {
        if self.refuse.contains(&role_id) {
            return Err(PlatformError::Http {
                status: 403,
                body: "Missing Permissions".into(),
            });
        }
        self.grants.lock().unwrap().push((member_id, role_id));
        self.roles
            .lock()
            .unwrap()
            .entry(member_id)
            .or_default()
            .push(role_id);
        Ok(())
    }

    fn send_direct_message(&self, member_id: MemberId, content: &str) -> Result<(), PlatformError> {
        self.messages
            .lock()
            .unwrap()
            .push((member_id, content.to_string()));
        Ok(())
    }

    fn send_channel_message(&self, _channel_id: ChannelId, _content: &str) -> Result<(), PlatformError> {
        Ok(())
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn secs(n: i64) -> Duration {
    Duration::seconds(n)
}

pub fn join(member_id: MemberId, channel: ChannelId, at: DateTime<Utc>) -> VoiceStateChange {
    VoiceStateChange {
        member_id,
        guild_id: Some(1),
        previous_channel: None,
        new_channel: Some(channel),
        at,
    }
}

pub fn leave(member_id: MemberId, channel: ChannelId, at: DateTime<Utc>) -> VoiceStateChange {
    VoiceStateChange {
        member_id,
        guild_id: Some(1),
        previous_channel: Some(channel),
        new_channel: None,
        at,
    }
}

pub fn move_channel(
    member_id: MemberId,
    from: ChannelId,
    to: ChannelId,
    at: DateTime<Utc>,
) -> VoiceStateChange {
    VoiceStateChange {
        member_id,
        guild_id: Some(1),
        previous_channel: Some(from),
        new_channel: Some(to),
        at,
    }
}
