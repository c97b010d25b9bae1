use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChannelId, GuildId, MemberId, RoleId};

/// A voice-connectivity change as delivered by the chat platform.
///
/// Only entering or leaving the "in any voice channel" state matters; which
/// channel is irrelevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceStateChange {
    pub member_id: MemberId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub previous_channel: Option<ChannelId>,
    #[serde(default)]
    pub new_channel: Option<ChannelId>,
    pub at: DateTime<Utc>,
}

impl VoiceStateChange {
    pub fn was_connected(&self) -> bool {
        self.previous_channel.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.new_channel.is_some()
    }

    pub fn transition(&self) -> Transition {
        match (self.was_connected(), self.is_connected()) {
            (false, true) => Transition::Joined,
            (true, false) => Transition::Left,
            _ => Transition::Ignored,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Joined,
    Left,
    /// Channel move or any other change that keeps the connectivity state.
    Ignored,
}

/// Every state change in the core produces an Event.
/// The CLI prints them; embedding processes can forward them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionOpened {
        member_id: MemberId,
        accumulated_seconds: f64,
        at: DateTime<Utc>,
    },
    SessionClosed {
        member_id: MemberId,
        elapsed_seconds: f64,
        total_seconds: f64,
        at: DateTime<Utc>,
    },
    /// Leave without an open session (duplicate or out-of-order delivery).
    LeaveIgnored {
        member_id: MemberId,
        at: DateTime<Utc>,
    },
    RoleGranted {
        member_id: MemberId,
        role_id: RoleId,
        role_name: String,
        required_minutes: f64,
    },
    /// The platform refused or could not perform the grant. Not remembered;
    /// the next evaluation tries again.
    GrantFailed {
        member_id: MemberId,
        role_id: RoleId,
        reason: String,
    },
    MemberNotified {
        member_id: MemberId,
        role_id: RoleId,
        required_minutes: f64,
    },
    NotificationFailed {
        member_id: MemberId,
        role_id: RoleId,
        reason: String,
    },
    /// Threshold evaluation could not run at all (e.g. member lookup failed).
    EvaluationFailed {
        member_id: MemberId,
        reason: String,
    },
}
