//! Chat platform actions consumed by the core.
//!
//! The core never talks to the platform directly; it requests role grants and
//! messages through a [`RoleSink`].

pub mod discord;

pub use discord::DiscordRoleSink;

use crate::error::PlatformError;
use crate::{ChannelId, MemberId, RoleId};

/// Role and message actions on the chat platform.
///
/// Calls are independent: a failure in one must not poison the next.
pub trait RoleSink: Send + Sync {
    /// Unique identifier (e.g. "discord", "dry-run").
    fn name(&self) -> &str;

    /// Roles the member currently holds.
    fn member_roles(&self, member_id: MemberId) -> Result<Vec<RoleId>, PlatformError>;

    /// Display name of a role, or `None` if the role no longer exists.
    fn role_name(&self, role_id: RoleId) -> Result<Option<String>, PlatformError>;

    /// Add a role to a member. Adding a held role is harmless.
    fn add_role(&self, member_id: MemberId, role_id: RoleId) -> Result<(), PlatformError>;

    /// Send a direct message to a member.
    fn send_direct_message(&self, member_id: MemberId, content: &str)
        -> Result<(), PlatformError>;

    /// Post a message to a text channel.
    fn send_channel_message(
        &self,
        channel_id: ChannelId,
        content: &str,
    ) -> Result<(), PlatformError>;
}

/// Sink that performs nothing and only logs what it would have done.
///
/// The member is assumed to hold no roles, so every eligible threshold is
/// reported as a grant.
#[derive(Debug, Default)]
pub struct DryRunSink;

impl RoleSink for DryRunSink {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn member_roles(&self, _member_id: MemberId) -> Result<Vec<RoleId>, PlatformError> {
        Ok(Vec::new())
    }

    fn role_name(&self, role_id: RoleId) -> Result<Option<String>, PlatformError> {
        Ok(Some(format!("role {role_id}")))
    }

    fn add_role(&self, member_id: MemberId, role_id: RoleId) -> Result<(), PlatformError> {
        tracing::info!(member_id, role_id, "dry-run: would add role");
        Ok(())
    }

    fn send_direct_message(
        &self,
        member_id: MemberId,
        content: &str,
    ) -> Result<(), PlatformError> {
        tracing::info!(member_id, content, "dry-run: would send direct message");
        Ok(())
    }

    fn send_channel_message(
        &self,
        channel_id: ChannelId,
        content: &str,
    ) -> Result<(), PlatformError> {
        tracing::info!(channel_id, content, "dry-run: would post to channel");
        Ok(())
    }
}

/// Stand-in for a sink that could not be built.
///
/// Every call fails with [`PlatformError::NotConfigured`], so presence
/// changes still accrue time and evaluation reports the failure as an event.
#[derive(Debug)]
pub struct UnavailableSink {
    sink: String,
    message: String,
}

impl UnavailableSink {
    pub fn new(sink: &str, message: impl Into<String>) -> Self {
        Self {
            sink: sink.to_string(),
            message: message.into(),
        }
    }

    fn error(&self) -> PlatformError {
        PlatformError::NotConfigured {
            sink: self.sink.clone(),
            message: self.message.clone(),
        }
    }
}

impl RoleSink for UnavailableSink {
    fn name(&self) -> &str {
        &self.sink
    }

    fn member_roles(&self, _member_id: MemberId) -> Result<Vec<RoleId>, PlatformError> {
        Err(self.error())
    }

    fn role_name(&self, _role_id: RoleId) -> Result<Option<String>, PlatformError> {
        Err(self.error())
    }

    fn add_role(&self, _member_id: MemberId, _role_id: RoleId) -> Result<(), PlatformError> {
        Err(self.error())
    }

    fn send_direct_message(&self, _member_id: MemberId, _content: &str) -> Result<(), PlatformError> {
        Err(self.error())
    }

    fn send_channel_message(
        &self,
        _channel_id: ChannelId,
        _content: &str,
    ) -> Result<(), PlatformError> {
        Err(self.error())
    }
}

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    const SERVICE: &str = "voicetime";

    pub fn get(key: &str) -> Result<Option<String>, keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)
    }

    pub fn delete(key: &str) -> Result<(), keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
