//! Discord integration -- role grants and messages via the REST API.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use super::{keyring_store, RoleSink};
use crate::error::PlatformError;
use crate::storage::DiscordConfig;
use crate::{ChannelId, GuildId, MemberId, RoleId};

/// Keyring entry holding the bot token.
pub const TOKEN_KEY: &str = "bot_token";
/// Environment fallback for the bot token.
pub const TOKEN_ENV: &str = "BOT_TOKEN";

#[derive(Deserialize)]
struct GuildMember {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Deserialize)]
struct GuildRole {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct DmChannel {
    id: String,
}

pub struct DiscordRoleSink {
    client: Client,
    api_base: String,
    guild_id: GuildId,
    token: String,
}

impl DiscordRoleSink {
    pub fn new(api_base: &str, guild_id: GuildId, token: &str) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .user_agent(concat!("voicetime/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            guild_id,
            token: token.to_string(),
        })
    }

    /// Build a sink from config plus the bot token (the `BOT_TOKEN`
    /// environment variable first, then the keyring).
    pub fn from_config(config: &DiscordConfig) -> Result<Self, PlatformError> {
        let guild_id = config.guild_id.ok_or_else(|| PlatformError::NotConfigured {
            sink: "discord".into(),
            message: "discord.guild_id is not set".into(),
        })?;
        let token = stored_token()?.ok_or_else(|| PlatformError::NotConfigured {
            sink: "discord".into(),
            message: "no bot token stored; run `auth set-token`".into(),
        })?;
        Self::new(&config.api_base, guild_id, &token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    fn check(resp: Response) -> Result<Response, PlatformError> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().unwrap_or_default();
            Err(PlatformError::Http {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn open_dm(&self, member_id: MemberId) -> Result<String, PlatformError> {
        let resp = self
            .client
            .post(self.url("/users/@me/channels"))
            .header("Authorization", self.auth())
            .json(&json!({ "recipient_id": member_id.to_string() }))
            .send()?;
        let channel: DmChannel = Self::check(resp)?.json()?;
        Ok(channel.id)
    }

    fn post_message(&self, channel_id: &str, content: &str) -> Result<(), PlatformError> {
        let resp = self
            .client
            .post(self.url(&format!("/channels/{channel_id}/messages")))
            .header("Authorization", self.auth())
            .json(&json!({ "content": content }))
            .send()?;
        Self::check(resp)?;
        Ok(())
    }
}

/// Bot token from the keyring, falling back to the environment.
pub fn stored_token() -> Result<Option<String>, PlatformError> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.is_empty() {
            return Ok(Some(token));
        }
    }
    Ok(keyring_store::get(TOKEN_KEY)?)
}

impl RoleSink for DiscordRoleSink {
    fn name(&self) -> &str {
        "discord"
    }

    fn member_roles(&self, member_id: MemberId) -> Result<Vec<RoleId>, PlatformError> {
        let resp = self
            .client
            .get(self.url(&format!("/guilds/{}/members/{member_id}", self.guild_id)))
            .header("Authorization", self.auth())
            .send()?;
        let member: GuildMember = Self::check(resp)?.json()?;
        Ok(member
            .roles
            .iter()
            .filter_map(|id| id.parse::<RoleId>().ok())
            .collect())
    }

    fn role_name(&self, role_id: RoleId) -> Result<Option<String>, PlatformError> {
        let resp = self
            .client
            .get(self.url(&format!("/guilds/{}/roles", self.guild_id)))
            .header("Authorization", self.auth())
            .send()?;
        let roles: Vec<GuildRole> = Self::check(resp)?.json()?;
        let wanted = role_id.to_string();
        Ok(roles.into_iter().find(|r| r.id == wanted).map(|r| r.name))
    }

    fn add_role(&self, member_id: MemberId, role_id: RoleId) -> Result<(), PlatformError> {
        let resp = self
            .client
            .put(self.url(&format!(
                "/guilds/{}/members/{member_id}/roles/{role_id}",
                self.guild_id
            )))
            .header("Authorization", self.auth())
            .header("X-Audit-Log-Reason", "voice time threshold reached")
            .header("Content-Length", "0")
            .send()?;
        Self::check(resp)?;
        Ok(())
    }

    fn send_direct_message(
        &self,
        member_id: MemberId,
        content: &str,
    ) -> Result<(), PlatformError> {
        let channel_id = self.open_dm(member_id)?;
        self.post_message(&channel_id, content)
    }

    fn send_channel_message(
        &self,
        channel_id: ChannelId,
        content: &str,
    ) -> Result<(), PlatformError> {
        self.post_message(&channel_id.to_string(), content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn sink(server: &mockito::Server) -> DiscordRoleSink {
        DiscordRoleSink::new(&server.url(), 10, "test-token").unwrap()
    }

    #[test]
    fn member_roles_parses_snowflake_strings() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/guilds/10/members/42")
            .match_header("authorization", "Bot test-token")
            .with_status(200)
            .with_body(r#"{"roles": ["100", "200"], "nick": null}"#)
            .create();

        let roles = sink(&server).member_roles(42).unwrap();
        assert_eq!(roles, vec![100, 200]);
        mock.assert();
    }

    #[test]
    fn role_name_returns_none_for_deleted_role() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/guilds/10/roles")
            .with_status(200)
            .with_body(r#"[{"id": "100", "name": "Regular"}]"#)
            .create();

        let sink = sink(&server);
        assert_eq!(sink.role_name(100).unwrap().as_deref(), Some("Regular"));
        assert_eq!(sink.role_name(300).unwrap(), None);
    }

    #[test]
    fn add_role_surfaces_permission_errors() {
        let mut server = mockito::Server::new();
        server
            .mock("PUT", "/guilds/10/members/42/roles/100")
            .with_status(403)
            .with_body(r#"{"message": "Missing Permissions", "code": 50013}"#)
            .create();

        let err = sink(&server).add_role(42, 100).unwrap_err();
        assert!(matches!(err, PlatformError::Http { status: 403, .. }));
    }

    #[test]
    fn direct_message_opens_dm_channel_first() {
        let mut server = mockito::Server::new();
        let open = server
            .mock("POST", "/users/@me/channels")
            .match_body(Matcher::PartialJson(json!({ "recipient_id": "42" })))
            .with_status(200)
            .with_body(r#"{"id": "555"}"#)
            .create();
        let send = server
            .mock("POST", "/channels/555/messages")
            .match_body(Matcher::PartialJson(json!({ "content": "hello" })))
            .with_status(200)
            .with_body("{}")
            .create();

        sink(&server).send_direct_message(42, "hello").unwrap();
        open.assert();
        send.assert();
    }

    #[test]
    fn stored_token_prefers_environment() {
        std::env::set_var(TOKEN_ENV, "env-token");
        let token = stored_token();
        std::env::remove_var(TOKEN_ENV);
        assert_eq!(token.unwrap().as_deref(), Some("env-token"));
    }

    #[test]
    fn from_config_requires_guild() {
        let config = DiscordConfig::default();
        let err = DiscordRoleSink::from_config(&config).err().unwrap();
        assert!(matches!(err, PlatformError::NotConfigured { .. }));
    }
}
