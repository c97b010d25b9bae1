pub mod auth;
pub mod broadcast;
pub mod config;
pub mod presence;
pub mod threshold;
pub mod time;

use voicetime_core::{Config, Database, DiscordRoleSink, DryRunSink, RoleSink, UnavailableSink};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Load config and open the configured database.
pub fn open() -> Result<(Config, Database), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open(&config.database)?;
    Ok((config, db))
}

/// The platform sink for commands that act on the chat platform.
pub fn role_sink(config: &Config, dry_run: bool) -> Result<Box<dyn RoleSink>, Box<dyn std::error::Error>> {
    if dry_run {
        return Ok(Box::new(DryRunSink));
    }
    Ok(Box::new(DiscordRoleSink::from_config(&config.discord)?))
}

/// Like [`role_sink`], but a platform that cannot be reached still lets
/// presence changes accrue; grants then fail as events.
pub fn presence_sink(config: &Config, dry_run: bool) -> Box<dyn RoleSink> {
    if dry_run {
        return Box::new(DryRunSink);
    }
    match DiscordRoleSink::from_config(&config.discord) {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            tracing::warn!("discord sink unavailable, recording time only: {e}");
            Box::new(UnavailableSink::new("discord", e.to_string()))
        }
    }
}
