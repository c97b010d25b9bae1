use clap::Subcommand;
use voicetime_core::platform::discord::{stored_token, TOKEN_KEY};
use voicetime_core::platform::keyring_store;

use super::CmdResult;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store the Discord bot token in the OS keyring
    SetToken { token: String },
    /// Remove the stored bot token
    Clear,
    /// Show whether a bot token is available
    Status,
}

pub fn run(action: AuthAction) -> CmdResult {
    match action {
        AuthAction::SetToken { token } => {
            if token.trim().is_empty() {
                return Err("bot token must not be empty".into());
            }
            keyring_store::set(TOKEN_KEY, token.trim())?;
            println!("Bot token stored.");
        }
        AuthAction::Clear => {
            keyring_store::delete(TOKEN_KEY)?;
            println!("Bot token removed.");
        }
        AuthAction::Status => {
            let status = if stored_token()?.is_some() {
                "configured"
            } else {
                "not configured"
            };
            println!("discord: {status}");
        }
    }
    Ok(())
}
