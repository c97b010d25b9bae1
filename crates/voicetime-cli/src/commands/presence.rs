use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::Subcommand;
use voicetime_core::{
    NotificationPolicy, PresenceTracker, ThresholdEvaluator, VoiceStateChange,
};

use super::{open, presence_sink, CmdResult};

#[derive(Subcommand)]
pub enum PresenceAction {
    /// Apply a single voice state change
    Update {
        member_id: u64,
        /// Channel the member was in before the change
        #[arg(long)]
        from: Option<u64>,
        /// Channel the member is in after the change
        #[arg(long)]
        to: Option<u64>,
        #[arg(long)]
        guild: Option<u64>,
        /// Time of the change (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// Log platform actions instead of performing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply voice state changes from a JSON-lines file, in order
    Replay {
        file: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run(action: PresenceAction) -> CmdResult {
    let (config, db) = open()?;

    let (changes, dry_run) = match action {
        PresenceAction::Update {
            member_id,
            from,
            to,
            guild,
            at,
            dry_run,
        } => {
            let change = VoiceStateChange {
                member_id,
                guild_id: guild.or(config.discord.guild_id),
                previous_channel: from,
                new_channel: to,
                at: at.unwrap_or_else(Utc::now),
            };
            (vec![change], dry_run)
        }
        PresenceAction::Replay { file, dry_run } => (read_changes(&file)?, dry_run),
    };

    let sink = presence_sink(&config, dry_run);
    let policy = NotificationPolicy::from(&config.notifications);
    let tracker = PresenceTracker::new(&db, ThresholdEvaluator::new(&db, sink.as_ref(), policy));

    for change in &changes {
        let outcome = tracker.on_presence_change(change)?;
        for event in &outcome.events {
            println!("{}", serde_json::to_string(event)?);
        }
    }
    Ok(())
}

fn read_changes(path: &Path) -> Result<Vec<VoiceStateChange>, Box<dyn std::error::Error>> {
    let file = std::fs::File::open(path)?;
    let mut changes = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let change: VoiceStateChange = serde_json::from_str(&line)
            .map_err(|e| format!("{}:{}: {e}", path.display(), index + 1))?;
        changes.push(change);
    }
    Ok(changes)
}
