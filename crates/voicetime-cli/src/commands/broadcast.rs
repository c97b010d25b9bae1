use chrono::Utc;
use clap::Subcommand;
use voicetime_core::broadcast::reset_schedule;
use voicetime_core::{BroadcastOutcome, Broadcaster};

use super::{open, role_sink, CmdResult};

#[derive(Subcommand)]
pub enum BroadcastAction {
    /// Configure the message and the channel it is posted to
    Set {
        channel_id: u64,
        message: String,
        #[arg(long, default_value_t = 12)]
        interval_hours: u64,
    },
    /// Stop broadcasting
    Stop,
    /// Post the message if the interval has passed (run from cron or a timer)
    Tick {
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run(action: BroadcastAction) -> CmdResult {
    let (mut config, db) = open()?;

    match action {
        BroadcastAction::Set {
            channel_id,
            message,
            interval_hours,
        } => {
            if interval_hours == 0 {
                return Err("--interval-hours must be at least 1".into());
            }
            config.broadcast.channel_id = Some(channel_id);
            config.broadcast.message = Some(message);
            config.broadcast.interval_hours = interval_hours;
            config.save()?;
            reset_schedule(&db)?;
            println!(
                "Automated message set for channel {channel_id}. Message will be sent every {interval_hours} hours."
            );
        }
        BroadcastAction::Stop => {
            config.broadcast.channel_id = None;
            config.broadcast.message = None;
            config.save()?;
            println!("Automated messaging stopped.");
        }
        BroadcastAction::Tick { dry_run } => {
            let sink = role_sink(&config, dry_run)?;
            let outcome = Broadcaster::new(&db, sink.as_ref(), &config.broadcast).tick(Utc::now())?;
            match &outcome {
                BroadcastOutcome::Disabled => println!("Automated messaging is not configured."),
                BroadcastOutcome::NotDue { next_at } => {
                    println!("Next message due at {}.", next_at.to_rfc3339())
                }
                BroadcastOutcome::Sent { .. } => println!("Message sent."),
            }
        }
    }
    Ok(())
}

