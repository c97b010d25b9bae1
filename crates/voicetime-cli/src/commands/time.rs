use chrono::Utc;
use clap::Subcommand;
use voicetime_core::{admin, SessionQueryService, TimeReport};

use super::{open, CmdResult};

#[derive(Subcommand)]
pub enum TimeAction {
    /// Show a member's voice time, including any open session
    Check {
        member_id: u64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a member's voice time
    Delete { member_id: u64 },
    /// Delete every member's voice time (thresholds are kept)
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(action: TimeAction) -> CmdResult {
    let (_config, db) = open()?;

    match action {
        TimeAction::Check { member_id, json } => {
            let report = SessionQueryService::new(&db).current_total(member_id, Utc::now())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", describe(&report));
            }
        }
        TimeAction::Delete { member_id } => {
            if admin::delete_time(&db, member_id)? {
                println!("Deleted voice chat time for {member_id}.");
            } else {
                println!("{member_id} has no voice chat time recorded.");
            }
        }
        TimeAction::Reset { yes } => {
            if !yes {
                return Err("refusing to reset all voice times without --yes".into());
            }
            let removed = admin::reset_all(&db)?;
            println!("Reset voice chat time for {removed} member(s).");
        }
    }
    Ok(())
}

/// Whole hours, minutes and seconds.
pub fn split_duration(seconds: f64) -> (u64, u64, u64) {
    let total = seconds.max(0.0) as u64;
    (total / 3600, (total % 3600) / 60, total % 60)
}

fn describe(report: &TimeReport) -> String {
    if !report.has_record {
        return format!(
            "{} hasn't spent any time in voice channels yet.",
            report.member_id
        );
    }
    let (hours, minutes, seconds) = split_duration(report.seconds);
    format!(
        "{} has spent {hours} hours, {minutes} minutes, and {seconds} seconds in voice chat.",
        report.member_id
    )
}
