use clap::Subcommand;
use voicetime_core::admin;

use super::{open, CmdResult};

#[derive(Subcommand)]
pub enum ThresholdAction {
    /// Assign a role once a member reaches the given voice minutes
    Add { role_id: u64, minutes: f64 },
    /// Remove every threshold for a role
    Remove { role_id: u64 },
    /// List all thresholds
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: ThresholdAction) -> CmdResult {
    let (_config, db) = open()?;

    match action {
        ThresholdAction::Add { role_id, minutes } => {
            let record = admin::add_threshold(&db, role_id, minutes)?;
            println!(
                "Threshold added: role {} will be assigned after {} minutes in voice chat.",
                record.role_id, record.required_minutes
            );
        }
        ThresholdAction::Remove { role_id } => {
            let removed = admin::remove_threshold(&db, role_id)?;
            if removed == 0 {
                println!("No threshold set for role {role_id}.");
            } else {
                println!("Threshold for role {role_id} has been removed.");
            }
        }
        ThresholdAction::List { json } => {
            let thresholds = admin::list_thresholds(&db)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&thresholds)?);
            } else if thresholds.is_empty() {
                println!("No thresholds set.");
            } else {
                println!("Current role thresholds:");
                for t in thresholds {
                    println!("  role {}: {} minutes", t.role_id, t.required_minutes);
                }
            }
        }
    }
    Ok(())
}
