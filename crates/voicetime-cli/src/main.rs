use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "voicetime-cli", version, about = "Voice time tracking and role thresholds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Member voice time queries and maintenance
    Time {
        #[command(subcommand)]
        action: commands::time::TimeAction,
    },
    /// Role threshold management
    Threshold {
        #[command(subcommand)]
        action: commands::threshold::ThresholdAction,
    },
    /// Feed voice presence changes into the tracker
    Presence {
        #[command(subcommand)]
        action: commands::presence::PresenceAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Bot token management
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Periodic channel broadcast
    Broadcast {
        #[command(subcommand)]
        action: commands::broadcast::BroadcastAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("VOICETIME_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Time { action } => commands::time::run(action),
        Commands::Threshold { action } => commands::threshold::run(action),
        Commands::Presence { action } => commands::presence::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action),
        Commands::Broadcast { action } => commands::broadcast::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
