use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::{ConfigCommand, EventCommand, HabitCommand};
use habit_store::config::Config;
use habit_store::selector::Repositories;

#[derive(Parser)]
#[command(name = "habits")]
#[command(version)]
#[command(about = "A habit tracking CLI with local and remote storage", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage habits
    Habit(HabitCommand),

    /// Record and inspect habit events
    Event(EventCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "habit_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Habit(cmd)) => {
            let repos = Repositories::global(&config).await?;
            cmd.run(repos).await?;
        }
        Some(Commands::Event(cmd)) => {
            let repos = Repositories::global(&config).await?;
            cmd.run(repos).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
