use std::path::PathBuf;

use clap::{Parser, Subcommand};
use taskrank_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "taskrank", version, about = "Rank your tasks by urgency, fit, mood and stress")]
struct Cli {
    /// Path to a TOML config file (default: $TASKRANK_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve,
    /// Task management against the task file
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Install the log subscriber. `RUST_LOG` wins over `default_level`.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(match cli.command {
        Commands::Serve => "info",
        _ => "warn",
    });

    let result = Config::load(cli.config.as_deref())
        .map_err(|e| -> Box<dyn std::error::Error> { Box::new(e) })
        .and_then(|config| match cli.command {
            Commands::Serve => commands::serve::run(&config),
            Commands::Task { action } => commands::task::run(action, &config),
            Commands::Config { action } => commands::config::run(action, &config),
        });

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
