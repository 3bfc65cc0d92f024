//! Blockstage CLI - run the stage from a terminal
//!
//! `demo` steps the default cast tick by tick and prints a JSON snapshot per
//! tick; `run` plays it in real time through the async driver.

use anyhow::Context;
use blockstage::runtime::driver::{Driver, DriverExit};
use blockstage::runtime::{Stage, StageConfig};
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "blockstage")]
#[command(about = "Tick-driven sprite animation runtime", long_about = None)]
struct Cli {
    /// JSON stage configuration (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Step the default cast and print a snapshot after every tick
    Demo {
        /// Maximum number of ticks to run
        #[arg(short, long, default_value = "100")]
        ticks: usize,
    },

    /// Play the default cast in real time
    Run {
        /// Give up after this many seconds
        #[arg(short, long, default_value = "60")]
        seconds: u64,
    },

    /// Print the effective configuration
    Config,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<StageConfig> {
    match path {
        Some(path) => StageConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(StageConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Demo { ticks } => {
            let mut stage = Stage::with_default_cast(config)?;
            stage.play();
            println!("{}", serde_json::to_string(&stage.snapshot())?);

            for _ in 0..ticks {
                if !stage.is_running() {
                    break;
                }
                let period = stage.config().tick_period();
                stage.advance_time(period);
                println!("{}", serde_json::to_string(&stage.snapshot())?);
            }
        }

        Commands::Run { seconds } => {
            let mut stage = Stage::with_default_cast(config)?;
            stage.subscribe(|event: &blockstage::runtime::StageEvent| {
                tracing::debug!(?event, "stage event");
            });
            stage.play();

            let shared = Arc::new(Mutex::new(stage));
            let exit = Driver::new(Arc::clone(&shared))
                .with_limit(Duration::from_secs(seconds))
                .run()
                .await;

            let snapshot = shared.lock().snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            if exit == DriverExit::TimedOut {
                tracing::info!(seconds, "stopped at time limit");
            }
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
