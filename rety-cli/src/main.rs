//! rety CLI - Command-line tools for action logs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rety_core::action::{ActionLog, pack, unpack};
use rety_core::config::{PausePolicy, RetyConfig};
use rety_core::events::ReplayEvent;
use rety_core::replay::Replayer;
use rety_core::router::SurfaceRouter;
use rety_core::surface::{BufferEditor, TextBuffer};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rety")]
#[command(about = "Record and replay text edits", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to rety.toml, then RETY_CONFIG_PATH)
    #[arg(short, long, global = true, env = "RETY_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compact a log into its packed form
    Pack {
        /// Log file, packed or expanded
        input: PathBuf,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Expand a packed log into one action per step
    Unpack {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replay a log against in-memory surfaces and print the result
    Replay {
        input: PathBuf,
        /// Surface ids to route between; repeat for several
        #[arg(short, long = "surface")]
        surfaces: Vec<String>,
        /// Base delay between actions in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// What to do with recorded pauses
        #[arg(long, value_enum)]
        pauses: Option<PauseArg>,
    },
    /// Print the effective configuration
    Config,
    /// Version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum PauseArg {
    Delay,
    Pause,
    Ignore,
}

impl From<PauseArg> for PausePolicy {
    fn from(arg: PauseArg) -> Self {
        match arg {
            PauseArg::Delay => PausePolicy::Delay,
            PauseArg::Pause => PausePolicy::Pause,
            PauseArg::Ignore => PausePolicy::Ignore,
        }
    }
}

fn read_log(path: &Path) -> Result<ActionLog> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    ActionLog::from_json(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json(value: &Value, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RetyConfig> {
    let config = match path {
        Some(path) => RetyConfig::from_file(path)?,
        None => RetyConfig::load()?,
    };
    Ok(config)
}

async fn replay(
    log: &ActionLog,
    surfaces: Vec<String>,
    mut config: RetyConfig,
    delay_ms: Option<u64>,
    pauses: Option<PauseArg>,
) -> Result<()> {
    if let Some(ms) = delay_ms {
        config.replay.delay = Duration::from_millis(ms);
    }
    if let Some(pauses) = pauses {
        config.replay.pauses = pauses.into();
    }

    let router = if surfaces.is_empty() {
        SurfaceRouter::single(TextBuffer::new("default"))
    } else {
        SurfaceRouter::from_map(
            surfaces
                .into_iter()
                .map(|id| (id.clone(), TextBuffer::new(id))),
        )
    };

    let mut replayer = Replayer::new(router, BufferEditor, config.replay);
    replayer.on("played", |event| {
        let ReplayEvent::Played { action } = event;
        tracing::info!(action = %action.type_name(), editor = ?action.editor, "Played");
    });

    replayer.run_all(log).await?;

    for (id, surface) in replayer.surfaces().iter() {
        println!("--- {id} ---");
        println!("{}", surface.text());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("rety {}", env!("CARGO_PKG_VERSION"));
            println!("rety-core {}", rety_core::VERSION);
        }
        Commands::Pack { input, output } => {
            let log = read_log(&input)?;
            let packed = pack(unpack(&log));
            tracing::info!(before = log.len(), after = packed.len(), "Packed log");
            write_json(&packed.to_value(), output.as_deref())?;
        }
        Commands::Unpack { input, output } => {
            let log = read_log(&input)?;
            let expanded: Vec<Value> = unpack(&log)
                .iter()
                .map(|action| Value::Object(action.to_object()))
                .collect();
            write_json(&Value::Array(expanded), output.as_deref())?;
        }
        Commands::Replay {
            input,
            surfaces,
            delay_ms,
            pauses,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let log = read_log(&input)?;
            replay(&log, surfaces, config, delay_ms, pauses).await?;
        }
        Commands::Config => {
            let config = load_config(cli.config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
