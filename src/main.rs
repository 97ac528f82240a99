use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "logbridge")]
#[command(about = "Ships audit-log records to a log listener", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        /// Run a single collection cycle and exit
        #[arg(long)]
        once: bool,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logbridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config_path = logbridge::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run { once }) => {
            logbridge::cli::run::run(config_path, once).await?;
        }
        None => {
            logbridge::cli::run::run(config_path, false).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                logbridge::cli::config::init(stdout)?;
            }
            ConfigAction::Validate => {
                logbridge::cli::config::validate(config_path)?;
            }
        },
    }

    Ok(())
}
