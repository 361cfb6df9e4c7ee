mod cmd;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "execapi",
    about = "Trigger pre-registered commands over authenticated HTTP",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the config file (.json, or .yaml/.yml)
    #[arg(long, global = true, env = "EXECAPI_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Address to listen on
    #[arg(long, global = true, env = "EXECAPI_LISTEN", default_value = "localhost:8080")]
    listen: String,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the configured actions over HTTP (default)
    Serve,

    /// Validate the config file and report problems
    Check,

    /// List the configured actions
    List,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        None | Some(Commands::Serve) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        None | Some(Commands::Serve) => cmd::serve::run(&cli.config, &cli.listen),
        Some(Commands::Check) => cmd::check::run(&cli.config, cli.json),
        Some(Commands::List) => cmd::list::run(&cli.config, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
