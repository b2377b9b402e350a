//! Cantor CLI - command-line interface for the cantor synthesizer.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cantor")]
#[command(author, version, about = "Cantor polyphonic synthesizer CLI", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user configuration if present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the instrument catalog
    Instruments(commands::instruments::InstrumentsArgs),

    /// Print one instrument in full
    Show(commands::show::ShowArgs),

    /// Build a voice and print its node graph and envelope
    Inspect(commands::inspect::InspectArgs),

    /// Print the effective configuration
    Config(commands::config::ConfigArgs),

    /// Play notes on the default output device
    #[cfg(feature = "playback")]
    Play(commands::play::PlayArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Instruments(args) => commands::instruments::run(args, config),
        Commands::Show(args) => commands::show::run(args, config),
        Commands::Inspect(args) => commands::inspect::run(args, config),
        Commands::Config(args) => commands::config::run(args, config),
        #[cfg(feature = "playback")]
        Commands::Play(args) => commands::play::run(args, config),
    }
}
