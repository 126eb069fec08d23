mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "skyshield",
    about = "Satellite streak detection and orbital sky-brightness estimation"
)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a folder of FITS frames: masks, quality, night and ODC reports
    Run(commands::run::RunArgs),
    /// Detect streaks in a single frame
    Detect(commands::detect::DetectArgs),
    /// Score a detector against a labelled dataset
    Validate(commands::validate::ValidateArgs),
    /// Natural sky brightness for a time and site
    Sky(commands::sky::SkyArgs),
    /// Show FITS header and derived observation context
    Info(commands::info::InfoArgs),
    /// Print or save the default pipeline config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Detect(args) => commands::detect::run(args),
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Sky(args) => commands::sky::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
