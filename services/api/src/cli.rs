use crate::seed::{run_seed_command, SeedCommand};
use crate::server;
use clap::{Args, Parser, Subcommand};
use santurist::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "santurist",
    about = "Run the Santurist tourism marketplace service and its seed tooling",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Load, export, or scrape mock marketplace data
    Seed {
        #[command(subcommand)]
        command: SeedCommand,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed snapshot (from `seed generate-file`) loaded into the store at startup
    #[arg(long)]
    pub(crate) seed_file: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Seed { command } => run_seed_command(command).await,
    }
}
