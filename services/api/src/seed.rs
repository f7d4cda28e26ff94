use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use santurist::config::AppConfig;
use santurist::error::AppError;
use santurist::seeds::{
    generate_seed_file, run_all, run_seed, scrape_provider, HttpPageFetcher, SeedError, SeedKind,
    SeedOutcome,
};
use santurist::store::Store;
use santurist::telemetry;
use santurist::tours::InventoryPolicy;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub(crate) enum SeedCommand {
    /// Run the mock data seeds, printing progress
    Run(SeedRunArgs),
    /// Run every seed and export the seeded documents as a JSON snapshot
    GenerateFile(GenerateFileArgs),
    /// Fetch a provider web page and print the contact details found on it
    Scrape(ScrapeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct SeedRunArgs {
    /// Run a single seed: casa-voyage, tours or marketplace
    #[arg(long)]
    pub(crate) only: Option<String>,
    /// Also write the seeded documents to this snapshot file
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct GenerateFileArgs {
    /// Destination of the JSON snapshot
    #[arg(long)]
    pub(crate) output: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct ScrapeArgs {
    /// Provider page to scrape (http or https)
    #[arg(long)]
    pub(crate) url: String,
}

pub(crate) async fn run_seed_command(command: SeedCommand) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_cli(&config.telemetry)?;

    let store = Store::in_memory();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        SeedCommand::Run(args) => {
            execute_seed_run(args, &store, &config.inventory, Utc::now(), &mut out)
        }
        SeedCommand::GenerateFile(args) => {
            let run = SeedRunArgs {
                only: None,
                output: Some(args.output),
            };
            execute_seed_run(run, &store, &config.inventory, Utc::now(), &mut out)
        }
        SeedCommand::Scrape(args) => {
            let fetcher = HttpPageFetcher::new()?;
            let scraped = scrape_provider(&fetcher, &args.url).await?;
            let rendered = serde_json::to_string_pretty(&scraped).map_err(SeedError::from)?;
            writeln!(out, "{rendered}")?;
            Ok(())
        }
    }
}

pub(crate) fn execute_seed_run<W: Write>(
    args: SeedRunArgs,
    store: &Store,
    policy: &InventoryPolicy,
    now: DateTime<Utc>,
    out: &mut W,
) -> Result<(), AppError> {
    match args.only.as_deref() {
        Some(name) => {
            let kind: SeedKind = name.parse()?;
            let outcome = run_seed(kind, store, policy, now)?;
            writeln!(out, "{}", describe(&outcome))?;
        }
        None => {
            run_all(store, policy, now, out)?;
        }
    }

    if let Some(path) = args.output {
        let snapshot = generate_seed_file(store, Some(&path))?;
        writeln!(
            out,
            "Archivo de datos escrito en {} ({} documentos).",
            path.display(),
            snapshot.document_count()
        )?;
    }
    Ok(())
}

fn describe(outcome: &SeedOutcome) -> String {
    match outcome {
        SeedOutcome::CasaVoyage(seed) => format!(
            "Casa Voyage listo: lead {}, alojamiento {}, invitación {}.",
            seed.lead_id, seed.stay_id, seed.invitation_code
        ),
        SeedOutcome::Tours(seed) => format!(
            "Catálogo de tours listo: {} tours y {} salidas nuevas.",
            seed.tours, seed.instances
        ),
        SeedOutcome::Marketplace(seed) => format!(
            "Marketplace listo: {} proveedores, {} alojamientos y {} productos nuevos.",
            seed.leads, seed.stays, seed.listings
        ),
    }
}
