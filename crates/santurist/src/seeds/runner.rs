use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::casa_voyage::{seed_casa_voyage, CasaVoyageSeed};
use super::marketplace::{seed_marketplace, MarketplaceSeed};
use super::tours::{seed_tours, TourSeed};
use super::{SeedError, SeedKind};
use crate::store::{CleanupReport, Store, StoreSnapshot};
use crate::tours::InventoryPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "seed", rename_all = "kebab-case")]
pub enum SeedOutcome {
    CasaVoyage(CasaVoyageSeed),
    Tours(TourSeed),
    Marketplace(MarketplaceSeed),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub casa_voyage: CasaVoyageSeed,
    pub tours: TourSeed,
    pub marketplace: MarketplaceSeed,
}

pub fn run_seed(
    kind: SeedKind,
    store: &Store,
    policy: &InventoryPolicy,
    now: DateTime<Utc>,
) -> Result<SeedOutcome, SeedError> {
    Ok(match kind {
        SeedKind::CasaVoyage => SeedOutcome::CasaVoyage(seed_casa_voyage(store, now)?),
        SeedKind::Tours => SeedOutcome::Tours(seed_tours(store, policy, now)?),
        SeedKind::Marketplace => SeedOutcome::Marketplace(seed_marketplace(store, now)?),
    })
}

/// Runs every seed in order, narrating progress to `out`.
pub fn run_all<W: Write>(
    store: &Store,
    policy: &InventoryPolicy,
    now: DateTime<Utc>,
    out: &mut W,
) -> Result<SeedSummary, SeedError> {
    writeln!(out, "Iniciando carga de datos de prueba...")?;

    writeln!(out, "[1/3] Creando proveedor Casa Voyage...")?;
    let casa_voyage = seed_casa_voyage(store, now)?;
    writeln!(
        out,
        "      Lead {} y alojamiento {} listos. Código de invitación: {}",
        casa_voyage.lead_id, casa_voyage.stay_id, casa_voyage.invitation_code
    )?;

    writeln!(out, "[2/3] Creando catálogo de tours...")?;
    let tours = seed_tours(store, policy, now)?;
    writeln!(
        out,
        "      {} tours y {} salidas nuevas.",
        tours.tours, tours.instances
    )?;

    writeln!(out, "[3/3] Creando proveedores del marketplace...")?;
    let marketplace = seed_marketplace(store, now)?;
    writeln!(
        out,
        "      {} proveedores, {} alojamientos y {} productos nuevos.",
        marketplace.leads, marketplace.stays, marketplace.listings
    )?;

    writeln!(out, "Carga de datos completada.")?;
    Ok(SeedSummary {
        casa_voyage,
        tours,
        marketplace,
    })
}

/// Removes the documents written by one seed.
pub fn cleanup_seed(store: &Store, seed: &str) -> Result<CleanupReport, SeedError> {
    let kind: SeedKind = seed.parse()?;
    let report = store.delete_seeded(Some(kind.seed_id()))?;
    info!(seed = %kind, removed = report.total(), "seed cleaned up");
    Ok(report)
}

pub fn cleanup_all(store: &Store) -> Result<CleanupReport, SeedError> {
    let report = store.delete_seeded(None)?;
    info!(removed = report.total(), "all seeds cleaned up");
    Ok(report)
}

/// Exports the seeded documents, also writing them to `path` when given.
pub fn generate_seed_file(store: &Store, path: Option<&Path>) -> Result<StoreSnapshot, SeedError> {
    let snapshot = StoreSnapshot::capture(store, true)?;

    if let Some(path) = path {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        snapshot.to_writer(&mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), documents = snapshot.document_count(), "seed file written");
    }

    Ok(snapshot)
}
