use crate::cli::ServeArgs;
use crate::infra::{AppState, Services};
use crate::routes::with_domain_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use santurist::config::AppConfig;
use santurist::error::AppError;
use santurist::seeds::SeedError;
use santurist::store::{Store, StoreSnapshot};
use santurist::telemetry;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Store::in_memory();
    if let Some(path) = args.seed_file.take() {
        load_seed_file(&store, &path)?;
    }

    let addr = config.server.socket_addr()?;
    let environment = config.environment;
    let services = Services::from_config(config, store)?;
    services.bootstrap_admin(chrono::Utc::now())?;

    let app = with_domain_routes(&services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?environment, %addr, "santurist marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn load_seed_file(store: &Store, path: &Path) -> Result<(), AppError> {
    let reader = BufReader::new(File::open(path)?);
    let snapshot = StoreSnapshot::from_reader(reader).map_err(SeedError::from)?;
    let restored = snapshot.restore(store)?;
    info!(path = %path.display(), restored, "seed file loaded");
    Ok(())
}
