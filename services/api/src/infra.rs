use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use santurist::auth::AuthService;
use santurist::bookings::{TourBookingService, TourRoutesState};
use santurist::cart::CartService;
use santurist::config::AppConfig;
use santurist::error::AppError;
use santurist::onboarding::OnboardingService;
use santurist::payments::{
    MercadoPagoGateway, PaymentGateway, PaymentRoutesState, SandboxGateway,
};
use santurist::providers::{InvitationService, ProviderRoutesState, ProviderService};
use santurist::seeds::{AdminRoutesState, HttpPageFetcher, PageFetcher};
use santurist::store::Store;
use santurist::tours::TourCatalogService;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every domain service, wired against one store.
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) store: Store,
    pub(crate) config: AppConfig,
    pub(crate) auth: Arc<AuthService>,
    pub(crate) catalog: Arc<TourCatalogService>,
    pub(crate) bookings: Arc<TourBookingService>,
    pub(crate) carts: Arc<CartService>,
    pub(crate) providers: Arc<ProviderService>,
    pub(crate) invitations: Arc<InvitationService>,
    pub(crate) onboarding: Arc<OnboardingService>,
    pub(crate) gateway: Arc<dyn PaymentGateway>,
    pub(crate) fetcher: Arc<dyn PageFetcher>,
}

impl Services {
    pub(crate) fn new(
        config: AppConfig,
        store: Store,
        gateway: Arc<dyn PaymentGateway>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        let policy = config.inventory;
        Self {
            auth: Arc::new(AuthService::new(store.clone())),
            catalog: Arc::new(TourCatalogService::new(store.clone(), policy)),
            bookings: Arc::new(TourBookingService::new(
                store.clone(),
                gateway.clone(),
                policy,
            )),
            carts: Arc::new(CartService::new(store.clone(), gateway.clone(), config.cart)),
            providers: Arc::new(ProviderService::new(store.clone())),
            invitations: Arc::new(InvitationService::new(store.clone())),
            onboarding: Arc::new(OnboardingService::new(store.clone())),
            gateway,
            fetcher,
            store,
            config,
        }
    }

    /// Wires the production adapters: Mercado Pago when a token is configured, sandbox otherwise.
    pub(crate) fn from_config(config: AppConfig, store: Store) -> Result<Self, AppError> {
        let gateway: Arc<dyn PaymentGateway> = match &config.payments.access_token {
            Some(token) => {
                info!(api_base = %config.payments.api_base, "using Mercado Pago gateway");
                Arc::new(MercadoPagoGateway::new(
                    token.clone(),
                    config.payments.api_base.clone(),
                    config.payments.back_url.clone(),
                )?)
            }
            None => {
                warn!("MERCADOPAGO_ACCESS_TOKEN not set, payments use the sandbox gateway");
                Arc::new(SandboxGateway::default())
            }
        };
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new()?);
        Ok(Self::new(config, store, gateway, fetcher))
    }

    /// Ensures the configured bootstrap account holds the admin role.
    pub(crate) fn bootstrap_admin(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        match &self.config.admin.bootstrap_uid {
            Some(uid) => {
                self.auth
                    .ensure_admin(uid, &self.config.admin.bootstrap_email, now)?;
                info!(%uid, "bootstrap administrator ready");
            }
            None => warn!("APP_ADMIN_UID not set, admin endpoints need an existing administrator"),
        }
        Ok(())
    }

    pub(crate) fn tour_state(&self) -> TourRoutesState {
        TourRoutesState {
            catalog: self.catalog.clone(),
            bookings: self.bookings.clone(),
        }
    }

    pub(crate) fn payment_state(&self) -> PaymentRoutesState {
        PaymentRoutesState {
            bookings: self.bookings.clone(),
            carts: self.carts.clone(),
            gateway: self.gateway.clone(),
        }
    }

    pub(crate) fn provider_state(&self) -> ProviderRoutesState {
        ProviderRoutesState {
            providers: self.providers.clone(),
            invitations: self.invitations.clone(),
            auth: self.auth.clone(),
        }
    }

    pub(crate) fn admin_state(&self) -> AdminRoutesState {
        AdminRoutesState {
            store: self.store.clone(),
            auth: self.auth.clone(),
            bookings: self.bookings.clone(),
            providers: self.providers.clone(),
            policy: self.config.inventory,
            output_dir: self.config.seeds.output_dir.clone(),
            fetcher: self.fetcher.clone(),
        }
    }
}
