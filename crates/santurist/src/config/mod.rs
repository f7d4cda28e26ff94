use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::cart::FeeConfig;
use crate::tours::InventoryPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the marketplace service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub payments: PaymentsConfig,
    pub cart: FeeConfig,
    pub inventory: InventoryPolicy,
    pub seeds: SeedConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let payments = PaymentsConfig {
            access_token: env::var("MERCADOPAGO_ACCESS_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            api_base: env::var("MERCADOPAGO_API_BASE")
                .unwrap_or_else(|_| "https://api.mercadopago.com".to_string()),
            back_url: env::var("PAYMENT_BACK_URL")
                .unwrap_or_else(|_| "http://localhost:3000/checkout/resultado".to_string()),
        };

        let defaults = FeeConfig::default();
        let cart = FeeConfig {
            service_fee_percent: parse_var("CART_SERVICE_FEE_PERCENT", defaults.service_fee_percent)?,
            delivery_fee: parse_var("CART_DELIVERY_FEE", defaults.delivery_fee)?,
            delivery_enabled: parse_var("CART_DELIVERY_ENABLED", defaults.delivery_enabled)?,
            free_delivery_threshold: parse_optional_var("CART_FREE_DELIVERY_THRESHOLD")?,
        };

        let policy = InventoryPolicy::default();
        let inventory = InventoryPolicy {
            almost_full_percent: parse_var("TOUR_ALMOST_FULL_PERCENT", policy.almost_full_percent)?,
            pricing_window_hours: parse_var(
                "TOUR_PRICING_WINDOW_HOURS",
                policy.pricing_window_hours,
            )?,
            cancel_cutoff_hours: parse_var("TOUR_CANCEL_CUTOFF_HOURS", policy.cancel_cutoff_hours)?,
            ..policy
        };

        let seeds = SeedConfig {
            output_dir: PathBuf::from(
                env::var("SEED_OUTPUT_DIR").unwrap_or_else(|_| "seed-data".to_string()),
            ),
        };

        let admin = AdminConfig {
            bootstrap_uid: env::var("APP_ADMIN_UID")
                .ok()
                .map(|uid| uid.trim().to_string())
                .filter(|uid| !uid.is_empty()),
            bootstrap_email: env::var("APP_ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@santurist.cl".to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            payments,
            cart,
            inventory,
            seeds,
            admin,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        _ => Ok(default),
    }
}

fn parse_optional_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        _ => Ok(None),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Mercado Pago credentials; without a token the sandbox gateway is used.
#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    pub access_token: Option<String>,
    pub api_base: String,
    pub back_url: String,
}

/// Where generated seed files are written.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub output_dir: PathBuf,
}

/// Account promoted to administrator at startup so the back office is reachable.
#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    pub bootstrap_uid: Option<String>,
    pub bootstrap_email: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "{name} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "MERCADOPAGO_ACCESS_TOKEN",
            "APP_ADMIN_UID",
            "APP_ADMIN_EMAIL",
            "CART_SERVICE_FEE_PERCENT",
            "CART_DELIVERY_FEE",
            "CART_DELIVERY_ENABLED",
            "CART_FREE_DELIVERY_THRESHOLD",
            "TOUR_ALMOST_FULL_PERCENT",
            "TOUR_PRICING_WINDOW_HOURS",
            "TOUR_CANCEL_CUTOFF_HOURS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.payments.access_token.is_none());
        assert_eq!(config.cart.service_fee_percent, 12);
        assert!(!config.cart.delivery_enabled);
        assert_eq!(config.inventory, InventoryPolicy::default());
        assert!(config.admin.bootstrap_uid.is_none());
    }

    #[test]
    fn reads_admin_bootstrap_account() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ADMIN_UID", " ops ");
        env::set_var("APP_ADMIN_EMAIL", "ops@santurist.cl");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.admin.bootstrap_uid.as_deref(), Some("ops"));
        assert_eq!(config.admin.bootstrap_email, "ops@santurist.cl");
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_fee_and_inventory_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CART_DELIVERY_ENABLED", "true");
        env::set_var("CART_FREE_DELIVERY_THRESHOLD", "30000");
        env::set_var("TOUR_PRICING_WINDOW_HOURS", "48");
        let config = AppConfig::load().expect("config loads");
        assert!(config.cart.delivery_enabled);
        assert_eq!(config.cart.free_delivery_threshold, Some(30_000));
        assert_eq!(config.inventory.pricing_window_hours, 48);
        reset_env();
    }

    #[test]
    fn rejects_invalid_numbers() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CART_SERVICE_FEE_PERCENT", "twelve");
        match AppConfig::load() {
            Err(ConfigError::InvalidValue { name, .. }) => {
                assert_eq!(name, "CART_SERVICE_FEE_PERCENT")
            }
            other => panic!("expected invalid value, got {other:?}"),
        }
        reset_env();
    }
}
