use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub marketplace: MarketplaceConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            marketplace: MarketplaceConfig::from_env()?,
        })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Upper bound for `MARKET_RECENT_APPOINTMENT_DAYS`, roughly a century.
pub const MAX_RECENT_APPOINTMENT_DAYS: u32 = 36_500;

/// Knobs for the listing, activity and lease services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceConfig {
    /// Storage prefix under which listing media is uploaded.
    pub media_root: String,
    pub recent_appointment_days: u32,
    pub lease_request_timeout: Duration,
    /// Client identifier returned alongside signature claims.
    pub signature_client_id: String,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            media_root: "listing_images".to_string(),
            recent_appointment_days: 14,
            lease_request_timeout: Duration::from_secs(300),
            signature_client_id: "demo-client".to_string(),
        }
    }
}

impl MarketplaceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let media_root = env::var("MARKET_MEDIA_ROOT")
            .map(|root| root.trim_matches('/').to_string())
            .unwrap_or(defaults.media_root);
        if media_root.is_empty() {
            return Err(ConfigError::EmptyMediaRoot);
        }

        let recent_appointment_days = match env::var("MARKET_RECENT_APPOINTMENT_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidNumber("MARKET_RECENT_APPOINTMENT_DAYS"))?,
            Err(_) => defaults.recent_appointment_days,
        };
        if recent_appointment_days > MAX_RECENT_APPOINTMENT_DAYS {
            return Err(ConfigError::OutOfRange {
                name: "MARKET_RECENT_APPOINTMENT_DAYS",
                max: u64::from(MAX_RECENT_APPOINTMENT_DAYS),
            });
        }

        let lease_request_timeout = match env::var("MARKET_LEASE_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidNumber("MARKET_LEASE_REQUEST_TIMEOUT_SECS"))?,
            Err(_) => defaults.lease_request_timeout,
        };

        let signature_client_id =
            env::var("MARKET_SIGNATURE_CLIENT_ID").unwrap_or(defaults.signature_client_id);

        Ok(Self {
            media_root,
            recent_appointment_days,
            lease_request_timeout,
            signature_client_id,
        })
    }

    pub fn recent_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.recent_appointment_days))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber(&'static str),
    OutOfRange { name: &'static str, max: u64 },
    EmptyMediaRoot,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber(name) => {
                write!(f, "{name} must be a non-negative integer")
            }
            ConfigError::OutOfRange { name, max } => write!(f, "{name} must be at most {max}"),
            ConfigError::EmptyMediaRoot => write!(f, "MARKET_MEDIA_ROOT must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber(_)
            | ConfigError::OutOfRange { .. }
            | ConfigError::EmptyMediaRoot => None,
        }
    }
}
