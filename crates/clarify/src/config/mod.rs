use crate::client::{AuthFailurePolicy, ClientConfig};
use crate::decisions::{MissingEvaluationPolicy, ScoringConfig};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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

/// Top-level configuration for the service and the bundled client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
    pub client: ClientConfig,
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

        let missing_evaluations = match env::var("CLARIFY_MISSING_EVALUATIONS") {
            Ok(raw) => MissingEvaluationPolicy::parse(&raw).ok_or(ConfigError::InvalidPolicy {
                variable: "CLARIFY_MISSING_EVALUATIONS",
                value: raw,
            })?,
            Err(_) => MissingEvaluationPolicy::default(),
        };

        let mut client = ClientConfig::default();
        if let Ok(base_url) = env::var("CLARIFY_API_URL") {
            client = client.with_base_url(base_url);
        }
        if let Ok(raw) = env::var("CLARIFY_REQUEST_TIMEOUT_MS") {
            let timeout_ms = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidTimeout)?;
            client = client.with_timeout_ms(timeout_ms);
        }
        if let Ok(raw) = env::var("CLARIFY_AUTH_FAILURE") {
            let policy = AuthFailurePolicy::parse(&raw).ok_or(ConfigError::InvalidPolicy {
                variable: "CLARIFY_AUTH_FAILURE",
                value: raw,
            })?;
            client = client.with_auth_failure(policy);
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringConfig {
                missing_evaluations,
            },
            client,
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

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidPolicy { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => write!(
                f,
                "CLARIFY_REQUEST_TIMEOUT_MS must be a positive number of milliseconds"
            ),
            ConfigError::InvalidPolicy { variable, value } => {
                write!(f, "{variable} does not accept '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidPolicy { .. } => None,
        }
    }
}
