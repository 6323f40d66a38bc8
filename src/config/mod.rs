use crate::analysis::machine::MachineParameters;
use crate::labels::{SimilarityMetric, SimilarityThreshold};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

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
    pub analysis: AnalysisDefaults,
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
            analysis: AnalysisDefaults::from_env()?,
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

/// Fallbacks applied when a request or CLI invocation leaves a knob unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisDefaults {
    pub similarity_threshold: SimilarityThreshold,
    pub similarity_metric: SimilarityMetric,
    pub machine: MachineParameters,
}

impl AnalysisDefaults {
    fn from_env() -> Result<Self, ConfigError> {
        let fallback = Self::default();

        let threshold = read_var("LINE_SIMILARITY_THRESHOLD", fallback.similarity_threshold.value())?;
        let similarity_threshold = SimilarityThreshold::new(threshold).map_err(|_| {
            ConfigError::InvalidValue {
                key: "LINE_SIMILARITY_THRESHOLD",
                value: threshold.to_string(),
            }
        })?;

        let similarity_metric = match env::var("LINE_SIMILARITY_METRIC") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "LINE_SIMILARITY_METRIC",
                value: raw,
            })?,
            Err(_) => fallback.similarity_metric,
        };

        let machine = MachineParameters {
            expected_cycle_time_secs: read_var(
                "LINE_CYCLE_TIME_SECS",
                fallback.machine.expected_cycle_time_secs,
            )?,
            break_minutes: read_var("LINE_BREAK_MINUTES", fallback.machine.break_minutes)?,
            lunch_minutes: read_var("LINE_LUNCH_MINUTES", fallback.machine.lunch_minutes)?,
            utilization_pct: read_var("LINE_UTILIZATION_PCT", fallback.machine.utilization_pct)?,
        };
        machine.validate().map_err(|err| ConfigError::InvalidMachineDefaults {
            detail: err.to_string(),
        })?;

        Ok(Self {
            similarity_threshold,
            similarity_metric,
            machine,
        })
    }
}

fn read_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
    InvalidMachineDefaults { detail: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
            }
            ConfigError::InvalidMachineDefaults { detail } => {
                write!(f, "machine defaults rejected: {detail}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::InvalidMachineDefaults { .. } => None,
        }
    }
}
