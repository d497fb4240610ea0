use crate::scoring::RankingOptions;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
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
    pub scoring: ScoringConfig,
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
            scoring: ScoringConfig::from_env()?,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Ranking fan-out limits and the CSV exports backing the collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub max_concurrency: usize,
    pub member_timeout: Option<Duration>,
    pub facts_csv: Option<PathBuf>,
    pub targets_csv: Option<PathBuf>,
    /// Brand to squad assignments, e.g. `SCOREBOARD_SQUADS=acme=Squad A,globex=Squad B`.
    pub squads: Vec<(String, String)>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_concurrency: RankingOptions::default().max_concurrency,
            member_timeout: None,
            facts_csv: None,
            targets_csv: None,
            squads: Vec::new(),
        }
    }
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_concurrency = match env::var("SCOREBOARD_MAX_CONCURRENCY") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidConcurrency),
            },
            Err(_) => defaults.max_concurrency,
        };

        let member_timeout = match env::var("SCOREBOARD_MEMBER_TIMEOUT_MS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(millis) if millis > 0 => Some(Duration::from_millis(millis)),
                _ => return Err(ConfigError::InvalidTimeout),
            },
            Err(_) => None,
        };

        let squads = match env::var("SCOREBOARD_SQUADS") {
            Ok(raw) => parse_squad_assignments(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            max_concurrency,
            member_timeout,
            facts_csv: env::var_os("SCOREBOARD_FACTS_CSV").map(PathBuf::from),
            targets_csv: env::var_os("SCOREBOARD_TARGETS_CSV").map(PathBuf::from),
            squads,
        })
    }

    pub fn ranking_options(&self) -> RankingOptions {
        RankingOptions {
            max_concurrency: self.max_concurrency,
            member_timeout: self.member_timeout,
        }
    }
}

/// Parse `brand=squad` pairs separated by commas.
pub fn parse_squad_assignments(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_squad_assignment)
        .collect()
}

/// Parse a single `brand=squad` pair.
pub fn parse_squad_assignment(raw: &str) -> Result<(String, String), ConfigError> {
    match raw.split_once('=') {
        Some((brand, squad)) if !brand.trim().is_empty() && !squad.trim().is_empty() => {
            Ok((brand.trim().to_string(), squad.trim().to_string()))
        }
        _ => Err(ConfigError::InvalidSquadAssignment(raw.to_string())),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidConcurrency,
    InvalidTimeout,
    InvalidSquadAssignment(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidConcurrency => {
                write!(f, "SCOREBOARD_MAX_CONCURRENCY must be a positive integer")
            }
            ConfigError::InvalidTimeout => write!(
                f,
                "SCOREBOARD_MEMBER_TIMEOUT_MS must be a positive number of milliseconds"
            ),
            ConfigError::InvalidSquadAssignment(raw) => {
                write!(f, "squad assignment '{raw}' must look like brand=squad")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
