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
    pub geocoder: GeocoderConfig,
    pub sessions: SessionConfig,
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

        let access_token = env::var("MAPBOX_ACCESS_TOKEN")
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        let base_url =
            env::var("MAPBOX_BASE_URL").unwrap_or_else(|_| DEFAULT_MAPBOX_BASE_URL.to_string());
        let timeout_secs = parse_number::<u64>("GEOCODER_TIMEOUT_SECS", 10)?;
        let sessions = SessionConfig {
            ttl_hours: parse_number::<i64>("SESSION_TTL_HOURS", 24 * 7)?,
        };
        sessions.ttl()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            geocoder: GeocoderConfig {
                access_token,
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            sessions,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

const DEFAULT_MAPBOX_BASE_URL: &str = "https://api.mapbox.com";

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

/// Mapbox geocoding settings. Without an access token the service falls back
/// to the built-in zip table.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub access_token: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

/// Upper bound on session lifetime: one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub ttl_hours: i64,
}

impl SessionConfig {
    /// Session lifetime, rejected unless within `1..=MAX_SESSION_TTL_HOURS`.
    pub fn ttl(&self) -> Result<chrono::Duration, ConfigError> {
        let out_of_range = ConfigError::OutOfRange {
            key: "SESSION_TTL_HOURS",
            min: 1,
            max: MAX_SESSION_TTL_HOURS,
        };
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.ttl_hours) {
            return Err(out_of_range);
        }
        chrono::Duration::try_hours(self.ttl_hours).ok_or(out_of_range)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    OutOfRange { key: &'static str, min: i64, max: i64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a positive whole number")
            }
            ConfigError::OutOfRange { key, min, max } => {
                write!(f, "{key} must be between {min} and {max}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::OutOfRange { .. } => None,
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "MAPBOX_ACCESS_TOKEN",
            "MAPBOX_BASE_URL",
            "GEOCODER_TIMEOUT_SECS",
            "SESSION_TTL_HOURS",
        ] {
            env::remove_var(key);
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
        assert!(config.geocoder.access_token.is_none());
        assert_eq!(config.geocoder.base_url, "https://api.mapbox.com");
        assert_eq!(config.geocoder.timeout, Duration::from_secs(10));
        assert_eq!(config.sessions.ttl_hours, 168);
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
    fn blank_mapbox_token_is_treated_as_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MAPBOX_ACCESS_TOKEN", "   ");
        let config = AppConfig::load().expect("config loads");
        assert!(config.geocoder.access_token.is_none());
        reset_env();
    }

    #[test]
    fn rejects_non_positive_session_ttl() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SESSION_TTL_HOURS", "0");
        let err = AppConfig::load().expect_err("zero ttl rejected");
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                key: "SESSION_TTL_HOURS",
                ..
            }
        ));
        reset_env();
    }

    #[test]
    fn rejects_session_ttl_beyond_a_year() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SESSION_TTL_HOURS", "10000000000");
        let err = AppConfig::load().expect_err("oversized ttl rejected");
        assert!(err.to_string().contains("between 1 and 8760"));
        reset_env();
    }

    #[test]
    fn ttl_guards_values_set_directly() {
        let huge = SessionConfig {
            ttl_hours: 3_000_000_000_000,
        };
        assert!(huge.ttl().is_err());

        let week = SessionConfig { ttl_hours: 168 };
        assert_eq!(week.ttl().expect("in range"), chrono::Duration::hours(168));
    }
}
