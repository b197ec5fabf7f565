use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEVELOPMENT_JWT_SECRET: &str = "agazh-development-secret";
/// One year; longer lifetimes are refused.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

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

/// Top-level configuration for the service and the client tooling.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub auth: AuthConfig,
    pub notifications: NotificationConfig,
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

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingJwtSecret)
            }
            _ => DEVELOPMENT_JWT_SECRET.to_string(),
        };
        let token_ttl_hours = env::var("JWT_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse::<i64>()
            .ok()
            .filter(|hours| (1..=MAX_TOKEN_TTL_HOURS).contains(hours))
            .ok_or(ConfigError::InvalidTokenTtl)?;

        let admin_email = env::var("ADMIN_EMAIL")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let api_base_url = env::var("AGAZH_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000/api/v1".to_string());
        let session_path = env::var("AGAZH_SESSION_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".agazh-session.json"));
        let request_timeout = match env::var("AGAZH_API_TIMEOUT_SECS") {
            Ok(raw) => Some(Duration::from_secs(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout)?,
            )),
            Err(_) => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            auth: AuthConfig {
                jwt_secret,
                token_ttl_hours,
            },
            notifications: NotificationConfig { admin_email },
            client: ClientConfig {
                api_base_url,
                session_path,
                request_timeout,
            },
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

/// Token signing settings.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

/// Where hiring notifications are addressed.
#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    pub admin_email: Option<String>,
}

/// Settings used by the client SDK and the CLI client commands.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub session_path: PathBuf,
    pub request_timeout: Option<Duration>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingJwtSecret,
    InvalidTokenTtl,
    InvalidTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingJwtSecret => {
                write!(f, "JWT_SECRET must be set when APP_ENV is production")
            }
            ConfigError::InvalidTokenTtl => {
                write!(
                    f,
                    "JWT_TTL_HOURS must be a whole number of hours between 1 and {MAX_TOKEN_TTL_HOURS}"
                )
            }
            ConfigError::InvalidTimeout => {
                write!(f, "AGAZH_API_TIMEOUT_SECS must be a whole number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::MissingJwtSecret
            | ConfigError::InvalidTokenTtl
            | ConfigError::InvalidTimeout => None,
        }
    }
}
