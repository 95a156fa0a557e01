use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Longest accepted access-token lifetime (one year).
pub const MAX_TOKEN_TTL_MINUTES: u64 = 525_600;
/// Longest accepted simulated provisioning run (one day).
pub const MAX_PROVISIONING_SECS: u64 = 86_400;
pub const MAX_WORKER_CONCURRENCY: u64 = 256;

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
    pub auth: AuthConfig,
    pub worker: WorkerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let auth = AuthConfig {
            jwt_secret: env::var("JWT_SECRET_KEY")
                .unwrap_or_else(|_| "local-dev-secret".to_string()),
            username: env::var("APP_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            password: env::var("APP_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "password123".to_string()),
            token_ttl_minutes: parse_number(
                "APP_TOKEN_TTL_MINUTES",
                60,
                MAX_TOKEN_TTL_MINUTES,
            )?,
        };

        let concurrency = parse_number("WORKER_CONCURRENCY", 2, MAX_WORKER_CONCURRENCY)?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidNumber {
                var: "WORKER_CONCURRENCY",
            });
        }

        let worker = WorkerConfig {
            concurrency: concurrency as usize,
            provisioning_duration: Duration::from_secs(parse_number(
                "PROVISIONING_DURATION_SECS",
                15,
                MAX_PROVISIONING_SECS,
            )?),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            auth,
            worker,
        })
    }
}

fn parse_number(var: &'static str, default: u64, max: u64) -> Result<u64, ConfigError> {
    let value = match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { var })?,
        Err(_) => default,
    };

    if value > max {
        return Err(ConfigError::OutOfRange { var, max });
    }
    Ok(value)
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

/// Operator credentials and token signing settings.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub username: String,
    pub password: String,
    pub token_ttl_minutes: u64,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .finish()
    }
}

/// Background worker pool sizing and the simulated provisioning workload.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub provisioning_duration: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str },
    OutOfRange { var: &'static str, max: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var } => {
                write!(f, "{var} must be a positive integer")
            }
            ConfigError::OutOfRange { var, max } => {
                write!(f, "{var} must not exceed {max}")
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
        for var in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "JWT_SECRET_KEY",
            "APP_ADMIN_USERNAME",
            "APP_ADMIN_PASSWORD",
            "APP_TOKEN_TTL_MINUTES",
            "WORKER_CONCURRENCY",
            "PROVISIONING_DURATION_SECS",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.auth.username, "admin");
        assert_eq!(config.auth.token_ttl_minutes, 60);
        assert_eq!(config.worker.concurrency, 2);
        assert_eq!(config.worker.provisioning_duration, Duration::from_secs(15));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 5000));
        reset_env();
    }

    #[test]
    fn rejects_zero_worker_concurrency() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("WORKER_CONCURRENCY", "0");
        let err = AppConfig::load().expect_err("zero workers rejected");
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                var: "WORKER_CONCURRENCY"
            }
        ));
        reset_env();
    }

    #[test]
    fn reads_provisioning_duration_override() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PROVISIONING_DURATION_SECS", "3");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.worker.provisioning_duration, Duration::from_secs(3));
        reset_env();
    }

    #[test]
    fn rejects_token_ttl_beyond_limit() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_TOKEN_TTL_MINUTES", u64::MAX.to_string());
        let err = AppConfig::load().expect_err("huge ttl rejected");
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                var: "APP_TOKEN_TTL_MINUTES",
                max: MAX_TOKEN_TTL_MINUTES
            }
        ));
        reset_env();
    }

    #[test]
    fn rejects_provisioning_duration_beyond_limit() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(
            "PROVISIONING_DURATION_SECS",
            (MAX_PROVISIONING_SECS + 1).to_string(),
        );
        let err = AppConfig::load().expect_err("huge duration rejected");
        assert!(err.to_string().contains("PROVISIONING_DURATION_SECS"));
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
        reset_env();
    }

    #[test]
    fn accepts_values_at_the_limit() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_TOKEN_TTL_MINUTES", MAX_TOKEN_TTL_MINUTES.to_string());
        env::set_var("PROVISIONING_DURATION_SECS", MAX_PROVISIONING_SECS.to_string());
        env::set_var("WORKER_CONCURRENCY", MAX_WORKER_CONCURRENCY.to_string());
        let config = AppConfig::load().expect("limits are inclusive");
        assert_eq!(config.auth.token_ttl_minutes, MAX_TOKEN_TTL_MINUTES);
        assert_eq!(config.worker.concurrency, MAX_WORKER_CONCURRENCY as usize);
        reset_env();
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = AuthConfig {
            jwt_secret: "super-secret".to_string(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            token_ttl_minutes: 5,
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("hunter2"));
    }
}
