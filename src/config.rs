use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Minimum length of the signing secret accepted in production.
const MIN_SECRET_BYTES: usize = 32;

/// The environment the application runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn from_var(value: &str) -> Self {
        if value.eq_ignore_ascii_case("production") {
            AppEnv::Production
        } else {
            AppEnv::Development
        }
    }
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// Development or production.
    pub app_env: AppEnv,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// The HMAC secret used to sign session tokens.
    pub jwt_secret: Zeroizing<Vec<u8>>,
    /// The duration of a session in days.
    pub session_duration_days: i64,
    /// How long a password reset token stays valid.
    pub reset_token_ttl_minutes: i64,
    /// Upstream exchange-rate quote URL.
    pub exchange_rate_url: String,
    /// Optional bearer key for the upstream quote service.
    pub exchange_rate_api_key: Option<String>,
    /// Freshness window of the cached quote.
    pub exchange_rate_ttl_hours: i64,
    /// Upper bound on a single upstream fetch.
    pub exchange_rate_timeout_secs: u64,
    /// Where authenticated users land.
    pub landing_path: String,
    /// Directory holding the built frontend.
    pub static_dir: PathBuf,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Creates a development configuration with the given database and secret.
    pub fn new(database_url: impl Into<String>, jwt_secret: Vec<u8>) -> Self {
        Self {
            database_url: database_url.into(),
            app_env: AppEnv::Development,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            jwt_secret: Zeroizing::new(jwt_secret),
            session_duration_days: 30,
            reset_token_ttl_minutes: 60,
            exchange_rate_url: "https://open.er-api.com/v6/latest/USD".to_string(),
            exchange_rate_api_key: None,
            exchange_rate_ttl_hours: 24,
            exchange_rate_timeout_secs: 5,
            landing_path: "/overview".to_string(),
            static_dir: PathBuf::from("public"),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }

    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let app_env = AppEnv::from_var(&env::var("APP_ENV").unwrap_or_default());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => {
                let secret = Zeroizing::new(secret);
                if app_env == AppEnv::Production && secret.len() < MIN_SECRET_BYTES {
                    anyhow::bail!("JWT_SECRET must be at least {MIN_SECRET_BYTES} bytes in production");
                }
                secret.as_bytes().to_vec()
            }
            Err(_) if app_env == AppEnv::Production => {
                anyhow::bail!("JWT_SECRET must be set in production (generate with: openssl rand -hex 32)");
            }
            Err(_) => {
                tracing::warn!("⚠️  JWT_SECRET not set, using an ephemeral secret; sessions end on restart");
                let mut secret = vec![0u8; MIN_SECRET_BYTES];
                OsRng.fill_bytes(&mut secret);
                secret
            }
        };

        let mut config = Self::new(database_url, jwt_secret);
        config.app_env = app_env;
        config.bind_addr = parse_var("BIND_ADDR", config.bind_addr)?;
        config.session_duration_days = parse_var("SESSION_DURATION_DAYS", config.session_duration_days)?;
        config.reset_token_ttl_minutes = parse_var("RESET_TOKEN_TTL_MINUTES", config.reset_token_ttl_minutes)?;
        config.exchange_rate_ttl_hours = parse_var("EXCHANGE_RATE_TTL_HOURS", config.exchange_rate_ttl_hours)?;
        config.exchange_rate_timeout_secs =
            parse_var("EXCHANGE_RATE_TIMEOUT_SECS", config.exchange_rate_timeout_secs)?;

        if let Ok(url) = env::var("EXCHANGE_RATE_URL") {
            config.exchange_rate_url = url;
        }
        config.exchange_rate_api_key = env::var("EXCHANGE_RATE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        if let Ok(path) = env::var("LANDING_PATH") {
            config.landing_path = path;
        }
        if let Ok(dir) = env::var("STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        if let Ok(origins) = env::var("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }

        if config.session_duration_days <= 0 {
            anyhow::bail!("SESSION_DURATION_DAYS must be positive");
        }

        Ok(config)
    }

    /// Whether the app runs in production.
    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("Invalid {name}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_env_only_recognizes_production() {
        assert_eq!(AppEnv::from_var("production"), AppEnv::Production);
        assert_eq!(AppEnv::from_var("PRODUCTION"), AppEnv::Production);
        assert_eq!(AppEnv::from_var("staging"), AppEnv::Development);
        assert_eq!(AppEnv::from_var(""), AppEnv::Development);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::new("postgres://localhost/kharji", vec![1; 32]);
        assert_eq!(config.session_duration_days, 30);
        assert_eq!(config.reset_token_ttl_minutes, 60);
        assert_eq!(config.exchange_rate_ttl_hours, 24);
        assert_eq!(config.landing_path, "/overview");
        assert!(!config.is_production());
    }
}
