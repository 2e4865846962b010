use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use deadpool_postgres::Pool;

use crate::config::Config;
use crate::crypto::token::TokenService;
use crate::error::{AppError, Result};
use crate::middleware_layer::gate::RouteTable;
use crate::services::exchange_rate::{ExchangeRateCache, HttpRateFetcher, SystemClock};
use crate::services::reset_delivery::{LogDelivery, ResetDelivery};
use crate::services::session::SessionManager;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: Pool,
    /// The application's configuration.
    pub config: Config,
    /// Session cookie handling.
    pub sessions: SessionManager,
    /// Path classification used by the access gate.
    pub routes: Arc<RouteTable>,
    /// The process-wide exchange-rate cache.
    pub exchange_rates: Arc<ExchangeRateCache>,
    /// Out-of-band channel for reset tokens.
    pub reset_delivery: Arc<dyn ResetDelivery>,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// The pool connects lazily, so this succeeds without a reachable database.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized");

        let tokens = TokenService::new(
            &config.jwt_secret,
            Duration::days(config.session_duration_days),
        );
        let sessions = SessionManager::new(tokens, config.is_production());
        tracing::info!("✅ Session manager initialized");

        let routes = Arc::new(RouteTable::standard(&config.landing_path));

        let fetcher = HttpRateFetcher::new(
            config.exchange_rate_url.clone(),
            config.exchange_rate_api_key.clone(),
            StdDuration::from_secs(config.exchange_rate_timeout_secs),
        )
        .map_err(|e| AppError::Internal(format!("HTTP client setup failed: {}", e)))?;
        let exchange_rates = Arc::new(ExchangeRateCache::new(
            Arc::new(fetcher),
            Arc::new(SystemClock),
            Duration::hours(config.exchange_rate_ttl_hours),
        ));
        tracing::info!("✅ Exchange rate cache initialized");

        Ok(AppState {
            db,
            config: config.clone(),
            sessions,
            routes,
            exchange_rates,
            reset_delivery: Arc::new(LogDelivery::new(config.is_production())),
        })
    }

    /// Replaces the exchange-rate cache.
    pub fn with_exchange_rates(mut self, exchange_rates: Arc<ExchangeRateCache>) -> Self {
        self.exchange_rates = exchange_rates;
        self
    }

    /// Replaces the reset delivery channel.
    pub fn with_reset_delivery(mut self, reset_delivery: Arc<dyn ResetDelivery>) -> Self {
        self.reset_delivery = reset_delivery;
        self
    }
}
