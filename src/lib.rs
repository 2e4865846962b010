//! Kharji: session, access control and exchange-rate backend for a
//! personal-finance tracker.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub mod crypto {
    pub mod password;
    pub mod token;
}

pub mod models {
    pub mod reset_token;
    pub mod session;
    pub mod user;
}

pub mod repositories {
    pub mod reset_token;
    pub mod user;
}

pub mod services {
    pub mod auth;
    pub mod exchange_rate;
    pub mod reset_delivery;
    pub mod session;
}

pub mod handlers {
    pub mod auth;
    pub mod exchange_rate;
}

pub mod middleware_layer {
    pub mod gate;
}

pub mod validation {
    pub mod auth;
}

pub use app::build_router;
pub use config::Config;
pub use state::AppState;
