use axum::{extract::State, Json};
use serde_json::Value;

use crate::{
    error::{AppError, Result},
    state::AppState,
};

/// Returns the USD/Toman quote with cache metadata under `_meta`.
pub async fn get_exchange_rate(State(state): State<AppState>) -> Result<Json<Value>> {
    let lookup = state
        .exchange_rates
        .lookup()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    Ok(Json(lookup.into_body()))
}
