use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth;
use crate::config::IngestMode;
use crate::error::ServiceError;
use crate::filter::filter_trades;
use crate::state::AppState;
use crate::trade::{column_spec, DATE_FORMAT};

/// Query parameters for `GET /trades`. Parameter names follow the existing
/// API contract, hence the camelCase renames.
#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    pub symbol: Option<String>,
    pub api_key: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/trades", get(get_trades))
}

/// The single read endpoint: date-range/symbol slice of the loaded table.
pub async fn get_trades(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TradesQuery>,
) -> Result<Json<Value>, ServiceError> {
    if !auth::api_key_matches(q.api_key.as_deref(), &state.config.api_key) {
        return Err(ServiceError::Unauthorized);
    }

    let start = parse_date(&q.start_date)?;
    let end = parse_date(&q.end_date)?;

    // An empty symbol= parameter means no symbol restriction.
    let symbol = q.symbol.as_deref().filter(|s| !s.is_empty());
    let matches = filter_trades(&state.table, start, end, symbol);

    let data = serde_json::to_value(&matches)
        .map_err(|e| ServiceError::Internal(format!("Error filtering trades: {e}")))?;

    let body = match state.config.ingest_mode {
        IngestMode::Strict => json!({
            "datatable": { "data": data, "columns": column_spec() },
            "meta": { "next_cursor_id": null },
        }),
        IngestMode::Lenient => data,
    };
    Ok(Json(body))
}

fn parse_date(s: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| {
        ServiceError::BadRequest("Invalid date format. Expected 'YYYY-MM-DD'".to_string())
    })
}
