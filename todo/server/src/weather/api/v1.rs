use crate::weather::{
    DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS, WeatherForecast, WeatherForecastService,
};
use crate::web::ApiError;
use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const INVALID_DAYS_MESSAGE: &str = "The number of forecast days must be between 1 and 14.";

#[derive(Clone, Default)]
pub struct WeatherState {
    pub service: WeatherForecastService,
}

/// JSON representation of a WeatherForecast for API responses.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastJson {
    pub date: NaiveDate,
    pub temperature_c: i32,
    pub temperature_f: i32,
    pub summary: String,
}

impl From<WeatherForecast> for ForecastJson {
    fn from(forecast: WeatherForecast) -> Self {
        Self {
            date: forecast.date,
            temperature_c: forecast.temperature_c,
            temperature_f: forecast.temperature_f(),
            summary: forecast.summary,
        }
    }
}

/// Raw query string. `days` is parsed by the handler so that malformed values
/// get the same message as out-of-range ones.
#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    #[serde(default)]
    days: Option<String>,
}

/// Handler for GET /api/weatherforecast - Returns `days` forecasts, 5 by default.
#[tracing::instrument(skip(state))]
pub async fn get_forecasts_handler(
    State(state): State<Arc<WeatherState>>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<Vec<ForecastJson>>, ApiError> {
    let days = match query.days.as_deref() {
        None => DEFAULT_FORECAST_DAYS,
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|days| (1..=MAX_FORECAST_DAYS).contains(days))
            .ok_or_else(|| {
                tracing::warn!("Rejected forecast request for days = {:?}", raw);
                ApiError::BadRequest(INVALID_DAYS_MESSAGE.to_string())
            })?,
    };

    let forecasts = state.service.get_forecasts(days);
    Ok(Json(forecasts.into_iter().map(ForecastJson::from).collect()))
}

/// Creates and returns the weather forecast API router.
pub fn create_api_router(state: Arc<WeatherState>) -> Router {
    Router::new()
        .route("/weatherforecast", get(get_forecasts_handler))
        .with_state(state)
}
