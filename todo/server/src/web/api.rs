use std::sync::Arc;

use crate::todo::api::v1::TodoState;
use crate::weather::api::v1::WeatherState;

use axum::Router;

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(todo_state: Arc<TodoState>, weather_state: Arc<WeatherState>) -> Router {
    let todos_router = crate::todo::api::v1::create_api_router(todo_state);
    let weather_router = crate::weather::api::v1::create_api_router(weather_state);
    Router::new().nest("/api", todos_router.merge(weather_router))
}
