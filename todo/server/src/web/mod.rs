use axum::Router;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use migration::MigratorTrait;
use sea_orm::Database;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::todo::api::v1::TodoState;
use crate::todo::{InMemoryTodoRepository, SqlTodoRepository, TodoRepository, TodoServiceError};
use crate::weather::api::v1::WeatherState;

pub mod api;

/// Body of every 500 response. Details only go to the log.
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Error type for JSON API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid input. The message is returned to the client as plain text.
    #[error("{0}")]
    BadRequest(String),
    /// The requested resource does not exist.
    #[error("Not found")]
    NotFound,
    /// Any other failure.
    #[error("{}", INTERNAL_ERROR_MESSAGE)]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE).into_response()
            }
        }
    }
}

impl From<TodoServiceError> for ApiError {
    fn from(err: TodoServiceError) -> Self {
        if err.is_validation() {
            ApiError::BadRequest(err.to_string())
        } else {
            tracing::error!("Request failed: {}", err);
            ApiError::Internal
        }
    }
}

/// Builds the application router around the given todo store.
pub fn create_app(config: &Config, todo_repository: Arc<dyn TodoRepository>) -> anyhow::Result<Router> {
    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|err| {
        anyhow::anyhow!("Invalid CORS origin '{}': {}", config.cors_origin, err)
    })?;

    let todo_state = Arc::new(TodoState::new(todo_repository));
    let weather_state = Arc::new(WeatherState::default());

    let app = Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(api::create_api_router(todo_state, weather_state))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(cors_origin)
                    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                    .allow_headers([header::CONTENT_TYPE])
                    .expose_headers([header::LOCATION]),
            ),
        );
    Ok(app)
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let todo_repository: Arc<dyn TodoRepository> = match &config.db_url {
        Some(db_url) => {
            let db = Database::connect(db_url).await?;
            migration::Migrator::up(&db, None).await?;
            tracing::info!("Database migrations applied successfully");
            Arc::new(SqlTodoRepository::new(Arc::new(db)))
        }
        None => {
            tracing::warn!("DB_URL is not set, todos are kept in memory and lost on restart");
            Arc::new(InMemoryTodoRepository::new())
        }
    };

    let app = create_app(&config, todo_repository)?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}
