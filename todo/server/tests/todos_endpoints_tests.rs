use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use todo_server::config::Config;
use todo_server::todo::{InMemoryTodoRepository, SqlTodoRepository, TodoRepository};
use todo_server::web::create_app;
use tower::ServiceExt;

mod common;

fn config() -> Config {
    Config {
        db_url: None,
        port: 8080,
        cors_origin: "http://localhost:5173".to_string(),
    }
}

fn create_test_app(repository: Arc<dyn TodoRepository>) -> Router {
    let _ = tracing_subscriber::fmt().try_init();
    create_app(&config(), repository).expect("Failed to create app")
}

fn in_memory_app() -> Router {
    create_test_app(Arc::new(InMemoryTodoRepository::new()))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Creates a todo, reads it back, updates it and deletes it over HTTP.
async fn exercise_todo_endpoints(app: Router) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/todos",
            json!({"title": "Buy milk", "isCompleted": false}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string();
    let created = body_json(response).await;
    let id = created["id"].as_i64().unwrap();
    assert!(id > 0);
    assert_eq!(created["title"], "Buy milk");
    assert_eq!(location, format!("/api/todos/{}", id));

    let response = app.clone().oneshot(get(&location)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["title"], "Buy milk");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &location,
            json!({"id": id, "title": "Buy oat milk", "description": "Barista edition", "isCompleted": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let updated = body_json(app.clone().oneshot(get(&location)).await.unwrap()).await;
    assert_eq!(updated["title"], "Buy oat milk");
    assert_eq!(updated["description"], "Barista edition");
    assert_eq!(updated["isCompleted"], true);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(&location)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get(&location)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn can_report_health() {
    let response = in_memory_app().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"OK");
}

#[tokio::test]
async fn can_manage_todos_in_memory() {
    exercise_todo_endpoints(in_memory_app()).await;
}

#[tokio::test]
async fn can_manage_todos_in_database() {
    let container = common::setup_container()
        .await
        .expect("Failed to start container");
    let db = common::setup_db(&container)
        .await
        .expect("Failed to setup database");

    exercise_todo_endpoints(create_test_app(Arc::new(SqlTodoRepository::new(Arc::new(db))))).await;
}

#[tokio::test]
async fn can_reject_blank_title() {
    let app = in_memory_app();

    for body in [json!({"title": ""}), json!({"title": "   "}), json!({"isCompleted": true})] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/todos", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_bytes(response).await, b"Todo title cannot be empty.");
    }

    let todos = body_json(app.oneshot(get("/api/todos")).await.unwrap()).await;
    assert_eq!(todos, json!([]));
}

#[tokio::test]
async fn can_reject_update_with_mismatched_id() {
    let response = in_memory_app()
        .oneshot(json_request(
            "PUT",
            "/api/todos/1",
            json!({"id": 2, "title": "Buy milk"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_bytes(response).await,
        b"ID in the URL does not match the ID in the request body"
    );
}

#[tokio::test]
async fn can_return_five_forecasts_by_default() {
    let response = in_memory_app()
        .oneshot(get("/api/weatherforecast"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn can_reject_forecast_days_out_of_range() {
    let app = in_memory_app();

    for uri in ["/api/weatherforecast?days=15", "/api/weatherforecast?days=0"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_bytes(response).await,
            b"The number of forecast days must be between 1 and 14."
        );
    }
}

#[tokio::test]
async fn can_allow_configured_origin_and_expose_location() {
    let response = in_memory_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/todos")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"title": "Cross origin"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_EXPOSE_HEADERS], "location");
}
