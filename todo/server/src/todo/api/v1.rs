use crate::todo::{Todo, TodoRepository, TodoService};
use crate::web::ApiError;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const ID_MISMATCH_MESSAGE: &str = "ID in the URL does not match the ID in the request body";

#[derive(Clone)]
pub struct TodoState {
    pub service: TodoService,
}

impl TodoState {
    pub fn new(repository: Arc<dyn TodoRepository>) -> Self {
        Self {
            service: TodoService::new(repository),
        }
    }
}

/// JSON representation of a Todo for API responses.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoJson {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Todo> for TodoJson {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            title: todo.title,
            description: todo.description,
            is_completed: todo.is_completed,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

/// Request body for creating or updating a Todo.
///
/// A missing title is accepted here so that it is reported as a validation
/// error rather than a malformed body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoRequest {
    #[serde(default)]
    id: i32,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_completed: bool,
}

impl From<TodoRequest> for Todo {
    fn from(request: TodoRequest) -> Self {
        let mut todo = Todo::new(request.title.unwrap_or_default());
        todo.id = request.id;
        todo.description = request.description;
        todo.is_completed = request.is_completed;
        todo
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    Completed,
    Incomplete,
}

/// Query parameters for listing todos.
#[derive(Debug, Deserialize)]
pub struct TodosQuery {
    #[serde(default)]
    status: Option<TodoStatus>,
}

/// Handler for GET /api/todos - Returns all todos, or only completed or incomplete ones.
#[tracing::instrument(skip(state))]
pub async fn get_todos_handler(
    State(state): State<Arc<TodoState>>,
    Query(query): Query<TodosQuery>,
) -> Result<Json<Vec<TodoJson>>, ApiError> {
    let todos = match query.status {
        Some(TodoStatus::Completed) => state.service.get_completed_todos().await?,
        Some(TodoStatus::Incomplete) => state.service.get_incomplete_todos().await?,
        None => state.service.get_all_todos().await?,
    };
    Ok(Json(todos.into_iter().map(TodoJson::from).collect()))
}

/// Handler for GET /api/todos/{id}.
#[tracing::instrument(skip(state))]
pub async fn get_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<i32>,
) -> Result<Json<TodoJson>, ApiError> {
    let todo = state
        .service
        .get_todo_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(TodoJson::from(todo)))
}

/// Handler for POST /api/todos - Responds 201 with the stored todo and its location.
#[tracing::instrument(skip(state, request))]
pub async fn create_todo_handler(
    State(state): State<Arc<TodoState>>,
    Json(request): Json<TodoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.service.create_todo(Todo::from(request)).await?;
    let location = format!("/api/todos/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(TodoJson::from(created)),
    ))
}

/// Handler for PUT /api/todos/{id}.
#[tracing::instrument(skip(state, request))]
pub async fn update_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<i32>,
    Json(request): Json<TodoRequest>,
) -> Result<StatusCode, ApiError> {
    if request.id != id {
        tracing::warn!("Rejected update of todo {} with body ID {}", id, request.id);
        return Err(ApiError::BadRequest(ID_MISMATCH_MESSAGE.to_string()));
    }

    if state.service.update_todo(Todo::from(request)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// Handler for DELETE /api/todos/{id}.
#[tracing::instrument(skip(state))]
pub async fn delete_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    no_content_or_not_found(state.service.delete_todo(id).await?)
}

/// Handler for POST /api/todos/{id}/complete.
#[tracing::instrument(skip(state))]
pub async fn complete_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    no_content_or_not_found(state.service.mark_as_completed(id).await?)
}

/// Handler for POST /api/todos/{id}/incomplete.
#[tracing::instrument(skip(state))]
pub async fn incomplete_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    no_content_or_not_found(state.service.mark_as_incomplete(id).await?)
}

fn no_content_or_not_found(found: bool) -> Result<StatusCode, ApiError> {
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// Creates and returns the todos API router.
pub fn create_api_router(state: Arc<TodoState>) -> Router {
    Router::new()
        .route("/todos", get(get_todos_handler).post(create_todo_handler))
        .route(
            "/todos/{id}",
            get(get_todo_handler)
                .put(update_todo_handler)
                .delete(delete_todo_handler),
        )
        .route("/todos/{id}/complete", post(complete_todo_handler))
        .route("/todos/{id}/incomplete", post(incomplete_todo_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::InMemoryTodoRepository;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn router() -> Router {
        create_api_router(Arc::new(TodoState::new(Arc::new(
            InMemoryTodoRepository::new(),
        ))))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn can_create_todo_with_location_header() {
        let response = router()
            .oneshot(json_request(
                "POST",
                "/todos",
                json!({"title": "Buy milk", "isCompleted": false}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/api/todos/1");
        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["title"], "Buy milk");
        assert_eq!(body["isCompleted"], false);
        assert!(body["createdAt"].is_string());
    }

    #[tokio::test]
    async fn can_reject_create_without_title() {
        let response = router()
            .oneshot(json_request("POST", "/todos", json!({"isCompleted": false})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Todo title cannot be empty.");
    }

    #[tokio::test]
    async fn can_reject_update_with_mismatched_id() {
        let response = router()
            .oneshot(json_request(
                "PUT",
                "/todos/1",
                json!({"id": 2, "title": "Mismatch"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], ID_MISMATCH_MESSAGE.as_bytes());
    }

    #[tokio::test]
    async fn can_return_not_found_for_unknown_todo() {
        let app = router();

        for request in [
            empty_request("GET", "/todos/99"),
            empty_request("DELETE", "/todos/99"),
            empty_request("POST", "/todos/99/complete"),
            empty_request("POST", "/todos/99/incomplete"),
            json_request("PUT", "/todos/99", json!({"id": 99, "title": "Ghost"})),
        ] {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn can_filter_todos_by_status() {
        let app = router();
        for title in ["First", "Second"] {
            app.clone()
                .oneshot(json_request("POST", "/todos", json!({"title": title})))
                .await
                .unwrap();
        }
        let response = app
            .clone()
            .oneshot(empty_request("POST", "/todos/1/complete"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let completed = app
            .clone()
            .oneshot(empty_request("GET", "/todos?status=completed"))
            .await
            .unwrap();
        let incomplete = app
            .clone()
            .oneshot(empty_request("GET", "/todos?status=incomplete"))
            .await
            .unwrap();
        let all = app.oneshot(empty_request("GET", "/todos")).await.unwrap();

        let completed = body_json(completed).await;
        let incomplete = body_json(incomplete).await;
        let all = body_json(all).await;
        assert_eq!(completed.as_array().unwrap().len(), 1);
        assert_eq!(completed[0]["title"], "First");
        assert_eq!(completed[0]["isCompleted"], true);
        assert_eq!(incomplete.as_array().unwrap().len(), 1);
        assert_eq!(incomplete[0]["title"], "Second");
        assert_eq!(all.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn can_reject_unknown_status_filter() {
        let response = router()
            .oneshot(empty_request("GET", "/todos?status=archived"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
