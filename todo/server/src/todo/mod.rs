use crate::entities::todo;
use crate::repository::{RepoResult, Repository, RepositoryError, timestamp_now};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub mod api;
pub mod memory;
pub mod repository;

pub use memory::InMemoryTodoRepository;
pub use repository::SqlTodoRepository;

/// Longest title a todo may have, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// Creates an unsaved, incomplete todo. The repository assigns the id and timestamps on add.
    pub fn new(title: impl Into<String>) -> Self {
        let now = timestamp_now();
        Self {
            id: 0,
            title: title.into(),
            description: None,
            is_completed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<todo::Model> for Todo {
    fn from(model: todo::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            is_completed: model.is_completed,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Todo-specific queries and state changes on top of the generic CRUD contract.
#[async_trait]
pub trait TodoRepository: Repository<Todo> {
    /// Returns completed todos, most recently updated first.
    async fn get_completed(&self) -> RepoResult<Vec<Todo>>;

    /// Returns incomplete todos, newest first.
    async fn get_incomplete(&self) -> RepoResult<Vec<Todo>>;

    /// Marks the todo as completed. Returns `false` if there is no todo with `id`.
    async fn mark_as_completed(&self, id: i32) -> RepoResult<bool>;

    /// Marks the todo as incomplete. Returns `false` if there is no todo with `id`.
    async fn mark_as_incomplete(&self, id: i32) -> RepoResult<bool>;
}

/// Error type for TodoService operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoServiceError {
    /// Represents a title that is empty or only whitespace.
    #[error("Todo title cannot be empty.")]
    EmptyTitle,
    /// Represents a title longer than [`MAX_TITLE_LENGTH`].
    #[error("Todo title cannot be longer than 200 characters.")]
    TitleTooLong,
    /// Represents a failure of the underlying repository.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl TodoServiceError {
    /// Whether the error was caused by invalid input rather than by the data layer.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyTitle | Self::TitleTooLong)
    }
}

/// Business logic for todos: title validation and logging around the repository.
#[derive(Clone)]
pub struct TodoService {
    repository: Arc<dyn TodoRepository>,
}

impl TodoService {
    pub fn new(repository: Arc<dyn TodoRepository>) -> Self {
        Self { repository }
    }

    /// Retrieves all todos, newest first.
    ///
    /// # Returns
    ///
    /// A `Result` containing every `Todo` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_todos(&self) -> Result<Vec<Todo>, TodoServiceError> {
        let todos = self.repository.get_all().await.inspect_err(|err| {
            tracing::error!("Failed to retrieve todos: {}", err);
        })?;
        tracing::info!("Retrieved {} todos", todos.len());
        Ok(todos)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_completed_todos(&self) -> Result<Vec<Todo>, TodoServiceError> {
        let todos = self.repository.get_completed().await.inspect_err(|err| {
            tracing::error!("Failed to retrieve completed todos: {}", err);
        })?;
        tracing::info!("Retrieved {} completed todos", todos.len());
        Ok(todos)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_incomplete_todos(&self) -> Result<Vec<Todo>, TodoServiceError> {
        let todos = self.repository.get_incomplete().await.inspect_err(|err| {
            tracing::error!("Failed to retrieve incomplete todos: {}", err);
        })?;
        tracing::info!("Retrieved {} incomplete todos", todos.len());
        Ok(todos)
    }

    /// Retrieves a todo by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the todo to retrieve.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Todo`, or `None` if there is no todo with that ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_todo_by_id(&self, id: i32) -> Result<Option<Todo>, TodoServiceError> {
        let todo = self.repository.get_by_id(id).await.inspect_err(|err| {
            tracing::error!("Failed to retrieve todo {}: {}", id, err);
        })?;
        if todo.is_none() {
            tracing::warn!("Todo {} not found", id);
        }
        Ok(todo)
    }

    /// Creates a new todo.
    ///
    /// # Arguments
    ///
    /// * `todo` - The todo to store. Its ID and timestamps are assigned by the repository.
    ///
    /// # Returns
    ///
    /// A `Result` containing the stored `Todo`, or a validation error if the title is
    /// empty or too long. Nothing is stored when validation fails.
    #[tracing::instrument(skip(self, todo), fields(title = %todo.title))]
    pub async fn create_todo(&self, todo: Todo) -> Result<Todo, TodoServiceError> {
        validate_title(&todo.title)?;

        let created = self.repository.add(todo).await.inspect_err(|err| {
            tracing::error!("Failed to create todo: {}", err);
        })?;
        tracing::info!("Created todo {}", created.id);
        Ok(created)
    }

    /// Replaces the title, description and completion state of an existing todo.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if there is no todo with the given ID, or a validation error if the
    /// title is empty or too long.
    #[tracing::instrument(skip(self, todo), fields(id = todo.id, title = %todo.title))]
    pub async fn update_todo(&self, todo: Todo) -> Result<bool, TodoServiceError> {
        validate_title(&todo.title)?;

        let id = todo.id;
        let updated = self.repository.update(todo).await.inspect_err(|err| {
            tracing::error!("Failed to update todo {}: {}", id, err);
        })?;
        if updated {
            tracing::info!("Updated todo {}", id);
        } else {
            tracing::warn!("Todo {} not found for update", id);
        }
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_todo(&self, id: i32) -> Result<bool, TodoServiceError> {
        let deleted = self.repository.delete(id).await.inspect_err(|err| {
            tracing::error!("Failed to delete todo {}: {}", id, err);
        })?;
        if deleted {
            tracing::info!("Deleted todo {}", id);
        } else {
            tracing::warn!("Todo {} not found for deletion", id);
        }
        Ok(deleted)
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_as_completed(&self, id: i32) -> Result<bool, TodoServiceError> {
        let marked = self.repository.mark_as_completed(id).await.inspect_err(|err| {
            tracing::error!("Failed to mark todo {} as completed: {}", id, err);
        })?;
        if !marked {
            tracing::warn!("Todo {} not found to mark as completed", id);
        }
        Ok(marked)
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_as_incomplete(&self, id: i32) -> Result<bool, TodoServiceError> {
        let marked = self.repository.mark_as_incomplete(id).await.inspect_err(|err| {
            tracing::error!("Failed to mark todo {} as incomplete: {}", id, err);
        })?;
        if !marked {
            tracing::warn!("Todo {} not found to mark as incomplete", id);
        }
        Ok(marked)
    }
}

fn validate_title(title: &str) -> Result<(), TodoServiceError> {
    if title.trim().is_empty() {
        tracing::warn!("Rejected todo with an empty title");
        return Err(TodoServiceError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        tracing::warn!("Rejected todo with a title longer than {}", MAX_TITLE_LENGTH);
        return Err(TodoServiceError::TitleTooLong);
    }
    Ok(())
}
