use crate::entities::app_user;
use crate::repository::{RepoResult, Repository, RepositoryError, timestamp_now};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod memory;
pub mod repository;

pub use memory::InMemoryUserRepository;
pub use repository::SqlUserRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates an unsaved, active user.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        let now = timestamp_now();
        Self {
            id: 0,
            username: username.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<app_user::Model> for User {
    fn from(model: app_user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// User lookups and activation on top of the generic CRUD contract.
///
/// `get_all` and `get_active_users` are ordered by username. `add` and
/// `update` fail with [`RepositoryError::Duplicate`] when the username or
/// email already belongs to another user.
#[async_trait]
pub trait UserRepository: Repository<User> {
    async fn get_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    async fn get_active_users(&self) -> RepoResult<Vec<User>>;

    /// Returns `false` if there is no user with `id`.
    async fn activate_user(&self, id: i32) -> RepoResult<bool>;

    /// Returns `false` if there is no user with `id`.
    async fn deactivate_user(&self, id: i32) -> RepoResult<bool>;
}

pub(crate) fn duplicate_username(username: &str) -> RepositoryError {
    RepositoryError::Duplicate {
        entity: "User",
        field: "username",
        value: username.to_string(),
    }
}

pub(crate) fn duplicate_email(email: &str) -> RepositoryError {
    RepositoryError::Duplicate {
        entity: "User",
        field: "email",
        value: email.to_string(),
    }
}
