//! Data access contracts shared by every entity repository.
//!
//! Repositories report "not found" through `Option::None` or `false`, never
//! through an error. Errors are reserved for infrastructure failures and
//! uniqueness violations.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use sea_orm::DbErr;
use std::future::Future;

pub mod base;
pub mod procedure;

pub use base::SeaOrmRepository;
pub use procedure::ProcedureExecutor;

/// Error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Represents a failure reported by the database or the ORM.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// Represents an attempt to store a value that must be unique but is already taken.
    #[error("{entity} with {field} '{value}' already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Predicate evaluated against an entity by [`Repository::find`].
pub type Predicate<'a, T> = &'a (dyn Fn(&T) -> bool + Send + Sync);

/// Generic CRUD contract for an entity identified by an integer id.
#[async_trait]
pub trait Repository<T>: Send + Sync
where
    T: Send + 'static,
{
    /// Returns every entity.
    async fn get_all(&self) -> RepoResult<Vec<T>>;

    /// Returns the entity with the given id, or `None` if there is none.
    async fn get_by_id(&self, id: i32) -> RepoResult<Option<T>>;

    /// Returns the entities matching `predicate`.
    ///
    /// The default implementation filters the result of [`Repository::get_all`].
    async fn find(&self, predicate: Predicate<'_, T>) -> RepoResult<Vec<T>> {
        let entities = self.get_all().await?;
        Ok(entities.into_iter().filter(|entity| predicate(entity)).collect())
    }

    /// Stores a new entity and returns it with its assigned id.
    async fn add(&self, entity: T) -> RepoResult<T>;

    /// Updates an existing entity. Returns `false` if no entity has its id.
    async fn update(&self, entity: T) -> RepoResult<bool>;

    /// Deletes the entity with the given id. Returns `false` if there is none.
    async fn delete(&self, id: i32) -> RepoResult<bool>;
}

/// Current UTC time at the microsecond precision the database stores.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamp for a mutation of a row last updated at `previous`.
///
/// Always later than `previous`, even when the clock has not moved on.
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    timestamp_now().max(previous + TimeDelta::microseconds(1))
}

/// Runs `primary` (a stored procedure call) and, if it fails, runs `fallback`
/// (the equivalent ORM operation) exactly once.
///
/// The fallback receives the stored procedure error. If the fallback fails as
/// well, its error is returned.
pub async fn with_fallback<T, P, F, Fut>(procedure: &str, primary: P, fallback: F) -> RepoResult<T>
where
    P: Future<Output = Result<T, DbErr>>,
    F: FnOnce(DbErr) -> Fut,
    Fut: Future<Output = RepoResult<T>>,
{
    match primary.await {
        Ok(value) => {
            tracing::debug!(procedure, "Served by stored procedure");
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(
                procedure,
                error = %err,
                "Stored procedure failed, falling back to ORM"
            );
            fallback(err).await
        }
    }
}
