use super::{User, UserRepository, duplicate_email, duplicate_username};
use crate::entities::app_user;
use crate::repository::{
    RepoResult, Repository, RepositoryError, SeaOrmRepository, next_timestamp, timestamp_now,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, QueryFilter, QueryOrder, SqlErr,
    sea_query::Condition,
};
use std::sync::Arc;

/// Database-backed user repository. Users have no stored procedures, so every
/// operation goes straight through the ORM.
pub struct SqlUserRepository<C> {
    orm: SeaOrmRepository<app_user::Entity, C>,
}

impl<C> SqlUserRepository<C>
where
    C: ConnectionTrait,
{
    pub fn new(db: Arc<C>) -> Self {
        Self {
            orm: SeaOrmRepository::new(db),
        }
    }

    async fn find_one(&self, condition: Condition) -> RepoResult<Option<User>> {
        let model = self
            .orm
            .select()
            .filter(condition)
            .one(self.orm.connection())
            .await?;
        Ok(model.map(User::from))
    }

    /// Fails if another user already holds the username or email of `user`.
    async fn ensure_unique(&self, user: &User) -> RepoResult<()> {
        let taken_by_other = |found: &Option<User>| {
            found
                .as_ref()
                .is_some_and(|existing| existing.id != user.id)
        };

        let by_username = self
            .find_one(Condition::all().add(app_user::Column::Username.eq(user.username.as_str())))
            .await?;
        if taken_by_other(&by_username) {
            return Err(duplicate_username(&user.username));
        }

        let by_email = self
            .find_one(Condition::all().add(app_user::Column::Email.eq(user.email.as_str())))
            .await?;
        if taken_by_other(&by_email) {
            return Err(duplicate_email(&user.email));
        }
        Ok(())
    }

    async fn set_active(&self, id: i32, is_active: bool) -> RepoResult<bool> {
        let Some(model) = self.orm.get_by_id(id).await? else {
            tracing::warn!("User {} not found to set active = {}", id, is_active);
            return Ok(false);
        };
        let previous = model.updated_at.with_timezone(&Utc);
        let mut active: app_user::ActiveModel = model.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(next_timestamp(previous).fixed_offset());
        Ok(self.orm.update(active).await?)
    }
}

/// Turns a unique index violation into `Duplicate`.
///
/// Covers writes that race past [`SqlUserRepository::ensure_unique`]. The
/// violated index name tells which field clashed.
fn unique_violation(err: DbErr, username: &str, email: &str) -> RepositoryError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) if message.contains("email") => {
            duplicate_email(email)
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_username(username),
        _ => RepositoryError::Database(err),
    }
}

#[async_trait]
impl<C> Repository<User> for SqlUserRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn get_all(&self) -> RepoResult<Vec<User>> {
        let models = self
            .orm
            .select()
            .order_by_asc(app_user::Column::Username)
            .all(self.orm.connection())
            .await?;
        Ok(models.into_iter().map(User::from).collect())
    }

    async fn get_by_id(&self, id: i32) -> RepoResult<Option<User>> {
        Ok(self.orm.get_by_id(id).await?.map(User::from))
    }

    #[tracing::instrument(skip(self, entity), fields(username = %entity.username))]
    async fn add(&self, entity: User) -> RepoResult<User> {
        self.ensure_unique(&entity).await?;

        let now = timestamp_now();
        let (username, email) = (entity.username, entity.email);
        let model = self
            .orm
            .add(app_user::ActiveModel {
                username: Set(username.clone()),
                email: Set(email.clone()),
                first_name: Set(entity.first_name),
                last_name: Set(entity.last_name),
                is_active: Set(entity.is_active),
                created_at: Set(now.fixed_offset()),
                updated_at: Set(now.fixed_offset()),
                ..Default::default()
            })
            .await
            .map_err(|err| unique_violation(err, &username, &email))?;
        tracing::info!("Added user {}", model.id);
        Ok(User::from(model))
    }

    #[tracing::instrument(skip(self, entity), fields(id = entity.id))]
    async fn update(&self, entity: User) -> RepoResult<bool> {
        let Some(existing) = self.get_by_id(entity.id).await? else {
            tracing::warn!("User {} not found for update", entity.id);
            return Ok(false);
        };
        self.ensure_unique(&entity).await?;

        let (username, email) = (entity.username, entity.email);
        let updated = self
            .orm
            .update(app_user::ActiveModel {
                id: Set(entity.id),
                username: Set(username.clone()),
                email: Set(email.clone()),
                first_name: Set(entity.first_name),
                last_name: Set(entity.last_name),
                is_active: Set(entity.is_active),
                updated_at: Set(next_timestamp(existing.updated_at).fixed_offset()),
                ..Default::default()
            })
            .await
            .map_err(|err| unique_violation(err, &username, &email))?;
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> RepoResult<bool> {
        let deleted = self.orm.delete(id).await?;
        if !deleted {
            tracing::warn!("User {} not found for deletion", id);
        }
        Ok(deleted)
    }
}

#[async_trait]
impl<C> UserRepository for SqlUserRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn get_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.find_one(Condition::all().add(app_user::Column::Username.eq(username)))
            .await
    }

    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.find_one(Condition::all().add(app_user::Column::Email.eq(email)))
            .await
    }

    async fn get_active_users(&self) -> RepoResult<Vec<User>> {
        let models = self
            .orm
            .select()
            .filter(app_user::Column::IsActive.eq(true))
            .order_by_asc(app_user::Column::Username)
            .all(self.orm.connection())
            .await?;
        Ok(models.into_iter().map(User::from).collect())
    }

    async fn activate_user(&self, id: i32) -> RepoResult<bool> {
        self.set_active(id, true).await
    }

    async fn deactivate_user(&self, id: i32) -> RepoResult<bool> {
        self.set_active(id, false).await
    }
}
