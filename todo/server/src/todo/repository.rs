use super::{Todo, TodoRepository};
use crate::entities::todo;
use crate::repository::{
    ProcedureExecutor, RepoResult, Repository, SeaOrmRepository, next_timestamp, timestamp_now,
    with_fallback,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, QueryFilter, QueryOrder,
    TransactionTrait,
};
use std::sync::Arc;

const SP_GET_ALL_TODOS: &str = "sp_get_all_todos";
const SP_GET_TODO_BY_ID: &str = "sp_get_todo_by_id";
const SP_CREATE_TODO: &str = "sp_create_todo";
const SP_UPDATE_TODO: &str = "sp_update_todo";
const SP_DELETE_TODO: &str = "sp_delete_todo";
const SP_GET_COMPLETED_TODOS: &str = "sp_get_completed_todos";
const SP_GET_INCOMPLETE_TODOS: &str = "sp_get_incomplete_todos";
const SP_MARK_TODO_COMPLETED: &str = "sp_mark_todo_completed";
const SP_MARK_TODO_INCOMPLETE: &str = "sp_mark_todo_incomplete";

/// Database-backed todo repository.
///
/// Every operation first calls the matching stored procedure. If that call
/// fails, the same operation is run once through the ORM.
pub struct SqlTodoRepository<C> {
    procedures: ProcedureExecutor<C>,
    orm: SeaOrmRepository<todo::Entity, C>,
}

impl<C> SqlTodoRepository<C>
where
    C: ConnectionTrait + TransactionTrait,
{
    pub fn new(db: Arc<C>) -> Self {
        Self {
            procedures: ProcedureExecutor::new(db.clone()),
            orm: SeaOrmRepository::new(db),
        }
    }

    async fn query_todos(
        &self,
        procedure: &str,
        fallback: sea_orm::Select<todo::Entity>,
    ) -> RepoResult<Vec<Todo>> {
        let models = with_fallback(
            procedure,
            self.procedures.query::<todo::Model>(procedure, vec![]),
            |_| async move { Ok(fallback.all(self.orm.connection()).await?) },
        )
        .await?;
        Ok(models.into_iter().map(Todo::from).collect())
    }

    async fn set_completed(
        &self,
        procedure: &str,
        id: i32,
        is_completed: bool,
    ) -> RepoResult<bool> {
        let now = timestamp_now();
        with_fallback(
            procedure,
            async {
                let affected = self
                    .procedures
                    .scalar(procedure, vec![id.into(), now.into()])
                    .await?;
                Ok(affected > 0)
            },
            |_| async move {
                let Some(model) = self.orm.get_by_id(id).await? else {
                    return Ok(false);
                };
                let previous = model.updated_at.with_timezone(&Utc);
                let mut active: todo::ActiveModel = model.into();
                active.is_completed = Set(is_completed);
                active.updated_at = Set(next_timestamp(previous).fixed_offset());
                Ok(self.orm.update(active).await?)
            },
        )
        .await
    }
}

#[async_trait]
impl<C> Repository<Todo> for SqlTodoRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn get_all(&self) -> RepoResult<Vec<Todo>> {
        self.query_todos(
            SP_GET_ALL_TODOS,
            self.orm
                .select()
                .order_by_desc(todo::Column::CreatedAt)
                .order_by_desc(todo::Column::Id),
        )
        .await
    }

    async fn get_by_id(&self, id: i32) -> RepoResult<Option<Todo>> {
        let model = with_fallback(
            SP_GET_TODO_BY_ID,
            self.procedures
                .query_first::<todo::Model>(SP_GET_TODO_BY_ID, vec![id.into()]),
            |_| async move { Ok(self.orm.get_by_id(id).await?) },
        )
        .await?;
        Ok(model.map(Todo::from))
    }

    #[tracing::instrument(skip(self, entity), fields(title = %entity.title))]
    async fn add(&self, entity: Todo) -> RepoResult<Todo> {
        let now = timestamp_now();
        let draft = &entity;
        let id = with_fallback(
            SP_CREATE_TODO,
            async {
                let id = self
                    .procedures
                    .scalar(
                        SP_CREATE_TODO,
                        vec![
                            draft.title.clone().into(),
                            draft.description.clone().into(),
                            draft.is_completed.into(),
                            now.into(),
                            now.into(),
                        ],
                    )
                    .await?;
                if id > 0 {
                    Ok(id)
                } else {
                    Err(DbErr::Custom(format!(
                        "{} returned invalid id {}",
                        SP_CREATE_TODO, id
                    )))
                }
            },
            |_| async move {
                let model = self
                    .orm
                    .add(todo::ActiveModel {
                        title: Set(draft.title.clone()),
                        description: Set(draft.description.clone()),
                        is_completed: Set(draft.is_completed),
                        created_at: Set(now.fixed_offset()),
                        updated_at: Set(now.fixed_offset()),
                        ..Default::default()
                    })
                    .await?;
                Ok(model.id)
            },
        )
        .await?;

        Ok(Todo {
            id,
            created_at: now,
            updated_at: now,
            ..entity
        })
    }

    #[tracing::instrument(skip(self, entity), fields(id = entity.id))]
    async fn update(&self, entity: Todo) -> RepoResult<bool> {
        let Some(existing) = self.get_by_id(entity.id).await? else {
            return Ok(false);
        };
        let updated_at = next_timestamp(existing.updated_at);
        let changes = &entity;

        with_fallback(
            SP_UPDATE_TODO,
            async {
                let affected = self
                    .procedures
                    .scalar(
                        SP_UPDATE_TODO,
                        vec![
                            changes.id.into(),
                            changes.title.clone().into(),
                            changes.description.clone().into(),
                            changes.is_completed.into(),
                            updated_at.into(),
                        ],
                    )
                    .await?;
                Ok(affected > 0)
            },
            |_| async move {
                Ok(self
                    .orm
                    .update(todo::ActiveModel {
                        id: Set(changes.id),
                        title: Set(changes.title.clone()),
                        description: Set(changes.description.clone()),
                        is_completed: Set(changes.is_completed),
                        updated_at: Set(updated_at.fixed_offset()),
                        ..Default::default()
                    })
                    .await?)
            },
        )
        .await
    }

    async fn delete(&self, id: i32) -> RepoResult<bool> {
        with_fallback(
            SP_DELETE_TODO,
            async {
                let affected = self
                    .procedures
                    .scalar(SP_DELETE_TODO, vec![id.into()])
                    .await?;
                Ok(affected > 0)
            },
            |_| async move { Ok(self.orm.delete(id).await?) },
        )
        .await
    }
}

#[async_trait]
impl<C> TodoRepository for SqlTodoRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn get_completed(&self) -> RepoResult<Vec<Todo>> {
        self.query_todos(
            SP_GET_COMPLETED_TODOS,
            self.orm
                .select()
                .filter(todo::Column::IsCompleted.eq(true))
                .order_by_desc(todo::Column::UpdatedAt),
        )
        .await
    }

    async fn get_incomplete(&self) -> RepoResult<Vec<Todo>> {
        self.query_todos(
            SP_GET_INCOMPLETE_TODOS,
            self.orm
                .select()
                .filter(todo::Column::IsCompleted.eq(false))
                .order_by_desc(todo::Column::CreatedAt)
                .order_by_desc(todo::Column::Id),
        )
        .await
    }

    async fn mark_as_completed(&self, id: i32) -> RepoResult<bool> {
        self.set_completed(SP_MARK_TODO_COMPLETED, id, true).await
    }

    async fn mark_as_incomplete(&self, id: i32) -> RepoResult<bool> {
        self.set_completed(SP_MARK_TODO_INCOMPLETE, id, false).await
    }
}
