//! Groups repository operations into one database transaction.

use crate::repository::RepoResult;
use crate::todo::{SqlTodoRepository, TodoRepository};
use crate::user::{SqlUserRepository, UserRepository};
use sea_orm::{DatabaseTransaction, DbErr, TransactionTrait};
use std::sync::{Arc, OnceLock};

/// One database transaction shared by the todo and user repositories.
///
/// Repositories are created on first access. Changes become visible to other
/// connections only after [`UnitOfWork::complete`]; dropping the unit of work
/// without completing it rolls every change back. Stored procedure calls made
/// through [`UnitOfWork::todos`] run in savepoints of the same transaction.
pub struct UnitOfWork {
    txn: Arc<DatabaseTransaction>,
    todos: OnceLock<SqlTodoRepository<DatabaseTransaction>>,
    users: OnceLock<SqlUserRepository<DatabaseTransaction>>,
}

impl UnitOfWork {
    /// Starts a transaction on `db`.
    #[tracing::instrument(skip(db))]
    pub async fn begin<C>(db: &C) -> RepoResult<Self>
    where
        C: TransactionTrait,
    {
        let txn = db.begin().await?;
        tracing::debug!("Unit of work started");
        Ok(Self {
            txn: Arc::new(txn),
            todos: OnceLock::new(),
            users: OnceLock::new(),
        })
    }

    pub fn todos(&self) -> &dyn TodoRepository {
        self.todos.get_or_init(|| SqlTodoRepository::new(self.txn.clone()))
    }

    pub fn users(&self) -> &dyn UserRepository {
        self.users.get_or_init(|| SqlUserRepository::new(self.txn.clone()))
    }

    /// Commits every change made through this unit of work.
    #[tracing::instrument(skip(self))]
    pub async fn complete(self) -> RepoResult<()> {
        let UnitOfWork { txn, todos, users } = self;
        drop(todos);
        drop(users);

        let txn = Arc::into_inner(txn).ok_or_else(|| {
            DbErr::Custom("Unit of work transaction is still shared".to_string())
        })?;
        txn.commit().await?;
        tracing::info!("Unit of work committed");
        Ok(())
    }
}
