use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseTransaction, DbErr, FromQueryResult, Statement,
    TransactionTrait, Value,
};
use std::sync::Arc;

/// Calls stored database functions by name with positional parameters.
///
/// Every call runs inside its own nested transaction. On Postgres a nested
/// transaction inside a unit of work is a savepoint, so a failing call leaves
/// the enclosing transaction usable for the ORM fallback.
pub struct ProcedureExecutor<C> {
    db: Arc<C>,
}

impl<C> ProcedureExecutor<C>
where
    C: ConnectionTrait + TransactionTrait,
{
    pub fn new(db: Arc<C>) -> Self {
        Self { db }
    }

    /// Calls a set-returning procedure and maps every row.
    #[tracing::instrument(skip(self, params))]
    pub async fn query<M>(&self, procedure: &str, params: Vec<Value>) -> Result<Vec<M>, DbErr>
    where
        M: FromQueryResult + Send,
    {
        let sql = select_rows_sql(self.db.get_database_backend(), procedure, params.len());
        let statement = self.statement(sql, params);
        let txn = self.db.begin().await?;
        let result = M::find_by_statement(statement).all(&txn).await;
        finish(txn, result).await
    }

    /// Calls a set-returning procedure and maps the first row, if any.
    #[tracing::instrument(skip(self, params))]
    pub async fn query_first<M>(
        &self,
        procedure: &str,
        params: Vec<Value>,
    ) -> Result<Option<M>, DbErr>
    where
        M: FromQueryResult + Send,
    {
        let sql = select_rows_sql(self.db.get_database_backend(), procedure, params.len());
        let statement = self.statement(sql, params);
        let txn = self.db.begin().await?;
        let result = M::find_by_statement(statement).one(&txn).await;
        finish(txn, result).await
    }

    /// Calls a procedure returning a single integer: a new id or an affected-row count.
    ///
    /// A null result is an error.
    #[tracing::instrument(skip(self, params))]
    pub async fn scalar(&self, procedure: &str, params: Vec<Value>) -> Result<i32, DbErr> {
        let sql = select_scalar_sql(self.db.get_database_backend(), procedure, params.len());
        let statement = self.statement(sql, params);
        let txn = self.db.begin().await?;
        let result = match txn.query_one(statement).await {
            Ok(Some(row)) => row.try_get::<Option<i32>>("", SCALAR_COLUMN).and_then(|value| {
                value.ok_or_else(|| {
                    DbErr::Custom(format!(
                        "Stored procedure {} returned null when a value was expected",
                        procedure
                    ))
                })
            }),
            Ok(None) => Err(DbErr::Custom(format!(
                "Stored procedure {} returned no rows",
                procedure
            ))),
            Err(err) => Err(err),
        };
        finish(txn, result).await
    }

    fn statement(&self, sql: String, params: Vec<Value>) -> Statement {
        Statement::from_sql_and_values(self.db.get_database_backend(), sql, params)
    }
}

const SCALAR_COLUMN: &str = "value";

/// Commits the call's nested transaction on success and rolls it back on failure.
async fn finish<T>(txn: DatabaseTransaction, result: Result<T, DbErr>) -> Result<T, DbErr> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!("Failed to roll back stored procedure call: {}", rollback_err);
            }
            Err(err)
        }
    }
}

fn placeholders(backend: DatabaseBackend, count: usize) -> String {
    (1..=count)
        .map(|index| match backend {
            DatabaseBackend::Postgres => format!("${}", index),
            _ => "?".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn select_rows_sql(backend: DatabaseBackend, procedure: &str, arity: usize) -> String {
    format!(
        "SELECT * FROM {}({})",
        procedure,
        placeholders(backend, arity)
    )
}

fn select_scalar_sql(backend: DatabaseBackend, procedure: &str, arity: usize) -> String {
    format!(
        "SELECT {}({}) AS {}",
        procedure,
        placeholders(backend, arity),
        SCALAR_COLUMN
    )
}
