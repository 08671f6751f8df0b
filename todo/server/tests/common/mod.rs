#![allow(dead_code)]

use migration::MigratorTrait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::ContainerAsync;
use testcontainers_modules::testcontainers::runners::AsyncRunner;

const POSTGRES_PORT: u16 = 5432;

/// Starts a throwaway Postgres server. It stops when the container is dropped.
pub async fn setup_container() -> anyhow::Result<ContainerAsync<Postgres>> {
    Ok(Postgres::default().start().await?)
}

async fn database_url(container: &ContainerAsync<Postgres>) -> anyhow::Result<String> {
    Ok(format!(
        "postgres://postgres:postgres@{}:{}/postgres",
        container.get_host().await?,
        container.get_host_port_ipv4(POSTGRES_PORT).await?
    ))
}

/// Connects to the container and applies the todo schema and stored procedures.
pub async fn setup_db(container: &ContainerAsync<Postgres>) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url(container).await?);
    options.max_connections(5).sqlx_logging(false);

    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Removes every todo stored procedure so that only the ORM path can serve requests.
pub async fn drop_todo_procedures(db: &DatabaseConnection) -> anyhow::Result<()> {
    db.execute_unprepared(
        "DROP FUNCTION sp_get_all_todos, sp_get_todo_by_id, sp_create_todo, sp_update_todo, \
         sp_delete_todo, sp_get_completed_todos, sp_get_incomplete_todos, \
         sp_mark_todo_completed, sp_mark_todo_incomplete",
    )
    .await?;
    Ok(())
}
