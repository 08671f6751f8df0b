use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

#[derive(DeriveMigrationName)]
pub struct Migration;

const CREATE_PROCEDURES: [&str; 9] = [
    r#"CREATE OR REPLACE FUNCTION sp_get_all_todos() RETURNS SETOF "Todo"
LANGUAGE sql STABLE AS $$
    SELECT * FROM "Todo" ORDER BY created_at DESC, id DESC
$$"#,
    r#"CREATE OR REPLACE FUNCTION sp_get_todo_by_id(p_id integer) RETURNS SETOF "Todo"
LANGUAGE sql STABLE AS $$
    SELECT * FROM "Todo" WHERE id = p_id
$$"#,
    r#"CREATE OR REPLACE FUNCTION sp_get_completed_todos() RETURNS SETOF "Todo"
LANGUAGE sql STABLE AS $$
    SELECT * FROM "Todo" WHERE is_completed ORDER BY updated_at DESC
$$"#,
    r#"CREATE OR REPLACE FUNCTION sp_get_incomplete_todos() RETURNS SETOF "Todo"
LANGUAGE sql STABLE AS $$
    SELECT * FROM "Todo" WHERE NOT is_completed ORDER BY created_at DESC, id DESC
$$"#,
    r#"CREATE OR REPLACE FUNCTION sp_create_todo(
    p_title text,
    p_description text,
    p_is_completed boolean,
    p_created_at timestamptz,
    p_updated_at timestamptz
) RETURNS integer
LANGUAGE sql AS $$
    INSERT INTO "Todo" (title, description, is_completed, created_at, updated_at)
    VALUES (p_title, p_description, p_is_completed, p_created_at, p_updated_at)
    RETURNING id
$$"#,
    r#"CREATE OR REPLACE FUNCTION sp_update_todo(
    p_id integer,
    p_title text,
    p_description text,
    p_is_completed boolean,
    p_updated_at timestamptz
) RETURNS integer
LANGUAGE plpgsql AS $$
DECLARE
    affected integer;
BEGIN
    UPDATE "Todo"
    SET title = p_title,
        description = p_description,
        is_completed = p_is_completed,
        updated_at = GREATEST(p_updated_at, updated_at + interval '1 microsecond')
    WHERE id = p_id;
    GET DIAGNOSTICS affected = ROW_COUNT;
    RETURN affected;
END
$$"#,
    r#"CREATE OR REPLACE FUNCTION sp_delete_todo(p_id integer) RETURNS integer
LANGUAGE plpgsql AS $$
DECLARE
    affected integer;
BEGIN
    DELETE FROM "Todo" WHERE id = p_id;
    GET DIAGNOSTICS affected = ROW_COUNT;
    RETURN affected;
END
$$"#,
    r#"CREATE OR REPLACE FUNCTION sp_mark_todo_completed(p_id integer, p_updated_at timestamptz) RETURNS integer
LANGUAGE plpgsql AS $$
DECLARE
    affected integer;
BEGIN
    UPDATE "Todo"
    SET is_completed = true,
        updated_at = GREATEST(p_updated_at, updated_at + interval '1 microsecond')
    WHERE id = p_id;
    GET DIAGNOSTICS affected = ROW_COUNT;
    RETURN affected;
END
$$"#,
    r#"CREATE OR REPLACE FUNCTION sp_mark_todo_incomplete(p_id integer, p_updated_at timestamptz) RETURNS integer
LANGUAGE plpgsql AS $$
DECLARE
    affected integer;
BEGIN
    UPDATE "Todo"
    SET is_completed = false,
        updated_at = GREATEST(p_updated_at, updated_at + interval '1 microsecond')
    WHERE id = p_id;
    GET DIAGNOSTICS affected = ROW_COUNT;
    RETURN affected;
END
$$"#,
];

const DROP_PROCEDURES: [&str; 9] = [
    "DROP FUNCTION IF EXISTS sp_get_all_todos()",
    "DROP FUNCTION IF EXISTS sp_get_todo_by_id(integer)",
    "DROP FUNCTION IF EXISTS sp_get_completed_todos()",
    "DROP FUNCTION IF EXISTS sp_get_incomplete_todos()",
    "DROP FUNCTION IF EXISTS sp_create_todo(text, text, boolean, timestamptz, timestamptz)",
    "DROP FUNCTION IF EXISTS sp_update_todo(integer, text, text, boolean, timestamptz)",
    "DROP FUNCTION IF EXISTS sp_delete_todo(integer)",
    "DROP FUNCTION IF EXISTS sp_mark_todo_completed(integer, timestamptz)",
    "DROP FUNCTION IF EXISTS sp_mark_todo_incomplete(integer, timestamptz)",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for statement in CREATE_PROCEDURES {
            db.execute_unprepared(statement).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for statement in DROP_PROCEDURES {
            db.execute_unprepared(statement).await?;
        }
        Ok(())
    }
}
