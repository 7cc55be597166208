// src/db/view_repo.rs

use chrono::Utc;
use serde_json::Value;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::view::{View, ViewFieldEntry},
};

#[derive(Clone)]
pub struct ViewRepository {
    pool: SqlitePool,
}

impl ViewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_all<'e, E>(&self, executor: E) -> Result<Vec<View>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let views = sqlx::query_as::<_, View>("SELECT * FROM views ORDER BY name")
            .fetch_all(executor)
            .await?;

        Ok(views)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<View>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let view = sqlx::query_as::<_, View>("SELECT * FROM views WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(view)
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        default_fields: &Value,
    ) -> Result<View, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let view = sqlx::query_as::<_, View>(
            r#"
            INSERT INTO views (name, description, default_fields, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(default_fields)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateKey(format!(
                        "Já existe uma view com o nome '{}'.",
                        name
                    ));
                }
            }
            e.into()
        })?;

        Ok(view)
    }

    pub async fn update_default_fields<'e, E>(
        &self,
        executor: E,
        id: i64,
        default_fields: &Value,
    ) -> Result<Option<View>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let view = sqlx::query_as::<_, View>(
            "UPDATE views SET default_fields = ? WHERE id = ? RETURNING *",
        )
        .bind(default_fields)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(view)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM views WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    //  ASSOCIAÇÕES VIEW <-> CAMPO
    // =========================================================================

    pub async fn delete_view_fields<'e, E>(&self, executor: E, view_id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM view_fields WHERE view_id = ?")
            .bind(view_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_view_field<'e, E>(
        &self,
        executor: E,
        view_id: i64,
        field_id: i64,
        sequence: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT INTO view_fields (view_id, field_id, sequence) VALUES (?, ?, ?)")
            .bind(view_id)
            .bind(field_id)
            .bind(sequence)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Campos dinâmicos da view, na ordem definida nela.
    pub async fn fields_for_view<'e, E>(
        &self,
        executor: E,
        view_id: i64,
    ) -> Result<Vec<ViewFieldEntry>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let fields = sqlx::query_as::<_, ViewFieldEntry>(
            r#"
            SELECT cf.id as field_id, cf.name, cf.field_key, vf.sequence as view_sequence
            FROM custom_fields cf
            JOIN view_fields vf ON cf.id = vf.field_id
            WHERE vf.view_id = ?
            ORDER BY vf.sequence, cf.id
            "#,
        )
        .bind(view_id)
        .fetch_all(executor)
        .await?;

        Ok(fields)
    }

    pub async fn count_view_fields_by_field<'e, E>(
        &self,
        executor: E,
        field_id: i64,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM view_fields WHERE field_id = ?")
                .bind(field_id)
                .fetch_one(executor)
                .await?;

        Ok(count)
    }

    // =========================================================================
    //  VIEW ATUAL DO USUÁRIO
    // =========================================================================

    pub async fn current_view<'e, E>(
        &self,
        executor: E,
        user_id: i64,
    ) -> Result<Option<View>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let view = sqlx::query_as::<_, View>(
            r#"
            SELECT v.* FROM views v
            JOIN user_view_preferences uvp ON v.id = uvp.current_view_id
            WHERE uvp.user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(view)
    }

    /// None = "All Fields" (nenhuma view selecionada).
    pub async fn set_current_view<'e, E>(
        &self,
        executor: E,
        user_id: i64,
        view_id: Option<i64>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO user_view_preferences (user_id, current_view_id)
            VALUES (?, ?)
            ON CONFLICT (user_id)
            DO UPDATE SET current_view_id = excluded.current_view_id
            "#,
        )
        .bind(user_id)
        .bind(view_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Quando uma view some, quem a usava volta para "All Fields".
    pub async fn clear_current_for_view<'e, E>(
        &self,
        executor: E,
        view_id: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE user_view_preferences SET current_view_id = NULL WHERE current_view_id = ?",
        )
        .bind(view_id)
        .execute(executor)
        .await?;

        Ok(())
    }
}
