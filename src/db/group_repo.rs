// src/db/group_repo.rs

use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::grouping::{GroupPreference, SortDirection},
};

#[derive(Clone)]
pub struct GroupPreferenceRepository {
    pool: SqlitePool,
}

impl GroupPreferenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Níveis de agrupamento do usuário, do mais externo para o mais interno.
    pub async fn list_for_user<'e, E>(
        &self,
        executor: E,
        user_id: i64,
    ) -> Result<Vec<GroupPreference>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let prefs = sqlx::query_as::<_, GroupPreference>(
            "SELECT * FROM group_preferences WHERE user_id = ? ORDER BY group_level",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(prefs)
    }

    pub async fn delete_for_user<'e, E>(&self, executor: E, user_id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM group_preferences WHERE user_id = ?")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        user_id: i64,
        group_level: i64,
        field_name: &str,
        sort_direction: SortDirection,
    ) -> Result<GroupPreference, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let pref = sqlx::query_as::<_, GroupPreference>(
            r#"
            INSERT INTO group_preferences (user_id, group_level, field_name, sort_direction)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(group_level)
        .bind(field_name)
        .bind(sort_direction)
        .fetch_one(executor)
        .await?;

        Ok(pref)
    }
}
