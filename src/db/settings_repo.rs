// src/db/settings_repo.rs

use sqlx::{Executor, Sqlite, SqlitePool};

use crate::common::error::AppError;

// Configuração mutável de runtime (webhook, chave de API, ordem global de
// campos) vive em linhas chave/valor, lidas a cada requisição. Nada de
// estado global mutável no processo.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get<'e, E>(&self, executor: E, key: &str) -> Result<Option<String>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let value = sqlx::query_scalar::<_, Option<String>>(
            "SELECT value FROM app_settings WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(executor)
        .await?;

        Ok(value.flatten())
    }

    pub async fn set<'e, E>(&self, executor: E, key: &str, value: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value)
            VALUES (?, ?)
            ON CONFLICT (key)
            DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, key: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM app_settings WHERE key = ?")
            .bind(key)
            .execute(executor)
            .await?;

        Ok(())
    }
}
