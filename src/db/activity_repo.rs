// src/db/activity_repo.rs

use chrono::Utc;
use serde_json::Value;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::activity::{Activity, ActivityType},
};

#[derive(Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert append-only: linhas existentes nunca são alteradas.
    pub async fn insert<'e, E>(
        &self,
        executor: E,
        lead_id: i64,
        user_id: Option<i64>,
        activity_type: ActivityType,
        content: &str,
        metadata: Option<&Value>,
    ) -> Result<Activity, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (lead_id, user_id, activity_type, content, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(user_id)
        .bind(activity_type)
        .bind(content)
        .bind(metadata)
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;

        Ok(activity)
    }

    pub async fn list_for_lead<'e, E>(
        &self,
        executor: E,
        lead_id: i64,
    ) -> Result<Vec<Activity>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let activities = sqlx::query_as::<_, Activity>(
            "SELECT * FROM activities WHERE lead_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(lead_id)
        .fetch_all(executor)
        .await?;

        Ok(activities)
    }

    /// Últimas anotações manuais, para o resumo de handoff.
    pub async fn last_notes<'e, E>(
        &self,
        executor: E,
        lead_id: i64,
        limit: i64,
    ) -> Result<Vec<Activity>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let notes = sqlx::query_as::<_, Activity>(
            r#"
            SELECT * FROM activities
            WHERE lead_id = ? AND activity_type = 'note'
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(lead_id)
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(notes)
    }

    pub async fn count_for_lead<'e, E>(&self, executor: E, lead_id: i64) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM activities WHERE lead_id = ?",
        )
        .bind(lead_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    pub async fn count_notes_for_lead<'e, E>(
        &self,
        executor: E,
        lead_id: i64,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM activities WHERE lead_id = ? AND activity_type = 'note'",
        )
        .bind(lead_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    /// Único caminho de remoção: o delete explícito por atividade.
    pub async fn delete<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM activities WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
