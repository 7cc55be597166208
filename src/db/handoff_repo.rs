// src/db/handoff_repo.rs

use chrono::Utc;
use serde_json::Value;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::handoff::{HandoffSummary, HandoffTrigger},
};

#[derive(Clone)]
pub struct HandoffRepository {
    pool: SqlitePool,
}

impl HandoffRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  GATILHOS
    // =========================================================================

    pub async fn find_exact_trigger<'e, E>(
        &self,
        executor: E,
        from_status: &str,
        to_status: &str,
    ) -> Result<Option<HandoffTrigger>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let trigger = sqlx::query_as::<_, HandoffTrigger>(
            "SELECT * FROM handoff_triggers WHERE from_status = ? AND to_status = ?",
        )
        .bind(from_status)
        .bind(to_status)
        .fetch_optional(executor)
        .await?;

        Ok(trigger)
    }

    /// Linha curinga: from_status IS NULL, casa com qualquer origem.
    pub async fn find_wildcard_trigger<'e, E>(
        &self,
        executor: E,
        to_status: &str,
    ) -> Result<Option<HandoffTrigger>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let trigger = sqlx::query_as::<_, HandoffTrigger>(
            "SELECT * FROM handoff_triggers WHERE from_status IS NULL AND to_status = ?",
        )
        .bind(to_status)
        .fetch_optional(executor)
        .await?;

        Ok(trigger)
    }

    pub async fn list_triggers<'e, E>(&self, executor: E) -> Result<Vec<HandoffTrigger>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let triggers = sqlx::query_as::<_, HandoffTrigger>(
            "SELECT * FROM handoff_triggers ORDER BY to_status, from_status",
        )
        .fetch_all(executor)
        .await?;

        Ok(triggers)
    }

    pub async fn insert_trigger<'e, E>(
        &self,
        executor: E,
        from_status: Option<&str>,
        to_status: &str,
    ) -> Result<HandoffTrigger, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let trigger = sqlx::query_as::<_, HandoffTrigger>(
            "INSERT INTO handoff_triggers (from_status, to_status) VALUES (?, ?) RETURNING *",
        )
        .bind(from_status)
        .bind(to_status)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateKey(format!(
                        "Já existe um gatilho para a transição ({} -> {}).",
                        from_status.unwrap_or("*"),
                        to_status
                    ));
                }
            }
            e.into()
        })?;

        Ok(trigger)
    }

    pub async fn delete_trigger<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM handoff_triggers WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    //  RESUMOS
    // =========================================================================

    pub async fn insert_summary<'e, E>(
        &self,
        executor: E,
        lead_id: i64,
        narrative: &str,
        key_info: &Value,
        from_status: Option<&str>,
        to_status: &str,
    ) -> Result<HandoffSummary, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let summary = sqlx::query_as::<_, HandoffSummary>(
            r#"
            INSERT INTO handoff_summaries (lead_id, narrative, key_info, from_status, to_status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(narrative)
        .bind(key_info)
        .bind(from_status)
        .bind(to_status)
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;

        Ok(summary)
    }

    pub async fn list_for_lead<'e, E>(
        &self,
        executor: E,
        lead_id: i64,
    ) -> Result<Vec<HandoffSummary>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let summaries = sqlx::query_as::<_, HandoffSummary>(
            "SELECT * FROM handoff_summaries WHERE lead_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(lead_id)
        .fetch_all(executor)
        .await?;

        Ok(summaries)
    }
}
