// src/db/lead_repo.rs

use chrono::Utc;
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::lead::{Lead, LeadStatus},
};

#[derive(Clone)]
pub struct LeadRepository {
    pool: SqlitePool,
}

impl LeadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        address: Option<&str>,
        job_type: Option<&str>,
        property_type: Option<&str>,
        status: &str,
        notes: Option<&str>,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (name, email, phone, address, job_type, property_type, status, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(address)
        .bind(job_type)
        .bind(property_type)
        .bind(status)
        .bind(notes)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await?;

        Ok(lead)
    }

    /// Busca um lead ativo (soft-deleted não conta).
    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(lead)
    }

    /// Lista leads ativos, com filtro opcional por status e busca textual
    /// (nome, e-mail, endereço ou telefone).
    pub async fn list<'e, E>(
        &self,
        executor: E,
        status: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT * FROM leads WHERE deleted_at IS NULL",
        );

        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status);
        }

        if let Some(search) = search {
            let term = format!("%{}%", search);
            qb.push(" AND (name LIKE ")
                .push_bind(term.clone())
                .push(" OR email LIKE ")
                .push_bind(term.clone())
                .push(" OR address LIKE ")
                .push_bind(term.clone())
                .push(" OR phone LIKE ")
                .push_bind(term)
                .push(")");
        }

        qb.push(" ORDER BY created_at DESC");

        let leads = qb.build_query_as::<Lead>().fetch_all(executor).await?;
        Ok(leads)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: i64,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        address: Option<&str>,
        job_type: Option<&str>,
        property_type: Option<&str>,
        status: &str,
        notes: Option<&str>,
    ) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads
            SET name = ?, email = ?, phone = ?, address = ?, job_type = ?,
                property_type = ?, status = ?, notes = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(address)
        .bind(job_type)
        .bind(property_type)
        .bind(status)
        .bind(notes)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(lead)
    }

    /// Atualização pontual de uma coluna fixa (edição inline na tabela).
    /// A coluna vem de um enum já validado, nunca de input cru.
    pub async fn update_column<'e, E>(
        &self,
        executor: E,
        id: i64,
        column: &str,
        value: Option<&str>,
    ) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "UPDATE leads SET {} = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL RETURNING *",
            column
        );

        let lead = sqlx::query_as::<_, Lead>(&sql)
            .bind(value)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(lead)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: i64,
        status: &str,
    ) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads SET status = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(lead)
    }

    /// Marca o lead como removido. Os dados continuam no banco até o purge.
    pub async fn soft_delete<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE leads SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Remoção física. Só aceita leads já marcados pelo soft delete.
    pub async fn purge<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM leads WHERE id = ? AND deleted_at IS NOT NULL")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    //  ESTÁGIOS DO FUNIL
    // =========================================================================

    pub async fn list_statuses<'e, E>(&self, executor: E) -> Result<Vec<LeadStatus>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let statuses = sqlx::query_as::<_, LeadStatus>(
            "SELECT * FROM lead_statuses ORDER BY sequence, id",
        )
        .fetch_all(executor)
        .await?;

        Ok(statuses)
    }

    pub async fn status_exists<'e, E>(&self, executor: E, name: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM lead_statuses WHERE name = ?",
        )
        .bind(name)
        .fetch_one(executor)
        .await?;

        Ok(found > 0)
    }

    pub async fn delete_all_statuses<'e, E>(&self, executor: E) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM lead_statuses").execute(executor).await?;
        Ok(())
    }

    pub async fn insert_status<'e, E>(
        &self,
        executor: E,
        name: &str,
        color: Option<&str>,
        sequence: i64,
    ) -> Result<LeadStatus, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let status = sqlx::query_as::<_, LeadStatus>(
            "INSERT INTO lead_statuses (name, color, sequence) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(name)
        .bind(color)
        .bind(sequence)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateKey(format!("O status '{}' já existe.", name));
                }
            }
            e.into()
        })?;

        Ok(status)
    }
}
