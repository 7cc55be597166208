// src/db/field_repo.rs

use chrono::Utc;
use serde_json::Value;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::field::{CustomField, FieldType, FieldVisibilityEntry, LeadFieldValue},
};

#[derive(Clone)]
pub struct FieldRepository {
    pool: SqlitePool,
}

impl FieldRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  DEFINIÇÕES DE CAMPOS (O Molde)
    // =========================================================================

    /// Lista todas as definições na ordem natural (sequence, id).
    pub async fn list_all<'e, E>(&self, executor: E) -> Result<Vec<CustomField>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let fields = sqlx::query_as::<_, CustomField>(
            "SELECT * FROM custom_fields ORDER BY sequence, id",
        )
        .fetch_all(executor)
        .await?;

        Ok(fields)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: i64,
    ) -> Result<Option<CustomField>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let field = sqlx::query_as::<_, CustomField>("SELECT * FROM custom_fields WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(field)
    }

    pub async fn find_by_key<'e, E>(
        &self,
        executor: E,
        field_key: &str,
    ) -> Result<Option<CustomField>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let field =
            sqlx::query_as::<_, CustomField>("SELECT * FROM custom_fields WHERE field_key = ?")
                .bind(field_key)
                .fetch_optional(executor)
                .await?;

        Ok(field)
    }

    pub async fn max_sequence<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let max = sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(sequence) FROM custom_fields")
            .fetch_one(executor)
            .await?;

        Ok(max.unwrap_or(0))
    }

    /// Abre espaço na posição `sequence`: empurra em 1 tudo a partir dela.
    pub async fn shift_sequences_from<'e, E>(
        &self,
        executor: E,
        sequence: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE custom_fields SET sequence = sequence + 1 WHERE sequence >= ?")
            .bind(sequence)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        name: &str,
        field_key: &str,
        field_type: FieldType,
        options: Option<&Value>,
        option_colors: Option<&Value>,
        is_required: bool,
        default_value: Option<&str>,
        sequence: i64,
    ) -> Result<CustomField, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let field = sqlx::query_as::<_, CustomField>(
            r#"
            INSERT INTO custom_fields
                (name, field_key, field_type, options, option_colors, is_required, default_value, sequence, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(field_key)
        .bind(field_type)
        .bind(options)
        .bind(option_colors)
        .bind(is_required)
        .bind(default_value)
        .bind(sequence)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateKey(format!(
                        "Já existe um campo com a chave '{}'.",
                        field_key
                    ));
                }
            }
            e.into()
        })?;

        Ok(field)
    }

    /// Edição da definição. Chave e tipo são imutáveis depois de criados.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: i64,
        name: &str,
        options: Option<&Value>,
        option_colors: Option<&Value>,
        is_required: bool,
        default_value: Option<&str>,
    ) -> Result<Option<CustomField>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let field = sqlx::query_as::<_, CustomField>(
            r#"
            UPDATE custom_fields
            SET name = ?, options = ?, option_colors = ?, is_required = ?, default_value = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(options)
        .bind(option_colors)
        .bind(is_required)
        .bind(default_value)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(field)
    }

    // As quatro remoções abaixo compõem a cascata do delete_field;
    // o service roda todas dentro de uma transação.

    pub async fn delete_values_by_field<'e, E>(&self, executor: E, id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM field_values WHERE field_id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_visibility_by_field<'e, E>(
        &self,
        executor: E,
        id: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM field_visibility WHERE field_id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_view_fields_by_field<'e, E>(
        &self,
        executor: E,
        id: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM view_fields WHERE field_id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_definition<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM custom_fields WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    //  VALORES (O Dado)
    // =========================================================================

    /// Grava o valor do par (lead, campo). A UNIQUE garante no máximo uma
    /// linha; a segunda gravação substitui a primeira.
    pub async fn upsert_value<'e, E>(
        &self,
        executor: E,
        lead_id: i64,
        field_id: i64,
        value: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO field_values (lead_id, field_id, value)
            VALUES (?, ?, ?)
            ON CONFLICT (lead_id, field_id)
            DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(lead_id)
        .bind(field_id)
        .bind(value)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn values_for_lead<'e, E>(
        &self,
        executor: E,
        lead_id: i64,
    ) -> Result<Vec<LeadFieldValue>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let values = sqlx::query_as::<_, LeadFieldValue>(
            r#"
            SELECT fv.lead_id, cf.field_key, cf.field_type, fv.value
            FROM field_values fv
            JOIN custom_fields cf ON fv.field_id = cf.id
            WHERE fv.lead_id = ?
            "#,
        )
        .bind(lead_id)
        .fetch_all(executor)
        .await?;

        Ok(values)
    }

    /// Todos os valores de todos os leads ativos, para montar o mapa
    /// lead_id -> {field_key: value} de uma vez só.
    pub async fn values_for_all_leads<'e, E>(
        &self,
        executor: E,
    ) -> Result<Vec<LeadFieldValue>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let values = sqlx::query_as::<_, LeadFieldValue>(
            r#"
            SELECT fv.lead_id, cf.field_key, cf.field_type, fv.value
            FROM field_values fv
            JOIN custom_fields cf ON fv.field_id = cf.id
            JOIN leads l ON fv.lead_id = l.id
            WHERE l.deleted_at IS NULL
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(values)
    }

    pub async fn count_values_by_field<'e, E>(
        &self,
        executor: E,
        field_id: i64,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM field_values WHERE field_id = ?")
                .bind(field_id)
                .fetch_one(executor)
                .await?;

        Ok(count)
    }

    // =========================================================================
    //  VISIBILIDADE POR USUÁRIO
    // =========================================================================

    /// Campos com a visibilidade/ordem do usuário aplicada por cima da
    /// ordem natural (COALESCE com os defaults da definição).
    pub async fn visibility_for_user<'e, E>(
        &self,
        executor: E,
        user_id: i64,
    ) -> Result<Vec<FieldVisibilityEntry>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let entries = sqlx::query_as::<_, FieldVisibilityEntry>(
            r#"
            SELECT cf.id, cf.name, cf.field_key, cf.field_type,
                   COALESCE(fv.is_visible, 1) as is_visible,
                   COALESCE(fv.sequence, cf.sequence) as sequence
            FROM custom_fields cf
            LEFT JOIN field_visibility fv ON cf.id = fv.field_id AND fv.user_id = ?
            ORDER BY COALESCE(fv.sequence, cf.sequence), cf.id
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }

    pub async fn upsert_visibility<'e, E>(
        &self,
        executor: E,
        user_id: i64,
        field_id: i64,
        is_visible: bool,
        sequence: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO field_visibility (user_id, field_id, is_visible, sequence)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id, field_id)
            DO UPDATE SET is_visible = excluded.is_visible, sequence = excluded.sequence
            "#,
        )
        .bind(user_id)
        .bind(field_id)
        .bind(is_visible)
        .bind(sequence)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Reordenação via drag-and-drop: grava só a posição, preservando a
    /// visibilidade já configurada (novas linhas nascem visíveis).
    pub async fn upsert_visibility_sequence<'e, E>(
        &self,
        executor: E,
        user_id: i64,
        field_id: i64,
        sequence: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO field_visibility (user_id, field_id, is_visible, sequence)
            VALUES (?, ?, 1, ?)
            ON CONFLICT (user_id, field_id)
            DO UPDATE SET sequence = excluded.sequence
            "#,
        )
        .bind(user_id)
        .bind(field_id)
        .bind(sequence)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn count_visibility_by_field<'e, E>(
        &self,
        executor: E,
        field_id: i64,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM field_visibility WHERE field_id = ?",
        )
        .bind(field_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }
}
