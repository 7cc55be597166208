// src/services/field_service.rs

use std::collections::HashMap;

use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    common::error::AppError,
    db::{ActivityRepository, FieldRepository, LeadRepository},
    models::{
        activity::ActivityType,
        field::{CustomField, FieldType, FieldVisibilityEntry},
    },
};

// Helper para erros de validação construídos à mão (fora do derive).
pub(crate) fn validation_error(field: &'static str, message: &'static str) -> AppError {
    let mut errors = validator::ValidationErrors::new();
    let mut error = validator::ValidationError::new("invalid");
    error.message = Some(message.into());
    errors.add(field.into(), error);
    AppError::ValidationError(errors)
}

/// Deriva a chave única (slug) a partir do nome do campo: minúsculas, sem
/// caracteres especiais, espaços/hífens viram underscore.
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_separator = false;

    for c in text.trim().to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            pending_separator = !slug.is_empty();
        } else if c.is_alphanumeric() || c == '_' {
            if pending_separator {
                slug.push('_');
                pending_separator = false;
            }
            slug.push(c);
        }
        // Qualquer outro caractere é simplesmente descartado.
    }

    slug
}

/// Normalização dirigida pelo tipo, aplicada antes de gravar o valor.
pub fn normalize_value(field_type: FieldType, raw: &Value) -> String {
    match field_type {
        // Lista vira array JSON serializado; lista vazia vira string vazia.
        FieldType::MultiSelect => match raw {
            Value::Array(items) if items.is_empty() => String::new(),
            Value::Array(items) => serde_json::to_string(items).unwrap_or_default(),
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        },
        // Qualquer entrada truthy vira "1", o resto "0".
        FieldType::Checkbox => {
            let truthy = match raw {
                Value::Bool(b) => *b,
                Value::String(s) => s == "true" || s == "1",
                Value::Number(n) => n.as_i64() == Some(1),
                _ => false,
            };
            if truthy { "1".to_string() } else { "0".to_string() }
        }
        // Os demais tipos passam como texto.
        _ => match raw {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        },
    }
}

/// Valor formatado para exibição inline na tabela.
pub fn display_value(field_type: FieldType, value: &str) -> String {
    match field_type {
        FieldType::Checkbox => {
            if value == "1" { "✓".to_string() } else { "-".to_string() }
        }
        FieldType::MultiSelect => {
            if value.is_empty() {
                "-".to_string()
            } else {
                value
                    .replace('[', "")
                    .replace(']', "")
                    .replace('"', "")
            }
        }
        _ => {
            if value.is_empty() { "-".to_string() } else { value.to_string() }
        }
    }
}

#[derive(Clone)]
pub struct FieldService {
    pool: SqlitePool,
    fields: FieldRepository,
    leads: LeadRepository,
    activities: ActivityRepository,
}

impl FieldService {
    pub fn new(
        pool: SqlitePool,
        fields: FieldRepository,
        leads: LeadRepository,
        activities: ActivityRepository,
    ) -> Self {
        Self { pool, fields, leads, activities }
    }

    pub async fn list_fields(&self) -> Result<Vec<CustomField>, AppError> {
        self.fields.list_all(&self.pool).await
    }

    pub async fn get_field(&self, id: i64) -> Result<CustomField, AppError> {
        self.fields
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Campo"))
    }

    /// Cria a definição de um campo dinâmico.
    ///
    /// A chave é derivada do nome; colisão de chave falha com DuplicateKey
    /// sem alterar nada. Sem `insert_after` o campo vai para o fim
    /// (max(sequence) + 1); com `insert_after`, abre espaço empurrando os
    /// campos seguintes.
    pub async fn define_field(
        &self,
        name: &str,
        field_type: FieldType,
        options: Option<Value>,
        option_colors: Option<Value>,
        is_required: bool,
        default_value: Option<&str>,
        insert_after: Option<i64>,
    ) -> Result<CustomField, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(validation_error("name", "required"));
        }

        let field_key = slugify(name);
        if field_key.is_empty() {
            return Err(validation_error("name", "invalid_name"));
        }

        let mut tx = self.pool.begin().await?;

        if self.fields.find_by_key(&mut *tx, &field_key).await?.is_some() {
            return Err(AppError::DuplicateKey(format!(
                "Já existe um campo com a chave '{}'.",
                field_key
            )));
        }

        let sequence = match insert_after {
            Some(after_id) => match self.fields.find_by_id(&mut *tx, after_id).await? {
                Some(after) => {
                    let position = after.sequence + 1;
                    self.fields.shift_sequences_from(&mut *tx, position).await?;
                    position
                }
                // Posição de referência sumiu: cai para o fim.
                None => self.fields.max_sequence(&mut *tx).await? + 1,
            },
            None => self.fields.max_sequence(&mut *tx).await? + 1,
        };

        let field = self
            .fields
            .insert(
                &mut *tx,
                name,
                &field_key,
                field_type,
                options.as_ref(),
                option_colors.as_ref(),
                is_required,
                default_value,
                sequence,
            )
            .await?;

        tx.commit().await?;

        Ok(field)
    }

    pub async fn update_field(
        &self,
        id: i64,
        name: &str,
        options: Option<Value>,
        option_colors: Option<Value>,
        is_required: bool,
        default_value: Option<&str>,
    ) -> Result<CustomField, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(validation_error("name", "required"));
        }

        self.fields
            .update(
                &self.pool,
                id,
                name,
                options.as_ref(),
                option_colors.as_ref(),
                is_required,
                default_value,
            )
            .await?
            .ok_or(AppError::NotFound("Campo"))
    }

    /// Remove a definição em cascata: valores, visibilidade e associações
    /// de views saem antes, tudo na mesma transação.
    pub async fn delete_field(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        if self.fields.find_by_id(&mut *tx, id).await?.is_none() {
            return Err(AppError::NotFound("Campo"));
        }

        self.fields.delete_values_by_field(&mut *tx, id).await?;
        self.fields.delete_visibility_by_field(&mut *tx, id).await?;
        self.fields.delete_view_fields_by_field(&mut *tx, id).await?;
        self.fields.delete_definition(&mut *tx, id).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Grava o valor de um campo em um lead (upsert no par) e devolve o
    /// valor de exibição. Também registra a edição na linha do tempo.
    pub async fn set_value(
        &self,
        lead_id: i64,
        field_id: i64,
        raw: &Value,
        user_id: Option<i64>,
    ) -> Result<String, AppError> {
        let field = self
            .fields
            .find_by_id(&self.pool, field_id)
            .await?
            .ok_or(AppError::NotFound("Campo"))?;

        // NotFound corta antes de qualquer escrita.
        if self.leads.find_by_id(&self.pool, lead_id).await?.is_none() {
            return Err(AppError::NotFound("Lead"));
        }

        let value = normalize_value(field.field_type, raw);

        let mut tx = self.pool.begin().await?;
        self.fields.upsert_value(&mut *tx, lead_id, field_id, &value).await?;
        self.activities
            .insert(
                &mut *tx,
                lead_id,
                user_id,
                ActivityType::FieldUpdate,
                &format!("Field \"{}\" updated", field.name),
                Some(&json!({ "fieldKey": field.field_key, "value": value })),
            )
            .await?;
        tx.commit().await?;

        Ok(display_value(field.field_type, &value))
    }

    /// Mapa lead_id -> {field_key: value} para o motor de agrupamento e a
    /// montagem das colunas da tabela.
    pub async fn values_map(&self) -> Result<HashMap<i64, HashMap<String, String>>, AppError> {
        let rows = self.fields.values_for_all_leads(&self.pool).await?;

        let mut map: HashMap<i64, HashMap<String, String>> = HashMap::new();
        for row in rows {
            if let Some(value) = row.value {
                map.entry(row.lead_id).or_default().insert(row.field_key, value);
            }
        }

        Ok(map)
    }

    pub async fn values_for_lead(&self, lead_id: i64) -> Result<HashMap<String, String>, AppError> {
        let rows = self.fields.values_for_lead(&self.pool, lead_id).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.value.map(|v| (row.field_key, v)))
            .collect())
    }

    // =========================================================================
    //  VISIBILIDADE / ORDEM POR USUÁRIO
    // =========================================================================

    pub async fn visibility_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<FieldVisibilityEntry>, AppError> {
        self.fields.visibility_for_user(&self.pool, user_id).await
    }

    pub async fn save_visibility(
        &self,
        user_id: i64,
        entries: &[(i64, bool, i64)],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for (field_id, is_visible, sequence) in entries {
            self.fields
                .upsert_visibility(&mut *tx, user_id, *field_id, *is_visible, *sequence)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Reordena os campos do usuário: a posição é o índice na lista enviada.
    pub async fn reorder_fields(&self, user_id: i64, order: &[i64]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for (index, field_id) in order.iter().enumerate() {
            self.fields
                .upsert_visibility_sequence(&mut *tx, user_id, *field_id, index as i64)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::test_pool;
    use crate::db::{ActivityRepository, FieldRepository, LeadRepository};
    use sqlx::SqlitePool;

    fn service(pool: &SqlitePool) -> FieldService {
        FieldService::new(
            pool.clone(),
            FieldRepository::new(pool.clone()),
            LeadRepository::new(pool.clone()),
            ActivityRepository::new(pool.clone()),
        )
    }

    #[test]
    fn slugify_lowercases_and_collapses_separators() {
        assert_eq!(slugify("Roof Type"), "roof_type");
        assert_eq!(slugify("  Budget ($) Approved!  "), "budget_approved");
        assert_eq!(slugify("multi - word -- name"), "multi_word_name");
        assert_eq!(slugify("Já_ok"), "já_ok");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn normalize_checkbox_maps_truthy_inputs() {
        use serde_json::json;
        for truthy in [json!(true), json!("true"), json!("1"), json!(1)] {
            assert_eq!(normalize_value(FieldType::Checkbox, &truthy), "1");
        }
        for falsy in [json!(false), json!(""), json!("no"), json!(0), json!(null)] {
            assert_eq!(normalize_value(FieldType::Checkbox, &falsy), "0");
        }
    }

    #[test]
    fn normalize_multi_select_serializes_lists() {
        use serde_json::json;
        assert_eq!(
            normalize_value(FieldType::MultiSelect, &json!(["A", "B"])),
            r#"["A","B"]"#
        );
        assert_eq!(normalize_value(FieldType::MultiSelect, &json!([])), "");
        assert_eq!(normalize_value(FieldType::MultiSelect, &json!("A")), "A");
    }

    #[test]
    fn display_value_formats_checkbox_and_multi_select() {
        assert_eq!(display_value(FieldType::Checkbox, "1"), "✓");
        assert_eq!(display_value(FieldType::Checkbox, "0"), "-");
        assert_eq!(display_value(FieldType::MultiSelect, r#"["A","B"]"#), "A,B");
        assert_eq!(display_value(FieldType::Text, ""), "-");
    }

    #[tokio::test]
    async fn duplicate_key_fails_and_leaves_table_unchanged() {
        let pool = test_pool().await;
        let svc = service(&pool);

        svc.define_field("Roof Type", FieldType::Text, None, None, false, None, None)
            .await
            .unwrap();

        // Nome diferente, mesma chave derivada.
        let err = svc
            .define_field("Roof  Type", FieldType::Text, None, None, false, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM custom_fields")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn set_value_twice_keeps_one_row_with_last_value() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let leads = LeadRepository::new(pool.clone());

        let field = svc
            .define_field("Budget", FieldType::Number, None, None, false, None, None)
            .await
            .unwrap();
        let lead = leads
            .create(&pool, "Ana", None, None, None, None, None, "New Lead", None)
            .await
            .unwrap();

        svc.set_value(lead.id, field.id, &serde_json::json!("100"), None)
            .await
            .unwrap();
        svc.set_value(lead.id, field.id, &serde_json::json!("250"), None)
            .await
            .unwrap();

        let rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT field_id, value FROM field_values WHERE lead_id = ?",
        )
        .bind(lead.id)
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, "250");
    }

    #[tokio::test]
    async fn delete_field_cascades_to_dependent_tables() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let leads = LeadRepository::new(pool.clone());
        let fields = FieldRepository::new(pool.clone());

        let field = svc
            .define_field("Roof Type", FieldType::Text, None, None, false, None, None)
            .await
            .unwrap();
        let lead = leads
            .create(&pool, "Ana", None, None, None, None, None, "New Lead", None)
            .await
            .unwrap();

        svc.set_value(lead.id, field.id, &serde_json::json!("Tile"), None)
            .await
            .unwrap();
        svc.save_visibility(0, &[(field.id, true, 0)]).await.unwrap();
        sqlx::query("INSERT INTO views (name, default_fields, created_at) VALUES ('V', '[]', ?)")
            .bind(chrono::Utc::now())
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO view_fields (view_id, field_id, sequence) VALUES (1, ?, 0)")
            .bind(field.id)
            .execute(&pool)
            .await
            .unwrap();

        svc.delete_field(field.id).await.unwrap();

        assert_eq!(fields.count_values_by_field(&pool, field.id).await.unwrap(), 0);
        assert_eq!(fields.count_visibility_by_field(&pool, field.id).await.unwrap(), 0);
        let view_refs: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM view_fields WHERE field_id = ?")
                .bind(field.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(view_refs, 0);
        assert!(fields.find_by_id(&pool, field.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_after_shifts_following_fields() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let first = svc
            .define_field("First", FieldType::Text, None, None, false, None, None)
            .await
            .unwrap();
        let second = svc
            .define_field("Second", FieldType::Text, None, None, false, None, None)
            .await
            .unwrap();
        assert_eq!((first.sequence, second.sequence), (1, 2));

        let middle = svc
            .define_field("Middle", FieldType::Text, None, None, false, None, Some(first.id))
            .await
            .unwrap();
        assert_eq!(middle.sequence, 2);

        let ordered: Vec<String> =
            sqlx::query_scalar("SELECT field_key FROM custom_fields ORDER BY sequence, id")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(ordered, vec!["first", "middle", "second"]);
    }

    #[tokio::test]
    async fn set_value_on_missing_lead_short_circuits() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let field = svc
            .define_field("Budget", FieldType::Number, None, None, false, None, None)
            .await
            .unwrap();

        let err = svc
            .set_value(999, field.id, &serde_json::json!("100"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Lead")));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM field_values")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
