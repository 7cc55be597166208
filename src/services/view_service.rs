// src/services/view_service.rs

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    common::error::AppError,
    db::{FieldRepository, SettingsRepository, ViewRepository},
    models::{
        field::CustomField,
        grouping::{FieldRef, DEFAULT_VIEW_KEYS},
        settings::SETTING_FIELD_ORDER,
        view::{FieldOrder, ResolvedField, ResolvedFields, View, ViewFieldEntry},
    },
    services::field_service::validation_error,
};

/// Resolve as colunas da tabela de leads em três camadas de precedência:
///
/// 1. Ordem global persistida (blob em app_settings) — vale para todos;
/// 2. View selecionada pelo usuário;
/// 3. Sem nada disso, tudo visível na ordem natural.
///
/// A saída sempre cobre TODOS os campos conhecidos: o que não foi citado
/// pela camada vencedora entra no fim como oculto, para que campos criados
/// depois nunca desapareçam do seletor.
pub fn resolve_fields(
    global_order: Option<&FieldOrder>,
    current_view: Option<(&View, &[ViewFieldEntry])>,
    all_fields: &[CustomField],
) -> ResolvedFields {
    let by_id: HashMap<i64, &CustomField> = all_fields.iter().map(|f| (f.id, f)).collect();
    let mut fields: Vec<ResolvedField> = Vec::new();

    if let Some(order) = global_order {
        let mut seen_defaults: HashSet<&'static str> = HashSet::new();
        let mut seen_customs: HashSet<i64> = HashSet::new();

        let mut push_ref = |fields: &mut Vec<ResolvedField>, r: &FieldRef, visible: bool| {
            match r {
                FieldRef::Default(key) => {
                    seen_defaults.insert(key.as_str());
                    fields.push(ResolvedField::Default {
                        key: key.as_str().to_string(),
                        label: key.label().to_string(),
                        visible,
                    });
                }
                // Referência para um campo já apagado é simplesmente pulada.
                FieldRef::Custom(id) => {
                    if let Some(field) = by_id.get(id) {
                        seen_customs.insert(*id);
                        fields.push(ResolvedField::Custom {
                            id: *id,
                            name: field.name.clone(),
                            visible,
                        });
                    }
                }
            }
        };

        for r in &order.visible {
            push_ref(&mut fields, r, true);
        }
        for r in &order.hidden {
            push_ref(&mut fields, r, false);
        }

        for key in DEFAULT_VIEW_KEYS {
            if !seen_defaults.contains(key.as_str()) {
                fields.push(ResolvedField::Default {
                    key: key.as_str().to_string(),
                    label: key.label().to_string(),
                    visible: false,
                });
            }
        }
        for field in all_fields {
            if !seen_customs.contains(&field.id) {
                fields.push(ResolvedField::Custom {
                    id: field.id,
                    name: field.name.clone(),
                    visible: false,
                });
            }
        }
    } else if let Some((view, view_fields)) = current_view {
        // Colunas fixas: visíveis se citadas no default_fields da view.
        let visible_defaults: HashSet<String> = view
            .default_fields
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        for key in DEFAULT_VIEW_KEYS {
            fields.push(ResolvedField::Default {
                key: key.as_str().to_string(),
                label: key.label().to_string(),
                visible: visible_defaults.contains(key.as_str()),
            });
        }

        // Campos dinâmicos: os da view primeiro, na ordem dela; o resto oculto.
        let mut in_view: HashSet<i64> = HashSet::new();
        for entry in view_fields {
            if by_id.contains_key(&entry.field_id) {
                in_view.insert(entry.field_id);
                fields.push(ResolvedField::Custom {
                    id: entry.field_id,
                    name: entry.name.clone(),
                    visible: true,
                });
            }
        }
        for field in all_fields {
            if !in_view.contains(&field.id) {
                fields.push(ResolvedField::Custom {
                    id: field.id,
                    name: field.name.clone(),
                    visible: false,
                });
            }
        }
    } else {
        // "All Fields": tudo visível na ordem natural.
        for key in DEFAULT_VIEW_KEYS {
            fields.push(ResolvedField::Default {
                key: key.as_str().to_string(),
                label: key.label().to_string(),
                visible: true,
            });
        }
        for field in all_fields {
            fields.push(ResolvedField::Custom {
                id: field.id,
                name: field.name.clone(),
                visible: true,
            });
        }
    }

    let visible_default_keys = fields
        .iter()
        .filter_map(|f| match f {
            ResolvedField::Default { key, visible: true, .. } => Some(key.clone()),
            _ => None,
        })
        .collect();
    let visible_custom_ids = fields
        .iter()
        .filter_map(|f| match f {
            ResolvedField::Custom { id, visible: true, .. } => Some(*id),
            _ => None,
        })
        .collect();

    ResolvedFields { fields, visible_default_keys, visible_custom_ids }
}

#[derive(Clone)]
pub struct ViewService {
    pool: SqlitePool,
    views: ViewRepository,
    fields: FieldRepository,
    settings: SettingsRepository,
}

impl ViewService {
    pub fn new(
        pool: SqlitePool,
        views: ViewRepository,
        fields: FieldRepository,
        settings: SettingsRepository,
    ) -> Self {
        Self { pool, views, fields, settings }
    }

    pub async fn list_views(&self) -> Result<Vec<View>, AppError> {
        self.views.list_all(&self.pool).await
    }

    pub async fn get_view(&self, id: i64) -> Result<(View, Vec<ViewFieldEntry>), AppError> {
        let view = self
            .views
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("View"))?;
        let fields = self.views.fields_for_view(&self.pool, id).await?;
        Ok((view, fields))
    }

    pub async fn create_view(
        &self,
        name: &str,
        description: Option<&str>,
        default_fields: &[String],
        custom_field_ids: &[i64],
    ) -> Result<View, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(validation_error("name", "required"));
        }

        let defaults = self.validate_default_keys(default_fields)?;

        let mut tx = self.pool.begin().await?;
        let view = self
            .views
            .insert(&mut *tx, name, description, &Value::Array(defaults))
            .await?;
        for (sequence, field_id) in custom_field_ids.iter().enumerate() {
            self.views
                .insert_view_field(&mut *tx, view.id, *field_id, sequence as i64)
                .await?;
        }
        tx.commit().await?;

        Ok(view)
    }

    pub async fn update_view(
        &self,
        id: i64,
        default_fields: &[String],
        custom_field_ids: &[i64],
    ) -> Result<View, AppError> {
        let defaults = self.validate_default_keys(default_fields)?;

        let mut tx = self.pool.begin().await?;
        let view = self
            .views
            .update_default_fields(&mut *tx, id, &Value::Array(defaults))
            .await?
            .ok_or(AppError::NotFound("View"))?;
        self.views.delete_view_fields(&mut *tx, id).await?;
        for (sequence, field_id) in custom_field_ids.iter().enumerate() {
            self.views
                .insert_view_field(&mut *tx, id, *field_id, sequence as i64)
                .await?;
        }
        tx.commit().await?;

        Ok(view)
    }

    /// Apaga a view e devolve para "All Fields" quem a tinha selecionada.
    pub async fn delete_view(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        self.views.clear_current_for_view(&mut *tx, id).await?;
        self.views.delete_view_fields(&mut *tx, id).await?;
        let deleted = self.views.delete(&mut *tx, id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound("View"));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Troca a view atual do usuário. `None` volta para "All Fields".
    pub async fn select_view(&self, user_id: i64, view_id: Option<i64>) -> Result<(), AppError> {
        if let Some(id) = view_id {
            if self.views.find_by_id(&self.pool, id).await?.is_none() {
                return Err(AppError::NotFound("View"));
            }
        }
        self.views.set_current_view(&self.pool, user_id, view_id).await
    }

    pub async fn current_view(&self, user_id: i64) -> Result<Option<View>, AppError> {
        self.views.current_view(&self.pool, user_id).await
    }

    /// Colunas resolvidas para o usuário, já com a precedência aplicada.
    pub async fn resolved_fields(&self, user_id: i64) -> Result<ResolvedFields, AppError> {
        let global_order = self.field_order().await?;
        let all_fields = self.fields.list_all(&self.pool).await?;

        let current = match self.views.current_view(&self.pool, user_id).await? {
            Some(view) => {
                let entries = self.views.fields_for_view(&self.pool, view.id).await?;
                Some((view, entries))
            }
            None => None,
        };

        Ok(resolve_fields(
            global_order.as_ref(),
            current.as_ref().map(|(v, e)| (v, e.as_slice())),
            &all_fields,
        ))
    }

    // =========================================================================
    //  ORDEM GLOBAL DE CAMPOS
    // =========================================================================

    pub async fn field_order(&self) -> Result<Option<FieldOrder>, AppError> {
        let raw = self.settings.get(&self.pool, SETTING_FIELD_ORDER).await?;
        match raw {
            Some(raw) => match serde_json::from_str::<FieldOrder>(&raw) {
                Ok(order) => Ok(Some(order)),
                // Blob corrompido não derruba a listagem: cai para a camada
                // seguinte e avisa no log.
                Err(e) => {
                    tracing::warn!("ordem global de campos ilegível, ignorando: {}", e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Persiste a ordem global. Referências a campos dinâmicos inexistentes
    /// são rejeitadas antes de gravar.
    pub async fn save_field_order(&self, order: &FieldOrder) -> Result<(), AppError> {
        let known: HashSet<i64> = self
            .fields
            .list_all(&self.pool)
            .await?
            .into_iter()
            .map(|f| f.id)
            .collect();

        for r in order.visible.iter().chain(order.hidden.iter()) {
            if let FieldRef::Custom(id) = r {
                if !known.contains(id) {
                    return Err(validation_error("fieldOrder", "unknown_custom_field"));
                }
            }
        }

        let blob = serde_json::to_string(order).map_err(anyhow::Error::from)?;
        self.settings.set(&self.pool, SETTING_FIELD_ORDER, &blob).await
    }

    pub async fn clear_field_order(&self) -> Result<(), AppError> {
        self.settings.delete(&self.pool, SETTING_FIELD_ORDER).await
    }

    fn validate_default_keys(&self, keys: &[String]) -> Result<Vec<Value>, AppError> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let valid = DEFAULT_VIEW_KEYS.iter().any(|k| k.as_str() == key);
            if !valid {
                return Err(validation_error("defaultFields", "unknown_default_field"));
            }
            out.push(json!(key));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::test_pool;
    use crate::models::field::FieldType;
    use crate::models::grouping::DefaultFieldKey;
    use chrono::Utc;

    fn custom(id: i64, name: &str) -> CustomField {
        CustomField {
            id,
            name: name.to_string(),
            field_key: name.to_lowercase().replace(' ', "_"),
            field_type: FieldType::Text,
            options: None,
            option_colors: None,
            is_required: false,
            default_value: None,
            sequence: id,
            created_at: Utc::now(),
        }
    }

    fn view(default_fields: Value) -> View {
        View {
            id: 1,
            name: "Estimator View".to_string(),
            description: None,
            default_fields,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn without_order_or_view_everything_is_visible() {
        let all = vec![custom(1, "Budget"), custom(2, "Roof Type")];
        let resolved = resolve_fields(None, None, &all);

        assert!(resolved.fields.iter().all(|f| f.visible()));
        assert_eq!(
            resolved.visible_default_keys,
            vec!["email", "phone", "address", "job_type", "property_type"]
        );
        assert_eq!(resolved.visible_custom_ids, vec![1, 2]);
    }

    #[test]
    fn view_controls_visibility_when_no_global_order() {
        let all = vec![custom(1, "Budget"), custom(2, "Roof Type")];
        let v = view(json!(["email", "job_type"]));
        let entries = vec![ViewFieldEntry {
            field_id: 2,
            name: "Roof Type".to_string(),
            field_key: "roof_type".to_string(),
            view_sequence: 0,
        }];

        let resolved = resolve_fields(None, Some((&v, &entries)), &all);

        assert_eq!(resolved.visible_default_keys, vec!["email", "job_type"]);
        assert_eq!(resolved.visible_custom_ids, vec![2]);
        // Campo fora da view continua listado, só que oculto.
        assert!(resolved
            .fields
            .iter()
            .any(|f| matches!(f, ResolvedField::Custom { id: 1, visible: false, .. })));
    }

    #[test]
    fn global_order_beats_the_selected_view() {
        let all = vec![custom(1, "Budget"), custom(2, "Roof Type")];
        let v = view(json!(["email", "phone", "address", "job_type", "property_type"]));
        let entries: Vec<ViewFieldEntry> = Vec::new();

        let order = FieldOrder {
            visible: vec![
                FieldRef::Custom(1),
                FieldRef::Default(DefaultFieldKey::Phone),
            ],
            hidden: vec![FieldRef::Default(DefaultFieldKey::Email)],
        };

        let resolved = resolve_fields(Some(&order), Some((&v, &entries)), &all);

        assert_eq!(resolved.visible_default_keys, vec!["phone"]);
        assert_eq!(resolved.visible_custom_ids, vec![1]);
        // A ordem explícita vem primeiro, o resto entra no fim como oculto.
        assert!(matches!(
            resolved.fields[0],
            ResolvedField::Custom { id: 1, visible: true, .. }
        ));
        let hidden_tail: Vec<bool> =
            resolved.fields[3..].iter().map(ResolvedField::visible).collect();
        assert!(hidden_tail.iter().all(|v| !v));
        assert_eq!(resolved.fields.len(), 7);
    }

    #[test]
    fn stale_custom_refs_in_global_order_are_skipped() {
        let all = vec![custom(1, "Budget")];
        let order = FieldOrder {
            visible: vec![FieldRef::Custom(99), FieldRef::Custom(1)],
            hidden: vec![],
        };

        let resolved = resolve_fields(Some(&order), None, &all);

        assert_eq!(resolved.visible_custom_ids, vec![1]);
        assert!(!resolved
            .fields
            .iter()
            .any(|f| matches!(f, ResolvedField::Custom { id: 99, .. })));
    }

    // --- TESTES COM BANCO ---

    fn service(pool: &SqlitePool) -> ViewService {
        ViewService::new(
            pool.clone(),
            ViewRepository::new(pool.clone()),
            FieldRepository::new(pool.clone()),
            SettingsRepository::new(pool.clone()),
        )
    }

    #[tokio::test]
    async fn create_select_and_resolve_view() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let fields = FieldRepository::new(pool.clone());

        let budget = fields
            .insert(&pool, "Budget", "budget", FieldType::Number, None, None, false, None, 1)
            .await
            .unwrap();

        let view = svc
            .create_view(
                "Estimator View",
                Some("Campos para orçamento"),
                &["email".to_string(), "phone".to_string()],
                &[budget.id],
            )
            .await
            .unwrap();

        svc.select_view(7, Some(view.id)).await.unwrap();

        let resolved = svc.resolved_fields(7).await.unwrap();
        assert_eq!(resolved.visible_default_keys, vec!["email", "phone"]);
        assert_eq!(resolved.visible_custom_ids, vec![budget.id]);

        // Outro usuário sem seleção continua vendo tudo.
        let other = svc.resolved_fields(8).await.unwrap();
        assert_eq!(other.visible_default_keys.len(), 5);
    }

    #[tokio::test]
    async fn duplicate_view_name_is_rejected() {
        let pool = test_pool().await;
        let svc = service(&pool);

        svc.create_view("Kanban", None, &[], &[]).await.unwrap();
        let err = svc.create_view("Kanban", None, &[], &[]).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn deleting_a_view_resets_users_pointing_at_it() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let view = svc.create_view("Kanban", None, &[], &[]).await.unwrap();
        svc.select_view(3, Some(view.id)).await.unwrap();

        svc.delete_view(view.id).await.unwrap();

        assert!(svc.current_view(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn field_order_round_trips_through_settings() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let fields = FieldRepository::new(pool.clone());

        let budget = fields
            .insert(&pool, "Budget", "budget", FieldType::Number, None, None, false, None, 1)
            .await
            .unwrap();

        assert!(svc.field_order().await.unwrap().is_none());

        let order = FieldOrder {
            visible: vec![FieldRef::Custom(budget.id), FieldRef::Default(DefaultFieldKey::Email)],
            hidden: vec![FieldRef::Default(DefaultFieldKey::Phone)],
        };
        svc.save_field_order(&order).await.unwrap();

        let loaded = svc.field_order().await.unwrap().unwrap();
        assert_eq!(loaded.visible, order.visible);
        assert_eq!(loaded.hidden, order.hidden);

        svc.clear_field_order().await.unwrap();
        assert!(svc.field_order().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn field_order_with_unknown_custom_field_is_rejected() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let order = FieldOrder { visible: vec![FieldRef::Custom(42)], hidden: vec![] };
        let err = svc.save_field_order(&order).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
