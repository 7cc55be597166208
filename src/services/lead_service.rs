// src/services/lead_service.rs

use std::collections::HashMap;

use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    common::error::AppError,
    db::{ActivityRepository, FieldRepository, GroupPreferenceRepository, LeadRepository},
    models::{
        activity::ActivityType,
        grouping::{FieldRef, GroupNode, GroupPreference, SortDirection},
        lead::{Lead, LeadStatus},
    },
    services::{
        field_service::validation_error, grouping, handoff_service::HandoffService,
        webhook::WebhookNotifier,
    },
};

// Estágio inicial de todo lead criado sem estágio explícito.
pub const DEFAULT_STATUS: &str = "New Lead";

// Colunas fixas editáveis pelo patch inline da tabela. Status e nome têm
// fluxos próprios; as demais colunas não são editáveis por esse caminho.
const INLINE_EDITABLE_COLUMNS: [&str; 6] =
    ["email", "phone", "address", "job_type", "property_type", "notes"];

#[derive(Debug, Clone, Default)]
pub struct LeadInput<'a> {
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub job_type: Option<&'a str>,
    pub property_type: Option<&'a str>,
    pub status: Option<&'a str>,
    pub notes: Option<&'a str>,
}

#[derive(Clone)]
pub struct LeadService {
    pool: SqlitePool,
    leads: LeadRepository,
    fields: FieldRepository,
    groups: GroupPreferenceRepository,
    activities: ActivityRepository,
    handoffs: HandoffService,
    webhook: WebhookNotifier,
}

impl LeadService {
    pub fn new(
        pool: SqlitePool,
        leads: LeadRepository,
        fields: FieldRepository,
        groups: GroupPreferenceRepository,
        activities: ActivityRepository,
        handoffs: HandoffService,
        webhook: WebhookNotifier,
    ) -> Self {
        Self { pool, leads, fields, groups, activities, handoffs, webhook }
    }

    // =========================================================================
    //  CRUD
    // =========================================================================

    pub async fn create_lead(
        &self,
        input: LeadInput<'_>,
        user_id: Option<i64>,
    ) -> Result<Lead, AppError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(validation_error("name", "required"));
        }

        let status = input.status.unwrap_or(DEFAULT_STATUS);
        if !self.leads.status_exists(&self.pool, status).await? {
            return Err(validation_error("status", "unknown_status"));
        }

        let mut tx = self.pool.begin().await?;
        let lead = self
            .leads
            .create(
                &mut *tx,
                name,
                input.email,
                input.phone,
                input.address,
                input.job_type,
                input.property_type,
                status,
                input.notes,
            )
            .await?;
        self.activities
            .insert(&mut *tx, lead.id, user_id, ActivityType::Created, "Lead created", None)
            .await?;
        tx.commit().await?;

        // Notificação externa em segundo plano; nunca bloqueia a resposta.
        if let Ok(payload) = serde_json::to_value(&lead) {
            self.webhook.notify_detached("lead.created", payload);
        }

        Ok(lead)
    }

    pub async fn list_leads(
        &self,
        status: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<Lead>, AppError> {
        self.leads.list(&self.pool, status, search).await
    }

    pub async fn get_lead(&self, id: i64) -> Result<Lead, AppError> {
        self.leads
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Lead"))
    }

    /// Atualização completa. Mudança de estágio embutida passa pelo mesmo
    /// fluxo do change_status (linha do tempo + handoff).
    pub async fn update_lead(
        &self,
        id: i64,
        input: LeadInput<'_>,
        user_id: Option<i64>,
    ) -> Result<Lead, AppError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(validation_error("name", "required"));
        }

        let existing = self.get_lead(id).await?;
        let status = input.status.unwrap_or(&existing.status);
        if !self.leads.status_exists(&self.pool, status).await? {
            return Err(validation_error("status", "unknown_status"));
        }

        let lead = self
            .leads
            .update(
                &self.pool,
                id,
                name,
                input.email,
                input.phone,
                input.address,
                input.job_type,
                input.property_type,
                status,
                input.notes,
            )
            .await?
            .ok_or(AppError::NotFound("Lead"))?;

        if lead.status != existing.status {
            self.record_status_change(&lead, &existing.status, user_id).await?;
        }

        Ok(lead)
    }

    /// Edição inline de uma única coluna fixa da tabela.
    pub async fn update_lead_column(
        &self,
        id: i64,
        column: &str,
        value: Option<&str>,
    ) -> Result<Lead, AppError> {
        if !INLINE_EDITABLE_COLUMNS.contains(&column) {
            return Err(validation_error("column", "not_editable"));
        }

        self.leads
            .update_column(&self.pool, id, column, value)
            .await?
            .ok_or(AppError::NotFound("Lead"))
    }

    /// Move o lead de estágio (drag do kanban).
    pub async fn change_status(
        &self,
        id: i64,
        status: &str,
        user_id: Option<i64>,
    ) -> Result<Lead, AppError> {
        if !self.leads.status_exists(&self.pool, status).await? {
            return Err(validation_error("status", "unknown_status"));
        }

        let existing = self.get_lead(id).await?;
        if existing.status == status {
            return Ok(existing);
        }

        let lead = self
            .leads
            .update_status(&self.pool, id, status)
            .await?
            .ok_or(AppError::NotFound("Lead"))?;

        self.record_status_change(&lead, &existing.status, user_id).await?;

        Ok(lead)
    }

    async fn record_status_change(
        &self,
        lead: &Lead,
        from_status: &str,
        user_id: Option<i64>,
    ) -> Result<(), AppError> {
        self.activities
            .insert(
                &self.pool,
                lead.id,
                user_id,
                ActivityType::StatusChange,
                &format!("Status changed from \"{}\" to \"{}\"", from_status, lead.status),
                Some(&json!({ "from": from_status, "to": lead.status })),
            )
            .await?;

        let fields = self.fields.list_all(&self.pool).await?;
        let values = self.values_for(lead.id).await?;
        self.handoffs
            .process_transition(lead, &fields, &values, Some(from_status), &lead.status, user_id)
            .await?;

        Ok(())
    }

    pub async fn delete_lead(&self, id: i64) -> Result<(), AppError> {
        let deleted = self.leads.soft_delete(&self.pool, id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound("Lead"));
        }
        Ok(())
    }

    /// Remoção definitiva; só aceita leads já na lixeira (soft delete).
    pub async fn purge_lead(&self, id: i64) -> Result<(), AppError> {
        let purged = self.leads.purge(&self.pool, id).await?;
        if purged == 0 {
            return Err(AppError::NotFound("Lead"));
        }
        Ok(())
    }

    pub async fn values_for(&self, lead_id: i64) -> Result<HashMap<String, String>, AppError> {
        let rows = self.fields.values_for_lead(&self.pool, lead_id).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.value.map(|v| (row.field_key, v)))
            .collect())
    }

    // =========================================================================
    //  AGRUPAMENTO
    // =========================================================================

    /// Árvore de grupos do usuário: carrega leads, valores dinâmicos e as
    /// preferências, e delega para o motor puro.
    pub async fn grouped_leads(
        &self,
        user_id: i64,
        status: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<GroupNode>, AppError> {
        let leads = self.leads.list(&self.pool, status, search).await?;
        let prefs = self.groups.list_for_user(&self.pool, user_id).await?;

        let mut values: HashMap<i64, HashMap<String, String>> = HashMap::new();
        for row in self.fields.values_for_all_leads(&self.pool).await? {
            if let Some(value) = row.value {
                values.entry(row.lead_id).or_default().insert(row.field_key, value);
            }
        }

        let custom_keys: HashMap<i64, String> = self
            .fields
            .list_all(&self.pool)
            .await?
            .into_iter()
            .map(|f| (f.id, f.field_key))
            .collect();

        Ok(grouping::group_leads(leads, &values, &custom_keys, &prefs))
    }

    pub async fn group_prefs(&self, user_id: i64) -> Result<Vec<GroupPreference>, AppError> {
        self.groups.list_for_user(&self.pool, user_id).await
    }

    /// Substitui as preferências de agrupamento do usuário. A posição na
    /// lista enviada vira o nível; referências inválidas são rejeitadas
    /// antes de qualquer escrita.
    pub async fn save_group_prefs(
        &self,
        user_id: i64,
        prefs: &[(String, SortDirection)],
    ) -> Result<Vec<GroupPreference>, AppError> {
        for (field_name, _) in prefs {
            let parsed = field_name
                .parse::<FieldRef>()
                .map_err(|_| validation_error("fieldName", "unknown_field"))?;
            if let FieldRef::Custom(id) = parsed {
                if self.fields.find_by_id(&self.pool, id).await?.is_none() {
                    return Err(validation_error("fieldName", "unknown_field"));
                }
            }
        }

        let mut tx = self.pool.begin().await?;
        self.groups.delete_for_user(&mut *tx, user_id).await?;
        let mut saved = Vec::with_capacity(prefs.len());
        for (level, (field_name, direction)) in prefs.iter().enumerate() {
            saved.push(
                self.groups
                    .insert(&mut *tx, user_id, level as i64, field_name, *direction)
                    .await?,
            );
        }
        tx.commit().await?;

        Ok(saved)
    }

    // =========================================================================
    //  ESTÁGIOS DO FUNIL
    // =========================================================================

    pub async fn statuses(&self) -> Result<Vec<LeadStatus>, AppError> {
        self.leads.list_statuses(&self.pool).await
    }

    /// Substitui o funil inteiro pela lista enviada, preservando a ordem.
    pub async fn replace_statuses(
        &self,
        statuses: &[(String, Option<String>)],
    ) -> Result<Vec<LeadStatus>, AppError> {
        if statuses.is_empty() {
            return Err(validation_error("statuses", "required"));
        }

        let mut tx = self.pool.begin().await?;
        self.leads.delete_all_statuses(&mut *tx).await?;
        let mut saved = Vec::with_capacity(statuses.len());
        for (sequence, (name, color)) in statuses.iter().enumerate() {
            let name = name.trim();
            if name.is_empty() {
                return Err(validation_error("statuses", "empty_name"));
            }
            saved.push(
                self.leads
                    .insert_status(&mut *tx, name, color.as_deref(), sequence as i64 + 1)
                    .await?,
            );
        }
        tx.commit().await?;

        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::test_pool;
    use crate::db::{HandoffRepository, SettingsRepository};
    use crate::models::field::FieldType;

    fn service(pool: &SqlitePool) -> LeadService {
        let activities = ActivityRepository::new(pool.clone());
        LeadService::new(
            pool.clone(),
            LeadRepository::new(pool.clone()),
            FieldRepository::new(pool.clone()),
            GroupPreferenceRepository::new(pool.clone()),
            activities.clone(),
            HandoffService::new(pool.clone(), HandoffRepository::new(pool.clone()), activities),
            WebhookNotifier::new(
                reqwest::Client::new(),
                pool.clone(),
                SettingsRepository::new(pool.clone()),
            ),
        )
    }

    fn input(name: &str) -> LeadInput<'_> {
        LeadInput { name, ..LeadInput::default() }
    }

    #[tokio::test]
    async fn create_defaults_to_new_lead_and_logs_creation() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let lead = svc.create_lead(input("Ana"), Some(1)).await.unwrap();
        assert_eq!(lead.status, DEFAULT_STATUS);

        let timeline = ActivityRepository::new(pool.clone())
            .list_for_lead(&pool, lead.id)
            .await
            .unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].activity_type, ActivityType::Created);
    }

    #[tokio::test]
    async fn create_rejects_unknown_status() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let err = svc
            .create_lead(LeadInput { name: "Ana", status: Some("Missing"), ..LeadInput::default() }, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn change_status_logs_and_triggers_handoff() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let handoffs =
            HandoffRepository::new(pool.clone());

        handoffs
            .insert_trigger(&pool, None, "Proposal Sent")
            .await
            .unwrap();

        let lead = svc.create_lead(input("Ana"), Some(1)).await.unwrap();
        let moved = svc.change_status(lead.id, "Proposal Sent", Some(1)).await.unwrap();
        assert_eq!(moved.status, "Proposal Sent");

        let timeline = ActivityRepository::new(pool.clone())
            .list_for_lead(&pool, lead.id)
            .await
            .unwrap();
        assert!(timeline.iter().any(|a| a.activity_type == ActivityType::StatusChange));
        assert!(timeline.iter().any(|a| a.activity_type == ActivityType::Handoff));

        let summaries = handoffs.list_for_lead(&pool, lead.id).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].from_status.as_deref(), Some(DEFAULT_STATUS));
    }

    #[tokio::test]
    async fn change_status_to_same_stage_is_a_no_op() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let lead = svc.create_lead(input("Ana"), None).await.unwrap();
        svc.change_status(lead.id, DEFAULT_STATUS, None).await.unwrap();

        let timeline = ActivityRepository::new(pool.clone())
            .list_for_lead(&pool, lead.id)
            .await
            .unwrap();
        assert!(!timeline.iter().any(|a| a.activity_type == ActivityType::StatusChange));
    }

    #[tokio::test]
    async fn inline_column_edit_is_restricted() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let lead = svc.create_lead(input("Ana"), None).await.unwrap();

        let updated = svc
            .update_lead_column(lead.id, "email", Some("ana@example.com"))
            .await
            .unwrap();
        assert_eq!(updated.email.as_deref(), Some("ana@example.com"));

        let err = svc
            .update_lead_column(lead.id, "status", Some("Lost"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        // Nome de coluna arbitrário nunca chega ao SQL.
        let err = svc
            .update_lead_column(lead.id, "id; DROP TABLE leads", Some("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn soft_delete_hides_and_purge_requires_it() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let lead = svc.create_lead(input("Ana"), None).await.unwrap();

        // Purge direto, sem soft delete, não acha nada.
        let err = svc.purge_lead(lead.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        svc.delete_lead(lead.id).await.unwrap();
        assert!(svc.list_leads(None, None).await.unwrap().is_empty());
        let err = svc.get_lead(lead.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        svc.purge_lead(lead.id).await.unwrap();
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn grouped_leads_follow_saved_preferences() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let fields = FieldRepository::new(pool.clone());

        let roof = fields
            .insert(&pool, "Roof Type", "roof_type", FieldType::Text, None, None, false, None, 1)
            .await
            .unwrap();

        let a = svc.create_lead(input("Ana"), None).await.unwrap();
        let b = svc.create_lead(input("Bia"), None).await.unwrap();
        svc.create_lead(input("Caio"), None).await.unwrap();

        fields.upsert_value(&pool, a.id, roof.id, "Tile").await.unwrap();
        fields.upsert_value(&pool, b.id, roof.id, "Metal").await.unwrap();

        svc.save_group_prefs(
            0,
            &[(format!("custom_{}", roof.id), SortDirection::Asc)],
        )
        .await
        .unwrap();

        let groups = svc.grouped_leads(0, None, None).await.unwrap();
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Metal", "Tile", "Uncategorized"]);

        // Outro usuário sem preferências vê a lista plana.
        let flat = svc.grouped_leads(9, None, None).await.unwrap();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].count, 3);
    }

    #[tokio::test]
    async fn group_prefs_reject_unknown_fields() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let err = svc
            .save_group_prefs(0, &[("budget".to_string(), SortDirection::Asc)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = svc
            .save_group_prefs(0, &[("custom_99".to_string(), SortDirection::Asc)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn replace_statuses_swaps_the_funnel() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let saved = svc
            .replace_statuses(&[
                ("Novo".to_string(), Some("#3b82f6".to_string())),
                ("Fechado".to_string(), None),
            ])
            .await
            .unwrap();
        assert_eq!(saved.len(), 2);

        let names: Vec<String> =
            svc.statuses().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Novo", "Fechado"]);
    }
}
