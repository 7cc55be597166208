// src/services/handoff_service.rs

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use sqlx::SqlitePool;

use crate::{
    common::error::AppError,
    db::{ActivityRepository, HandoffRepository},
    models::{
        activity::{Activity, ActivityType},
        field::CustomField,
        handoff::{HandoffDraft, HandoffSummary, HandoffTrigger},
        lead::Lead,
    },
    services::field_service::display_value,
};

// Quantas notas recentes entram na narrativa, e o corte por nota.
const NARRATIVE_NOTE_LIMIT: i64 = 5;
const NARRATIVE_NOTE_MAX_CHARS: usize = 200;

fn truncate_note(content: &str) -> String {
    if content.chars().count() <= NARRATIVE_NOTE_MAX_CHARS {
        return content.to_string();
    }
    let mut cut: String = content.chars().take(NARRATIVE_NOTE_MAX_CHARS).collect();
    cut.push('…');
    cut
}

/// Monta o resumo de handoff em memória: narrativa em markdown para quem
/// recebe o lead, mais o snapshot estruturado (key_info). Função pura; a
/// persistência é um passo separado (salvamento explícito ou transição
/// de estágio com gatilho).
pub fn build_draft(
    lead: &Lead,
    fields: &[CustomField],
    values: &HashMap<String, String>,
    notes: &[Activity],
    note_count: i64,
    activity_count: i64,
) -> HandoffDraft {
    let mut narrative = format!("# Handoff Summary: {}\n\n## Contact\n", lead.name);

    let contact_lines = [
        ("Email", lead.email.as_deref()),
        ("Phone", lead.phone.as_deref()),
        ("Address", lead.address.as_deref()),
    ];
    for (label, value) in contact_lines {
        narrative.push_str(&format!("- {}: {}\n", label, value.unwrap_or("-")));
    }

    narrative.push_str("\n## Job\n");
    narrative.push_str(&format!("- Status: {}\n", lead.status));
    narrative.push_str(&format!("- Job Type: {}\n", lead.job_type.as_deref().unwrap_or("-")));
    narrative.push_str(&format!(
        "- Property Type: {}\n",
        lead.property_type.as_deref().unwrap_or("-")
    ));

    // Só campos dinâmicos preenchidos entram no resumo.
    let mut custom_snapshot = Map::new();
    let mut details = String::new();
    for field in fields {
        if let Some(value) = values.get(&field.field_key) {
            if value.is_empty() {
                continue;
            }
            details.push_str(&format!(
                "- {}: {}\n",
                field.name,
                display_value(field.field_type, value)
            ));
            custom_snapshot.insert(field.field_key.clone(), json!(value));
        }
    }
    if !details.is_empty() {
        narrative.push_str("\n## Details\n");
        narrative.push_str(&details);
    }

    if !notes.is_empty() {
        narrative.push_str("\n## Recent Notes\n");
        for note in notes {
            narrative.push_str(&format!("- {}\n", truncate_note(&note.content)));
        }
    }

    if let Some(lead_notes) = lead.notes.as_deref() {
        if !lead_notes.is_empty() {
            narrative.push_str(&format!("\n## General Notes\n{}\n", lead_notes));
        }
    }

    let key_info = json!({
        "createdAt": lead.created_at,
        "status": lead.status,
        "customFields": Value::Object(custom_snapshot),
        "noteCount": note_count,
        "activityCount": activity_count,
    });

    HandoffDraft { lead_id: lead.id, narrative, key_info }
}

#[derive(Clone)]
pub struct HandoffService {
    pool: SqlitePool,
    handoffs: HandoffRepository,
    activities: ActivityRepository,
}

impl HandoffService {
    pub fn new(
        pool: SqlitePool,
        handoffs: HandoffRepository,
        activities: ActivityRepository,
    ) -> Self {
        Self { pool, handoffs, activities }
    }

    // =========================================================================
    //  GATILHOS
    // =========================================================================

    pub async fn list_triggers(&self) -> Result<Vec<HandoffTrigger>, AppError> {
        self.handoffs.list_triggers(&self.pool).await
    }

    /// Cadastra um gatilho. O UNIQUE do banco não barra curinga duplicado
    /// (NULLs são distintos entre si no SQLite), então o curinga é checado
    /// aqui antes de inserir.
    pub async fn create_trigger(
        &self,
        from_status: Option<&str>,
        to_status: &str,
    ) -> Result<HandoffTrigger, AppError> {
        if from_status.is_none()
            && self
                .handoffs
                .find_wildcard_trigger(&self.pool, to_status)
                .await?
                .is_some()
        {
            return Err(AppError::DuplicateKey(format!(
                "Já existe um gatilho curinga para o estágio '{}'.",
                to_status
            )));
        }

        self.handoffs.insert_trigger(&self.pool, from_status, to_status).await
    }

    pub async fn delete_trigger(&self, id: i64) -> Result<(), AppError> {
        let deleted = self.handoffs.delete_trigger(&self.pool, id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound("Gatilho"));
        }
        Ok(())
    }

    /// Decide se a transição dispara um handoff. A linha exata
    /// (from -> to) vence a curinga (NULL -> to); sem origem conhecida,
    /// só a curinga se aplica.
    pub async fn check_trigger(
        &self,
        from_status: Option<&str>,
        to_status: &str,
    ) -> Result<Option<HandoffTrigger>, AppError> {
        if let Some(from) = from_status {
            if let Some(exact) = self
                .handoffs
                .find_exact_trigger(&self.pool, from, to_status)
                .await?
            {
                return Ok(Some(exact));
            }
        }
        self.handoffs.find_wildcard_trigger(&self.pool, to_status).await
    }

    // =========================================================================
    //  RESUMOS
    // =========================================================================

    pub async fn summaries_for_lead(&self, lead_id: i64) -> Result<Vec<HandoffSummary>, AppError> {
        self.handoffs.list_for_lead(&self.pool, lead_id).await
    }

    /// Prévia não persistida do resumo, para a tela de handoff.
    pub async fn draft_for_lead(
        &self,
        lead: &Lead,
        fields: &[CustomField],
        values: &HashMap<String, String>,
    ) -> Result<HandoffDraft, AppError> {
        let notes = self
            .activities
            .last_notes(&self.pool, lead.id, NARRATIVE_NOTE_LIMIT)
            .await?;
        let note_count = self.activities.count_notes_for_lead(&self.pool, lead.id).await?;
        let activity_count = self.activities.count_for_lead(&self.pool, lead.id).await?;

        Ok(build_draft(lead, fields, values, &notes, note_count, activity_count))
    }

    /// Salvamento explícito da prévia atual: grava o resumo no estágio em
    /// que o lead está e registra o evento na linha do tempo.
    pub async fn save_summary(
        &self,
        lead: &Lead,
        fields: &[CustomField],
        values: &HashMap<String, String>,
        user_id: Option<i64>,
    ) -> Result<HandoffSummary, AppError> {
        let draft = self.draft_for_lead(lead, fields, values).await?;

        let mut tx = self.pool.begin().await?;
        let summary = self
            .handoffs
            .insert_summary(&mut *tx, lead.id, &draft.narrative, &draft.key_info, None, &lead.status)
            .await?;
        self.activities
            .insert(
                &mut *tx,
                lead.id,
                user_id,
                ActivityType::Handoff,
                "Handoff summary saved",
                Some(&json!({ "summaryId": summary.id, "toStatus": lead.status })),
            )
            .await?;
        tx.commit().await?;

        Ok(summary)
    }

    /// Chamado após uma mudança de estágio: se algum gatilho casar, gera e
    /// grava o resumo e registra o evento na linha do tempo.
    pub async fn process_transition(
        &self,
        lead: &Lead,
        fields: &[CustomField],
        values: &HashMap<String, String>,
        from_status: Option<&str>,
        to_status: &str,
        user_id: Option<i64>,
    ) -> Result<Option<HandoffSummary>, AppError> {
        if self.check_trigger(from_status, to_status).await?.is_none() {
            return Ok(None);
        }

        let draft = self.draft_for_lead(lead, fields, values).await?;

        let mut tx = self.pool.begin().await?;
        let summary = self
            .handoffs
            .insert_summary(
                &mut *tx,
                lead.id,
                &draft.narrative,
                &draft.key_info,
                from_status,
                to_status,
            )
            .await?;
        self.activities
            .insert(
                &mut *tx,
                lead.id,
                user_id,
                ActivityType::Handoff,
                &format!("Handoff summary generated for \"{}\"", to_status),
                Some(&json!({ "summaryId": summary.id, "toStatus": to_status })),
            )
            .await?;
        tx.commit().await?;

        Ok(Some(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::test_pool;
    use crate::models::field::FieldType;
    use chrono::Utc;

    fn lead(name: &str, status: &str) -> Lead {
        Lead {
            id: 1,
            name: name.to_string(),
            email: Some("ana@example.com".to_string()),
            phone: None,
            address: None,
            job_type: Some("Roofing".to_string()),
            property_type: None,
            status: status.to_string(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn custom(id: i64, name: &str, key: &str) -> CustomField {
        CustomField {
            id,
            name: name.to_string(),
            field_key: key.to_string(),
            field_type: FieldType::Text,
            options: None,
            option_colors: None,
            is_required: false,
            default_value: None,
            sequence: id,
            created_at: Utc::now(),
        }
    }

    fn note(content: &str) -> Activity {
        Activity {
            id: 1,
            lead_id: 1,
            user_id: None,
            activity_type: ActivityType::Note,
            content: content.to_string(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn draft_includes_only_populated_custom_fields() {
        let fields = vec![custom(1, "Budget", "budget"), custom(2, "Roof Type", "roof_type")];
        let mut values = HashMap::new();
        values.insert("budget".to_string(), "2500".to_string());
        values.insert("roof_type".to_string(), String::new());

        let draft = build_draft(&lead("Ana", "Estimating"), &fields, &values, &[], 0, 0);

        assert!(draft.narrative.contains("- Budget: 2500"));
        assert!(!draft.narrative.contains("Roof Type"));
        assert_eq!(draft.key_info["customFields"]["budget"], "2500");
        assert!(draft.key_info["customFields"].get("roof_type").is_none());
    }

    #[test]
    fn draft_truncates_long_notes() {
        let long = "x".repeat(450);
        let notes = vec![note(&long), note("curta")];

        let draft =
            build_draft(&lead("Ana", "Estimating"), &[], &HashMap::new(), &notes, 2, 2);

        let expected = format!("- {}…\n", "x".repeat(200));
        assert!(draft.narrative.contains(&expected));
        assert!(draft.narrative.contains("- curta\n"));
        assert_eq!(draft.key_info["noteCount"], 2);
        assert_eq!(draft.key_info["activityCount"], 2);
    }

    #[test]
    fn draft_carries_identity_and_status() {
        let draft =
            build_draft(&lead("Ana", "Proposal Sent"), &[], &HashMap::new(), &[], 0, 0);

        assert!(draft.narrative.starts_with("# Handoff Summary: Ana"));
        assert!(draft.narrative.contains("- Email: ana@example.com"));
        assert!(draft.narrative.contains("- Phone: -"));
        assert!(draft.narrative.contains("- Status: Proposal Sent"));
        assert_eq!(draft.key_info["status"], "Proposal Sent");
    }

    // --- TESTES COM BANCO ---

    fn service(pool: &SqlitePool) -> HandoffService {
        HandoffService::new(
            pool.clone(),
            HandoffRepository::new(pool.clone()),
            ActivityRepository::new(pool.clone()),
        )
    }

    #[tokio::test]
    async fn exact_trigger_beats_wildcard() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let wildcard = svc.create_trigger(None, "Proposal Sent").await.unwrap();
        let exact = svc
            .create_trigger(Some("Estimating"), "Proposal Sent")
            .await
            .unwrap();

        let hit = svc
            .check_trigger(Some("Estimating"), "Proposal Sent")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.id, exact.id);

        // Origem sem linha exata cai na curinga.
        let hit = svc
            .check_trigger(Some("New Lead"), "Proposal Sent")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.id, wildcard.id);

        // Origem desconhecida só considera a curinga.
        let hit = svc.check_trigger(None, "Proposal Sent").await.unwrap().unwrap();
        assert_eq!(hit.id, wildcard.id);

        assert!(svc.check_trigger(Some("Estimating"), "Lost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_wildcard_trigger_is_rejected() {
        let pool = test_pool().await;
        let svc = service(&pool);

        svc.create_trigger(None, "Proposal Sent").await.unwrap();
        let err = svc.create_trigger(None, "Proposal Sent").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn transition_with_trigger_persists_summary_and_activity() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let leads = crate::db::LeadRepository::new(pool.clone());

        let lead = leads
            .create(&pool, "Ana", Some("ana@example.com"), None, None, None, None, "Proposal Sent", None)
            .await
            .unwrap();

        svc.create_trigger(Some("Estimating"), "Proposal Sent").await.unwrap();

        let summary = svc
            .process_transition(
                &lead,
                &[],
                &HashMap::new(),
                Some("Estimating"),
                "Proposal Sent",
                Some(1),
            )
            .await
            .unwrap()
            .expect("a transição deveria gerar resumo");

        assert_eq!(summary.from_status.as_deref(), Some("Estimating"));
        assert_eq!(summary.to_status, "Proposal Sent");

        let stored = svc.summaries_for_lead(lead.id).await.unwrap();
        assert_eq!(stored.len(), 1);

        let timeline = ActivityRepository::new(pool.clone())
            .list_for_lead(&pool, lead.id)
            .await
            .unwrap();
        assert!(timeline
            .iter()
            .any(|a| a.activity_type == ActivityType::Handoff));
    }

    #[tokio::test]
    async fn explicit_save_persists_summary_without_trigger() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let leads = crate::db::LeadRepository::new(pool.clone());

        let lead = leads
            .create(&pool, "Ana", None, None, None, None, None, "Estimating", None)
            .await
            .unwrap();

        let summary = svc
            .save_summary(&lead, &[], &HashMap::new(), Some(1))
            .await
            .unwrap();

        assert!(summary.from_status.is_none());
        assert_eq!(summary.to_status, "Estimating");
        assert_eq!(svc.summaries_for_lead(lead.id).await.unwrap().len(), 1);

        let timeline = ActivityRepository::new(pool.clone())
            .list_for_lead(&pool, lead.id)
            .await
            .unwrap();
        assert!(timeline
            .iter()
            .any(|a| a.activity_type == ActivityType::Handoff));
    }

    #[tokio::test]
    async fn transition_without_trigger_is_a_no_op() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let leads = crate::db::LeadRepository::new(pool.clone());

        let lead = leads
            .create(&pool, "Ana", None, None, None, None, None, "Lost", None)
            .await
            .unwrap();

        let result = svc
            .process_transition(&lead, &[], &HashMap::new(), Some("Estimating"), "Lost", None)
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(svc.summaries_for_lead(lead.id).await.unwrap().is_empty());
    }
}
