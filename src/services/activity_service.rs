// src/services/activity_service.rs

use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    common::error::AppError,
    db::{ActivityRepository, LeadRepository},
    models::activity::{Activity, ActivityType},
};

#[derive(Clone)]
pub struct ActivityService {
    pool: SqlitePool,
    activities: ActivityRepository,
    leads: LeadRepository,
}

impl ActivityService {
    pub fn new(pool: SqlitePool, activities: ActivityRepository, leads: LeadRepository) -> Self {
        Self { pool, activities, leads }
    }

    /// Registra um evento na linha do tempo do lead (append-only).
    pub async fn log_activity(
        &self,
        lead_id: i64,
        user_id: Option<i64>,
        activity_type: ActivityType,
        content: &str,
        metadata: Option<&Value>,
    ) -> Result<Activity, AppError> {
        if self.leads.find_by_id(&self.pool, lead_id).await?.is_none() {
            return Err(AppError::NotFound("Lead"));
        }

        self.activities
            .insert(&self.pool, lead_id, user_id, activity_type, content, metadata)
            .await
    }

    /// Linha do tempo do lead, do mais recente para o mais antigo.
    pub async fn timeline(&self, lead_id: i64) -> Result<Vec<Activity>, AppError> {
        if self.leads.find_by_id(&self.pool, lead_id).await?.is_none() {
            return Err(AppError::NotFound("Lead"));
        }

        self.activities.list_for_lead(&self.pool, lead_id).await
    }

    pub async fn delete_activity(&self, id: i64) -> Result<(), AppError> {
        let deleted = self.activities.delete(&self.pool, id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound("Atividade"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::test_pool;
    use serde_json::json;

    fn service(pool: &SqlitePool) -> ActivityService {
        ActivityService::new(
            pool.clone(),
            ActivityRepository::new(pool.clone()),
            LeadRepository::new(pool.clone()),
        )
    }

    #[tokio::test]
    async fn timeline_is_newest_first() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let leads = LeadRepository::new(pool.clone());

        let lead = leads
            .create(&pool, "Ana", None, None, None, None, None, "New Lead", None)
            .await
            .unwrap();

        svc.log_activity(lead.id, Some(1), ActivityType::Note, "primeira", None)
            .await
            .unwrap();
        svc.log_activity(lead.id, Some(1), ActivityType::Call, "segunda", Some(&json!({"min": 5})))
            .await
            .unwrap();

        let timeline = svc.timeline(lead.id).await.unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].content, "segunda");
        assert_eq!(timeline[1].content, "primeira");
    }

    #[tokio::test]
    async fn logging_against_missing_lead_fails() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let err = svc
            .log_activity(999, None, ActivityType::Note, "nada", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Lead")));
    }

    #[tokio::test]
    async fn delete_removes_a_single_entry() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let leads = LeadRepository::new(pool.clone());

        let lead = leads
            .create(&pool, "Ana", None, None, None, None, None, "New Lead", None)
            .await
            .unwrap();
        let kept = svc
            .log_activity(lead.id, None, ActivityType::Note, "fica", None)
            .await
            .unwrap();
        let removed = svc
            .log_activity(lead.id, None, ActivityType::Note, "sai", None)
            .await
            .unwrap();

        svc.delete_activity(removed.id).await.unwrap();

        let timeline = svc.timeline(lead.id).await.unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].id, kept.id);

        let err = svc.delete_activity(removed.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
