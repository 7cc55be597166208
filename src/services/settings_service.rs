// src/services/settings_service.rs

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::SettingsRepository,
    models::settings::{AppSettingsResponse, SETTING_API_KEY, SETTING_WEBHOOK_URL},
};

#[derive(Clone)]
pub struct SettingsService {
    pool: SqlitePool,
    settings: SettingsRepository,
}

impl SettingsService {
    pub fn new(pool: SqlitePool, settings: SettingsRepository) -> Self {
        Self { pool, settings }
    }

    pub async fn get_settings(&self) -> Result<AppSettingsResponse, AppError> {
        let webhook_url = self.settings.get(&self.pool, SETTING_WEBHOOK_URL).await?;
        let api_key = self.settings.get(&self.pool, SETTING_API_KEY).await?;

        Ok(AppSettingsResponse {
            webhook_url,
            api_key_configured: api_key.is_some(),
        })
    }

    /// Atualiza a URL do webhook. String vazia (ou ausente) remove.
    pub async fn update_webhook_url(
        &self,
        webhook_url: Option<&str>,
    ) -> Result<AppSettingsResponse, AppError> {
        match webhook_url.map(str::trim) {
            Some(url) if !url.is_empty() => {
                self.settings.set(&self.pool, SETTING_WEBHOOK_URL, url).await?;
            }
            _ => {
                self.settings.delete(&self.pool, SETTING_WEBHOOK_URL).await?;
            }
        }

        self.get_settings().await
    }

    /// Gera (e substitui) a chave de API usada pelo guard das rotas.
    /// O segredo só aparece nesta resposta.
    pub async fn generate_api_key(&self) -> Result<String, AppError> {
        let key = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        self.settings.set(&self.pool, SETTING_API_KEY, &key).await?;
        Ok(key)
    }

    pub async fn revoke_api_key(&self) -> Result<(), AppError> {
        self.settings.delete(&self.pool, SETTING_API_KEY).await
    }

    /// Chave vigente, para o guard de autenticação.
    pub async fn stored_api_key(&self) -> Result<Option<String>, AppError> {
        self.settings.get(&self.pool, SETTING_API_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::test_pool;

    fn service(pool: &SqlitePool) -> SettingsService {
        SettingsService::new(pool.clone(), SettingsRepository::new(pool.clone()))
    }

    #[tokio::test]
    async fn webhook_url_set_and_clear() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let settings = svc.get_settings().await.unwrap();
        assert!(settings.webhook_url.is_none());

        let settings = svc
            .update_webhook_url(Some("https://hooks.example.com/abc"))
            .await
            .unwrap();
        assert_eq!(settings.webhook_url.as_deref(), Some("https://hooks.example.com/abc"));

        let settings = svc.update_webhook_url(Some("  ")).await.unwrap();
        assert!(settings.webhook_url.is_none());
    }

    #[tokio::test]
    async fn api_key_lifecycle() {
        let pool = test_pool().await;
        let svc = service(&pool);

        assert!(svc.stored_api_key().await.unwrap().is_none());
        assert!(!svc.get_settings().await.unwrap().api_key_configured);

        let key = svc.generate_api_key().await.unwrap();
        assert_eq!(key.len(), 64);
        assert_eq!(svc.stored_api_key().await.unwrap().as_deref(), Some(key.as_str()));
        assert!(svc.get_settings().await.unwrap().api_key_configured);

        // Gerar de novo substitui a anterior.
        let replacement = svc.generate_api_key().await.unwrap();
        assert_ne!(replacement, key);
        assert_eq!(
            svc.stored_api_key().await.unwrap().as_deref(),
            Some(replacement.as_str())
        );

        svc.revoke_api_key().await.unwrap();
        assert!(svc.stored_api_key().await.unwrap().is_none());
    }
}
