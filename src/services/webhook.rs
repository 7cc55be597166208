// src/services/webhook.rs

use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{db::SettingsRepository, models::settings::SETTING_WEBHOOK_URL};

// Tempo máximo esperando o endpoint externo.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Notificação de novos leads para um endpoint externo (Zapier etc.).
///
/// Melhor esforço: falha de rede ou resposta ruim vira warning no log e
/// nunca se propaga para o fluxo que criou o lead.
#[derive(Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    pool: SqlitePool,
    settings: SettingsRepository,
}

impl WebhookNotifier {
    pub fn new(http: reqwest::Client, pool: SqlitePool, settings: SettingsRepository) -> Self {
        Self { http, pool, settings }
    }

    /// Dispara o POST em segundo plano, sem segurar a resposta HTTP.
    pub fn notify_detached(&self, event: &str, payload: Value) {
        let notifier = self.clone();
        let event = event.to_string();
        tokio::spawn(async move {
            notifier.notify(&event, payload).await;
        });
    }

    pub async fn notify(&self, event: &str, payload: Value) {
        let url = match self.settings.get(&self.pool, SETTING_WEBHOOK_URL).await {
            Ok(Some(url)) if !url.is_empty() => url,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!("webhook: falha lendo a URL configurada: {}", e);
                return;
            }
        };

        let body = json!({
            "event": event,
            "timestamp": Utc::now(),
            "data": payload,
        });

        let result = self
            .http
            .post(&url)
            .timeout(WEBHOOK_TIMEOUT)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("webhook '{}' entregue para {}", event, url);
            }
            Ok(response) => {
                tracing::warn!(
                    "webhook '{}' respondeu {} em {}",
                    event,
                    response.status(),
                    url
                );
            }
            Err(e) => {
                tracing::warn!("webhook '{}' falhou: {}", event, e);
            }
        }
    }
}
