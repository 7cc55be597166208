// src/models/settings.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Chaves conhecidas da tabela app_settings.
pub const SETTING_API_KEY: &str = "api_key";
pub const SETTING_WEBHOOK_URL: &str = "webhook_url";
pub const SETTING_FIELD_ORDER: &str = "field_order";

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppSettingsResponse {
    #[schema(example = "https://hooks.zapier.com/hooks/catch/123/abc")]
    pub webhook_url: Option<String>,

    // Indica se existe chave de API configurada (o segredo em si não volta).
    pub api_key_configured: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub api_key: String,
}
