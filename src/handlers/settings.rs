// src/handlers/settings.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    models::settings::{ApiKeyResponse, AppSettingsResponse, UpdateSettingsRequest},
};

// GET /api/settings
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    responses(
        (status = 200, description = "Configurações atuais", body = AppSettingsResponse)
    ),
    security(("api_key" = []))
)]
pub async fn get_settings(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let settings = app_state.settings_service.get_settings().await?;
    Ok(Json(settings))
}

// PUT /api/settings
#[utoipa::path(
    put,
    path = "/api/settings",
    tag = "Settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Configurações atualizadas", body = AppSettingsResponse)
    ),
    security(("api_key" = []))
)]
pub async fn update_settings(
    State(app_state): State<AppState>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let settings = app_state
        .settings_service
        .update_webhook_url(payload.webhook_url.as_deref())
        .await?;

    Ok(Json(settings))
}

// POST /api/settings/api-key
#[utoipa::path(
    post,
    path = "/api/settings/api-key",
    tag = "Settings",
    responses(
        (status = 201, description = "Chave gerada; o segredo só aparece aqui", body = ApiKeyResponse)
    ),
    security(("api_key" = []))
)]
pub async fn generate_api_key(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let api_key = app_state.settings_service.generate_api_key().await?;
    Ok((StatusCode::CREATED, Json(ApiKeyResponse { api_key })))
}

// DELETE /api/settings/api-key
#[utoipa::path(
    delete,
    path = "/api/settings/api-key",
    tag = "Settings",
    responses(
        (status = 204, description = "Chave revogada; o guard volta ao estado aberto")
    ),
    security(("api_key" = []))
)]
pub async fn revoke_api_key(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    app_state.settings_service.revoke_api_key().await?;
    Ok(StatusCode::NO_CONTENT)
}
