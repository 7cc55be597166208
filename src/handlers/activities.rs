// src/handlers/activities.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::UserContext,
    models::activity::{Activity, ActivityType},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogActivityPayload {
    pub activity_type: ActivityType,

    #[validate(length(min = 1, message = "O conteúdo é obrigatório"))]
    #[schema(example = "Cliente pediu orçamento para telhado novo")]
    pub content: String,

    pub metadata: Option<Value>,
}

// POST /api/leads/{id}/activities
#[utoipa::path(
    post,
    path = "/api/leads/{id}/activities",
    tag = "Activities",
    params(("id" = i64, Path, description = "ID do lead")),
    request_body = LogActivityPayload,
    responses(
        (status = 201, description = "Evento registrado", body = Activity),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn log_activity(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    user: UserContext,
    Json(payload): Json<LogActivityPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let activity = app_state
        .activity_service
        .log_activity(
            id,
            Some(user.0),
            payload.activity_type,
            &payload.content,
            payload.metadata.as_ref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(activity)))
}

// GET /api/leads/{id}/activities
#[utoipa::path(
    get,
    path = "/api/leads/{id}/activities",
    tag = "Activities",
    params(("id" = i64, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Linha do tempo, do mais recente para o mais antigo", body = Vec<Activity>),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn lead_timeline(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let timeline = app_state.activity_service.timeline(id).await?;
    Ok(Json(timeline))
}

// DELETE /api/activities/{id}
#[utoipa::path(
    delete,
    path = "/api/activities/{id}",
    tag = "Activities",
    params(("id" = i64, Path, description = "ID do evento")),
    responses(
        (status = 204, description = "Evento removido"),
        (status = 404, description = "Evento não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn delete_activity(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.activity_service.delete_activity(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
