// src/handlers/handoffs.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::UserContext,
    models::handoff::{HandoffDraft, HandoffSummary, HandoffTrigger},
};

// =============================================================================
//  ÁREA 1: GATILHOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTriggerPayload {
    // None = curinga (qualquer estágio de origem).
    #[schema(example = "Estimating")]
    pub from_status: Option<String>,

    #[validate(length(min = 1, message = "O estágio de destino é obrigatório"))]
    #[schema(example = "Proposal Sent")]
    pub to_status: String,
}

// GET /api/handoff-triggers
#[utoipa::path(
    get,
    path = "/api/handoff-triggers",
    tag = "Handoffs",
    responses(
        (status = 200, description = "Gatilhos cadastrados", body = Vec<HandoffTrigger>)
    ),
    security(("api_key" = []))
)]
pub async fn list_triggers(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let triggers = app_state.handoff_service.list_triggers().await?;
    Ok(Json(triggers))
}

// POST /api/handoff-triggers
#[utoipa::path(
    post,
    path = "/api/handoff-triggers",
    tag = "Handoffs",
    request_body = CreateTriggerPayload,
    responses(
        (status = 201, description = "Gatilho criado", body = HandoffTrigger),
        (status = 409, description = "Gatilho duplicado para a transição")
    ),
    security(("api_key" = []))
)]
pub async fn create_trigger(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateTriggerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let trigger = app_state
        .handoff_service
        .create_trigger(payload.from_status.as_deref(), &payload.to_status)
        .await?;

    Ok((StatusCode::CREATED, Json(trigger)))
}

// DELETE /api/handoff-triggers/{id}
#[utoipa::path(
    delete,
    path = "/api/handoff-triggers/{id}",
    tag = "Handoffs",
    params(("id" = i64, Path, description = "ID do gatilho")),
    responses(
        (status = 204, description = "Gatilho removido"),
        (status = 404, description = "Gatilho não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn delete_trigger(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.handoff_service.delete_trigger(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 2: RESUMOS
// =============================================================================

// GET /api/leads/{id}/handoff
#[utoipa::path(
    get,
    path = "/api/leads/{id}/handoff",
    tag = "Handoffs",
    params(("id" = i64, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Prévia do resumo (não persiste nada)", body = HandoffDraft),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn handoff_preview(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service.get_lead(id).await?;
    let fields = app_state.field_service.list_fields().await?;
    let values = app_state.field_service.values_for_lead(id).await?;

    let draft = app_state
        .handoff_service
        .draft_for_lead(&lead, &fields, &values)
        .await?;

    Ok(Json(draft))
}

// POST /api/leads/{id}/handoff
#[utoipa::path(
    post,
    path = "/api/leads/{id}/handoff",
    tag = "Handoffs",
    params(("id" = i64, Path, description = "ID do lead")),
    responses(
        (status = 201, description = "Resumo salvo no estágio atual do lead", body = HandoffSummary),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn save_handoff(
    State(app_state): State<AppState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service.get_lead(id).await?;
    let fields = app_state.field_service.list_fields().await?;
    let values = app_state.field_service.values_for_lead(id).await?;

    let summary = app_state
        .handoff_service
        .save_summary(&lead, &fields, &values, Some(user.0))
        .await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

// GET /api/leads/{id}/handoffs
#[utoipa::path(
    get,
    path = "/api/leads/{id}/handoffs",
    tag = "Handoffs",
    params(("id" = i64, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Resumos persistidos, do mais recente para o mais antigo", body = Vec<HandoffSummary>),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn lead_handoffs(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.lead_service.get_lead(id).await?;
    let summaries = app_state.handoff_service.summaries_for_lead(id).await?;
    Ok(Json(summaries))
}
