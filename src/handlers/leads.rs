// src/handlers/leads.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::UserContext,
    models::{
        grouping::{GroupNode, GroupPreference, SortDirection},
        lead::{Lead, LeadStatus},
    },
    services::lead_service::LeadInput,
};

// =============================================================================
//  ÁREA 1: CRUD DE LEADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório"))]
    #[schema(example = "Ana Souza")]
    pub name: String,

    #[validate(email(message = "E-mail inválido"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub address: Option<String>,
    pub job_type: Option<String>,
    pub property_type: Option<String>,

    #[schema(example = "New Lead")]
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl CreateLeadPayload {
    fn as_input(&self) -> LeadInput<'_> {
        LeadInput {
            name: &self.name,
            email: self.email.as_deref(),
            phone: self.phone.as_deref(),
            address: self.address.as_deref(),
            job_type: self.job_type.as_deref(),
            property_type: self.property_type.as_deref(),
            status: self.status.as_deref(),
            notes: self.notes.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListLeadsQuery {
    // Filtra por estágio exato.
    pub status: Option<String>,
    // Busca em nome, e-mail, endereço e telefone.
    pub search: Option<String>,
}

// POST /api/leads
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body = CreateLeadPayload,
    responses(
        (status = 201, description = "Lead criado", body = Lead),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_key" = []))
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    user: UserContext,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let lead = app_state
        .lead_service
        .create_lead(payload.as_input(), Some(user.0))
        .await?;

    Ok((StatusCode::CREATED, Json(lead)))
}

// GET /api/leads
#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "Leads",
    params(ListLeadsQuery),
    responses(
        (status = 200, description = "Lista de leads", body = Vec<Lead>)
    ),
    security(("api_key" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    Query(query): Query<ListLeadsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let leads = app_state
        .lead_service
        .list_leads(query.status.as_deref(), query.search.as_deref())
        .await?;

    Ok(Json(leads))
}

// GET /api/leads/grouped
#[utoipa::path(
    get,
    path = "/api/leads/grouped",
    tag = "Leads",
    params(
        ListLeadsQuery,
        ("x-user-id" = Option<i64>, Header, description = "Usuário das preferências")
    ),
    responses(
        (status = 200, description = "Leads agrupados pelas preferências do usuário", body = Vec<GroupNode>)
    ),
    security(("api_key" = []))
)]
pub async fn grouped_leads(
    State(app_state): State<AppState>,
    user: UserContext,
    Query(query): Query<ListLeadsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let groups = app_state
        .lead_service
        .grouped_leads(user.0, query.status.as_deref(), query.search.as_deref())
        .await?;

    Ok(Json(groups))
}

// GET /api/leads/{id}
#[utoipa::path(
    get,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lead encontrado", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service.get_lead(id).await?;
    Ok(Json(lead))
}

// PUT /api/leads/{id}
#[utoipa::path(
    put,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do lead")),
    request_body = CreateLeadPayload,
    responses(
        (status = 200, description = "Lead atualizado", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    user: UserContext,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let lead = app_state
        .lead_service
        .update_lead(id, payload.as_input(), Some(user.0))
        .await?;

    Ok(Json(lead))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateColumnPayload {
    #[schema(example = "email")]
    pub column: String,
    pub value: Option<String>,
}

// PATCH /api/leads/{id}/column
#[utoipa::path(
    patch,
    path = "/api/leads/{id}/column",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do lead")),
    request_body = UpdateColumnPayload,
    responses(
        (status = 200, description = "Coluna atualizada", body = Lead),
        (status = 400, description = "Coluna não editável")
    ),
    security(("api_key" = []))
)]
pub async fn update_lead_column(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateColumnPayload>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state
        .lead_service
        .update_lead_column(id, &payload.column, payload.value.as_deref())
        .await?;

    Ok(Json(lead))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusPayload {
    #[validate(length(min = 1, message = "O status é obrigatório"))]
    #[schema(example = "Proposal Sent")]
    pub status: String,
}

// PUT /api/leads/{id}/status
#[utoipa::path(
    put,
    path = "/api/leads/{id}/status",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do lead")),
    request_body = ChangeStatusPayload,
    responses(
        (status = 200, description = "Lead movido de estágio", body = Lead),
        (status = 400, description = "Status desconhecido")
    ),
    security(("api_key" = []))
)]
pub async fn change_lead_status(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    user: UserContext,
    Json(payload): Json<ChangeStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let lead = app_state
        .lead_service
        .change_status(id, &payload.status, Some(user.0))
        .await?;

    Ok(Json(lead))
}

// DELETE /api/leads/{id}
#[utoipa::path(
    delete,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do lead")),
    responses(
        (status = 204, description = "Lead enviado para a lixeira"),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn delete_lead(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.lead_service.delete_lead(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// DELETE /api/leads/{id}/purge
#[utoipa::path(
    delete,
    path = "/api/leads/{id}/purge",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do lead")),
    responses(
        (status = 204, description = "Lead removido em definitivo"),
        (status = 404, description = "Lead não está na lixeira")
    ),
    security(("api_key" = []))
)]
pub async fn purge_lead(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.lead_service.purge_lead(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 2: ESTÁGIOS DO FUNIL
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntryPayload {
    #[schema(example = "Estimating")]
    pub name: String,

    #[schema(example = "#f59e0b")]
    pub color: Option<String>,
}

// GET /api/statuses
#[utoipa::path(
    get,
    path = "/api/statuses",
    tag = "Leads",
    responses(
        (status = 200, description = "Estágios do funil, em ordem", body = Vec<LeadStatus>)
    ),
    security(("api_key" = []))
)]
pub async fn list_statuses(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let statuses = app_state.lead_service.statuses().await?;
    Ok(Json(statuses))
}

// PUT /api/statuses
#[utoipa::path(
    put,
    path = "/api/statuses",
    tag = "Leads",
    request_body = Vec<StatusEntryPayload>,
    responses(
        (status = 200, description = "Funil substituído", body = Vec<LeadStatus>),
        (status = 400, description = "Lista inválida")
    ),
    security(("api_key" = []))
)]
pub async fn replace_statuses(
    State(app_state): State<AppState>,
    Json(payload): Json<Vec<StatusEntryPayload>>,
) -> Result<impl IntoResponse, AppError> {
    let statuses: Vec<(String, Option<String>)> =
        payload.into_iter().map(|s| (s.name, s.color)).collect();

    let saved = app_state.lead_service.replace_statuses(&statuses).await?;
    Ok(Json(saved))
}

// =============================================================================
//  ÁREA 3: PREFERÊNCIAS DE AGRUPAMENTO
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupPreferencePayload {
    // "status", "job_type", "custom_<id>"...
    #[schema(example = "status")]
    pub field_name: String,
    pub sort_direction: SortDirection,
}

// GET /api/group-preferences
#[utoipa::path(
    get,
    path = "/api/group-preferences",
    tag = "Leads",
    params(("x-user-id" = Option<i64>, Header, description = "Usuário das preferências")),
    responses(
        (status = 200, description = "Preferências do usuário, por nível", body = Vec<GroupPreference>)
    ),
    security(("api_key" = []))
)]
pub async fn get_group_preferences(
    State(app_state): State<AppState>,
    user: UserContext,
) -> Result<impl IntoResponse, AppError> {
    let prefs = app_state.lead_service.group_prefs(user.0).await?;
    Ok(Json(prefs))
}

// PUT /api/group-preferences
#[utoipa::path(
    put,
    path = "/api/group-preferences",
    tag = "Leads",
    params(("x-user-id" = Option<i64>, Header, description = "Usuário das preferências")),
    request_body = Vec<GroupPreferencePayload>,
    responses(
        (status = 200, description = "Preferências substituídas", body = Vec<GroupPreference>),
        (status = 400, description = "Campo de agrupamento desconhecido")
    ),
    security(("api_key" = []))
)]
pub async fn save_group_preferences(
    State(app_state): State<AppState>,
    user: UserContext,
    Json(payload): Json<Vec<GroupPreferencePayload>>,
) -> Result<impl IntoResponse, AppError> {
    let prefs: Vec<(String, SortDirection)> = payload
        .into_iter()
        .map(|p| (p.field_name, p.sort_direction))
        .collect();

    let saved = app_state.lead_service.save_group_prefs(user.0, &prefs).await?;
    Ok(Json(saved))
}
