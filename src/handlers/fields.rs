// src/handlers/fields.rs

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::UserContext,
    models::field::{CustomField, FieldType, FieldVisibilityEntry},
};

// =============================================================================
//  ÁREA 1: DEFINIÇÕES DE CAMPOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFieldPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório"))]
    #[schema(example = "Roof Type")]
    pub name: String,

    pub field_type: FieldType,

    #[schema(example = json!(["Tile", "Metal", "Shingle"]))]
    pub options: Option<Value>,
    pub option_colors: Option<Value>,

    #[serde(default)]
    pub is_required: bool,
    pub default_value: Option<String>,

    // Insere logo após este campo; sem ele, vai para o fim.
    pub insert_after: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFieldPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório"))]
    pub name: String,

    pub options: Option<Value>,
    pub option_colors: Option<Value>,

    #[serde(default)]
    pub is_required: bool,
    pub default_value: Option<String>,
}

// POST /api/fields
#[utoipa::path(
    post,
    path = "/api/fields",
    tag = "Fields",
    request_body = CreateFieldPayload,
    responses(
        (status = 201, description = "Campo criado", body = CustomField),
        (status = 409, description = "Chave duplicada")
    ),
    security(("api_key" = []))
)]
pub async fn create_field(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateFieldPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let field = app_state
        .field_service
        .define_field(
            &payload.name,
            payload.field_type,
            payload.options,
            payload.option_colors,
            payload.is_required,
            payload.default_value.as_deref(),
            payload.insert_after,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(field)))
}

// GET /api/fields
#[utoipa::path(
    get,
    path = "/api/fields",
    tag = "Fields",
    responses(
        (status = 200, description = "Definições de campos, em ordem", body = Vec<CustomField>)
    ),
    security(("api_key" = []))
)]
pub async fn list_fields(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let fields = app_state.field_service.list_fields().await?;
    Ok(Json(fields))
}

// GET /api/fields/{id}
#[utoipa::path(
    get,
    path = "/api/fields/{id}",
    tag = "Fields",
    params(("id" = i64, Path, description = "ID do campo")),
    responses(
        (status = 200, description = "Campo encontrado", body = CustomField),
        (status = 404, description = "Campo não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn get_field(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let field = app_state.field_service.get_field(id).await?;
    Ok(Json(field))
}

// PUT /api/fields/{id}
#[utoipa::path(
    put,
    path = "/api/fields/{id}",
    tag = "Fields",
    params(("id" = i64, Path, description = "ID do campo")),
    request_body = UpdateFieldPayload,
    responses(
        (status = 200, description = "Campo atualizado", body = CustomField),
        (status = 404, description = "Campo não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn update_field(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateFieldPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let field = app_state
        .field_service
        .update_field(
            id,
            &payload.name,
            payload.options,
            payload.option_colors,
            payload.is_required,
            payload.default_value.as_deref(),
        )
        .await?;

    Ok(Json(field))
}

// DELETE /api/fields/{id}
#[utoipa::path(
    delete,
    path = "/api/fields/{id}",
    tag = "Fields",
    params(("id" = i64, Path, description = "ID do campo")),
    responses(
        (status = 204, description = "Campo removido, com valores e associações"),
        (status = 404, description = "Campo não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn delete_field(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.field_service.delete_field(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 2: VALORES POR LEAD
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetValuePayload {
    // Valor bruto; a normalização depende do tipo do campo.
    #[schema(example = json!("Tile"))]
    pub value: Value,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetValueResponse {
    #[schema(example = "Tile")]
    pub display_value: String,
}

// PUT /api/leads/{lead_id}/fields/{field_id}
#[utoipa::path(
    put,
    path = "/api/leads/{lead_id}/fields/{field_id}",
    tag = "Fields",
    params(
        ("lead_id" = i64, Path, description = "ID do lead"),
        ("field_id" = i64, Path, description = "ID do campo")
    ),
    request_body = SetValuePayload,
    responses(
        (status = 200, description = "Valor gravado", body = SetValueResponse),
        (status = 404, description = "Lead ou campo não encontrado")
    ),
    security(("api_key" = []))
)]
pub async fn set_field_value(
    State(app_state): State<AppState>,
    Path((lead_id, field_id)): Path<(i64, i64)>,
    user: UserContext,
    Json(payload): Json<SetValuePayload>,
) -> Result<impl IntoResponse, AppError> {
    let display_value = app_state
        .field_service
        .set_value(lead_id, field_id, &payload.value, Some(user.0))
        .await?;

    Ok(Json(SetValueResponse { display_value }))
}

// GET /api/leads/{id}/values
#[utoipa::path(
    get,
    path = "/api/leads/{id}/values",
    tag = "Fields",
    params(("id" = i64, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Valores dinâmicos do lead (field_key -> valor)", body = HashMap<String, String>)
    ),
    security(("api_key" = []))
)]
pub async fn lead_field_values(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    // Garante 404 para lead inexistente antes de devolver um mapa vazio.
    app_state.lead_service.get_lead(id).await?;
    let values = app_state.field_service.values_for_lead(id).await?;
    Ok(Json(values))
}

// =============================================================================
//  ÁREA 3: VISIBILIDADE E ORDEM POR USUÁRIO
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityEntryPayload {
    pub field_id: i64,
    pub is_visible: bool,
    pub sequence: i64,
}

// GET /api/fields/visibility
#[utoipa::path(
    get,
    path = "/api/fields/visibility",
    tag = "Fields",
    params(("x-user-id" = Option<i64>, Header, description = "Usuário das preferências")),
    responses(
        (status = 200, description = "Visibilidade dos campos para o usuário", body = Vec<FieldVisibilityEntry>)
    ),
    security(("api_key" = []))
)]
pub async fn get_visibility(
    State(app_state): State<AppState>,
    user: UserContext,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state.field_service.visibility_for_user(user.0).await?;
    Ok(Json(entries))
}

// PUT /api/fields/visibility
#[utoipa::path(
    put,
    path = "/api/fields/visibility",
    tag = "Fields",
    params(("x-user-id" = Option<i64>, Header, description = "Usuário das preferências")),
    request_body = Vec<VisibilityEntryPayload>,
    responses(
        (status = 204, description = "Visibilidade gravada")
    ),
    security(("api_key" = []))
)]
pub async fn save_visibility(
    State(app_state): State<AppState>,
    user: UserContext,
    Json(payload): Json<Vec<VisibilityEntryPayload>>,
) -> Result<impl IntoResponse, AppError> {
    let entries: Vec<(i64, bool, i64)> = payload
        .into_iter()
        .map(|e| (e.field_id, e.is_visible, e.sequence))
        .collect();

    app_state.field_service.save_visibility(user.0, &entries).await?;
    Ok(StatusCode::NO_CONTENT)
}

// PUT /api/fields/reorder
#[utoipa::path(
    put,
    path = "/api/fields/reorder",
    tag = "Fields",
    params(("x-user-id" = Option<i64>, Header, description = "Usuário das preferências")),
    request_body = Vec<i64>,
    responses(
        (status = 204, description = "Ordem gravada; a posição é o índice na lista")
    ),
    security(("api_key" = []))
)]
pub async fn reorder_fields(
    State(app_state): State<AppState>,
    user: UserContext,
    Json(order): Json<Vec<i64>>,
) -> Result<impl IntoResponse, AppError> {
    app_state.field_service.reorder_fields(user.0, &order).await?;
    Ok(StatusCode::NO_CONTENT)
}
