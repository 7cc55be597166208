// src/handlers/views.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::UserContext,
    models::view::{FieldOrder, ResolvedFields, View, ViewFieldEntry},
};

// =============================================================================
//  ÁREA 1: VIEWS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateViewPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório"))]
    #[schema(example = "Estimator View")]
    pub name: String,

    pub description: Option<String>,

    // Chaves das colunas fixas visíveis na view.
    #[serde(default)]
    #[schema(example = json!(["email", "phone"]))]
    pub default_fields: Vec<String>,

    // IDs dos campos dinâmicos, na ordem da view.
    #[serde(default)]
    pub custom_field_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateViewPayload {
    #[serde(default)]
    pub default_fields: Vec<String>,

    #[serde(default)]
    pub custom_field_ids: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewDetailResponse {
    #[serde(flatten)]
    pub view: View,
    pub fields: Vec<ViewFieldEntry>,
}

// POST /api/views
#[utoipa::path(
    post,
    path = "/api/views",
    tag = "Views",
    request_body = CreateViewPayload,
    responses(
        (status = 201, description = "View criada", body = View),
        (status = 409, description = "Nome duplicado")
    ),
    security(("api_key" = []))
)]
pub async fn create_view(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateViewPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let view = app_state
        .view_service
        .create_view(
            &payload.name,
            payload.description.as_deref(),
            &payload.default_fields,
            &payload.custom_field_ids,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

// GET /api/views
#[utoipa::path(
    get,
    path = "/api/views",
    tag = "Views",
    responses(
        (status = 200, description = "Views disponíveis", body = Vec<View>)
    ),
    security(("api_key" = []))
)]
pub async fn list_views(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let views = app_state.view_service.list_views().await?;
    Ok(Json(views))
}

// GET /api/views/{id}
#[utoipa::path(
    get,
    path = "/api/views/{id}",
    tag = "Views",
    params(("id" = i64, Path, description = "ID da view")),
    responses(
        (status = 200, description = "View com seus campos", body = ViewDetailResponse),
        (status = 404, description = "View não encontrada")
    ),
    security(("api_key" = []))
)]
pub async fn get_view(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (view, fields) = app_state.view_service.get_view(id).await?;
    Ok(Json(ViewDetailResponse { view, fields }))
}

// PUT /api/views/{id}
#[utoipa::path(
    put,
    path = "/api/views/{id}",
    tag = "Views",
    params(("id" = i64, Path, description = "ID da view")),
    request_body = UpdateViewPayload,
    responses(
        (status = 200, description = "View atualizada", body = View),
        (status = 404, description = "View não encontrada")
    ),
    security(("api_key" = []))
)]
pub async fn update_view(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateViewPayload>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state
        .view_service
        .update_view(id, &payload.default_fields, &payload.custom_field_ids)
        .await?;

    Ok(Json(view))
}

// DELETE /api/views/{id}
#[utoipa::path(
    delete,
    path = "/api/views/{id}",
    tag = "Views",
    params(("id" = i64, Path, description = "ID da view")),
    responses(
        (status = 204, description = "View removida"),
        (status = 404, description = "View não encontrada")
    ),
    security(("api_key" = []))
)]
pub async fn delete_view(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.view_service.delete_view(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 2: SELEÇÃO E RESOLUÇÃO
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectViewPayload {
    // null volta para "All Fields".
    pub view_id: Option<i64>,
}

// PUT /api/views/select
#[utoipa::path(
    put,
    path = "/api/views/select",
    tag = "Views",
    params(("x-user-id" = Option<i64>, Header, description = "Usuário da preferência")),
    request_body = SelectViewPayload,
    responses(
        (status = 204, description = "View selecionada"),
        (status = 404, description = "View não encontrada")
    ),
    security(("api_key" = []))
)]
pub async fn select_view(
    State(app_state): State<AppState>,
    user: UserContext,
    Json(payload): Json<SelectViewPayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state.view_service.select_view(user.0, payload.view_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/views/current
#[utoipa::path(
    get,
    path = "/api/views/current",
    tag = "Views",
    params(("x-user-id" = Option<i64>, Header, description = "Usuário da preferência")),
    responses(
        (status = 200, description = "View atual do usuário (null = All Fields)", body = Option<View>)
    ),
    security(("api_key" = []))
)]
pub async fn current_view(
    State(app_state): State<AppState>,
    user: UserContext,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state.view_service.current_view(user.0).await?;
    Ok(Json(view))
}

// GET /api/views/resolved
#[utoipa::path(
    get,
    path = "/api/views/resolved",
    tag = "Views",
    params(("x-user-id" = Option<i64>, Header, description = "Usuário da preferência")),
    responses(
        (status = 200, description = "Colunas resolvidas (ordem global > view > tudo visível)", body = ResolvedFields)
    ),
    security(("api_key" = []))
)]
pub async fn resolved_fields(
    State(app_state): State<AppState>,
    user: UserContext,
) -> Result<impl IntoResponse, AppError> {
    let resolved = app_state.view_service.resolved_fields(user.0).await?;
    Ok(Json(resolved))
}

// =============================================================================
//  ÁREA 3: ORDEM GLOBAL DE CAMPOS
// =============================================================================

// GET /api/field-order
#[utoipa::path(
    get,
    path = "/api/field-order",
    tag = "Views",
    responses(
        (status = 200, description = "Ordem global persistida (null se não houver)", body = Option<FieldOrder>)
    ),
    security(("api_key" = []))
)]
pub async fn get_field_order(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state.view_service.field_order().await?;
    Ok(Json(order))
}

// PUT /api/field-order
#[utoipa::path(
    put,
    path = "/api/field-order",
    tag = "Views",
    request_body = FieldOrder,
    responses(
        (status = 204, description = "Ordem global gravada"),
        (status = 400, description = "Referência de campo inválida")
    ),
    security(("api_key" = []))
)]
pub async fn save_field_order(
    State(app_state): State<AppState>,
    Json(order): Json<FieldOrder>,
) -> Result<impl IntoResponse, AppError> {
    app_state.view_service.save_field_order(&order).await?;
    Ok(StatusCode::NO_CONTENT)
}

// DELETE /api/field-order
#[utoipa::path(
    delete,
    path = "/api/field-order",
    tag = "Views",
    responses(
        (status = 204, description = "Ordem global removida; volta a valer a view do usuário")
    ),
    security(("api_key" = []))
)]
pub async fn clear_field_order(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    app_state.view_service.clear_field_order().await?;
    Ok(StatusCode::NO_CONTENT)
}
