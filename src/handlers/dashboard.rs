// src/handlers/dashboard.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{common::error::AppError, config::AppState, models::dashboard::DashboardData};

// GET /api/dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Agregados da API externa de obras (vazio se não configurada)", body = DashboardData)
    ),
    security(("api_key" = []))
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let data = app_state.jobtread.dashboard_data().await;
    Ok(Json(data))
}

// DELETE /api/dashboard/cache
#[utoipa::path(
    delete,
    path = "/api/dashboard/cache",
    tag = "Dashboard",
    responses(
        (status = 204, description = "Cache limpo; a próxima consulta busca dados novos")
    ),
    security(("api_key" = []))
)]
pub async fn clear_dashboard_cache(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    app_state.jobtread.clear_cache().await;
    Ok(StatusCode::NO_CONTENT)
}
