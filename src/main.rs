//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::api_key_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let lead_routes = Router::new()
        .route("/", post(handlers::leads::create_lead).get(handlers::leads::list_leads))
        .route("/grouped", get(handlers::leads::grouped_leads))
        .route(
            "/{id}",
            get(handlers::leads::get_lead)
                .put(handlers::leads::update_lead)
                .delete(handlers::leads::delete_lead),
        )
        .route("/{id}/column", axum::routing::patch(handlers::leads::update_lead_column))
        .route("/{id}/status", put(handlers::leads::change_lead_status))
        .route("/{id}/purge", delete(handlers::leads::purge_lead))
        .route(
            "/{id}/activities",
            post(handlers::activities::log_activity).get(handlers::activities::lead_timeline),
        )
        .route("/{id}/values", get(handlers::fields::lead_field_values))
        .route("/{lead_id}/fields/{field_id}", put(handlers::fields::set_field_value))
        .route(
            "/{id}/handoff",
            get(handlers::handoffs::handoff_preview).post(handlers::handoffs::save_handoff),
        )
        .route("/{id}/handoffs", get(handlers::handoffs::lead_handoffs));

    let field_routes = Router::new()
        .route("/", post(handlers::fields::create_field).get(handlers::fields::list_fields))
        .route(
            "/visibility",
            get(handlers::fields::get_visibility).put(handlers::fields::save_visibility),
        )
        .route("/reorder", put(handlers::fields::reorder_fields))
        .route(
            "/{id}",
            get(handlers::fields::get_field)
                .put(handlers::fields::update_field)
                .delete(handlers::fields::delete_field),
        );

    let view_routes = Router::new()
        .route("/", post(handlers::views::create_view).get(handlers::views::list_views))
        .route("/select", put(handlers::views::select_view))
        .route("/current", get(handlers::views::current_view))
        .route("/resolved", get(handlers::views::resolved_fields))
        .route(
            "/{id}",
            get(handlers::views::get_view)
                .put(handlers::views::update_view)
                .delete(handlers::views::delete_view),
        );

    let handoff_routes = Router::new()
        .route(
            "/",
            get(handlers::handoffs::list_triggers).post(handlers::handoffs::create_trigger),
        )
        .route("/{id}", delete(handlers::handoffs::delete_trigger));

    // Tudo que é protegido pela chave de API, em um router só.
    let api_routes = Router::new()
        .nest("/leads", lead_routes)
        .nest("/fields", field_routes)
        .nest("/views", view_routes)
        .nest("/handoff-triggers", handoff_routes)
        .route(
            "/statuses",
            get(handlers::leads::list_statuses).put(handlers::leads::replace_statuses),
        )
        .route(
            "/group-preferences",
            get(handlers::leads::get_group_preferences)
                .put(handlers::leads::save_group_preferences),
        )
        .route(
            "/field-order",
            get(handlers::views::get_field_order)
                .put(handlers::views::save_field_order)
                .delete(handlers::views::clear_field_order),
        )
        .route("/activities/{id}", delete(handlers::activities::delete_activity))
        .route(
            "/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route(
            "/settings/api-key",
            post(handlers::settings::generate_api_key)
                .delete(handlers::settings::revoke_api_key),
        )
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route("/dashboard/cache", delete(handlers::dashboard::clear_dashboard_cache))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), api_key_guard));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
