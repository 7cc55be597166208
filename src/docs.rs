// src/docs.rs

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Leads ---
        handlers::leads::create_lead,
        handlers::leads::list_leads,
        handlers::leads::grouped_leads,
        handlers::leads::get_lead,
        handlers::leads::update_lead,
        handlers::leads::update_lead_column,
        handlers::leads::change_lead_status,
        handlers::leads::delete_lead,
        handlers::leads::purge_lead,
        handlers::leads::list_statuses,
        handlers::leads::replace_statuses,
        handlers::leads::get_group_preferences,
        handlers::leads::save_group_preferences,

        // --- Fields ---
        handlers::fields::create_field,
        handlers::fields::list_fields,
        handlers::fields::get_field,
        handlers::fields::update_field,
        handlers::fields::delete_field,
        handlers::fields::set_field_value,
        handlers::fields::lead_field_values,
        handlers::fields::get_visibility,
        handlers::fields::save_visibility,
        handlers::fields::reorder_fields,

        // --- Views ---
        handlers::views::create_view,
        handlers::views::list_views,
        handlers::views::get_view,
        handlers::views::update_view,
        handlers::views::delete_view,
        handlers::views::select_view,
        handlers::views::current_view,
        handlers::views::resolved_fields,
        handlers::views::get_field_order,
        handlers::views::save_field_order,
        handlers::views::clear_field_order,

        // --- Activities ---
        handlers::activities::log_activity,
        handlers::activities::lead_timeline,
        handlers::activities::delete_activity,

        // --- Handoffs ---
        handlers::handoffs::list_triggers,
        handlers::handoffs::create_trigger,
        handlers::handoffs::delete_trigger,
        handlers::handoffs::handoff_preview,
        handlers::handoffs::save_handoff,
        handlers::handoffs::lead_handoffs,

        // --- Settings ---
        handlers::settings::get_settings,
        handlers::settings::update_settings,
        handlers::settings::generate_api_key,
        handlers::settings::revoke_api_key,

        // --- Dashboard ---
        handlers::dashboard::get_dashboard,
        handlers::dashboard::clear_dashboard_cache,
    ),
    components(
        schemas(
            // --- Leads ---
            models::lead::Lead,
            models::lead::LeadStatus,
            models::grouping::GroupNode,
            models::grouping::GroupPreference,
            models::grouping::SortDirection,
            handlers::leads::CreateLeadPayload,
            handlers::leads::UpdateColumnPayload,
            handlers::leads::ChangeStatusPayload,
            handlers::leads::StatusEntryPayload,
            handlers::leads::GroupPreferencePayload,

            // --- Fields ---
            models::field::CustomField,
            models::field::FieldType,
            models::field::FieldValue,
            models::field::FieldVisibilityEntry,
            handlers::fields::CreateFieldPayload,
            handlers::fields::UpdateFieldPayload,
            handlers::fields::SetValuePayload,
            handlers::fields::SetValueResponse,
            handlers::fields::VisibilityEntryPayload,

            // --- Views ---
            models::view::View,
            models::view::ViewFieldEntry,
            models::view::FieldOrder,
            models::view::ResolvedField,
            models::view::ResolvedFields,
            handlers::views::CreateViewPayload,
            handlers::views::UpdateViewPayload,
            handlers::views::ViewDetailResponse,
            handlers::views::SelectViewPayload,

            // --- Activities ---
            models::activity::Activity,
            models::activity::ActivityType,
            handlers::activities::LogActivityPayload,

            // --- Handoffs ---
            models::handoff::HandoffTrigger,
            models::handoff::HandoffSummary,
            models::handoff::HandoffDraft,
            handlers::handoffs::CreateTriggerPayload,

            // --- Settings ---
            models::settings::AppSettingsResponse,
            models::settings::UpdateSettingsRequest,
            models::settings::ApiKeyResponse,

            // --- Dashboard ---
            models::dashboard::DashboardData,
            models::dashboard::JobStats,
            models::dashboard::FinancialSummary,
        )
    ),
    tags(
        (name = "Leads", description = "Funil de vendas: leads, estágios e agrupamento"),
        (name = "Fields", description = "Campos dinâmicos: definições, valores e visibilidade"),
        (name = "Views", description = "Views nomeadas e resolução de colunas"),
        (name = "Activities", description = "Linha do tempo dos leads"),
        (name = "Handoffs", description = "Gatilhos e resumos de passagem de bastão"),
        (name = "Settings", description = "Webhook e chave de API"),
        (name = "Dashboard", description = "Indicadores da API externa de obras")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
        );
    }
}
