// src/models/dashboard.rs

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

// Agregados da API externa de gestão de obras. Campos cruzados da API
// chegam como JSON opaco (Value); só os totais são tipados aqui.

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub active_jobs: i64,
    pub closed_jobs: i64,
    pub total_jobs: i64,
    pub jobs_this_month: i64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub proposals_pending: i64,
    pub proposals_pending_value: f64,
    pub proposals_approved: i64,
    pub proposals_approved_value: f64,
    pub invoices_outstanding: i64,
    pub invoices_outstanding_value: f64,
    pub invoices_paid: i64,
    pub invoices_paid_value: f64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub job_stats: JobStats,
    pub active_jobs: Vec<Value>,
    pub financial_summary: FinancialSummary,
    pub recent_proposals: Vec<Value>,
    pub upcoming_tasks: Vec<Value>,
}
