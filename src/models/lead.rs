// src/models/lead.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- LEAD (a entidade central do CRM) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,

    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub job_type: Option<String>,
    pub property_type: Option<String>,

    #[schema(example = "New Lead")]
    pub status: String,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Soft delete: preenchido = marcado para remoção, ainda recuperável.
    pub deleted_at: Option<DateTime<Utc>>,
}

// --- ESTÁGIOS DO FUNIL (status com cor, configuráveis) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadStatus {
    pub id: i64,

    #[schema(example = "Proposal Sent")]
    pub name: String,

    #[schema(example = "#06b6d4")]
    pub color: Option<String>,

    pub sequence: i64,
}
