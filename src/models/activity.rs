// src/models/activity.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;

// Tipos de evento da linha do tempo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    StatusChange,
    FieldUpdate,
    Handoff,
    Call,
    Email,
    Meeting,
    Created,
    Note,
}

// Registro append-only: nunca é alterado depois de gravado.
// A única remoção é o delete explícito por atividade, exposto na UI.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub lead_id: i64,
    pub user_id: Option<i64>,

    pub activity_type: ActivityType,

    #[schema(example = "Status changed from \"Estimating\" to \"Proposal Sent\"")]
    pub content: String,

    // Dados estruturados opcionais do evento.
    pub metadata: Option<Value>,

    pub created_at: DateTime<Utc>,
}
