// src/models/handoff.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;

// Gatilho de handoff: transições (from -> to) que geram um resumo.
// from_status = None é o curinga ("qualquer origem"). Quando existe uma
// linha exata e uma curinga para o mesmo to_status, a exata vence.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HandoffTrigger {
    pub id: i64,

    #[schema(example = "Estimating")]
    pub from_status: Option<String>,

    #[schema(example = "Proposal Sent")]
    pub to_status: String,
}

// Resumo gerado em uma transição de estágio: narrativa em markdown mais o
// snapshot estruturado (key_info) para a parte que recebe o lead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HandoffSummary {
    pub id: i64,
    pub lead_id: i64,

    pub narrative: String,
    pub key_info: Value,

    pub from_status: Option<String>,
    pub to_status: String,

    pub created_at: DateTime<Utc>,
}

// Resumo ainda não persistido (a prévia de GET /handoff).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HandoffDraft {
    pub lead_id: i64,
    pub narrative: String,
    pub key_info: Value,
}
