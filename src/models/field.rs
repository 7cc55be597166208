// src/models/field.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;

// --- ENUMS ---

// Tipos de campo dinâmico. Gravados como TEXT no banco.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Dropdown,
    MultiSelect,
    Checkbox,
    Contact,
    Duration,
    AutoNumber,
    Symbol,
    File,
    Currency,
    Email,
    Phone,
    Url,
}

// --- DEFINIÇÕES (O Molde) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub id: i64,

    #[schema(example = "Roof Type")]
    pub name: String,

    // Chave derivada do nome (slug). Única no sistema.
    #[schema(example = "roof_type")]
    pub field_key: String,

    pub field_type: FieldType,

    // Opções para dropdown / multi_select (array JSON de strings).
    #[schema(example = json!(["Tile", "Metal", "Shingle"]))]
    pub options: Option<Value>,

    // Cor por opção, para o kanban ({"Tile": "#f59e0b", ...}).
    pub option_colors: Option<Value>,

    pub is_required: bool,
    pub default_value: Option<String>,

    // Posição na ordenação natural dos campos.
    pub sequence: i64,

    pub created_at: DateTime<Utc>,
}

// --- VALOR (O Dado): no máximo uma linha por par (lead, campo) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    pub id: i64,
    pub lead_id: i64,
    pub field_id: i64,
    pub value: Option<String>,
}

// Valor já juntado com a definição, para montar o mapa por lead.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadFieldValue {
    pub lead_id: i64,
    pub field_key: String,
    pub field_type: FieldType,
    pub value: Option<String>,
}

// --- VISIBILIDADE POR USUÁRIO ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldVisibilityEntry {
    pub id: i64,
    pub name: String,
    pub field_key: String,
    pub field_type: FieldType,
    pub is_visible: bool,
    pub sequence: i64,
}
