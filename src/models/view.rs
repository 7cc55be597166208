// src/models/view.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::grouping::FieldRef;

// --- VIEW (seleção nomeada e ordenada de campos) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: i64,

    #[schema(example = "Estimator View")]
    pub name: String,
    pub description: Option<String>,

    // Array JSON com as chaves das colunas fixas visíveis na view.
    #[schema(example = json!(["email", "phone", "job_type"]))]
    pub default_fields: Value,

    pub created_at: DateTime<Utc>,
}

// Campo dinâmico associado a uma view, já com a posição dentro dela.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewFieldEntry {
    pub field_id: i64,
    pub name: String,
    pub field_key: String,
    pub view_sequence: i64,
}

// --- ORDEM GLOBAL DE CAMPOS ---
//
// Um único blob compartilhado (linha em app_settings): lista explícita dos
// campos visíveis, em ordem, mais a lista dos ocultos. Quando presente,
// vence a view selecionada do usuário.

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldOrder {
    #[schema(value_type = Vec<String>, example = json!(["email", "custom_3", "phone"]))]
    pub visible: Vec<FieldRef>,

    #[schema(value_type = Vec<String>)]
    pub hidden: Vec<FieldRef>,
}

// --- SAÍDA DA RESOLUÇÃO ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedField {
    // Coluna fixa do lead.
    Default {
        key: String,
        label: String,
        visible: bool,
    },
    // Campo dinâmico.
    Custom {
        id: i64,
        name: String,
        visible: bool,
    },
}

impl ResolvedField {
    pub fn visible(&self) -> bool {
        match self {
            ResolvedField::Default { visible, .. } => *visible,
            ResolvedField::Custom { visible, .. } => *visible,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFields {
    // Lista completa e ordenada (visíveis e ocultos).
    pub fields: Vec<ResolvedField>,

    // Listas reduzidas usadas para filtrar as colunas da tabela.
    pub visible_default_keys: Vec<String>,
    pub visible_custom_ids: Vec<i64>,
}
