// src/models/grouping.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::lead::Lead;

// Rótulo do balde para leads sem valor no campo de agrupamento.
pub const UNCATEGORIZED: &str = "Uncategorized";

// --- REFERÊNCIA DE CAMPO ---
//
// Um agrupamento ou uma ordenação pode apontar para uma coluna fixa do lead
// ("email", "status"...) ou para um campo dinâmico ("custom_<id>").
// Este sum type elimina o parse espalhado dessas strings: o formato de fio
// é decodificado uma única vez, aqui.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultFieldKey {
    Name,
    Email,
    Phone,
    Address,
    JobType,
    PropertyType,
    Status,
    Notes,
}

impl DefaultFieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultFieldKey::Name => "name",
            DefaultFieldKey::Email => "email",
            DefaultFieldKey::Phone => "phone",
            DefaultFieldKey::Address => "address",
            DefaultFieldKey::JobType => "job_type",
            DefaultFieldKey::PropertyType => "property_type",
            DefaultFieldKey::Status => "status",
            DefaultFieldKey::Notes => "notes",
        }
    }

    // Rótulo de exibição da coluna.
    pub fn label(&self) -> &'static str {
        match self {
            DefaultFieldKey::Name => "Name",
            DefaultFieldKey::Email => "Email",
            DefaultFieldKey::Phone => "Phone",
            DefaultFieldKey::Address => "Address",
            DefaultFieldKey::JobType => "Job Type",
            DefaultFieldKey::PropertyType => "Property Type",
            DefaultFieldKey::Status => "Status",
            DefaultFieldKey::Notes => "Notes",
        }
    }

    // Valor da coluna fixa em um lead, para o agrupamento.
    pub fn value_of(&self, lead: &Lead) -> Option<String> {
        match self {
            DefaultFieldKey::Name => Some(lead.name.clone()),
            DefaultFieldKey::Email => lead.email.clone(),
            DefaultFieldKey::Phone => lead.phone.clone(),
            DefaultFieldKey::Address => lead.address.clone(),
            DefaultFieldKey::JobType => lead.job_type.clone(),
            DefaultFieldKey::PropertyType => lead.property_type.clone(),
            DefaultFieldKey::Status => Some(lead.status.clone()),
            DefaultFieldKey::Notes => lead.notes.clone(),
        }
    }
}

impl FromStr for DefaultFieldKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(DefaultFieldKey::Name),
            "email" => Ok(DefaultFieldKey::Email),
            "phone" => Ok(DefaultFieldKey::Phone),
            "address" => Ok(DefaultFieldKey::Address),
            "job_type" => Ok(DefaultFieldKey::JobType),
            "property_type" => Ok(DefaultFieldKey::PropertyType),
            "status" => Ok(DefaultFieldKey::Status),
            "notes" => Ok(DefaultFieldKey::Notes),
            _ => Err(()),
        }
    }
}

// Colunas opcionais da tabela de leads, na ordem natural de exibição.
// ("name" é a coluna âncora e nunca entra na resolução de visibilidade.)
pub const DEFAULT_VIEW_KEYS: [DefaultFieldKey; 5] = [
    DefaultFieldKey::Email,
    DefaultFieldKey::Phone,
    DefaultFieldKey::Address,
    DefaultFieldKey::JobType,
    DefaultFieldKey::PropertyType,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldRef {
    Default(DefaultFieldKey),
    Custom(i64),
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Default(key) => write!(f, "{}", key.as_str()),
            FieldRef::Custom(id) => write!(f, "custom_{}", id),
        }
    }
}

impl FromStr for FieldRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(raw_id) = s.strip_prefix("custom_") {
            let id: i64 = raw_id
                .parse()
                .map_err(|_| format!("referência de campo inválida: {}", s))?;
            return Ok(FieldRef::Custom(id));
        }
        DefaultFieldKey::from_str(s)
            .map(FieldRef::Default)
            .map_err(|_| format!("referência de campo inválida: {}", s))
    }
}

impl TryFrom<String> for FieldRef {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FieldRef> for String {
    fn from(r: FieldRef) -> String {
        r.to_string()
    }
}

// --- PREFERÊNCIA DE AGRUPAMENTO ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupPreference {
    pub id: i64,
    pub user_id: i64,

    // Nível 0 = partição mais externa.
    pub group_level: i64,

    // "status", "job_type", "custom_<id>"...
    #[schema(example = "status")]
    pub field_name: String,

    pub sort_direction: SortDirection,
}

// --- ÁRVORE DE GRUPOS ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupNode {
    // Valor do campo neste balde (ou o sentinela "Uncategorized").
    pub label: String,

    // Campo que particionou este nível; None no nó plano sem agrupamento.
    pub field: Option<String>,

    pub level: usize,
    pub count: usize,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<GroupNode>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub leads: Vec<Lead>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_ref_parses_default_and_custom() {
        assert_eq!(
            "status".parse::<FieldRef>().unwrap(),
            FieldRef::Default(DefaultFieldKey::Status)
        );
        assert_eq!("custom_42".parse::<FieldRef>().unwrap(), FieldRef::Custom(42));
    }

    #[test]
    fn field_ref_rejects_unknown_and_malformed() {
        assert!("budget".parse::<FieldRef>().is_err());
        assert!("custom_abc".parse::<FieldRef>().is_err());
        assert!("custom_".parse::<FieldRef>().is_err());
    }

    #[test]
    fn field_ref_round_trips_display() {
        for raw in ["email", "job_type", "custom_7"] {
            let parsed: FieldRef = raw.parse().unwrap();
            assert_eq!(parsed.to_string(), raw);
        }
    }
}
