// src/services/grouping.rs
//
// Motor de agrupamento do kanban/tabela: partição recursiva de uma lista já
// carregada de leads, nível a nível, pelos campos das preferências do
// usuário. Função pura: nenhuma escrita, mesma entrada -> mesma saída.

use std::collections::{BTreeMap, HashMap};

use crate::models::{
    grouping::{FieldRef, GroupNode, GroupPreference, SortDirection, UNCATEGORIZED},
    lead::Lead,
};

/// Agrupa os leads pela lista ordenada de preferências.
///
/// `values` é o mapa pré-computado lead_id -> {field_key: value} dos campos
/// dinâmicos; `custom_keys` resolve id do campo -> field_key. Sem
/// preferências, devolve um único balde plano com todos os leads, na ordem
/// recebida.
pub fn group_leads(
    leads: Vec<Lead>,
    values: &HashMap<i64, HashMap<String, String>>,
    custom_keys: &HashMap<i64, String>,
    prefs: &[GroupPreference],
) -> Vec<GroupNode> {
    if prefs.is_empty() {
        let count = leads.len();
        return vec![GroupNode {
            label: "All Leads".to_string(),
            field: None,
            level: 0,
            count,
            children: Vec::new(),
            leads,
        }];
    }

    partition(leads, values, custom_keys, prefs, 0)
}

fn partition(
    leads: Vec<Lead>,
    values: &HashMap<i64, HashMap<String, String>>,
    custom_keys: &HashMap<i64, String>,
    prefs: &[GroupPreference],
    level: usize,
) -> Vec<GroupNode> {
    let pref = &prefs[level];
    let field_ref = pref.field_name.parse::<FieldRef>().ok();

    // BTreeMap ordena as chaves; a ordem dos membros dentro do balde é a
    // ordem de chegada.
    let mut buckets: BTreeMap<String, Vec<Lead>> = BTreeMap::new();
    for lead in leads {
        let key = group_key(&lead, field_ref, values, custom_keys);
        buckets.entry(key).or_default().push(lead);
    }

    let ordered: Vec<(String, Vec<Lead>)> = match pref.sort_direction {
        SortDirection::Asc => buckets.into_iter().collect(),
        SortDirection::Desc => buckets.into_iter().rev().collect(),
    };

    ordered
        .into_iter()
        .map(|(label, members)| {
            let count = members.len();
            if level + 1 < prefs.len() {
                GroupNode {
                    label,
                    field: Some(pref.field_name.clone()),
                    level,
                    count,
                    children: partition(members, values, custom_keys, prefs, level + 1),
                    leads: Vec::new(),
                }
            } else {
                // Último nível: os membros viram folhas.
                GroupNode {
                    label,
                    field: Some(pref.field_name.clone()),
                    level,
                    count,
                    children: Vec::new(),
                    leads: members,
                }
            }
        })
        .collect()
}

fn group_key(
    lead: &Lead,
    field_ref: Option<FieldRef>,
    values: &HashMap<i64, HashMap<String, String>>,
    custom_keys: &HashMap<i64, String>,
) -> String {
    let raw = match field_ref {
        Some(FieldRef::Default(key)) => key.value_of(lead),
        Some(FieldRef::Custom(id)) => custom_keys
            .get(&id)
            .and_then(|key| values.get(&lead.id).and_then(|map| map.get(key)))
            .cloned(),
        // Referência que não resolve: tudo cai no sentinela.
        None => None,
    };

    match raw {
        Some(value) if !value.trim().is_empty() => value,
        _ => UNCATEGORIZED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lead(id: i64, name: &str, status: &str, job_type: Option<&str>) -> Lead {
        let now = chrono::DateTime::<Utc>::UNIX_EPOCH;
        Lead {
            id,
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
            job_type: job_type.map(str::to_string),
            property_type: None,
            status: status.to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn pref(level: i64, field_name: &str, dir: SortDirection) -> GroupPreference {
        GroupPreference {
            id: level + 1,
            user_id: 0,
            group_level: level,
            field_name: field_name.to_string(),
            sort_direction: dir,
        }
    }

    #[test]
    fn empty_prefs_yield_single_flat_bucket_in_input_order() {
        let leads = vec![
            lead(1, "Ana", "Lost", None),
            lead(2, "Bia", "New Lead", None),
            lead(3, "Caio", "Lost", None),
        ];

        let tree = group_leads(leads, &HashMap::new(), &HashMap::new(), &[]);

        assert_eq!(tree.len(), 1);
        let root = &tree[0];
        assert_eq!(root.field, None);
        assert_eq!(root.count, 3);
        assert!(root.children.is_empty());
        let ids: Vec<i64> = root.leads.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn groups_by_status_ascending_then_descending() {
        let leads = || {
            vec![
                lead(1, "Ana", "New Lead", None),
                lead(2, "Bia", "Lost", None),
                lead(3, "Caio", "New Lead", None),
            ]
        };

        let asc = group_leads(
            leads(),
            &HashMap::new(),
            &HashMap::new(),
            &[pref(0, "status", SortDirection::Asc)],
        );
        let labels: Vec<&str> = asc.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Lost", "New Lead"]);
        assert_eq!(asc[1].count, 2);

        let desc = group_leads(
            leads(),
            &HashMap::new(),
            &HashMap::new(),
            &[pref(0, "status", SortDirection::Desc)],
        );
        let labels: Vec<&str> = desc.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["New Lead", "Lost"]);
    }

    #[test]
    fn missing_custom_value_falls_into_uncategorized() {
        let leads = vec![lead(1, "Ana", "New Lead", None), lead(2, "Bia", "New Lead", None)];

        let mut values = HashMap::new();
        values.insert(
            1,
            HashMap::from([("roof_type".to_string(), "Tile".to_string())]),
        );
        let custom_keys = HashMap::from([(7_i64, "roof_type".to_string())]);

        let tree = group_leads(
            leads,
            &values,
            &custom_keys,
            &[pref(0, "custom_7", SortDirection::Asc)],
        );

        let labels: Vec<&str> = tree.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Tile", UNCATEGORIZED]);
        assert_eq!(tree[1].leads[0].id, 2);
    }

    #[test]
    fn empty_string_value_counts_as_uncategorized() {
        let leads = vec![lead(1, "Ana", "New Lead", Some(""))];

        let tree = group_leads(
            leads,
            &HashMap::new(),
            &HashMap::new(),
            &[pref(0, "job_type", SortDirection::Asc)],
        );

        assert_eq!(tree[0].label, UNCATEGORIZED);
    }

    #[test]
    fn two_levels_partition_recursively() {
        let leads = vec![
            lead(1, "Ana", "New Lead", Some("Remodel")),
            lead(2, "Bia", "New Lead", Some("Pool Deck")),
            lead(3, "Caio", "Lost", Some("Remodel")),
            lead(4, "Duda", "New Lead", Some("Remodel")),
        ];

        let tree = group_leads(
            leads,
            &HashMap::new(),
            &HashMap::new(),
            &[
                pref(0, "status", SortDirection::Asc),
                pref(1, "job_type", SortDirection::Desc),
            ],
        );

        // Nível 0: status ascendente.
        let labels: Vec<&str> = tree.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Lost", "New Lead"]);

        // Os grupos intermediários não carregam folhas, só filhos.
        assert!(tree[1].leads.is_empty());

        // Nível 1 de "New Lead": job_type descendente.
        let inner: Vec<&str> = tree[1].children.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(inner, vec!["Remodel", "Pool Deck"]);
        assert_eq!(tree[1].children[0].level, 1);
        assert_eq!(tree[1].children[0].count, 2);

        // A contagem do pai cobre todos os descendentes.
        assert_eq!(tree[1].count, 3);
    }

    #[test]
    fn same_inputs_produce_same_tree() {
        let make = || {
            group_leads(
                vec![
                    lead(1, "Ana", "New Lead", Some("Remodel")),
                    lead(2, "Bia", "Lost", None),
                ],
                &HashMap::new(),
                &HashMap::new(),
                &[pref(0, "status", SortDirection::Asc)],
            )
        };

        let a = serde_json::to_string(&make()).unwrap();
        let b = serde_json::to_string(&make()).unwrap();
        assert_eq!(a, b);
    }
}
