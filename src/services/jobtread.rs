// src/services/jobtread.rs
//
// Cliente somente-leitura da API externa de gestão de obras (JobTread).
// A API é de consulta ("pave"): um único POST com a forma do resultado
// desejado; a credencial (grantKey) entra no envelope da própria query.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::{Datelike, Utc};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::models::dashboard::{DashboardData, FinancialSummary, JobStats};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// Respostas ficam em cache por 5 minutos, chaveadas pelo nome da consulta.
const CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct JobTreadClient {
    http: reqwest::Client,
    api_url: String,
    org_id: String,
    grant_key: Option<String>,
    time_zone: String,
    cache: Arc<RwLock<HashMap<String, (Value, Instant)>>>,
}

impl JobTreadClient {
    pub fn new(
        http: reqwest::Client,
        api_url: String,
        org_id: String,
        grant_key: Option<String>,
        time_zone: String,
    ) -> Self {
        Self {
            http,
            api_url,
            org_id,
            grant_key,
            time_zone,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn configured(&self) -> bool {
        self.grant_key.is_some()
    }

    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Painel completo. Cada seção degrada para vazio se a consulta falhar;
    /// sem credencial configurada, devolve tudo vazio sem tocar na rede.
    pub async fn dashboard_data(&self) -> DashboardData {
        if !self.configured() {
            tracing::debug!("jobtread: sem grant key configurada, painel vazio");
            return DashboardData::default();
        }

        DashboardData {
            job_stats: self.section("job_stats", self.job_stats()).await,
            active_jobs: self.section("active_jobs", self.active_jobs(5)).await,
            financial_summary: self
                .section("financial_summary", self.financial_summary())
                .await,
            recent_proposals: self
                .section("recent_proposals", self.recent_documents("proposal", 5))
                .await,
            upcoming_tasks: self.section("upcoming_tasks", self.upcoming_tasks(5)).await,
        }
    }

    async fn section<T: Default>(
        &self,
        name: &str,
        fut: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> T {
        match fut.await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("jobtread: seção '{}' falhou: {:#}", name, e);
                T::default()
            }
        }
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn job_stats(&self) -> anyhow::Result<JobStats> {
        let query = self.org_query(json!({
            "jobs": {
                "$": { "size": 200 },
                "nodes": { "id": {}, "name": {}, "closedOn": {}, "createdAt": {} }
            }
        }));

        let result = self.cached_query("job_stats", query).await?;
        let jobs = nodes(&result, "jobs");

        let now = Utc::now();
        let month_start = format!("{:04}-{:02}-01", now.year(), now.month());

        Ok(compute_job_stats(&jobs, &month_start))
    }

    pub async fn active_jobs(&self, limit: i64) -> anyhow::Result<Vec<Value>> {
        let query = self.org_query(json!({
            "jobs": {
                "$": {
                    "where": ["closedOn", "=", null],
                    "size": limit,
                    "sortBy": [{ "field": "createdAt", "order": "desc" }]
                },
                "nodes": {
                    "id": {}, "name": {}, "number": {}, "createdAt": {},
                    "location": {
                        "name": {}, "address": {},
                        "account": { "name": {} }
                    }
                }
            }
        }));

        let result = self.cached_query("active_jobs", query).await?;
        Ok(nodes(&result, "jobs"))
    }

    pub async fn recent_documents(
        &self,
        doc_type: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<Value>> {
        let query = self.org_query(json!({
            "documents": {
                "$": {
                    "where": ["type", "=", doc_type],
                    "size": limit,
                    "sortBy": [{ "field": "createdAt", "order": "desc" }]
                },
                "nodes": {
                    "id": {}, "number": {}, "type": {}, "status": {},
                    "total": {}, "createdAt": {},
                    "job": { "name": {}, "number": {} }
                }
            }
        }));

        let result = self
            .cached_query(&format!("documents_{}", doc_type), query)
            .await?;
        Ok(nodes(&result, "documents"))
    }

    pub async fn financial_summary(&self) -> anyhow::Result<FinancialSummary> {
        let documents_query = |doc_type: &str| {
            self.org_query(json!({
                "documents": {
                    "$": { "where": ["type", "=", doc_type], "size": 100 },
                    "nodes": { "id": {}, "status": {}, "total": {} }
                }
            }))
        };

        let proposals = self
            .cached_query("financial_proposals", documents_query("proposal"))
            .await?;
        let invoices = self
            .cached_query("financial_invoices", documents_query("invoice"))
            .await?;

        Ok(compute_financial_summary(
            &nodes(&proposals, "documents"),
            &nodes(&invoices, "documents"),
        ))
    }

    pub async fn upcoming_tasks(&self, limit: i64) -> anyhow::Result<Vec<Value>> {
        let today = Utc::now().format("%Y-%m-%d").to_string();

        let query = self.org_query(json!({
            "tasks": {
                "$": {
                    "where": {
                        "and": [
                            ["startDate", ">=", today],
                            ["completedAt", "=", null]
                        ]
                    },
                    "size": limit,
                    "sortBy": [{ "field": "startDate", "order": "asc" }]
                },
                "nodes": {
                    "id": {}, "name": {}, "startDate": {}, "endDate": {},
                    "job": { "name": {}, "number": {} }
                }
            }
        }));

        let result = self.cached_query("upcoming_tasks", query).await?;
        Ok(nodes(&result, "tasks"))
    }

    // =========================================================================
    //  TRANSPORTE E CACHE
    // =========================================================================

    fn org_query(&self, body: Value) -> Value {
        let mut organization = json!({ "$": { "id": self.org_id } });
        if let (Value::Object(org), Value::Object(extra)) = (&mut organization, body) {
            org.extend(extra);
        }
        json!({ "query": { "organization": organization } })
    }

    async fn cached_query(&self, cache_key: &str, query: Value) -> anyhow::Result<Value> {
        {
            let cache = self.cache.read().await;
            if let Some((value, stored_at)) = cache.get(cache_key) {
                if stored_at.elapsed() < CACHE_TTL {
                    return Ok(value.clone());
                }
            }
        }

        let result = self.raw_query(query).await?;

        self.cache
            .write()
            .await
            .insert(cache_key.to_string(), (result.clone(), Instant::now()));

        Ok(result)
    }

    async fn raw_query(&self, mut query: Value) -> anyhow::Result<Value> {
        let grant_key = self
            .grant_key
            .as_deref()
            .context("grant key não configurada")?;

        // A credencial vai dentro do envelope "$" da query.
        if let Some(envelope) = query.pointer_mut("/query") {
            let dollar = envelope
                .as_object_mut()
                .context("query malformada")?
                .entry("$")
                .or_insert_with(|| json!({}));
            if let Some(dollar) = dollar.as_object_mut() {
                dollar.insert("grantKey".to_string(), json!(grant_key));
                dollar.insert("timeZone".to_string(), json!(self.time_zone));
            }
        }

        let response = self
            .http
            .post(&self.api_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&query)
            .send()
            .await
            .context("falha de rede na API externa")?
            .error_for_status()
            .context("a API externa respondeu com erro")?;

        let body = response
            .json::<Value>()
            .await
            .context("resposta da API externa não é JSON")?;

        Ok(body)
    }
}

fn nodes(result: &Value, collection: &str) -> Vec<Value> {
    result
        .pointer(&format!("/organization/{}/nodes", collection))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn compute_job_stats(jobs: &[Value], month_start: &str) -> JobStats {
    let closed = jobs
        .iter()
        .filter(|j| j.get("closedOn").is_some_and(|v| !v.is_null()))
        .count() as i64;
    let total = jobs.len() as i64;
    let this_month = jobs
        .iter()
        .filter(|j| {
            j.get("createdAt")
                .and_then(Value::as_str)
                .is_some_and(|created| created >= month_start)
        })
        .count() as i64;

    JobStats {
        active_jobs: total - closed,
        closed_jobs: closed,
        total_jobs: total,
        jobs_this_month: this_month,
    }
}

fn document_total(doc: &Value) -> f64 {
    match doc.get("total") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn compute_financial_summary(proposals: &[Value], invoices: &[Value]) -> FinancialSummary {
    let mut summary = FinancialSummary::default();

    for proposal in proposals {
        let total = document_total(proposal);
        let status = proposal
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_lowercase();
        match status.as_str() {
            "pending" | "sent" | "draft" => {
                summary.proposals_pending += 1;
                summary.proposals_pending_value += total;
            }
            "approved" | "accepted" => {
                summary.proposals_approved += 1;
                summary.proposals_approved_value += total;
            }
            _ => {}
        }
    }

    for invoice in invoices {
        let total = document_total(invoice);
        let status = invoice
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_lowercase();
        match status.as_str() {
            "sent" | "pending" | "overdue" => {
                summary.invoices_outstanding += 1;
                summary.invoices_outstanding_value += total;
            }
            "paid" | "complete" => {
                summary.invoices_paid += 1;
                summary.invoices_paid_value += total;
            }
            _ => {}
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_stats_split_active_closed_and_month() {
        let jobs = vec![
            json!({ "id": "1", "closedOn": null, "createdAt": "2026-08-10T12:00:00Z" }),
            json!({ "id": "2", "closedOn": "2026-07-01", "createdAt": "2026-06-05T09:00:00Z" }),
            json!({ "id": "3", "createdAt": "2026-08-02T08:00:00Z" }),
        ];

        let stats = compute_job_stats(&jobs, "2026-08-01");

        assert_eq!(stats.total_jobs, 3);
        assert_eq!(stats.closed_jobs, 1);
        assert_eq!(stats.active_jobs, 2);
        assert_eq!(stats.jobs_this_month, 2);
    }

    #[test]
    fn financial_summary_buckets_by_status() {
        let proposals = vec![
            json!({ "status": "Sent", "total": 1000.0 }),
            json!({ "status": "draft", "total": "250.50" }),
            json!({ "status": "approved", "total": 4000 }),
            json!({ "status": "declined", "total": 9999 }),
        ];
        let invoices = vec![
            json!({ "status": "overdue", "total": 300 }),
            json!({ "status": "paid", "total": 700 }),
            json!({ "status": null, "total": 50 }),
        ];

        let summary = compute_financial_summary(&proposals, &invoices);

        assert_eq!(summary.proposals_pending, 2);
        assert_eq!(summary.proposals_pending_value, 1250.5);
        assert_eq!(summary.proposals_approved, 1);
        assert_eq!(summary.proposals_approved_value, 4000.0);
        assert_eq!(summary.invoices_outstanding, 1);
        assert_eq!(summary.invoices_outstanding_value, 300.0);
        assert_eq!(summary.invoices_paid, 1);
        assert_eq!(summary.invoices_paid_value, 700.0);
    }

    #[test]
    fn org_query_wraps_body_under_organization() {
        let client = JobTreadClient::new(
            reqwest::Client::new(),
            "https://api.example.com/pave".to_string(),
            "org123".to_string(),
            None,
            "UTC".to_string(),
        );

        let query = client.org_query(json!({ "jobs": { "nodes": { "id": {} } } }));

        assert_eq!(query["query"]["organization"]["$"]["id"], "org123");
        assert!(query["query"]["organization"]["jobs"]["nodes"]["id"].is_object());
    }

    #[tokio::test]
    async fn unconfigured_client_returns_empty_dashboard() {
        let client = JobTreadClient::new(
            reqwest::Client::new(),
            "https://api.example.com/pave".to_string(),
            "org123".to_string(),
            None,
            "UTC".to_string(),
        );

        let data = client.dashboard_data().await;

        assert_eq!(data.job_stats.total_jobs, 0);
        assert!(data.active_jobs.is_empty());
        assert!(data.upcoming_tasks.is_empty());
    }
}
