// src/config.rs

use std::{env, str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    db::{
        ActivityRepository, FieldRepository, GroupPreferenceRepository, HandoffRepository,
        LeadRepository, SettingsRepository, ViewRepository,
    },
    services::{
        webhook::WebhookNotifier, ActivityService, FieldService, HandoffService, JobTreadClient,
        LeadService, SettingsService, ViewService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub lead_service: LeadService,
    pub field_service: FieldService,
    pub view_service: ViewService,
    pub activity_service: ActivityService,
    pub handoff_service: HandoffService,
    pub settings_service: SettingsService,
    pub jobtread: JobTreadClient,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        // Banco embutido: sem DATABASE_URL, cria crm.db no diretório atual.
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:crm.db".to_string());
        let connect_options =
            SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);

        let db_pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(connect_options)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let http = reqwest::Client::builder().build()?;

        // --- Monta o gráfico de dependências ---
        let lead_repo = LeadRepository::new(db_pool.clone());
        let field_repo = FieldRepository::new(db_pool.clone());
        let view_repo = ViewRepository::new(db_pool.clone());
        let group_repo = GroupPreferenceRepository::new(db_pool.clone());
        let activity_repo = ActivityRepository::new(db_pool.clone());
        let handoff_repo = HandoffRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());

        let webhook =
            WebhookNotifier::new(http.clone(), db_pool.clone(), settings_repo.clone());
        let handoff_service =
            HandoffService::new(db_pool.clone(), handoff_repo, activity_repo.clone());
        let lead_service = LeadService::new(
            db_pool.clone(),
            lead_repo.clone(),
            field_repo.clone(),
            group_repo,
            activity_repo.clone(),
            handoff_service.clone(),
            webhook,
        );
        let field_service = FieldService::new(
            db_pool.clone(),
            field_repo.clone(),
            lead_repo.clone(),
            activity_repo.clone(),
        );
        let view_service = ViewService::new(
            db_pool.clone(),
            view_repo,
            field_repo,
            settings_repo.clone(),
        );
        let activity_service =
            ActivityService::new(db_pool.clone(), activity_repo, lead_repo);
        let settings_service = SettingsService::new(db_pool.clone(), settings_repo);

        let jobtread = JobTreadClient::new(
            http,
            env::var("JOBTREAD_API_URL")
                .unwrap_or_else(|_| "https://api.jobtread.com/pave".to_string()),
            env::var("JOBTREAD_ORG_ID").unwrap_or_default(),
            env::var("JOBTREAD_GRANT_KEY").ok().filter(|key| !key.is_empty()),
            env::var("JOBTREAD_TIME_ZONE")
                .unwrap_or_else(|_| "America/New_York".to_string()),
        );

        Ok(Self {
            db_pool,
            lead_service,
            field_service,
            view_service,
            activity_service,
            handoff_service,
            settings_service,
            jobtread,
        })
    }
}
