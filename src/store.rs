use crate::config::{Config, StoreBackend};
use crate::db::Database;
use crate::errors::{AppError, ResultExt};
use crate::models::OrgId;
use crate::rest_client::RestRecordStore;
use serde_json::Value;
use sqlx::PgPool;

const SCORE_RECORDS_SQL: &str = r#"
    SELECT to_jsonb(s) || jsonb_build_object(
        'lead', jsonb_build_object('name', l.name, 'company', l.company, 'email', l.email)
    )
    FROM lead_scores s
    LEFT JOIN leads l ON l.id = s.lead_id AND l.org_id = s.org_id
    WHERE s.org_id = $1
    ORDER BY s.generated_at DESC NULLS LAST
"#;

const LEADS_SQL: &str = r#"
    SELECT to_jsonb(l)
    FROM leads l
    WHERE l.org_id = $1
"#;

/// Score records and leads read directly from Postgres.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn fetch_score_records(&self, org: OrgId) -> Result<Vec<Value>, AppError> {
        sqlx::query_scalar::<_, Value>(SCORE_RECORDS_SQL)
            .bind(org.0)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch score records for org {}", org))
    }

    pub async fn fetch_leads(&self, org: OrgId) -> Result<Vec<Value>, AppError> {
        sqlx::query_scalar::<_, Value>(LEADS_SQL)
            .bind(org.0)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch leads for org {}", org))
    }
}

/// The configured store backend.
#[derive(Clone)]
pub enum RecordStore {
    Postgres(PgRecordStore),
    Rest(RestRecordStore),
}

impl RecordStore {
    /// Opens the backend selected by the configuration.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        match &config.store {
            StoreBackend::Postgres { database_url } => {
                let db = Database::new(database_url).await?;
                tracing::info!("Record store: Postgres");
                Ok(RecordStore::Postgres(PgRecordStore::new(db.pool)))
            }
            StoreBackend::Rest { base_url, api_key } => {
                let client = RestRecordStore::new(base_url.clone(), api_key.clone())
                    .map_err(|e| anyhow::anyhow!("{}", e))?;
                tracing::info!("Record store: REST {}", base_url);
                Ok(RecordStore::Rest(client))
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            RecordStore::Postgres(_) => "postgres",
            RecordStore::Rest(_) => "rest",
        }
    }

    /// All score records of `org`, newest first.
    pub async fn fetch_score_records(&self, org: OrgId) -> Result<Vec<Value>, AppError> {
        match self {
            RecordStore::Postgres(store) => store.fetch_score_records(org).await,
            RecordStore::Rest(store) => store.fetch_score_records(org).await,
        }
    }

    /// All leads of `org`.
    pub async fn fetch_leads(&self, org: OrgId) -> Result<Vec<Value>, AppError> {
        match self {
            RecordStore::Postgres(store) => store.fetch_leads(org).await,
            RecordStore::Rest(store) => store.fetch_leads(org).await,
        }
    }
}
