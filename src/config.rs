use std::time::Duration;

/// Where score records and leads are read from.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// Direct Postgres access via sqlx.
    Postgres { database_url: String },
    /// PostgREST-style HTTP API of the hosted store.
    Rest { base_url: String, api_key: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store: StoreBackend,
    /// Shared secret expected in `X-Webhook-Token` on realtime notifications.
    pub realtime_webhook_secret: Option<String>,
    /// Idle time after which an organization's loaded state is evicted.
    pub snapshot_idle: Duration,
    /// Maximum number of organizations kept in memory.
    pub snapshot_max_orgs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DB_URL")
            .or_else(|| var("DATABASE_URL"))
            .map(|url| {
                if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                    anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                }
                Ok(url)
            })
            .transpose()?;

        let rest_url = var("STORE_REST_URL")
            .map(|url| {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("STORE_REST_URL must start with http:// or https://");
                }
                url::Url::parse(&url)
                    .map_err(|e| anyhow::anyhow!("STORE_REST_URL is not a valid URL: {}", e))?;
                Ok(url.trim_end_matches('/').to_string())
            })
            .transpose()?;

        let store = match (database_url, rest_url) {
            (Some(database_url), rest) => {
                if rest.is_some() {
                    tracing::warn!("Both DB_URL and STORE_REST_URL set, using Postgres");
                }
                StoreBackend::Postgres { database_url }
            }
            (None, Some(base_url)) => {
                let api_key = var("STORE_API_KEY").ok_or_else(|| {
                    anyhow::anyhow!("STORE_API_KEY environment variable required with STORE_REST_URL")
                })?;
                StoreBackend::Rest { base_url, api_key }
            }
            (None, None) => {
                anyhow::bail!("Either DB_URL/DATABASE_URL or STORE_REST_URL must be set")
            }
        };

        let port = var("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?;

        let snapshot_idle_secs: u64 = var("SNAPSHOT_IDLE_SECS")
            .unwrap_or_else(|| "1800".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("SNAPSHOT_IDLE_SECS must be a number of seconds"))?;

        let snapshot_max_orgs: u64 = var("SNAPSHOT_MAX_ORGS")
            .unwrap_or_else(|| "10000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("SNAPSHOT_MAX_ORGS must be a positive number"))?;
        if snapshot_max_orgs == 0 {
            anyhow::bail!("SNAPSHOT_MAX_ORGS must be a positive number");
        }

        let config = Self {
            port,
            store,
            realtime_webhook_secret: var("REALTIME_WEBHOOK_SECRET"),
            snapshot_idle: Duration::from_secs(snapshot_idle_secs),
            snapshot_max_orgs,
        };

        // Log successful configuration load (without sensitive values)
        match &config.store {
            StoreBackend::Postgres { database_url } => tracing::debug!(
                "Store: Postgres at {}",
                url::Url::parse(database_url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string))
                    .unwrap_or_else(|| "unknown host".to_string())
            ),
            StoreBackend::Rest { base_url, .. } => tracing::debug!("Store: REST {}", base_url),
        }
        if config.realtime_webhook_secret.is_none() {
            tracing::warn!("REALTIME_WEBHOOK_SECRET not set, realtime webhook is unauthenticated");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
