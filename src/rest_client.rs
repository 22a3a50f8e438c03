use crate::errors::AppError;
use crate::models::OrgId;
use reqwest;
use serde_json::Value;
use std::time::Duration;
use tracing;
use url::Url;

/// Client for the hosted store's PostgREST-style HTTP API.
///
/// Only ever issues the two list reads; every request carries the
/// organization filter.
#[derive(Clone)]
pub struct RestRecordStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestRecordStore {
    /// Creates a new `RestRecordStore`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the store, without the `/rest/v1` suffix.
    /// * `api_key` - The API key, sent both as `apikey` and as bearer token.
    pub fn new(base_url: String, api_key: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create store client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Fetches all score records of an organization, newest first.
    ///
    /// # Arguments
    ///
    /// * `org` - The organization to read.
    ///
    /// # Returns
    ///
    /// * `Result<Vec<Value>, AppError>` - Raw rows, with the lead embedded under `lead`.
    pub async fn fetch_score_records(&self, org: OrgId) -> Result<Vec<Value>, AppError> {
        let org_filter = format!("eq.{}", org);
        self.list(
            "lead_scores",
            &[
                ("org_id", org_filter.as_str()),
                ("order", "generated_at.desc"),
                ("select", "*,lead:leads(name,company,email)"),
            ],
        )
        .await
    }

    /// Fetches all leads of an organization.
    ///
    /// # Arguments
    ///
    /// * `org` - The organization to read.
    ///
    /// # Returns
    ///
    /// * `Result<Vec<Value>, AppError>` - Raw lead rows.
    pub async fn fetch_leads(&self, org: OrgId) -> Result<Vec<Value>, AppError> {
        let org_filter = format!("eq.{}", org);
        self.list("leads", &[("org_id", org_filter.as_str())]).await
    }

    async fn list(&self, table: &str, params: &[(&str, &str)]) -> Result<Vec<Value>, AppError> {
        let url = Url::parse_with_params(&format!("{}/rest/v1/{}", self.base_url, table), params)
            .map_err(|e| AppError::InternalError(format!("Invalid store URL: {}", e)))?;
        tracing::debug!("Fetching {} from store", table);

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Store request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Store returned {} for {}: {}",
                status, table, error_text
            )));
        }

        let data: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse {} response: {}", table, e))
        })?;

        match data {
            Value::Array(rows) => {
                tracing::debug!("Store returned {} {} row(s)", rows.len(), table);
                Ok(rows)
            }
            other => Err(AppError::ExternalApiError(format!(
                "Expected an array of {} rows, got {}",
                table,
                kind_of(&other)
            ))),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
