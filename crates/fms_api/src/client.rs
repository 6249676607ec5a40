use anyhow::{Context, Result};
use fms_core::ApiConfig;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Envelope keys list endpoints are known to wrap their rows in.
const ROW_KEYS: [&str; 3] = ["data", "results", "items"];

/// Client for the FMS list endpoints (`/fms/api/v0/<resource>`).
pub struct FmsClient {
    base_url: String,
    client: Client,
}

impl FmsClient {
    /// Build a client from the API section of the application config.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .with_context(|| format!("invalid FMS base URL: {base_url}"))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { base_url, client })
    }

    /// Return the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a resource name such as `companies` or `sales/invoices`.
    pub fn endpoint(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource.trim_matches('/'))
    }

    /// Fetch every row of a list resource.
    pub async fn list(&self, resource: &str) -> Result<Vec<Value>> {
        let url = self.endpoint(resource);
        debug!(url = %url, "listing FMS resource");
        let body = self.get(&url).await?;
        extract_rows(body).with_context(|| format!("unexpected response shape from {url}"))
    }

    async fn get(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("FMS GET request failed")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("failed to read FMS response body")?;

        if !status.is_success() {
            anyhow::bail!("FMS API error ({status}): {text}");
        }

        serde_json::from_str(&text).context("failed to parse FMS response as JSON")
    }
}

/// Pull the row array out of a list response.
///
/// Accepts a bare array or an object wrapping one under `data`, `results`
/// or `items`.
pub fn extract_rows(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut map) => {
            for key in ROW_KEYS {
                if let Some(Value::Array(rows)) = map.remove(key) {
                    return Ok(rows);
                }
            }
            anyhow::bail!("no row array under any of {ROW_KEYS:?}")
        }
        other => anyhow::bail!("expected a JSON array or object, got {other}"),
    }
}
