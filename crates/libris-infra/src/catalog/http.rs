//! HTTP client for the upstream catalog summaries endpoint.
//!
//! `GET {base_url}{endpoint}?ultimostamp=..&ultimoId=..&cantidad=..` returns a
//! JSON array of records changed after the watermark.

use std::time::Duration;

use libris_core::catalog::CatalogSource;
use libris_types::config::CatalogConfig;
use libris_types::error::FetchError;
use libris_types::record::Record;
use libris_types::sync::SyncCursor;

/// Watermark timestamp format expected by the catalog.
const STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct HttpCatalogClient {
    client: reqwest::Client,
    url: String,
    page_size: i64,
}

impl HttpCatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| FetchError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                config.endpoint.trim_start_matches('/')
            ),
            page_size: config.page_size,
        })
    }
}

impl CatalogSource for HttpCatalogClient {
    async fn fetch_since(&self, cursor: &SyncCursor) -> Result<Vec<Record>, FetchError> {
        let stamp = cursor.last_stamp.format(STAMP_FORMAT).to_string();
        let last_id = cursor.last_id.to_string();
        let page_size = self.page_size.to_string();

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("ultimostamp", stamp.as_str()),
                ("ultimoId", last_id.as_str()),
                ("cantidad", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        let records: Vec<Record> =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        tracing::debug!(count = records.len(), url = %self.url, "catalog returned records");
        Ok(records)
    }
}
