//! HTTP gateway data source
//!
//! Posts `{company, query}` as JSON to a gateway that speaks the accounting
//! system's native protocol, and returns the gateway's JSON answer.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{Value, json};

use super::{DataQuery, DataSource};
use crate::error::{LedgerError, Result};

/// Data source reached through an HTTP gateway
pub struct HttpDataSource {
    client: Client,
    url: String,
    company: String,
    timeout: Duration,
}

impl std::fmt::Debug for HttpDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDataSource")
            .field("url", &self.url)
            .field("company", &self.company)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpDataSource {
    pub fn new(url: impl Into<String>, company: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            company: company.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify(&self, e: reqwest::Error) -> LedgerError {
        if e.is_timeout() {
            LedgerError::UpstreamTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if e.is_connect() {
            LedgerError::UpstreamUnavailable(format!("cannot connect to {}", self.url))
        } else if e.is_decode() {
            LedgerError::UpstreamUnavailable(format!("malformed response: {}", e))
        } else {
            LedgerError::UpstreamUnavailable(e.to_string())
        }
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn query(&self, query: &DataQuery) -> Result<Value> {
        debug!("Querying {} for {}", self.url, query);
        let body = json!({"company": self.company, "query": query});

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::UpstreamUnavailable(format!("gateway returned {}", status)));
        }

        let value: Value = response.json().await.map_err(|e| self.classify(e))?;

        // The gateway reports accounting-side failures in-band
        if let Some(err) = value.get("error") {
            let message = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
            return Err(LedgerError::UpstreamUnavailable(message));
        }

        Ok(value)
    }
}
