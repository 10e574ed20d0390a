use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::analyzer::ThreatBreakdown;
use crate::config::MlConfig;

#[derive(Debug, Serialize)]
struct MlRequest<'a> {
    url: &'a str,
    domain: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Wire response from the inference endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlResponse {
    pub risk_score: f64,
    pub threats: ThreatBreakdown,
    pub confidence: f64,
    #[serde(default)]
    pub source: Option<String>,
    pub model_version: String,
    #[serde(rename = "processingTime")]
    pub processing_time_ms: u64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Client for the external phishing classifier. Every failure mode
/// (refused connection, non-2xx, malformed body, timeout) surfaces as an
/// error so the caller can fall back to rule-based scoring.
pub struct MlClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl MlClient {
    pub fn new(config: &MlConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("phishguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build ML inference client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn classify(&self, url: &str, domain: &str) -> Result<MlResponse> {
        let request = MlRequest {
            url,
            domain,
            metadata: None,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("ML request to {} failed", self.endpoint))?
            .error_for_status()
            .context("ML service returned an error status")?;

        let parsed: MlResponse = response
            .json()
            .await
            .context("Malformed ML response payload")?;

        log::debug!(
            "ML classification for {domain}: risk {:.2} (model {}, {} ms)",
            parsed.risk_score,
            parsed.model_version,
            parsed.processing_time_ms
        );

        Ok(parsed)
    }
}
