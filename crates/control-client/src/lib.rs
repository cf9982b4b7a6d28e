// SPDX-License-Identifier: MIT

//! Control-Plane Client (spec.md §4.3): an HTTP client with per-request
//! cancellation, bearer authentication, and a cached entity tag for the
//! desired-state endpoint.

use nodeagent_core::{DesiredState, DriftEvent, NodeHealth};
use nodeagent_wire::DriftEventsReport;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Overrides the configured bearer token, per spec.md §6.
const TOKEN_ENV_VAR: &str = "CORE_API_TOKEN";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("control plane returned {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

pub struct ControlClient {
    http: Client,
    base_url: String,
    token: String,
    cached_etag: Mutex<Option<String>>,
}

impl ControlClient {
    #[allow(clippy::expect_used)]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let token = std::env::var(TOKEN_ENV_VAR).unwrap_or_else(|_| token.into());
        Self {
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("building the control-plane http client"),
            base_url: base_url.into(),
            token,
            cached_etag: Mutex::new(None),
        }
    }

    /// Returns `(Some(state), None)` on 200 (and updates the cached tag);
    /// `(None, None)` on 304 (caller must reuse the last known state); and
    /// `(None, Some(error))` on any other outcome.
    pub async fn get_desired_state(&self, node_id: &str) -> (Option<DesiredState>, Option<ClientError>) {
        let url = format!("{}/internal/v1/nodes/{node_id}/desired-state", self.base_url);
        let mut request = self.http.get(&url).bearer_auth(&self.token);
        if let Some(etag) = self.cached_etag.lock().clone() {
            request = request.header(reqwest::header::IF_NONE_MATCH, etag);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return (None, Some(e.into())),
        };

        match response.status() {
            StatusCode::OK => {
                let etag = response
                    .headers()
                    .get(reqwest::header::ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let body = match response.json::<DesiredState>().await {
                    Ok(body) => body,
                    Err(e) => return (None, Some(e.into())),
                };
                if let Some(etag) = etag {
                    *self.cached_etag.lock() = Some(etag);
                }
                (Some(body), None)
            }
            StatusCode::NOT_MODIFIED => (None, None),
            status => {
                let body = response.text().await.unwrap_or_default();
                (None, Some(ClientError::Rejected { status, body }))
            }
        }
    }

    pub async fn report_health(&self, node_id: &str, health: &NodeHealth) -> Result<(), ClientError> {
        let url = format!("{}/internal/v1/nodes/{node_id}/health", self.base_url);
        self.post_json(&url, health).await
    }

    pub async fn report_drift_events(&self, node_id: &str, events: Vec<DriftEvent>) -> Result<(), ClientError> {
        if events.is_empty() {
            return Ok(());
        }
        let url = format!("{}/internal/v1/nodes/{node_id}/drift-events", self.base_url);
        self.post_json(&url, &DriftEventsReport::new(events)).await
    }

    async fn post_json(&self, url: &str, body: &impl serde::Serialize) -> Result<(), ClientError> {
        let response = self.http.post(url).bearer_auth(&self.token).json(body).send().await?;

        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(url, %status, "control-plane rejected report");
        Err(ClientError::Rejected { status, body })
    }

    #[cfg(test)]
    fn token(&self) -> &str {
        &self.token
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
