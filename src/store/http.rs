//! `reqwest`-backed adapter for the orchestrator's REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::MessageStore;
use super::types::{
    Message, ReviewRequest, ReviewResponse, RunStatus, StartTransformRequest,
    StartTransformResponse,
};
use crate::errors::TransportError;

/// Talks to the orchestrator over HTTP.
///
/// Every endpoint path is resolved against `base_url` (for example
/// `http://localhost:7071/api`). Timeouts are enforced by the underlying client.
#[derive(Debug, Clone)]
pub struct HttpMessageStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMessageStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| TransportError::Request {
                endpoint: base_url.to_string(),
                source,
            })?;
        Ok(Self::with_client(client, base_url))
    }

    /// Build a store around an existing client (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        debug!(endpoint = path, "GET");
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|source| TransportError::Request {
                endpoint: path.to_string(),
                source,
            })?;
        read_json(path, resp).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        debug!(endpoint = path, "POST");
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                endpoint: path.to_string(),
                source,
            })?;
        read_json(path, resp).await
    }
}

/// Map a response to `T`, treating non-2xx and shape mismatches as transport failures.
async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, TransportError> {
    let status = resp.status();
    let body = resp.text().await.map_err(|source| TransportError::Request {
        endpoint: endpoint.to_string(),
        source,
    })?;

    if !status.is_success() {
        return Err(TransportError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| TransportError::Body {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl MessageStore for HttpMessageStore {
    async fn start_transform(
        &self,
        request: &StartTransformRequest,
    ) -> Result<StartTransformResponse, TransportError> {
        self.post_json("/transform", request).await
    }

    async fn status(&self, instance_id: &str) -> Result<RunStatus, TransportError> {
        self.get_json(&format!("/transform/{}/status", instance_id))
            .await
    }

    async fn messages(&self, instance_id: &str) -> Result<Vec<Message>, TransportError> {
        self.get_json(&format!("/transform/{}/messages", instance_id))
            .await
    }

    async fn submit_review(
        &self,
        instance_id: &str,
        request: &ReviewRequest,
    ) -> Result<ReviewResponse, TransportError> {
        self.post_json(&format!("/transform/{}/review", instance_id), request)
            .await
    }
}
