//! HTTP transport over reqwest.
//!
//! Methods map to verbs as CREATE→POST, UPDATE→PATCH, REPLACE→PUT,
//! DELETE→DELETE. Bodies are sent and read as JSON objects.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use sync_types::{Method, Record};
use tracing::debug;

/// Longest response body kept in an error.
const MAX_ERROR_BODY: usize = 512;

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Prefix for relative target URLs.
    pub base_url: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Transport that talks to the server over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpTransport {
    /// Build a transport from configuration.
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    /// Absolute URL for a target.
    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        match &self.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ),
            None => url.to_string(),
        }
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> reqwest::RequestBuilder {
        headers
            .iter()
            .fold(self.client.request(method, self.resolve(url)), |req, (name, value)| {
                req.header(name.as_str(), value.as_str())
            })
    }
}

fn verb(method: Method) -> reqwest::Method {
    match method {
        Method::Create => reqwest::Method::POST,
        Method::Update => reqwest::Method::PATCH,
        Method::Replace => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_decode() {
        TransportError::InvalidResponse(e.to_string())
    } else {
        TransportError::Connection(e.to_string())
    }
}

async fn error_from_response(response: reqwest::Response) -> TransportError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        body.truncate(cut);
    }
    TransportError::from_status(status, body)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_current(
        &self,
        resource_id: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<Option<Record>, TransportError> {
        let response = self
            .request(reqwest::Method::GET, url, headers)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        debug!(resource_id, status = status.as_u16(), "fetched server state");

        if !status.is_success() {
            let error = error_from_response(response).await;
            return if error.is_not_found() { Ok(None) } else { Err(error) };
        }

        let json: serde_json::Value = response.json().await.map_err(map_reqwest_error)?;
        Record::from_json(json)
            .map(Some)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }

    async fn submit(
        &self,
        method: Method,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: Option<&Record>,
    ) -> Result<(), TransportError> {
        let mut request = self.request(verb(method), url, headers);
        if let Some(body) = body {
            request = request.json(&body.to_json());
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        debug!(%method, status = status.as_u16(), "submitted request");

        if status.is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}
