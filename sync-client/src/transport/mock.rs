//! Mock transport for testing.
//!
//! Holds an in-memory copy of server records keyed by URL, applies submitted
//! mutations to it, and captures every request for verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use sync_types::{Method, Record};

/// A request captured by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedRequest {
    /// Method replayed.
    pub method: Method,
    /// Target URL.
    pub url: String,
    /// Headers sent.
    pub headers: BTreeMap<String, String>,
    /// Body sent (absent for deletes).
    pub body: Option<Record>,
}

/// Mock transport for testing.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    records: HashMap<String, Record>,
    fetched: Vec<String>,
    submitted: Vec<SubmittedRequest>,
    fail_next_fetch: Option<TransportError>,
    fail_next_submit: Option<TransportError>,
    failing_urls: HashMap<String, TransportError>,
    latency: Option<Duration>,
}

impl MockTransport {
    /// Create a new mock transport with no server records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server's copy of the resource at `url`.
    pub fn set_record(&self, url: &str, record: Record) {
        self.lock().records.insert(url.to_string(), record);
    }

    /// Delete the server's copy of the resource at `url`.
    pub fn remove_record(&self, url: &str) {
        self.lock().records.remove(url);
    }

    /// The server's copy of the resource at `url`.
    pub fn record(&self, url: &str) -> Option<Record> {
        self.lock().records.get(url).cloned()
    }

    /// URLs fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.lock().fetched.clone()
    }

    /// Requests submitted so far, in order.
    pub fn submitted(&self) -> Vec<SubmittedRequest> {
        self.lock().submitted.clone()
    }

    /// Cause the next fetch_current() to fail with the given error.
    pub fn fail_next_fetch(&self, error: TransportError) {
        self.lock().fail_next_fetch = Some(error);
    }

    /// Cause the next submit() to fail with the given error.
    pub fn fail_next_submit(&self, error: TransportError) {
        self.lock().fail_next_submit = Some(error);
    }

    /// Cause every request to `url` to fail until cleared.
    pub fn fail_url(&self, url: &str, error: TransportError) {
        self.lock().failing_urls.insert(url.to_string(), error);
    }

    /// Let requests to `url` succeed again.
    pub fn heal_url(&self, url: &str) {
        self.lock().failing_urls.remove(url);
    }

    /// Delay every request by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    /// Clear all state (records, captured requests, failures).
    pub fn reset(&self) {
        *self.lock() = MockTransportInner::default();
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch_current(
        &self,
        _resource_id: &str,
        url: &str,
        _headers: &BTreeMap<String, String>,
    ) -> Result<Option<Record>, TransportError> {
        self.simulate_latency().await;
        let mut inner = self.lock();
        inner.fetched.push(url.to_string());

        // Check for forced failure
        if let Some(error) = inner.fail_next_fetch.take() {
            return Err(error);
        }
        if let Some(error) = inner.failing_urls.get(url) {
            return Err(error.clone());
        }

        Ok(inner.records.get(url).cloned())
    }

    async fn submit(
        &self,
        method: Method,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: Option<&Record>,
    ) -> Result<(), TransportError> {
        self.simulate_latency().await;
        let mut inner = self.lock();

        // Check for forced failure
        if let Some(error) = inner.fail_next_submit.take() {
            return Err(error);
        }
        if let Some(error) = inner.failing_urls.get(url) {
            return Err(error.clone());
        }

        let missing = TransportError::NotFound { status: 404 };
        match method {
            Method::Create => {}
            Method::Update => {
                let record = inner.records.get_mut(url).ok_or(missing)?;
                for (field, value) in body.into_iter().flat_map(|b| b.iter()) {
                    record.insert(field, value.clone());
                }
            }
            Method::Replace => {
                let record = inner.records.get_mut(url).ok_or(missing)?;
                *record = body.cloned().unwrap_or_default();
            }
            Method::Delete => {
                inner.records.remove(url).ok_or(missing)?;
            }
        }

        inner.submitted.push(SubmittedRequest {
            method,
            url: url.to_string(),
            headers: headers.clone(),
            body: body.cloned(),
        });
        Ok(())
    }
}
