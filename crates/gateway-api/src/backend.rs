//! # Backend Client
//!
//! Outbound calls to the fronted services. Every call makes exactly one
//! attempt under an explicit timeout and always yields a classified
//! `BackendResponse`; transport problems never escape as errors.

use async_trait::async_trait;
use gateway_domain::{BackendResponse, HttpMethod, Payload, Route, TransportFailure};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Seam between the orchestrator and the fronted services
#[async_trait]
pub trait Backend: Send + Sync {
    /// Call the backend endpoint of `route`, sending `payload` as the JSON body
    async fn call(&self, route: &Route, payload: Option<&Payload>) -> BackendResponse;
}

/// reqwest-based backend client
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpBackendClient {
    /// Create a client whose calls give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Backend for HttpBackendClient {
    async fn call(&self, route: &Route, payload: Option<&Payload>) -> BackendResponse {
        let url = route.url();
        let request = match route.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => match payload {
                Some(payload) => self.client.post(&url).json(payload),
                None => self.client.post(&url),
            },
        };

        let started = Instant::now();
        let result = async {
            let response = request.timeout(self.timeout).send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        }
        .await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let response = match result {
            Ok((status, body)) => classify(status, body),
            Err(e) => BackendResponse::Unreachable {
                failure: transport_failure(&e),
                detail: e.to_string(),
            },
        };

        match &response {
            BackendResponse::Success { status, .. } => tracing::info!(
                route = %route.name,
                backend = %route.backend,
                status,
                elapsed_ms,
                "Backend call succeeded"
            ),
            BackendResponse::Rejected { status, .. } => tracing::warn!(
                route = %route.name,
                backend = %route.backend,
                status,
                elapsed_ms,
                "Backend rejected request"
            ),
            BackendResponse::Unreachable { failure, detail } => tracing::error!(
                route = %route.name,
                backend = %route.backend,
                url = %url,
                %failure,
                error = %detail,
                elapsed_ms,
                "Backend unreachable"
            ),
        }

        response
    }
}

/// Classify a completed exchange
///
/// A 2xx with an empty body (`204`, bare `200`) is a success carrying `null`;
/// a non-empty 2xx body must be JSON.
fn classify(status: u16, body: String) -> BackendResponse {
    if !(200..300).contains(&status) {
        return BackendResponse::Rejected { status, body };
    }
    if body.trim().is_empty() {
        return BackendResponse::Success {
            status,
            body: Value::Null,
        };
    }

    match serde_json::from_str::<Value>(&body) {
        Ok(body) => BackendResponse::Success { status, body },
        Err(e) => BackendResponse::Unreachable {
            failure: TransportFailure::Malformed,
            detail: format!("invalid JSON in {status} response: {e}"),
        },
    }
}

fn transport_failure(err: &reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout
    } else if err.is_connect() {
        TransportFailure::Connect
    } else if err.is_decode() || err.is_body() {
        TransportFailure::Malformed
    } else {
        TransportFailure::Transport
    }
}
