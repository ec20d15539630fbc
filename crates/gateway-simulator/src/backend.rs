//! In-process HTTP server impersonating the four backend services.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use gateway_domain::{HttpMethod, Route, RouteName};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::generators;

/// How one simulated endpoint answers
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Generated success body (see `generators`)
    Generated,
    /// Fixed status and JSON body
    Json { status: u16, body: Value },
    /// Fixed status and raw text body
    Raw { status: u16, body: String },
    /// `307 Temporary Redirect` to `location`
    Redirect { location: String },
}

/// Reply plus artificial latency
#[derive(Debug, Clone, PartialEq)]
pub struct Behavior {
    pub reply: Reply,
    pub latency: Duration,
}

impl Behavior {
    #[must_use]
    pub const fn generated() -> Self {
        Self {
            reply: Reply::Generated,
            latency: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    #[must_use]
    pub const fn json(status: u16, body: Value) -> Self {
        Self {
            reply: Reply::Json { status, body },
            latency: Duration::ZERO,
        }
    }

    pub fn raw(status: u16, body: impl Into<String>) -> Self {
        Self {
            reply: Reply::Raw {
                status,
                body: body.into(),
            },
            latency: Duration::ZERO,
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            reply: Reply::Redirect {
                location: location.into(),
            },
            latency: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Self::generated()
    }
}

#[derive(Debug, Default)]
struct EndpointState {
    behavior: Behavior,
    last_payload: Option<Value>,
}

/// Simulated backend services with per-endpoint behavior and call counters
#[derive(Debug)]
pub struct SimulatedBackend {
    endpoints: RwLock<HashMap<RouteName, EndpointState>>,
    calls: [AtomicUsize; 4],
}

impl SimulatedBackend {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            endpoints: RwLock::new(HashMap::new()),
            calls: Default::default(),
        })
    }

    /// Replace the behavior of one endpoint
    pub fn set_behavior(&self, route: RouteName, behavior: Behavior) {
        let mut endpoints = self
            .endpoints
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        endpoints.entry(route).or_default().behavior = behavior;
    }

    /// Number of requests the endpoint has received
    #[must_use]
    pub fn calls(&self, route: RouteName) -> usize {
        self.calls[slot(route)].load(Ordering::SeqCst)
    }

    /// Body of the most recent request, `Null` when it carried none
    #[must_use]
    pub fn last_payload(&self, route: RouteName) -> Option<Value> {
        self.endpoints
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&route)
            .and_then(|state| state.last_payload.clone())
    }

    /// Router exposing every backend endpoint at its standard path
    pub fn router(self: &Arc<Self>) -> Router {
        RouteName::ALL
            .into_iter()
            .fold(Router::new(), |router, name| {
                let route = Route::standard(name, "");
                let handler = move |State(backend): State<Arc<Self>>, body: Bytes| async move {
                    backend.handle(name, &body).await
                };
                let method_router = match route.method {
                    HttpMethod::Get => get(handler),
                    HttpMethod::Post => post(handler),
                };
                router.route(route.path, method_router)
            })
            .with_state(self.clone())
    }

    /// Serve on `addr` (port 0 picks a free port) in a background task
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn spawn(self: &Arc<Self>, addr: SocketAddr) -> std::io::Result<SimulatorHandle> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let app = self.router();

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Simulated backend stopped");
            }
        });

        tracing::info!(%addr, "Simulated backend listening");
        Ok(SimulatorHandle {
            addr,
            task: Some(task),
        })
    }

    async fn handle(&self, route: RouteName, body: &[u8]) -> Response {
        self.calls[slot(route)].fetch_add(1, Ordering::SeqCst);
        let payload: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

        let behavior = {
            let mut endpoints = self
                .endpoints
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let state = endpoints.entry(route).or_default();
            state.last_payload = Some(payload.clone());
            state.behavior.clone()
        };

        tracing::debug!(%route, latency = ?behavior.latency, "Simulated request");
        if !behavior.latency.is_zero() {
            tokio::time::sleep(behavior.latency).await;
        }

        match behavior.reply {
            Reply::Generated => axum::Json(generators::generate(route, &payload)).into_response(),
            Reply::Json { status, body } => (status_code(status), axum::Json(body)).into_response(),
            Reply::Raw { status, body } => (
                status_code(status),
                [(header::CONTENT_TYPE, "text/plain")],
                body,
            )
                .into_response(),
            Reply::Redirect { location } => (
                StatusCode::TEMPORARY_REDIRECT,
                [(header::LOCATION, location)],
            )
                .into_response(),
        }
    }
}

const fn slot(route: RouteName) -> usize {
    match route {
        RouteName::Preprocess => 0,
        RouteName::Train => 1,
        RouteName::Predict => 2,
        RouteName::Experiments => 3,
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Running simulator; the server stops when the handle is dropped
#[derive(Debug)]
pub struct SimulatorHandle {
    pub addr: SocketAddr,
    task: Option<JoinHandle<()>>,
}

impl SimulatorHandle {
    /// Base URL usable as a backend address
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait for the server task (runs until the process exits)
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
