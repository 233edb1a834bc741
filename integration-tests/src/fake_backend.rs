use std::collections::HashMap;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const LIST_USERS_SEGMENT: &str = "list-users";

/// A canned HTTP response.
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Canned {
    /// 200 with `value` as the JSON body.
    pub fn json(value: Value) -> Self {
        Self::raw(200, &value.to_string())
    }

    /// Arbitrary status and body text, sent as `application/json`.
    pub fn raw(status: u16, body: &str) -> Self {
        Canned {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Hold the response back for `delay` before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Routes for a [`FakeBackend`], keyed by the last path segment.
#[derive(Debug, Default)]
pub struct FakeBackendBuilder {
    routes: HashMap<String, Canned>,
}

impl FakeBackendBuilder {
    pub fn list_users(mut self, canned: Canned) -> Self {
        self.routes.insert(LIST_USERS_SEGMENT.to_string(), canned);
        self
    }

    /// Response for `/api/v2/datapipeline/{id}`, with `id` as decoded by the server.
    pub fn user(mut self, id: &str, canned: Canned) -> Self {
        self.routes.insert(id.to_string(), canned);
        self
    }

    /// Bind to an ephemeral local port and start serving.
    pub async fn start(self) -> FakeBackend {
        let app = Router::new()
            .route("/api/v2/datapipeline/:segment", get(respond))
            .with_state(Arc::new(self.routes));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        tokio::spawn(server.into_future());

        FakeBackend {
            addr,
            shutdown: Some(shutdown_tx),
        }
    }
}

/// A running fake API; stops serving when dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl FakeBackend {
    pub fn builder() -> FakeBackendBuilder {
        FakeBackendBuilder::default()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn respond(
    State(routes): State<Arc<HashMap<String, Canned>>>,
    Path(segment): Path<String>,
) -> Response {
    let Some(canned) = routes.get(&segment) else {
        return (StatusCode::NOT_FOUND, r#"{"detail":"Not Found"}"#).into_response();
    };

    if !canned.delay.is_zero() {
        tokio::time::sleep(canned.delay).await;
    }

    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body.clone(),
    )
        .into_response()
}

/// Base URL of a local port nothing is listening on.
pub fn refused_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}
