//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, body limit, timeout, compression)
//! - Strip the base path and hand requests to the proxy engine
//! - Record per-request metrics
//! - Serve until the shutdown broadcast fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::engine::ProxyEngine;
use crate::error::{ProxyError, StartupError};
use crate::http::request::{extract_target, InboundRequest, UuidRequestId, X_REQUEST_ID};
use crate::observability::metrics;
use crate::routing::ProxyPrefix;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProxyEngine>,
    pub base_path: Arc<str>,
    pub public_url: Option<Arc<str>>,
    pub local_addr: SocketAddr,
    pub max_body_bytes: usize,
}

/// HTTP server for the rewriting proxy.
pub struct HttpServer {
    engine: Arc<ProxyEngine>,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server from a validated configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let engine = Arc::new(ProxyEngine::new(&config)?);
        Ok(Self { engine, config })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// `local_addr` is the listener address, used for the proxy prefix when a
    /// request carries no Host header.
    #[allow(deprecated)]
    pub fn router(&self, local_addr: SocketAddr) -> Router {
        let state = AppState {
            engine: self.engine.clone(),
            base_path: Arc::from(self.config.listener.base_path.trim_end_matches('/')),
            public_url: self.config.listener.public_url.as_deref().map(Arc::from),
            local_addr,
            max_body_bytes: self.config.upstream.max_body_bytes,
        };

        let mut router = Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(self.config.upstream.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.timeouts.request_secs,
            )));

        if self.config.listener.compress_responses {
            router = router.layer(CompressionLayer::new());
        }

        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            base_path = %self.config.listener.base_path,
            "HTTP server starting"
        );

        let app = self
            .router(addr)
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let Some(target) = extract_target(path_and_query, &state.base_path) else {
        tracing::debug!(request_id = %request_id, path = %path_and_query, "Outside base path");
        metrics::record_request(method.as_str(), 404, "none", start_time);
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };
    let target = target.to_string();

    tracing::debug!(
        request_id = %request_id,
        client = %client,
        method = %method,
        target = %target,
        "Proxying request"
    );

    let body = if matches!(method, Method::POST | Method::PUT) {
        match axum::body::to_bytes(body, state.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = ProxyError::RequestBody(e.to_string());
                tracing::info!(request_id = %request_id, error = %err, "Rejected request body");
                metrics::record_request(method.as_str(), err.status().as_u16(), "error", start_time);
                return err.into_response();
            }
        }
    } else {
        Bytes::new()
    };

    let prefix = ProxyPrefix::for_request(
        &parts.headers,
        state.public_url.as_deref(),
        &state.base_path,
        state.local_addr,
    );

    let inbound = InboundRequest {
        method: method.clone(),
        headers: parts.headers,
        body,
        target,
        prefix,
    };

    let (response, kind) = match state.engine.handle(inbound).await {
        Ok(rewritten) => {
            let kind = rewritten.kind.as_str();
            (rewritten.into_response(), kind)
        }
        Err(err) => {
            if err.status().is_server_error() {
                tracing::warn!(request_id = %request_id, error = %err, "Proxy request failed");
            } else {
                tracing::info!(request_id = %request_id, error = %err, "Proxy request refused");
            }
            (err.into_response(), "error")
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), kind, start_time);
    response
}
