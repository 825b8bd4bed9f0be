use crate::{
    config::{Config, ResolutionMode},
    engine::{
        parse_body, run_execution, CommandRunner, ExecutableRegistry, ExecutionRequest,
        ExecutionResult, ProcessRunner,
    },
    error::ExecutionError,
    sinks::logging::LoggingEventSink,
};

use axum::debug_handler;
use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::Request,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::Span;

/* ---------------- state ---------------- */

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub registry: ExecutableRegistry,
    pub mode: ResolutionMode,
    pub runner: Arc<dyn CommandRunner>,
}

impl AppState {
    /// Production state: registry from config, real child processes.
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            registry: cfg.registry(),
            mode: cfg.mode,
            runner: Arc::new(ProcessRunner::new()),
        }
    }
}

/* ---------------- server ---------------- */

/// Build the router. Execute routes are only mounted for enabled modes.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/", get(index))
        .route("/health", get(health));

    if state.mode.allows_path() {
        app = app.route("/execute", post(execute_path));
    }

    if state.mode.allows_alias() {
        app = app.route("/execute/:alias", post(execute_alias));
    }

    app.with_state(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            })
            .on_response(|res: &Response, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = res.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "request completed"
                );
            }),
    )
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, state).await
}

/// Serve on an already-bound listener until Ctrl-C.
pub async fn serve_listener(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    tracing::info!(
        mode = ?state.mode,
        executables = state.registry.len(),
        "cmdgate listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/* ---------------- endpoints ---------------- */

async fn index() -> Json<Value> {
    Json(serde_json::json!({ "message": "C++ Executable API Server" }))
}

async fn health() -> &'static str {
    "ok"
}

#[debug_handler]
async fn execute_alias(
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
    body: Bytes,
) -> Result<ExecutionResult, ExecutionError> {
    let body = parse_body(&body)?;

    dispatch(&state, ExecutionRequest::for_alias(alias, body)).await
}

#[debug_handler]
async fn execute_path(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<ExecutionResult, ExecutionError> {
    let body = parse_body(&body)?;

    dispatch(&state, ExecutionRequest::for_path(body)).await
}

async fn dispatch(
    state: &AppState,
    request: ExecutionRequest,
) -> Result<ExecutionResult, ExecutionError> {
    let mut sink = LoggingEventSink;

    run_execution(&state.registry, state.runner.as_ref(), request, &mut sink).await
}
