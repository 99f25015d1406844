//! Gateway service: two-phase construction and the HTTP entry point.
//!
//! [`GatewayBuilder`] collects configuration, handlers and log sinks.
//! [`GatewayBuilder::build`] freezes them into a [`Gateway`], which only
//! serves requests.

use crate::domain::config::GatewayConfig;
use crate::domain::error::{DispatchError, GatewayError};
use crate::domain::pending::{cleanup_task, PendingRequestStore};
use crate::domain::registry::MethodRegistry;
use crate::ipc::{Dispatcher, ResponseListener};
use crate::middleware::{GatewayMetrics, RequestTimer, TracingLayer};
use crate::routes::RouteTable;
use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use gateway_telemetry::{init_logging, LogLevel, LogSink, TelemetryError};
use serde_json::Value;
use shared_bus::InMemoryEventBus;
use shared_types::{ReplyEnvelope, RequestEnvelope, ServiceDefinition};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Phase one: mutable registration of handlers and sinks.
pub struct GatewayBuilder {
    config: GatewayConfig,
    definition: ServiceDefinition,
    registry: MethodRegistry,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig, definition: ServiceDefinition) -> Self {
        Self {
            config,
            definition,
            registry: MethodRegistry::new(),
        }
    }

    /// Register a handler by bare method name.
    ///
    /// Every declared method with this name resolves to it; registering the
    /// same name again replaces the earlier handler.
    pub fn register_handler<F>(&mut self, name: &str, handler: F) -> Result<&mut Self, GatewayError>
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        if self.registry.register(name, handler)? {
            warn!(method = name, "Handler replaced by later registration");
        }
        Ok(self)
    }

    /// Register a handler for one service's method only.
    pub fn register_service_handler<F>(
        &mut self,
        service: &str,
        method: &str,
        handler: F,
    ) -> Result<&mut Self, GatewayError>
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        if self.registry.register_qualified(service, method, handler)? {
            warn!(
                service = service,
                method = method,
                "Handler replaced by later registration"
            );
        }
        Ok(self)
    }

    pub fn add_console_logger(&mut self, level: LogLevel) -> &mut Self {
        self.config.logging.sinks.push(LogSink::Console { level });
        self
    }

    /// POST each JSON log line to `http://{host}:{port}/`.
    pub fn add_http_logger(
        &mut self,
        host: impl Into<String>,
        port: u16,
        level: LogLevel,
    ) -> &mut Self {
        self.config.logging.sinks.push(LogSink::Http {
            host: host.into(),
            port,
            level,
        });
        self
    }

    /// Append JSON log lines to `path`.
    pub fn add_file_logger(&mut self, path: impl Into<PathBuf>, level: LogLevel) -> &mut Self {
        self.config.logging.sinks.push(LogSink::File {
            path: path.into(),
            level,
        });
        self
    }

    /// Validate everything and subscribe the routes.
    pub fn build(self) -> Result<Gateway, GatewayError> {
        self.config.validate()?;

        let bus = Arc::new(InMemoryEventBus::new());
        let routes = Arc::new(RouteTable::build(&self.definition, &self.registry, &bus)?);

        let pending = Arc::new(PendingRequestStore::new(self.config.timeouts.reply));
        let listener = Arc::new(ResponseListener::attach(&bus, Arc::clone(&pending)));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&bus),
            Arc::clone(&pending),
            self.config.timeouts.reply,
        ));

        info!(
            routes = routes.len(),
            handlers = self.registry.len(),
            endpoint = %self.config.http.endpoint,
            "Gateway built"
        );

        Ok(Gateway {
            config: self.config,
            bus,
            routes,
            listener,
            dispatcher,
            pending,
            metrics: Arc::new(GatewayMetrics::new()),
        })
    }
}

/// Phase two: an immutable, running gateway.
pub struct Gateway {
    config: GatewayConfig,
    bus: Arc<InMemoryEventBus>,
    routes: Arc<RouteTable>,
    listener: Arc<ResponseListener>,
    dispatcher: Arc<Dispatcher>,
    pending: Arc<PendingRequestStore>,
    metrics: Arc<GatewayMetrics>,
}

impl Gateway {
    /// Router serving the configured endpoint.
    pub fn router(&self) -> Router {
        let state = AppState {
            dispatcher: Arc::clone(&self.dispatcher),
            metrics: Arc::clone(&self.metrics),
            max_request_size: self.config.limits.max_request_size,
            _routes: Arc::clone(&self.routes),
            _listener: Arc::clone(&self.listener),
        };

        Router::new()
            .route(&self.config.http.endpoint, any(handle_envelope))
            .fallback(reject)
            .layer(TracingLayer::new())
            .with_state(state)
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cleanup = tokio::spawn(cleanup_task(
            Arc::clone(&self.pending),
            self.config.timeouts.cleanup_interval,
        ));

        if let Ok(addr) = listener.local_addr() {
            info!(addr = %addr, endpoint = %self.config.http.endpoint, "Gateway listening");
        }

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(GatewayError::Serve);

        cleanup.abort();
        info!("Gateway stopped");
        result
    }

    /// Install the configured log sinks, bind `config.http` and serve.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.config.logging.has_sinks() {
            match init_logging(&self.config.logging) {
                Ok(()) => {}
                Err(TelemetryError::AlreadyInitialized(reason)) => {
                    warn!(reason = %reason, "Logging already installed, keeping it");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let listener = TcpListener::bind(self.config.http_addr())
            .await
            .map_err(GatewayError::Bind)?;
        self.serve(listener, shutdown).await
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The bus shared by the connection handler and the routes.
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Connections currently waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<GatewayMetrics>,
    max_request_size: usize,
    // Keep the bus subscriptions alive as long as the router.
    _routes: Arc<RouteTable>,
    _listener: Arc<ResponseListener>,
}

/// Handle one request on the configured endpoint.
async fn handle_envelope(State(state): State<AppState>, request: Request) -> Response {
    let timer = RequestTimer::new(Arc::clone(&state.metrics));

    let reply = match read_envelope(request, state.max_request_size).await {
        Ok(envelope) => state.dispatcher.dispatch(envelope).await,
        Err(rejection) => {
            debug!(error = %rejection, "Rejected before dispatch");
            timer.finish(rejection.status_code());
            return rejection_response(&rejection);
        }
    };

    timer.finish(reply.status_code);
    reply_response(&reply)
}

/// Method check, bounded body read and envelope validation, in that order.
async fn read_envelope(
    request: Request,
    max_request_size: usize,
) -> Result<RequestEnvelope, DispatchError> {
    // Checked before the body is read.
    if request.method() != Method::POST {
        return Err(DispatchError::BadRequest(format!(
            "method {} not allowed",
            request.method()
        )));
    }

    let body = axum::body::to_bytes(request.into_body(), max_request_size)
        .await
        .map_err(|e| DispatchError::BadRequest(format!("unreadable or oversized body: {e}")))?;

    Ok(RequestEnvelope::parse(&body)?)
}

/// Any path other than the configured endpoint.
async fn reject(State(state): State<AppState>, request: Request) -> Response {
    let rejection = DispatchError::BadRequest(format!(
        "{} {} is not the gateway endpoint",
        request.method(),
        request.uri().path()
    ));
    debug!(error = %rejection, "Rejected: unknown path");
    state.metrics.record(rejection.status_code(), 0);
    rejection_response(&rejection)
}

/// Pre-dispatch rejection, sent as `text/plain`.
fn rejection_response(rejection: &DispatchError) -> Response {
    let reply = rejection.to_reply();
    let status =
        StatusCode::from_u16(reply.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        reply.body(),
    )
        .into_response()
}

fn reply_response(reply: &ReplyEnvelope) -> Response {
    let status =
        StatusCode::from_u16(reply.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body(),
    )
        .into_response()
}
