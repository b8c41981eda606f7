//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the cart routes
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Hand decoded requests to the operation handlers
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, HeaderName},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cart::{Cart, Item};
use crate::config::ServiceConfig;
use crate::http::request::{self, UuidRequestId, X_REQUEST_ID};
use crate::http::response::ApiError;
use crate::operations::{CartOperations, RemoveItem};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub operations: Arc<CartOperations>,
}

/// HTTP server for the cart service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig, operations: Arc<CartOperations>) -> Self {
        let state = AppState { operations };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/cart/add", post(add_to_cart))
            .route("/cart/remove", post(remove_from_cart))
            .route("/cart/view", get(view_cart))
            .route("/health", get(health))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(x_request_id, UuidRequestId))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

async fn add_to_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Item>, JsonRejection>,
) -> Result<Json<Cart>, ApiError> {
    let inbound = request::inbound(&headers, request::json_payload(body));
    Ok(Json(state.operations.add(inbound)?))
}

async fn remove_from_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RemoveItem>, JsonRejection>,
) -> Result<Json<Cart>, ApiError> {
    let inbound = request::inbound(&headers, request::json_payload(body));
    Ok(Json(state.operations.remove(inbound)?))
}

async fn view_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Cart>, ApiError> {
    let inbound = request::inbound(&headers, Ok(()));
    Ok(Json(state.operations.view(inbound)?))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
