use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    middleware,
    routing::get,
};
use tower_http::trace::TraceLayer;
use userserv_auth::{AuthState, TokenVerifier};
use userserv_storage::DynRecordStore;

use crate::cache::{CacheBackend, CacheCoordinator};
use crate::config::AppConfig;
use crate::service::{CardService, PrincipalService};
use crate::{handlers, middleware as app_middleware, routes};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub principals: PrincipalService,
    pub cards: CardService,
    pub store: DynRecordStore,
    pub cache: Arc<CacheCoordinator>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(
        store: DynRecordStore,
        cache: Arc<CacheCoordinator>,
        verifier: Arc<TokenVerifier>,
    ) -> Self {
        Self {
            principals: PrincipalService::new(store.clone(), cache.clone()),
            cards: CardService::new(store.clone(), cache.clone()),
            store,
            cache,
            auth: AuthState::new(verifier),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

pub struct UserservServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        // Health and metrics endpoints
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        .merge(routes::api_routes())
        .with_state(state)
        // Layers wrap outwards: body limit -> request id -> trace -> metrics -> routes
        .layer(middleware::from_fn(app_middleware::track_metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    /// Overrides `server.host`/`server.port` when set.
    addr: Option<SocketAddr>,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            addr: None,
            config: AppConfig::default(),
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Wires the store, cache and verifier.
    ///
    /// # Errors
    ///
    /// Fails if the listen address or the public key cannot be parsed, or the
    /// record store cannot be opened. A missing Redis is not an error: the
    /// cache falls back to local mode.
    pub async fn build(self) -> anyhow::Result<UserservServer> {
        let addr = match self.addr {
            Some(addr) => addr,
            None => self.config.addr().map_err(anyhow::Error::msg)?,
        };
        let verifier = TokenVerifier::from_key_material(
            &self.config.auth.public_key,
            &self.config.auth.identity_claim,
        )
        .context("invalid auth.public_key")?;

        let store = crate::create_record_store(&self.config.storage)
            .await
            .context("failed to open record store")?;

        let backend: CacheBackend =
            crate::create_cache_backend(&self.config.redis, self.config.cache_ttl()).await;
        tracing::info!(
            store = store.backend_name(),
            cache = %backend.stats().mode,
            ttl_secs = self.config.cache.ttl_secs,
            "Backends initialized"
        );
        let cache = Arc::new(CacheCoordinator::new(backend, self.config.cache_ttl()));

        crate::metrics::init_metrics();

        let state = AppState::new(store, cache, Arc::new(verifier));
        Ok(UserservServer {
            addr,
            app: build_app(state, &self.config),
        })
    }
}

impl UserservServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
