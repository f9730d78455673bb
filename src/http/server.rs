//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router from every feature module
//! - Wire up middleware (tracing, timeouts, body limit, request ID,
//!   security headers, access gate)
//! - Own the rate limit sweepers for the lifetime of the server
//! - Serve with graceful shutdown and flush the store afterwards

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::blob::{BlobStore, LocalBlobStore};
use crate::config::ServerConfig;
use crate::lifecycle::Shutdown;
use crate::mail::{mailer_from_config, MailError, Mailer};
use crate::security::access_control::access_gate_middleware;
use crate::security::headers::security_headers;
use crate::security::session::SessionError;
use crate::security::{AccessGate, RateLimiters, SessionSigner};
use crate::store::{seed, MemoryStore, Store, StoreError};
use crate::{admin, contact, menu, social};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub gate: AccessGate,
    pub signer: SessionSigner,
    pub limiters: RateLimiters,
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub blobs: Arc<dyn BlobStore>,
}

impl FromRef<AppState> for AccessGate {
    fn from_ref(state: &AppState) -> Self {
        state.gate.clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("session signer: {0}")]
    Session(#[from] SessionError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("mailer: {0}")]
    Mail(#[from] MailError),
}

impl AppState {
    /// Build the state with the given collaborators.
    pub fn new(
        config: ServerConfig,
        limiters: RateLimiters,
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        blobs: Arc<dyn BlobStore>,
    ) -> Result<Self, StartupError> {
        let signer = SessionSigner::from_config(&config.session)?;
        let gate = AccessGate::new(
            config.admin.email.clone(),
            config.session.cookie_name.clone(),
            config.access.clone(),
            signer.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            gate,
            signer,
            limiters,
            store,
            mailer,
            blobs,
        })
    }

    /// Build the state with collaborators chosen by configuration.
    pub async fn from_config(config: ServerConfig) -> Result<Self, StartupError> {
        let store = match &config.storage.data_path {
            Some(path) => MemoryStore::load_from_file(&PathBuf::from(path))?,
            None => MemoryStore::new(None),
        };
        if config.storage.seed_examples {
            seed::seed_if_empty(&store).await?;
        }

        let mailer = mailer_from_config(
            &config.mail,
            Duration::from_secs(config.timeouts.mail_secs),
        )?;
        let blobs = LocalBlobStore::new(
            config.storage.upload_dir.clone(),
            config.storage.public_base_url.clone(),
        );
        let limiters = RateLimiters::from_config(&config.rate_limit);

        Self::new(config, limiters, Arc::new(store), mailer, Arc::new(blobs))
    }
}

/// HTTP server for the café site.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server around prepared state.
    pub fn new(state: AppState) -> Self {
        let router = build_router(state.clone());
        Self { router, state }
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            admin_email = %self.state.config.admin.email,
            rate_limiting = self.state.limiters.enabled(),
            "HTTP server starting"
        );

        let sweepers = self.state.limiters.spawn_sweepers(&shutdown);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(Shutdown::wait(shutdown.subscribe()))
            .await?;

        // Sweepers see the same signal; make sure they are gone.
        shutdown.trigger();
        for sweeper in sweepers {
            sweeper.stopped().await;
        }

        if let Err(e) = self.state.store.flush().await {
            tracing::error!(error = %e, "Failed to persist store on shutdown");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the state.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(menu::routes(&state.limiters))
        .merge(contact::routes(&state.limiters))
        .merge(social::routes(&state.limiters))
        .merge(admin::routes(&state.limiters))
        .layer(middleware::from_fn_with_state(
            state.gate.clone(),
            access_gate_middleware,
        ))
        .with_state(state);

    if config.security.enable_headers {
        for layer in security_headers() {
            router = router.layer(layer);
        }
    }

    #[allow(deprecated)]
    let timeout = TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs));

    router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
        .layer(timeout)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
