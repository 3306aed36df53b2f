//! Gateway service: wires the sign-in core, the session registry and the
//! HTTP router, and runs them until shutdown.

use crate::config::{ConfigError, GatewayConfig};
use crate::routes::{router, AppState};
use crate::session::{SessionCookie, SessionRegistry};
use axum::Router;
use chrono::{DateTime, Utc};
use qc_18_siwe_auth::{InMemoryNonceStore, SiweAuthService};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Gateway startup/runtime errors
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Listener could not be bound or served
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Running state of the sign-in gateway.
pub struct AuthGateway {
    config: GatewayConfig,
    nonce_ttl: chrono::Duration,
    store: Arc<InMemoryNonceStore>,
    sessions: Arc<SessionRegistry>,
    service: Arc<SiweAuthService<Arc<InMemoryNonceStore>>>,
}

impl AuthGateway {
    /// Validate `config` and build the gateway around an in-memory store.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        let nonce_ttl = chrono::Duration::from_std(config.nonce_ttl)
            .map_err(|e| ConfigError::InvalidTimeout(format!("nonce TTL: {e}")))?;

        let store = Arc::new(InMemoryNonceStore::new());
        let service = SiweAuthService::new(config.auth.clone(), Arc::clone(&store))
            .map_err(ConfigError::from)?;

        Ok(Self {
            config,
            nonce_ttl,
            store,
            sessions: Arc::new(SessionRegistry::new()),
            service: Arc::new(service),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// HTTP router bound to this gateway's state.
    pub fn router(&self) -> Router {
        router(AppState {
            auth: self.service.clone(),
            sessions: Arc::clone(&self.sessions),
            cookie: Arc::new(SessionCookie {
                name: self.config.session_cookie.clone(),
                secure: self.config.secure_cookie,
                max_age: self.config.nonce_ttl,
            }),
        })
    }

    /// Drop nonces and sessions older than the TTL at `now`.
    /// Returns `(nonces_removed, sessions_removed)`.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> (usize, usize) {
        match now.checked_sub_signed(self.nonce_ttl) {
            Some(cutoff) => (
                self.store.purge_issued_before(cutoff),
                self.sessions.purge_issued_before(cutoff),
            ),
            None => (0, 0),
        }
    }

    /// Serve until `shutdown` resolves, purging in the background.
    pub async fn run<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        info!(
            addr = %self.config.bind_addr,
            domain = %self.config.auth.domain,
            "Starting auth gateway"
        );

        let app = self.router();
        let purge_interval = self.config.purge_interval;
        let gateway = Arc::new(self);
        let purge_handle = tokio::spawn(purge_task(Arc::clone(&gateway), purge_interval));

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        purge_handle.abort();
        info!("Auth gateway stopped");
        result.map_err(GatewayError::from)
    }
}

/// Periodic purge of stale nonces and sessions.
pub async fn purge_task(gateway: Arc<AuthGateway>, interval: Duration) {
    let mut purge_interval = tokio::time::interval(interval);
    purge_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        purge_interval.tick().await;
        let (nonces, sessions) = gateway.purge_expired(Utc::now());
        if nonces > 0 || sessions > 0 {
            debug!(nonces = nonces, sessions = sessions, "Purged stale login state");
        }
    }
}
