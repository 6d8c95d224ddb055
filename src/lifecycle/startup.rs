//! Startup orchestration.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::http::handlers::{
    AuthHandler, BackupHandler, CollectionHandler, HealthHandler, PreflightHandler, SingletonHandler,
};
use crate::http::{AppState, HttpServer, Pipeline};
use crate::resources::{HighlightValidator, PlanValidator, SnippetValidator, TemplateValidator};
use crate::lifecycle::Shutdown;
use crate::session::{spawn_sweeper, IdentitySource, InMemoryTokenStore, SessionManager, UserDirectory};
use crate::store::{StoreError, Stores};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open document stores: {0}")]
    Store(#[from] StoreError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// A configured server bound to its listener, ready to run.
pub struct Application {
    stores: Stores,
    sessions: Arc<SessionManager>,
    sweep_interval: Duration,
    server: HttpServer,
    listener: TcpListener,
}

impl Application {
    /// Open stores, wire sessions and handlers, and bind the listener.
    pub async fn build(config: &ServerConfig) -> Result<Self, StartupError> {
        let stores = Stores::open(&config.storage).await?;

        let sessions = Arc::new(SessionManager::new(
            Arc::new(InMemoryTokenStore::new()),
            config.sessions.ttl(),
            config.sessions.cookie_settings(),
        ));
        let identity = Arc::new(IdentitySource::new(sessions.clone(), config.identity.trust_headers));
        let users = Arc::new(UserDirectory::from_config(&config.users));
        if users.is_empty() {
            tracing::warn!("No users configured; only trusted identity headers can authenticate");
        }

        let origin = config.security.cors_allow_origin.as_str();
        let pipeline = Pipeline::new()
            .with(HealthHandler)
            .with(AuthHandler::new(users, origin))
            .with(CollectionHandler::new(stores.plans.clone(), PlanValidator, origin))
            .with(CollectionHandler::new(stores.templates.clone(), TemplateValidator, origin))
            .with(SingletonHandler::new(stores.highlights.clone(), HighlightValidator, origin))
            .with(SingletonHandler::new(stores.snippets.clone(), SnippetValidator, origin))
            .with(BackupHandler::new(stores.clone(), origin))
            .with(PreflightHandler::new(origin));

        let server = HttpServer::new(AppState {
            pipeline: Arc::new(pipeline),
            identity,
            sessions: sessions.clone(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            max_body_size: config.security.max_body_size,
        });

        let address = config.listener.bind_address.clone();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind { address, source })?;

        Ok(Self {
            stores,
            sessions,
            sweep_interval: config.sessions.sweep_interval(),
            server,
            listener,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, StartupError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Serve until `shutdown` triggers, then stop the session sweeper and
    /// drain every store.
    ///
    /// Subscribes before returning, so a trigger sent after this call is
    /// never missed even if the future is first polled later.
    pub fn run(self, shutdown: &Shutdown) -> impl Future<Output = Result<(), StartupError>> + Send + 'static {
        let stopped = shutdown.wait();
        let sweeper_stop = shutdown.subscribe();

        async move {
            let sweeper = spawn_sweeper(self.sessions, self.sweep_interval, sweeper_stop);
            let result = self.server.run(self.listener, stopped).await;
            if result.is_err() {
                sweeper.abort();
            }
            match sweeper.await {
                Err(err) if !err.is_cancelled() => {
                    tracing::warn!(error = %err, "Session sweeper task failed");
                }
                _ => {}
            }
            self.stores.close().await;
            tracing::info!("Document stores closed");
            Ok(result?)
        }
    }
}
