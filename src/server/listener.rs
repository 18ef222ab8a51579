//! Relay server listener
//!
//! Handles TCP accept loop and spawns sessions.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::registry::{ClientRegistry, RegistryConfig, TopicRegistry};
use crate::router::Router;
use crate::server::config::ServerConfig;
use crate::session::run_session;
use crate::stats::spawn_stats_task;

/// Topic relay server
pub struct RelayServer<R: ClientRegistry + ?Sized + 'static = TopicRegistry> {
    config: ServerConfig,
    registry: Arc<R>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl RelayServer<TopicRegistry> {
    /// Create a server whose registry capacity matches `max_connections`
    pub fn new(config: ServerConfig) -> Self {
        let registry_config = RegistryConfig::default().capacity(config.max_connections);
        Self::with_registry(config, Arc::new(TopicRegistry::with_config(registry_config)))
    }
}

impl<R: ClientRegistry + ?Sized + 'static> RelayServer<R> {
    /// Create a server over an existing registry
    pub fn with_registry(config: ServerConfig, registry: Arc<R>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            registry,
            connection_semaphore,
        }
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_until(listener, shutdown).await
    }

    /// Accept on an already-bound listener until `shutdown` resolves
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Relay server listening");

        let stats_handle = self
            .config
            .stats_interval
            .map(|interval| spawn_stats_task(Arc::clone(&self.registry), interval));

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = self.accept_loop(&listener) => {}
        }

        if let Some(handle) = stats_handle {
            handle.abort();
        }

        Ok(())
    }

    async fn accept_loop(&self, listener: &TcpListener) {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit; dropping the socket closes it without a reply
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        tracing::debug!(peer = %peer_addr, "New connection");

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(peer = %peer_addr, error = %e, "Failed to configure socket");
            return;
        }

        let router = Router::new(Arc::clone(&self.registry));
        let limits = self.config.session_limits();

        tokio::spawn(async move {
            let state = run_session(socket, peer_addr, router, limits).await;

            tracing::debug!(
                peer = %peer_addr,
                client_id = ?state.client_id,
                registered = state.was_registered(),
                reason = ?state.termination,
                "Connection closed"
            );

            // Slot is freed only after the session has left the registry
            drop(permit);
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}
