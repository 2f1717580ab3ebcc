//! Core world server implementation.
//!
//! This module contains the main `WorldServer` struct, which wires the
//! coordinator to the WebSocket gateway and runs the accept loop.

use crate::{
    config::ServerConfig,
    connection::{ChannelBus, ConnectionManager},
    error::ServerError,
    server::handlers::handle_connection,
    shutdown::ShutdownState,
};
use cubeworld_core::Coordinator;
use std::future::pending;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// The world server.
///
/// `WorldServer` owns the [`Coordinator`] and the gateway around it. Every
/// connection is served by its own task; world events travel from the
/// coordinator through the [`ChannelBus`] into per-connection outboxes, and
/// channel vacancies travel back to [`Coordinator::disconnect`].
pub struct WorldServer {
    /// Server configuration settings
    config: ServerConfig,

    /// The coordinator guarding all world state
    coordinator: Arc<Coordinator>,

    /// Manager for client connections and channel subscriptions
    connection_manager: Arc<ConnectionManager>,

    /// Bus the coordinator delivers through
    bus: Arc<ChannelBus>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl WorldServer {
    /// Creates a new world server with the specified configuration.
    ///
    /// The world starts empty; nothing is bound until the server is started.
    pub fn new(config: ServerConfig) -> Self {
        let connection_manager = Arc::new(ConnectionManager::new());
        let bus = Arc::new(ChannelBus::new(connection_manager.clone()));
        let coordinator = Arc::new(Coordinator::new(config.world.clone(), bus.clone()));
        let (shutdown_sender, _) = broadcast::channel(1);

        Self {
            config,
            coordinator,
            connection_manager,
            bus,
            shutdown_sender,
        }
    }

    /// Starts the server and accepts connections until shutdown is initiated
    /// through `shutdown_state`.
    pub async fn start_with_shutdown_state(&self, shutdown_state: ShutdownState) -> Result<(), ServerError> {
        self.start_internal(Some(shutdown_state)).await
    }

    /// Starts the server and accepts connections until [`shutdown`](Self::shutdown).
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_internal(None).await
    }

    async fn start_internal(&self, shutdown_state: Option<ShutdownState>) -> Result<(), ServerError> {
        info!("🚀 Starting world server on {}", self.config.bind_address);
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| ServerError::Network(format!("Failed to bind {}: {e}", self.config.bind_address)))?;
        self.serve(listener, shutdown_state).await
    }

    /// Serves connections from an already bound listener.
    ///
    /// # Startup Sequence
    ///
    /// 1. Claim the bus's vacancy stream and start the disconnect listener
    /// 2. Accept connections, spawning a handler per connection
    /// 3. Stop on shutdown, on the internal shutdown signal or on an accept error
    ///
    /// # Shutdown Sequence
    ///
    /// 1. Tell every handler to close its connection
    /// 2. Wait for the handlers, whose channels are reported vacated
    /// 3. Disconnect the sessions behind those channels
    /// 4. Mark `shutdown_state` complete
    ///
    /// A server can only be served once.
    pub async fn serve(&self, listener: TcpListener, shutdown_state: Option<ShutdownState>) -> Result<(), ServerError> {
        let mut vacancies = self
            .bus
            .take_vacancy_receiver()
            .await
            .ok_or_else(|| ServerError::Internal("server is already running".to_string()))?;

        if let Ok(local_addr) = listener.local_addr() {
            info!("🌍 Listening on ws://{}", local_addr);
        }
        info!(
            "🧱 World ready: {} plot(s), names up to {} characters",
            self.config.world.max_slots, self.config.world.max_name_length
        );

        let (stop_vacancies, mut vacancies_stopped) = oneshot::channel::<()>();
        let vacancy_task = {
            let coordinator = self.coordinator.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        biased;
                        channel = vacancies.recv() => match channel {
                            Some(channel) => {
                                debug!("📭 Channel {} vacated, disconnecting session", channel);
                                coordinator.disconnect(&channel).await;
                            }
                            None => break,
                        },
                        _ = &mut vacancies_stopped => {
                            while let Ok(channel) = vacancies.try_recv() {
                                coordinator.disconnect(&channel).await;
                            }
                            break;
                        }
                    }
                }
            })
        };

        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let shutdown_initiated = async {
            match &shutdown_state {
                Some(state) => state.wait_for_initiation().await,
                None => pending::<()>().await,
            }
        };
        tokio::pin!(shutdown_initiated);

        let mut handlers = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        // Handlers count from accept, before their handshake completes.
                        while handlers.try_join_next().is_some() {}
                        if handlers.len() >= self.config.max_connections {
                            warn!("🚫 Refusing {}: connection limit {} reached", addr, self.config.max_connections);
                            continue;
                        }

                        let connection_manager = self.connection_manager.clone();
                        let coordinator = self.coordinator.clone();
                        let security = self.config.security.clone();
                        let shutdown = self.shutdown_sender.subscribe();

                        handlers.spawn(async move {
                            if let Err(e) = handle_connection(
                                stream,
                                addr,
                                connection_manager,
                                coordinator,
                                security,
                                shutdown,
                            ).await {
                                error!("Connection error: {:?}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        break;
                    }
                },
                _ = &mut shutdown_initiated => {
                    info!("🛑 Accept loop stopping - shutdown initiated");
                    break;
                }
                _ = shutdown_receiver.recv() => {
                    info!("Internal shutdown signal received");
                    break;
                }
            }
        }

        info!("🧹 Closing {} connection handler(s)...", handlers.len());
        let _ = self.shutdown_sender.send(());
        while handlers.join_next().await.is_some() {}

        let _ = stop_vacancies.send(());
        if let Err(e) = vacancy_task.await {
            error!("Vacancy listener failed: {}", e);
        }

        info!(
            "✅ Server stopped with {} session(s) and {} connection(s) open",
            self.coordinator.session_count().await,
            self.connection_manager.connection_count().await
        );
        if let Some(state) = &shutdown_state {
            state.complete_shutdown();
        }
        Ok(())
    }

    /// Initiates server shutdown.
    ///
    /// Stops the accept loop and closes every open connection; [`serve`](Self::serve)
    /// returns once their sessions have been disconnected.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Gets the coordinator, e.g. for statistics or diagnostics.
    pub fn get_coordinator(&self) -> Arc<Coordinator> {
        self.coordinator.clone()
    }

    /// Gets the connection manager.
    pub fn get_connection_manager(&self) -> Arc<ConnectionManager> {
        self.connection_manager.clone()
    }
}
