//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that orchestrates server
//! startup, periodic statistics and shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, setup_signal_handlers_silent},
};
use cubeworld_core::Coordinator;
use cubeworld_server::{ShutdownState, WorldServer};
use std::sync::Arc;
use tokio::time::{interval, timeout, Duration};
use tracing::{error, info, warn};

/// Interval between statistics reports.
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Main application struct.
///
/// Manages the complete lifecycle of the Cubeworld server: configuration,
/// server startup, statistics monitoring and graceful shutdown.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// World server instance
    server: Arc<WorldServer>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Initialize the world server
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_overrides(&args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let server_config = config.to_server_config()?;
        let server = Arc::new(WorldServer::new(server_config));

        Ok(Self { config, server })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Runs the server until a shutdown signal arrives.
    ///
    /// A second signal during shutdown exits the process immediately.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Cubeworld");
        self.log_configuration_summary();

        let coordinator = self.server.get_coordinator();
        let shutdown_state = ShutdownState::new();

        let server_handle = {
            let server = self.server.clone();
            let shutdown_state = shutdown_state.clone();
            tokio::spawn(async move {
                match server.start_with_shutdown_state(shutdown_state).await {
                    Ok(()) => info!("✅ Server completed successfully"),
                    Err(e) => {
                        error!("❌ Server error: {:?}", e);
                        std::process::exit(1);
                    }
                }
            })
        };

        let monitoring_handle = {
            let coordinator = coordinator.clone();
            let connection_manager = self.server.get_connection_manager();

            tokio::spawn(async move {
                let mut ticker = interval(STATS_INTERVAL);
                ticker.tick().await;
                let mut last_delivered = 0u64;

                loop {
                    ticker.tick().await;

                    let stats = coordinator.stats();
                    let delivered_this_period = stats.events_delivered - last_delivered;
                    last_delivered = stats.events_delivered;

                    info!(
                        "📊 World Health - {} member(s) | {} free plot(s) | {} connection(s) | {} events/min",
                        coordinator.session_count().await,
                        coordinator.available_slots().await,
                        connection_manager.connection_count().await,
                        delivered_this_period
                    );

                    if stats.delivery_failures > 0 {
                        warn!(
                            "⚠️ {} event deliveries have failed since start",
                            stats.delivery_failures
                        );
                    }
                }
            })
        };

        info!("✅ Cubeworld is now running!");
        info!("🎮 Ready to accept connections on {}", self.config.server.bind_address);
        info!("🔍 Statistics every {} seconds", STATS_INTERVAL.as_secs());
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let signal_shutdown_state = setup_signal_handlers().await?;

        tokio::spawn(async move {
            if let Err(e) = setup_signal_handlers_silent().await {
                error!("Failed to set up forced shutdown signal handler: {e}");
                return;
            }
            warn!("Shutdown signal received again, exiting immediately.");
            std::process::exit(1);
        });

        if signal_shutdown_state.is_shutdown_initiated() {
            shutdown_state.initiate_shutdown();
        }

        info!("📡 Phase 1: Stopping new connections...");
        monitoring_handle.abort();

        info!("🧹 Phase 2: Closing connections and releasing sessions...");
        match timeout(Duration::from_secs(5), server_handle).await {
            Ok(_) => info!("✅ Server task completed gracefully"),
            Err(_) => warn!("⏰ Server task did not complete within timeout, proceeding with cleanup"),
        }
        if !shutdown_state.is_shutdown_complete() {
            warn!("⚠️ Sessions were not all released before exit");
        }

        log_final_statistics(&coordinator).await;

        info!("✅ Cubeworld shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  🗺️ Plots: {}", self.config.world.max_slots);
        info!("  🏷️ Max name length: {}", self.config.world.max_name_length);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!("  📦 Max message size: {} bytes", self.config.security.max_message_size);
    }
}

/// Logs final statistics during shutdown.
async fn log_final_statistics(coordinator: &Coordinator) {
    let stats = coordinator.stats();
    info!("📊 Final Statistics:");
    info!("  - Members still present: {}", coordinator.session_count().await);
    info!("  - Sessions joined: {}", stats.sessions_joined);
    info!("  - Sessions left: {}", stats.sessions_left);
    info!("  - Joins rejected: {}", stats.joins_rejected);
    info!("  - Objects placed: {}", stats.objects_placed);
    info!("  - Objects removed: {}", stats.objects_removed);
    info!(
        "  - Events delivered: {} ({} failed)",
        stats.events_delivered, stats.delivery_failures
    );
}
