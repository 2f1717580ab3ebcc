//! # Cubeworld - Main Entry Point
//!
//! Shared building world server. This entry point handles CLI parsing,
//! configuration loading, and application lifecycle management.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! cubeworld
//!
//! # Specify custom configuration
//! cubeworld --config production.toml
//!
//! # Override specific settings
//! cubeworld --bind 0.0.0.0:8080 --max-slots 100 --log-level debug
//!
//! # JSON logging for production
//! cubeworld --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The server shuts down gracefully on SIGINT (Ctrl+C) and SIGTERM. A second
//! signal exits immediately.

use tracing::error;

mod app;
pub mod cli;
pub mod config;
mod logging;
mod signals;

pub use app::Application;
pub use cli::CliArgs;
pub use config::{AppConfig, LoggingSettings, ServerSettings};

/// Runs the Cubeworld server.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
///
/// Must be called from within a Tokio runtime.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging comes first so configuration problems are reported through it.
    let mut logging_config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    logging_config.apply_overrides(&args);

    if let Err(e) = logging::setup_logging(&logging_config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn args(config_path: PathBuf) -> CliArgs {
        CliArgs {
            config_path,
            bind_address: None,
            max_slots: None,
            log_level: None,
            json_logs: false,
        }
    }

    #[tokio::test]
    async fn test_application_creation_writes_default_config() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.toml");

        let app = Application::new(args(path.clone()))
            .await
            .expect("Default configuration should start");
        assert!(path.exists());
        assert_eq!(app.config().world.max_slots, 50);
    }

    #[tokio::test]
    async fn test_cli_overrides_win_over_file() {
        let dir = tempdir().unwrap();
        let mut cli = args(dir.path().join("config.toml"));
        cli.bind_address = Some("127.0.0.1:9100".to_string());
        cli.max_slots = Some(4);
        cli.log_level = Some("debug".to_string());
        cli.json_logs = true;

        let app = Application::new(cli).await.unwrap();
        assert_eq!(app.config().server.bind_address, "127.0.0.1:9100");
        assert_eq!(app.config().world.max_slots, 4);
        assert_eq!(app.config().logging.level, "debug");
        assert!(app.config().logging.json_format);
    }

    #[tokio::test]
    async fn test_invalid_overrides_are_rejected() {
        let dir = tempdir().unwrap();
        let mut cli = args(dir.path().join("config.toml"));
        cli.max_slots = Some(0);
        assert!(Application::new(cli).await.is_err());

        let mut cli = args(dir.path().join("config.toml"));
        cli.bind_address = Some("not an address".to_string());
        assert!(Application::new(cli).await.is_err());
    }
}
