//! listd daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                            listd                             │
//!   │                                                              │
//!   │  startup: config → storage → bind → register signals         │
//!   │                                                              │
//!   │  ┌───────────────┐   fault    ┌─────────────────────────┐    │
//!   │  │ listener task │──────────▶│                         │    │
//!   │  │ (net + http)  │◀──────────│  lifecycle coordinator  │    │
//!   │  └───────────────┘ stop/abort │                         │    │
//!   │  ┌───────────────┐  request   │   close storage first   │    │
//!   │  │ signal watcher│──────────▶│                         │    │
//!   │  └───────────────┘            └─────────────────────────┘    │
//!   └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exit status: 0 after a clean shutdown, 1 on startup failure or listener
//! fault, `shutdown.force_close_exit_code` (default 2) when the grace
//! period ran out.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use listd::config::{read_config, validate_config, ConfigError, DaemonConfig};
use listd::http::{routes, HttpServer};
use listd::lifecycle::{startup, Coordinator, ListenerTask, Termination, EXIT_FAILURE};
use listd::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "listd", version)]
#[command(about = "HTTP daemon with ordered, time-bounded shutdown", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "LISTD_CONFIG")]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(long, env = "LISTD_BIND_ADDRESS")]
    bind: Option<String>,

    /// Override storage.address
    #[arg(long, env = "LISTD_STORAGE_ADDRESS")]
    storage: Option<String>,

    /// Override listener.read_timeout_secs
    #[arg(long, env = "LISTD_READ_TIMEOUT_SECS")]
    read_timeout_secs: Option<u64>,

    /// Override listener.write_timeout_secs
    #[arg(long, env = "LISTD_WRITE_TIMEOUT_SECS")]
    write_timeout_secs: Option<u64>,

    /// Override shutdown.grace_period_secs
    #[arg(long, env = "LISTD_GRACE_PERIOD_SECS")]
    grace_period_secs: Option<u64>,

    /// Override shutdown.force_close_exit_code
    #[arg(long, env = "LISTD_FORCE_CLOSE_EXIT_CODE")]
    force_close_exit_code: Option<u8>,
}

impl Cli {
    fn load_config(&self) -> Result<DaemonConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => DaemonConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(storage) = &self.storage {
            config.storage.address = Some(storage.clone());
        }
        if let Some(secs) = self.read_timeout_secs {
            config.listener.read_timeout_secs = secs;
        }
        if let Some(secs) = self.write_timeout_secs {
            config.listener.write_timeout_secs = secs;
        }
        if let Some(secs) = self.grace_period_secs {
            config.shutdown.grace_period_secs = secs;
        }
        if let Some(code) = self.force_close_exit_code {
            config.shutdown.force_close_exit_code = code;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("listd: invalid configuration: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        read_timeout_secs = config.listener.read_timeout_secs,
        write_timeout_secs = config.listener.write_timeout_secs,
        grace_period_secs = config.shutdown.grace_period_secs,
        "listd starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let started = match startup::start(&config).await {
        Ok(started) => started,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let server = HttpServer::new(&config.listener, routes::router());
    let listener = started.listener;
    let task = ListenerTask::spawn(move |stop| server.serve(listener, stop));

    let termination = Termination::new();
    started.signals.spawn(termination.clone());

    let coordinator = Coordinator::new(
        task,
        started.resource,
        termination,
        config.shutdown.grace_period(),
    );
    let exit = coordinator.run().await;

    let code = exit.code(config.shutdown.force_close_exit_code);
    tracing::info!(exit = exit.as_str(), code, "listd exiting");
    ExitCode::from(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_defaults() {
        let cli = Cli::try_parse_from([
            "listd",
            "--bind",
            "127.0.0.1:9000",
            "--read-timeout-secs",
            "3",
            "--write-timeout-secs",
            "4",
            "--grace-period-secs",
            "12",
            "--force-close-exit-code",
            "0",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.listener.read_timeout_secs, 3);
        assert_eq!(config.listener.write_timeout_secs, 4);
        assert_eq!(config.shutdown.grace_period_secs, 12);
        assert_eq!(config.shutdown.force_close_exit_code, 0);
    }

    #[test]
    fn test_zero_grace_override_is_rejected() {
        let cli = Cli::try_parse_from(["listd", "--grace-period-secs", "0"]).unwrap();
        assert!(matches!(cli.load_config(), Err(ConfigError::Validation(_))));
    }
}
