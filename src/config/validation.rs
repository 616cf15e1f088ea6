//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, header limits, connection limits)
//! - Validate addresses before anything tries to bind or connect
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DaemonConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{DaemonConfig, MIN_HEADER_BYTES};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("listener.max_header_bytes must be at least {min}, got {actual}")]
    HeaderLimitTooSmall { min: usize, actual: usize },

    #[error("listener.max_connections must be greater than zero")]
    ZeroConnections,

    #[error("storage.address `{0}` must be in host:port form")]
    InvalidStorageAddress(String),

    #[error("observability.metrics_address `{0}` is not a valid socket address")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &DaemonConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let listener = &config.listener;
    if listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(listener.bind_address.clone()));
    }
    if listener.read_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration("listener.read_timeout_secs"));
    }
    if listener.write_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration("listener.write_timeout_secs"));
    }
    if listener.max_header_bytes < MIN_HEADER_BYTES {
        errors.push(ValidationError::HeaderLimitTooSmall {
            min: MIN_HEADER_BYTES,
            actual: listener.max_header_bytes,
        });
    }
    if listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    if config.shutdown.grace_period_secs == 0 {
        errors.push(ValidationError::ZeroDuration("shutdown.grace_period_secs"));
    }

    let storage = &config.storage;
    if let Some(address) = &storage.address {
        if !is_host_port(address) {
            errors.push(ValidationError::InvalidStorageAddress(address.clone()));
        }
        if storage.connect_timeout_secs == 0 {
            errors.push(ValidationError::ZeroDuration("storage.connect_timeout_secs"));
        }
        if storage.close_timeout_secs == 0 {
            errors.push(ValidationError::ZeroDuration("storage.close_timeout_secs"));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_host_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
