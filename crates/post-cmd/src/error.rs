//! Service error types with process exit code mapping.

use domain::{DomainError, RoutingError};
use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

/// Errors that stop the service.
#[derive(Debug, Error)]
pub enum AppError {
    /// A command was rejected or failed.
    #[error("Command failed: {0}")]
    Domain(#[from] DomainError),

    /// The dispatcher could not be wired.
    #[error("Dispatcher wiring failed: {0}")]
    Routing(#[from] RoutingError),

    /// The Prometheus recorder could not be installed.
    #[error("Failed to install metrics recorder: {0}")]
    Metrics(#[from] BuildError),

    /// The tracing subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Telemetry(#[from] TryInitError),

    /// The demo scenario observed an unexpected state.
    #[error("Demo scenario failed: {0}")]
    Scenario(&'static str),
}

impl AppError {
    /// Exit code reported by the binary: 2 for rejected commands, 3 for
    /// concurrency conflicts, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Domain(err) if err.is_validation() => 2,
            AppError::Domain(err) if err.is_concurrency_conflict() => 3,
            _ => 1,
        }
    }
}
