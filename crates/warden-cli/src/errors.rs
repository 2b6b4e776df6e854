//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use warden_harness::HarnessError;
use warden_harness::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Harness(#[from] HarnessError),
    #[error("failed to serialise result: {0}")]
    Serialise(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Write(#[from] io::Error),
}
