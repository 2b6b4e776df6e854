//! Structured logging for processes embedding the harness.
//!
//! Every harness module logs through `tracing` with its own target. Nothing is
//! printed until a subscriber is installed; binaries call [`initialise`] once
//! at start-up with the layered configuration.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, time::UtcTime};
use warden_config::{Config, LogFormat};

/// Format chosen by the first successful initialisation.
static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Proof that a global subscriber is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Output format of the installed subscriber.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured filter expression does not parse.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Expression that was rejected.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Another global subscriber was installed first.
    #[error("failed to install log subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global subscriber on first use.
///
/// Events go to stderr with RFC 3339 UTC timestamps, as flattened JSON objects
/// or compact text depending on [`Config::log_format`]. Colour is only used
/// when stderr is a terminal. Later calls return a handle for the subscriber
/// that is already installed and ignore their configuration.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an invalid filter expression and
/// [`TelemetryError::Subscriber`] when a foreign subscriber is already set.
///
/// # Examples
///
/// ```rust
/// use warden_config::Config;
/// use warden_harness::telemetry;
///
/// # fn main() -> Result<(), telemetry::TelemetryError> {
/// let config = Config::default();
/// let first = telemetry::initialise(&config)?;
/// let again = telemetry::initialise(&config)?;
/// assert_eq!(first, again);
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| install(config))
        .map(|format| TelemetryHandle { format: *format })
}

fn install(config: &Config) -> Result<LogFormat, TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter {
        filter: config.log_filter().to_owned(),
        message: error.to_string(),
    })?;

    let format = config.log_format();
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339());

    match format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.json().flatten_event(true).finish())?;
        }
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(builder.compact().finish())?;
        }
    }
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_is_reported() {
        let config = Config {
            log_filter: Some(String::from("warden=notalevel")),
            ..Config::default()
        };
        let error = install(&config).expect_err("filter must be rejected");
        assert!(matches!(error, TelemetryError::Filter { .. }));
        assert!(error.to_string().contains("warden=notalevel"));
    }
}
