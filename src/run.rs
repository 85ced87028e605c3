//! Application execution logic.
//!
//! This module starts a monitoring session against the configured device,
//! waits for the operator to ask for a stop, and shuts the session down.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use statewatch::config::{ValidatedConfig, defaults};
use statewatch::fetch::{HttpError, HttpStateFetcher, ReqwestClient};
use statewatch::monitor::{MonitorSession, SessionError, SessionHandle, SessionReport};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// Failed to build the HTTP client.
    #[error("Failed to create HTTP client: {0}")]
    ClientCreation(#[source] HttpError),

    /// The session could not start or ended with a failure.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Executes a monitoring run.
///
/// This function:
/// 1. Creates the HTTP state fetcher for the configured device
/// 2. Starts the session (baseline pass included)
/// 3. Waits for Enter, Ctrl+C / SIGTERM, or the session ending on its own
/// 4. Stops the session and logs the final counters
///
/// # Errors
///
/// Returns an error if:
/// - The HTTP client cannot be built
/// - The catalog is empty or the change log cannot be opened or written
///
/// # Coverage Note
///
/// This function is excluded from coverage because it requires a console
/// and real signal handling.
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig) -> Result<(), RunError> {
    let fetcher = create_fetcher(&config)?;
    let session_config = config.session_config();

    tracing::info!(
        "Monitoring {} entities every {}s, changes go to {}",
        session_config.entities.len(),
        session_config.interval.as_secs(),
        session_config.destination.display()
    );

    let mut handle = MonitorSession::new(fetcher, session_config).start().await?;
    tracing::info!("Press Enter or Ctrl+C to stop");

    let ended = tokio::select! {
        () = operator_stop() => None,
        result = handle.join() => Some(result),
    };

    let report = match ended {
        Some(result) => result?,
        None => stop_session(&mut handle, defaults::stop_wait()).await?,
    };

    tracing::info!("Monitoring stopped: {report}");
    Ok(())
}

/// Creates the HTTP state fetcher from configuration.
fn create_fetcher(config: &ValidatedConfig) -> Result<HttpStateFetcher<ReqwestClient>, RunError> {
    let client = ReqwestClient::with_timeout(config.fetch_timeout).map_err(RunError::ClientCreation)?;

    Ok(HttpStateFetcher::new(client, config.url.clone())
        .with_state_path(config.state_path.as_str())
        .with_headers(config.headers.clone()))
}

/// Requests a stop and waits for the poller, retrying while it is mid-tick.
async fn stop_session(
    handle: &mut SessionHandle,
    wait: Duration,
) -> Result<SessionReport, SessionError> {
    tracing::info!("Stopping, waiting for the current tick to finish...");
    handle.request_stop();

    loop {
        match handle.wait_until_stopped(wait).await {
            Err(e) if e.is_timeout() => {
                tracing::warn!(
                    "Monitoring loop has not stopped after {}s, still waiting",
                    wait.as_secs()
                );
            }
            outcome => return outcome,
        }
    }
}

/// Returns a future that completes when the operator asks for a stop.
///
/// Excluded from coverage - requires a console and OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn operator_stop() {
    tokio::select! {
        () = console_enter() => tracing::info!("Stop requested from console"),
        () = shutdown_signal() => tracing::info!("Shutdown signal received"),
    }
}

/// Completes on the first line read from stdin.
///
/// A closed or unreadable stdin never completes, leaving signals as the
/// only way to stop.
#[cfg(not(tarpaulin_include))]
async fn console_enter() {
    let mut line = String::new();
    match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
        Ok(0) => {
            tracing::debug!("stdin closed, waiting for a signal instead");
            std::future::pending::<()>().await;
        }
        Ok(_) => {}
        Err(e) => {
            tracing::debug!("stdin unreadable ({e}), waiting for a signal instead");
            std::future::pending::<()>().await;
        }
    }
}

/// Returns a future that completes when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
