//! Error types for monitoring sessions.

use thiserror::Error;

use crate::changelog::ChangeLogError;

use super::SessionReport;

/// Error type for session lifecycle operations.
///
/// Per-entity fetch failures never show up here; they are absorbed by the
/// poller. Everything in this enum reaches the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The entity catalog was empty; the session never started.
    #[error("No entities selected for monitoring")]
    NoEntitiesSelected,

    /// The change log could not be opened or written.
    ///
    /// The session is over. `report` holds the counters reached before the
    /// failure.
    #[error("Monitoring stopped, change log is not writable: {source}")]
    Persistence {
        /// Underlying change log error
        #[source]
        source: ChangeLogError,
        /// Counters captured at the time of failure
        report: SessionReport,
    },

    /// The poller has not confirmed termination within the wait timeout.
    ///
    /// Not fatal: the poller stops on its own at the next tick boundary and
    /// the wait can be retried.
    #[error("Monitoring loop has not stopped yet")]
    StopTimeout,

    /// The poller task panicked or was cancelled.
    #[error("Monitoring task aborted: {0}")]
    Aborted(#[source] tokio::task::JoinError),

    /// The session result was already collected and it was not a success.
    #[error("Session result was already collected")]
    AlreadyJoined,
}

impl SessionError {
    /// Returns the counters captured when the session failed, if any.
    #[must_use]
    pub const fn report(&self) -> Option<&SessionReport> {
        match self {
            Self::Persistence { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Returns `true` if the error is [`SessionError::StopTimeout`], i.e.
    /// waiting again may succeed.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::StopTimeout)
    }
}
