//! Change-detection polling engine.
//!
//! This module provides types and functions for:
//! - Representing detected transitions ([`ChangeEvent`])
//! - Surfacing changes and progress to the operator ([`Reporter`], [`LogReporter`])
//! - Starting, stopping and joining a monitoring run ([`MonitorSession`], [`SessionHandle`])
//! - Session configuration and results ([`SessionConfig`], [`SessionReport`])
//! - Error handling ([`SessionError`])
//!
//! # Concurrency
//!
//! A session has exactly two actors: the poller task, which owns the
//! last-known-state table and the change log, and the caller holding the
//! [`SessionHandle`]. They share nothing but the stop signal and the final
//! [`SessionReport`], so no locks are involved.
//!
//! Cancellation is cooperative and only observed between ticks. A tick that
//! has started always visits every entity, so the worst-case stop latency is
//! one full tick: the sum of the fetch timeouts of unreachable entities.

mod change;
mod engine;
mod error;
mod reporter;
mod session;
mod table;

#[cfg(test)]
mod engine_tests;
#[cfg(test)]
mod test_fixtures;

pub use change::ChangeEvent;
pub use error::SessionError;
pub use reporter::{LogReporter, Reporter};
pub use session::{MonitorSession, SessionConfig, SessionHandle, SessionReport};
