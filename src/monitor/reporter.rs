//! Operator-facing notifications.

use std::sync::Arc;

use super::ChangeEvent;

/// Receives progress notifications from the poller.
///
/// Notifications are informational only; nothing a reporter does can
/// affect what gets persisted. Calls happen on the poller task, in order.
pub trait Reporter: Send + Sync {
    /// The baseline pass finished: `recorded` of `monitored` entities
    /// answered and got an initial record.
    fn baseline(&self, recorded: u64, monitored: usize);

    /// A change was detected and persisted.
    fn change(&self, change: &ChangeEvent<'_>);

    /// Periodic liveness summary.
    fn progress(&self, checks: u64, changes: u64);
}

impl<T: Reporter> Reporter for Arc<T> {
    fn baseline(&self, recorded: u64, monitored: usize) {
        (**self).baseline(recorded, monitored);
    }

    fn change(&self, change: &ChangeEvent<'_>) {
        (**self).change(change);
    }

    fn progress(&self, checks: u64, changes: u64) {
        (**self).progress(checks, changes);
    }
}

/// Production reporter that writes notifications through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn baseline(&self, recorded: u64, monitored: usize) {
        if recorded == monitored as u64 {
            tracing::info!("Initial state recorded for {monitored} entities");
        } else {
            tracing::warn!(
                "Initial state recorded for {recorded} of {monitored} entities; \
                 the rest will be recorded on their first successful fetch"
            );
        }
    }

    fn change(&self, change: &ChangeEvent<'_>) {
        tracing::info!("{change}");
    }

    fn progress(&self, checks: u64, changes: u64) {
        tracing::info!("Checks: {checks} | Changes detected: {changes}");
    }
}
