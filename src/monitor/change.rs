//! Detected state transitions.

use std::fmt;

use crate::entity::MonitoredEntity;

/// A transition detected for one entity during a tick.
///
/// `previous` is `None` when this is the first successful observation of the
/// entity (its baseline fetch failed). Only `current` is persisted; the
/// previous value is shown to the operator alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent<'a> {
    /// Entity whose state changed
    pub entity: &'a MonitoredEntity,
    /// Last stored state, if any
    pub previous: Option<String>,
    /// Newly observed state
    pub current: String,
    /// ISO-8601 timestamp of the tick that observed the change
    pub timestamp: &'a str,
}

impl fmt::Display for ChangeEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} -> {}",
            self.timestamp,
            self.entity,
            self.previous.as_deref().unwrap_or("none"),
            self.current
        )
    }
}
