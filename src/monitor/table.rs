//! Last-known-state table.

use std::collections::HashMap;

/// Last observed state per entity id.
///
/// Owned by the poller alone. An entry is only written after a successful
/// fetch, so an unreachable entity keeps its last known value instead of
/// being erased.
#[derive(Debug, Default)]
pub(crate) struct StateTable {
    states: HashMap<String, String>,
}

impl StateTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the last stored state for `id`, if any.
    pub(crate) fn get(&self, id: &str) -> Option<&str> {
        self.states.get(id).map(String::as_str)
    }

    /// Stores `state` for `id`, returning the value it replaced.
    pub(crate) fn set(&mut self, id: &str, state: String) -> Option<String> {
        self.states.insert(id.to_string(), state)
    }
}
