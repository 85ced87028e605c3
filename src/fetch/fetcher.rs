//! State fetching trait.

use super::Unavailable;

/// Trait for reading the current state of one entity.
///
/// # Design
///
/// - The monitor calls this once per entity per tick, so implementations
///   must tolerate rapid repeated calls
/// - Implementations should bound each call with their own timeout; the
///   monitor applies an outer timeout as well
/// - The state is an opaque string; the monitor only compares it for equality
///
/// # Example
///
/// ```ignore
/// use statewatch::fetch::{StateFetcher, Unavailable};
///
/// struct Fixed;
///
/// impl StateFetcher for Fixed {
///     async fn fetch(&self, _id: &str) -> Result<String, Unavailable> {
///         Ok("on".to_string())
///     }
/// }
/// ```
pub trait StateFetcher: Send + Sync {
    /// Fetches the current state of the entity with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Unavailable`] when no observation could be made. The monitor
    /// never escalates this; the entity is simply skipped for the tick.
    fn fetch(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<String, Unavailable>> + Send;
}
