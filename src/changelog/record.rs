//! Persisted row type and delimited encoding.

use std::borrow::Cow;

use crate::entity::MonitoredEntity;

/// Column names written once at the top of a new destination.
pub const HEADER: [&str; 6] = [
    "timestamp",
    "entityId",
    "displayName",
    "typeLabel",
    "locationLabel",
    "state",
];

/// One durable observation.
///
/// Borrows from the entity catalog and the fetched state; it only lives
/// long enough to be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRecord<'a> {
    /// ISO-8601 observation time
    pub timestamp: &'a str,
    /// Entity the observation belongs to
    pub entity: &'a MonitoredEntity,
    /// Observed state
    pub state: &'a str,
}

impl<'a> ChangeRecord<'a> {
    /// Creates a record.
    #[must_use]
    pub const fn new(timestamp: &'a str, entity: &'a MonitoredEntity, state: &'a str) -> Self {
        Self {
            timestamp,
            entity,
            state,
        }
    }

    /// Returns the column values in [`HEADER`] order.
    #[must_use]
    pub fn fields(&self) -> [&'a str; 6] {
        [
            self.timestamp,
            &self.entity.id,
            &self.entity.display_name,
            &self.entity.type_label,
            &self.entity.location_label,
            self.state,
        ]
    }

    /// Encodes the record as one newline-terminated row.
    #[must_use]
    pub fn to_row(&self) -> String {
        encode_row(&self.fields())
    }
}

/// Encodes fields as one comma-delimited, newline-terminated row.
///
/// Fields containing a delimiter, a quote or a line break are quoted and
/// embedded quotes are doubled.
#[must_use]
pub fn encode_row(fields: &[&str]) -> String {
    let mut row = fields
        .iter()
        .map(|field| escape(field))
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
