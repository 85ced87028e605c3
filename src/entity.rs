//! Identity and display metadata for monitored entities.

use std::fmt;

use serde::Deserialize;

/// One remote device or control being watched.
///
/// Entities are supplied once, in catalog order, when a session starts and
/// never change while it runs. Only `id` needs to be unique; the labels are
/// free-form and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "CatalogEntry")]
pub struct MonitoredEntity {
    /// Stable identifier used to query the device state endpoint.
    pub id: String,

    /// Human-readable label, the id when the catalog entry has no name.
    pub display_name: String,

    /// Classification of the control (e.g. "Switch", "Dimmer").
    pub type_label: String,

    /// Room or area the control belongs to.
    pub location_label: String,
}

/// On-disk shape of a `[[entities]]` entry.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    type_label: String,
    #[serde(rename = "location", default)]
    location_label: String,
}

impl From<CatalogEntry> for MonitoredEntity {
    fn from(entry: CatalogEntry) -> Self {
        let entity = Self::new(entry.id)
            .with_type(entry.type_label)
            .with_location(entry.location_label);
        match entry.name {
            Some(name) if !name.is_empty() => entity.with_name(name),
            _ => entity,
        }
    }
}

impl MonitoredEntity {
    /// Creates an entity whose display name is its identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            type_label: String::new(),
            location_label: String::new(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets the type label.
    #[must_use]
    pub fn with_type(mut self, type_label: impl Into<String>) -> Self {
        self.type_label = type_label.into();
        self
    }

    /// Sets the location label.
    #[must_use]
    pub fn with_location(mut self, location_label: impl Into<String>) -> Self {
        self.location_label = location_label.into();
        self
    }

    /// Returns the display name, falling back to the id when it is empty.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }
}

impl fmt::Display for MonitoredEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location_label.is_empty() {
            write!(f, "{}", self.label())
        } else {
            write!(f, "{} [{}]", self.label(), self.location_label)
        }
    }
}
