//! Publication gate: decides whether a recomputed table is written back.

use nodehosts_core::{HostChange, HostTable, NodeEvent, Reconciled};
use std::fmt;

/// Why a reconciliation was not published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Publication is turned off for this process
    Disabled,
    /// Add event without an internal address
    MissingAddress,
    /// Removal of a hostname the table does not hold
    AbsentOnRemoval,
    /// The hostname already maps to the event's address
    Unchanged,
}

impl SkipReason {
    /// Short label for logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::MissingAddress => "missing-address",
            Self::AbsentOnRemoval => "absent-on-removal",
            Self::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publication {
    /// Leave the published table as it is
    Skip(SkipReason),
    /// Write the new table back, reporting this change
    Publish(HostChange),
}

impl Publication {
    /// Returns true if the table should be written back
    #[must_use]
    pub const fn is_publish(&self) -> bool {
        matches!(self, Self::Publish(_))
    }
}

/// Decides whether a reconciliation result is worth publishing.
///
/// The enabled flag is fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicationGate {
    enabled: bool,
}

impl PublicationGate {
    /// Create a gate
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether publication is turned on at all
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Decide for `event`, given the table before and after reconciliation.
    #[must_use]
    pub fn decide(&self, event: &NodeEvent, before: &HostTable, after: &Reconciled) -> Publication {
        if !self.enabled {
            return Publication::Skip(SkipReason::Disabled);
        }

        if event.removed {
            if !before.contains(&event.name) {
                return Publication::Skip(SkipReason::AbsentOnRemoval);
            }
        } else {
            if !event.has_address() {
                return Publication::Skip(SkipReason::MissingAddress);
            }
            if before.get(&event.name) == Some(event.address.as_str()) {
                return Publication::Skip(SkipReason::Unchanged);
            }
        }

        match &after.change {
            Some(change) if after.table != *before => Publication::Publish(change.clone()),
            _ => Publication::Skip(SkipReason::Unchanged),
        }
    }
}
