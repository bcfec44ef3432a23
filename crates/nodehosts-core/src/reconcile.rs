//! Host-table reconciler: applies one node event to a table.
//!
//! Reconciliation is last-write-wins per hostname. No ordering is attempted
//! between events, so a stale address delivered late replaces a newer one.

use crate::{HostEntry, HostTable, NodeEvent};

/// Structural change produced by a reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostChange {
    /// The hostname was added or moved to a new address
    Updated {
        /// The entry now in the table
        entry: HostEntry,
        /// Address the hostname had before, if any
        previous: Option<String>,
    },
    /// The hostname was dropped from the table
    Removed {
        /// The entry that was dropped
        entry: HostEntry,
    },
}

impl HostChange {
    /// Action label used when reporting a publication
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Updated { .. } => "Updated",
            Self::Removed { .. } => "Removed",
        }
    }

    /// The entry affected by this change
    #[must_use]
    pub const fn entry(&self) -> &HostEntry {
        match self {
            Self::Updated { entry, .. } | Self::Removed { entry } => entry,
        }
    }
}

/// Outcome of applying one event to a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// The resulting table
    pub table: HostTable,
    /// What changed, if anything
    pub change: Option<HostChange>,
}

impl Reconciled {
    /// Returns true if the table differs from the input
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.change.is_some()
    }
}

/// Apply `event` to a copy of `table`.
///
/// - removal drops the hostname if present, whatever address the event carries
/// - an add without an address leaves the table alone
/// - an add matching the current address leaves the table alone
/// - anything else upserts the hostname
#[must_use]
pub fn reconcile(table: &HostTable, event: &NodeEvent) -> Reconciled {
    let mut next = table.clone();

    let change = if event.removed {
        next.remove(&event.name).map(|address| HostChange::Removed {
            entry: HostEntry::new(address, event.name.as_str()),
        })
    } else if !event.has_address() || table.get(&event.name) == Some(event.address.as_str()) {
        None
    } else {
        let previous = next.insert(event.name.as_str(), event.address.as_str());
        Some(HostChange::Updated {
            entry: HostEntry::new(event.address.as_str(), event.name.as_str()),
            previous,
        })
    };

    Reconciled {
        table: next,
        change,
    }
}
