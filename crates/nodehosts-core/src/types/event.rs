use super::Node;

/// A single lifecycle observation of one node.
///
/// An empty `address` means the node has no usable internal address yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEvent {
    /// Hostname, used as the table key
    pub name: String,

    /// Internal address, possibly empty
    pub address: String,

    /// Whether the node left the cluster
    pub removed: bool,
}

impl NodeEvent {
    /// An add or address-change observation
    #[must_use]
    pub fn changed(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            removed: false,
        }
    }

    /// A removal observation; the address is informational only
    #[must_use]
    pub fn removed(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            removed: true,
        }
    }

    /// Build an event from a node, taking its first internal IP
    #[must_use]
    pub fn from_node(node: &Node, removed: bool) -> Self {
        Self {
            name: node.name.clone(),
            address: node.internal_address().unwrap_or_default().to_string(),
            removed,
        }
    }

    /// Returns true if the event carries an address
    #[must_use]
    pub fn has_address(&self) -> bool {
        !self.address.is_empty()
    }
}
