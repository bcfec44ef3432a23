use serde::{Deserialize, Serialize};
use std::fmt;

/// A cluster member as reported by the lifecycle source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Stable hostname, unique across the cluster
    pub name: String,

    /// Addresses reported in the node status
    #[serde(default)]
    pub addresses: Vec<NodeAddress>,
}

impl Node {
    /// Create a node with no addresses
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addresses: Vec::new(),
        }
    }

    /// Add an address of the given type
    #[must_use]
    pub fn with_address(mut self, kind: AddressType, address: impl Into<String>) -> Self {
        self.addresses.push(NodeAddress {
            kind,
            address: address.into(),
        });
        self
    }

    /// First address flagged as the node's internal IP
    #[must_use]
    pub fn internal_address(&self) -> Option<&str> {
        self.addresses
            .iter()
            .find(|a| a.kind == AddressType::InternalIp)
            .map(|a| a.address.as_str())
    }
}

/// One entry of a node's address list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    /// Address type
    #[serde(rename = "type")]
    pub kind: AddressType,

    /// Address value (an IP for the IP types)
    pub address: String,
}

/// Node address types, named as the cluster API names them
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AddressType {
    /// `Hostname`
    Hostname,
    /// `InternalIP`
    InternalIp,
    /// `ExternalIP`
    ExternalIp,
    /// `InternalDNS`
    InternalDns,
    /// `ExternalDNS`
    ExternalDns,
    /// Any type this crate does not know about
    Other(String),
}

impl AddressType {
    /// Wire name of this address type
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Hostname => "Hostname",
            Self::InternalIp => "InternalIP",
            Self::ExternalIp => "ExternalIP",
            Self::InternalDns => "InternalDNS",
            Self::ExternalDns => "ExternalDNS",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for AddressType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Hostname" => Self::Hostname,
            "InternalIP" => Self::InternalIp,
            "ExternalIP" => Self::ExternalIp,
            "InternalDNS" => Self::InternalDns,
            "ExternalDNS" => Self::ExternalDns,
            _ => Self::Other(s),
        }
    }
}

impl From<AddressType> for String {
    fn from(kind: AddressType) -> Self {
        match kind {
            AddressType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_address_picks_first_internal_ip() {
        let node = Node::new("node-a")
            .with_address(AddressType::Hostname, "node-a")
            .with_address(AddressType::ExternalIp, "203.0.113.7")
            .with_address(AddressType::InternalIp, "10.0.0.1")
            .with_address(AddressType::InternalIp, "10.0.0.9");
        assert_eq!(node.internal_address(), Some("10.0.0.1"));
    }

    #[test]
    fn test_internal_address_missing() {
        let node = Node::new("node-a").with_address(AddressType::ExternalIp, "203.0.113.7");
        assert_eq!(node.internal_address(), None);
    }

    #[test]
    fn test_node_deserialization() {
        let json = r#"{
            "name": "node-a",
            "addresses": [
                {"type": "Hostname", "address": "node-a"},
                {"type": "InternalIP", "address": "10.0.0.1"},
                {"type": "SomethingNew", "address": "x"}
            ]
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.name, "node-a");
        assert_eq!(node.internal_address(), Some("10.0.0.1"));
        assert_eq!(
            node.addresses[2].kind,
            AddressType::Other("SomethingNew".into())
        );
    }

    #[test]
    fn test_address_type_wire_names() {
        let json = serde_json::to_string(&AddressType::InternalIp).unwrap();
        assert_eq!(json, "\"InternalIP\"");
        assert_eq!(AddressType::InternalDns.to_string(), "InternalDNS");
    }
}
