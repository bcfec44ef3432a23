//! Store collaborators: the config resource holding the hosts blob, and
//! the per-node credential store.

use async_trait::async_trait;
use nodehosts_core::Result;
use std::collections::BTreeMap;

/// A named key-value config resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigResource {
    /// Namespace of the resource
    pub namespace: String,
    /// Resource name
    pub name: String,
    /// Version observed on read. `None` on update means a blind overwrite.
    pub resource_version: Option<u64>,
    /// Key-value data; may be absent on a freshly created resource
    pub data: Option<BTreeMap<String, String>>,
}

impl ConfigResource {
    /// Create a resource with no data
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            resource_version: None,
            data: None,
        }
    }

    /// Set one data field
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Value of a data field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key).map(String::as_str)
    }

    /// Set a data field, creating the data map if needed
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
    }
}

/// Storage for the config resource that carries the published table.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Fetch a resource; `NotFound` if it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<ConfigResource>;

    /// Write a resource back in full.
    ///
    /// Stores reject the write with `Conflict` only when the resource
    /// carries a version that is no longer current.
    async fn update(&self, resource: ConfigResource) -> Result<ConfigResource>;
}

/// Storage for per-node authentication credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Delete the credential of a node
    async fn delete(&self, node_name: &str) -> Result<()>;
}
