//! Lifecycle source seam: where node change and removal notifications
//! come from, and what receives them.

use async_trait::async_trait;
use nodehosts_core::{Node, Result};
use std::sync::Arc;

/// Receiver of node lifecycle notifications.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// A node was created or updated. `node` is `None` when the object was
    /// already gone by the time the notification was processed.
    async fn on_change(&self, key: &str, node: Option<&Node>) -> Result<()>;

    /// A node was deleted.
    async fn on_remove(&self, key: &str, node: &Node) -> Result<()>;
}

/// Source of node lifecycle notifications with named registrations.
pub trait NodeEventSource {
    /// Register `handler` for change notifications under `name`
    fn on_change(&self, name: &str, handler: Arc<dyn NodeHandler>);

    /// Register `handler` for removal notifications under `name`
    fn on_remove(&self, name: &str, handler: Arc<dyn NodeHandler>);
}
