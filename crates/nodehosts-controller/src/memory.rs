//! In-memory collaborators for embedding and tests.
//!
//! - [`MemoryTableStore`]: versioned config resources with conflict checks
//! - [`MemoryCredentialStore`]: node credentials with a deletion log
//! - [`ChannelEventSource`]: lifecycle notifications fed through a channel

use async_trait::async_trait;
use nodehosts_core::{Node, NodeHostsError, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock as StdRwLock};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::source::{NodeEventSource, NodeHandler};
use crate::store::{ConfigResource, CredentialStore, TableStore};

/// Config resources held in memory, keyed by namespace and name.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    resources: RwLock<HashMap<(String, String), ConfigResource>>,
    unavailable: AtomicBool,
    pending_conflicts: AtomicU32,
    updates: AtomicUsize,
}

impl MemoryTableStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a resource, bumping its version
    pub async fn insert(&self, mut resource: ConfigResource) {
        let key = (resource.namespace.clone(), resource.name.clone());
        let mut resources = self.resources.write().await;
        let version = resources
            .get(&key)
            .and_then(|r| r.resource_version)
            .unwrap_or(0);
        resource.resource_version = Some(version + 1);
        resources.insert(key, resource);
    }

    /// Make every call fail with `Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Simulate `count` concurrent writers: each of the next `count`
    /// versioned updates finds the resource already changed.
    pub fn inject_conflicts(&self, count: u32) {
        self.pending_conflicts.store(count, Ordering::SeqCst);
    }

    /// Number of successful updates
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(NodeHostsError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }

    fn take_conflict(&self) -> bool {
        self.pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<ConfigResource> {
        self.check_available()?;
        self.resources
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| NodeHostsError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn update(&self, mut resource: ConfigResource) -> Result<ConfigResource> {
        self.check_available()?;
        let key = (resource.namespace.clone(), resource.name.clone());
        let mut resources = self.resources.write().await;

        let current = resources
            .get_mut(&key)
            .ok_or_else(|| NodeHostsError::NotFound {
                namespace: key.0.clone(),
                name: key.1.clone(),
            })?;
        let current_version = current.resource_version.unwrap_or(0);

        if let Some(version) = resource.resource_version {
            if self.take_conflict() {
                // Someone else wrote first.
                current.resource_version = Some(current_version + 1);
                return Err(NodeHostsError::Conflict {
                    namespace: key.0,
                    name: key.1,
                });
            }
            if version != current_version {
                return Err(NodeHostsError::Conflict {
                    namespace: key.0,
                    name: key.1,
                });
            }
        }

        resource.resource_version = Some(current_version + 1);
        *current = resource.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        debug!(namespace = %key.0, name = %key.1, "config resource updated");
        Ok(resource)
    }
}

/// Node credentials held in memory.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<BTreeSet<String>>,
    deleted: RwLock<Vec<String>>,
    failing: AtomicBool,
}

impl MemoryCredentialStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a credential for `node_name`
    pub async fn insert(&self, node_name: impl Into<String>) {
        self.credentials.write().await.insert(node_name.into());
    }

    /// Returns true if `node_name` still has a credential
    pub async fn contains(&self, node_name: &str) -> bool {
        self.credentials.read().await.contains(node_name)
    }

    /// Node names passed to successful deletes, in call order
    pub async fn deleted(&self) -> Vec<String> {
        self.deleted.read().await.clone()
    }

    /// Make every delete fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn delete(&self, node_name: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NodeHostsError::Credential(format!(
                "cannot delete credential for {node_name}"
            )));
        }
        // Deleting a missing credential is not an error.
        self.credentials.write().await.remove(node_name);
        self.deleted.write().await.push(node_name.to_string());
        Ok(())
    }
}

/// A lifecycle notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeNotification {
    /// A node was created or updated; `None` if it is already gone
    Changed {
        /// Object key
        key: String,
        /// Node object, if still present
        node: Option<Node>,
    },
    /// A node was deleted
    Removed {
        /// Object key
        key: String,
        /// Last known node object
        node: Node,
    },
}

impl NodeNotification {
    /// Change notification for a live node
    #[must_use]
    pub fn changed(node: Node) -> Self {
        Self::Changed {
            key: node.name.clone(),
            node: Some(node),
        }
    }

    /// Removal notification
    #[must_use]
    pub fn removed(node: Node) -> Self {
        Self::Removed {
            key: node.name.clone(),
            node,
        }
    }

    /// Object key
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Changed { key, .. } | Self::Removed { key, .. } => key,
        }
    }
}

/// Outcome of draining a [`ChannelEventSource`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Notifications every handler accepted
    pub delivered: usize,
    /// Notifications that still failed after redelivery
    pub failed: usize,
}

type Registrations = StdRwLock<Vec<(String, Arc<dyn NodeHandler>)>>;

/// Lifecycle source fed from an mpsc channel.
///
/// Each node key gets its own worker task. Notifications for different
/// nodes run concurrently; those for one node run one at a time in channel
/// order. A handler error that is retryable is redelivered up to
/// `max_redeliveries` times.
pub struct ChannelEventSource {
    change_handlers: Registrations,
    remove_handlers: Registrations,
    max_redeliveries: u32,
    redelivery_backoff: Duration,
}

impl Default for ChannelEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelEventSource {
    /// Create a source with no handlers and three redeliveries
    #[must_use]
    pub fn new() -> Self {
        Self {
            change_handlers: StdRwLock::new(Vec::new()),
            remove_handlers: StdRwLock::new(Vec::new()),
            max_redeliveries: 3,
            redelivery_backoff: Duration::from_millis(10),
        }
    }

    /// Set the redelivery policy
    #[must_use]
    pub fn with_redelivery(mut self, max_redeliveries: u32, backoff: Duration) -> Self {
        self.max_redeliveries = max_redeliveries;
        self.redelivery_backoff = backoff;
        self
    }

    /// Names of the registered change and removal handlers
    pub fn registered(&self) -> (Vec<String>, Vec<String>) {
        let names = |handlers: &Registrations| -> Vec<String> {
            handlers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        };
        (names(&self.change_handlers), names(&self.remove_handlers))
    }

    /// Create a channel whose receiver can be passed to [`Self::run`]
    #[must_use]
    pub fn channel(
        capacity: usize,
    ) -> (
        mpsc::Sender<NodeNotification>,
        mpsc::Receiver<NodeNotification>,
    ) {
        mpsc::channel(capacity)
    }

    /// Deliver one notification to every matching handler, redelivering
    /// retryable failures.
    pub async fn dispatch(&self, notification: &NodeNotification) -> Result<()> {
        let handlers = match notification {
            NodeNotification::Changed { .. } => &self.change_handlers,
            NodeNotification::Removed { .. } => &self.remove_handlers,
        };
        let handlers: Vec<_> = handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (name, handler) in handlers {
            let mut attempt = 0;
            loop {
                let result = match notification {
                    NodeNotification::Changed { key, node } => {
                        handler.on_change(key, node.as_ref()).await
                    }
                    NodeNotification::Removed { key, node } => handler.on_remove(key, node).await,
                };
                match result {
                    Ok(()) => break,
                    Err(e) if e.is_retryable() && attempt < self.max_redeliveries => {
                        attempt += 1;
                        debug!(handler = %name, key = %notification.key(), attempt, error = %e, "redelivering");
                        tokio::time::sleep(self.redelivery_backoff).await;
                    }
                    Err(e) => {
                        warn!(handler = %name, key = %notification.key(), error = %e, "handler failed");
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Handle notifications until every sender is dropped.
    pub async fn run(self: Arc<Self>, receiver: mpsc::Receiver<NodeNotification>) -> DeliveryReport {
        let mut stream = ReceiverStream::new(receiver);
        let mut lanes: HashMap<String, mpsc::UnboundedSender<NodeNotification>> = HashMap::new();
        let mut workers = JoinSet::new();

        while let Some(notification) = stream.next().await {
            let lane = lanes
                .entry(notification.key().to_string())
                .or_insert_with(|| {
                    let (tx, rx) = mpsc::unbounded_channel();
                    workers.spawn(Arc::clone(&self).drain_lane(rx));
                    tx
                });
            if let Err(e) = lane.send(notification) {
                warn!(key = %e.0.key(), "notification worker gone, dropping");
            }
        }
        // Closing the lanes lets each worker finish its backlog and exit.
        drop(lanes);

        let mut report = DeliveryReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(lane) => {
                    report.delivered += lane.delivered;
                    report.failed += lane.failed;
                }
                Err(e) => warn!(error = %e, "notification worker aborted"),
            }
        }
        report
    }

    async fn drain_lane(
        self: Arc<Self>,
        mut lane: mpsc::UnboundedReceiver<NodeNotification>,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        while let Some(notification) = lane.recv().await {
            if self.dispatch(&notification).await.is_ok() {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }
}

impl NodeEventSource for ChannelEventSource {
    fn on_change(&self, name: &str, handler: Arc<dyn NodeHandler>) {
        self.change_handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), handler));
    }

    fn on_remove(&self, name: &str, handler: Arc<dyn NodeHandler>) {
        self.remove_handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), handler));
    }
}
