//! Node event dispatcher: turns lifecycle notifications into hosts table
//! publications and credential cleanup.

use async_trait::async_trait;
use futures_util::future::join;
use nodehosts_core::{codec, reconcile, HostChange, Node, NodeEvent, NodeHostsError, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::{ControllerConfig, WriteMode};
use crate::gate::{Publication, PublicationGate};
use crate::source::{NodeEventSource, NodeHandler};
use crate::store::{CredentialStore, TableStore};

/// Name under which the dispatcher registers with a lifecycle source
pub const HANDLER_NAME: &str = "node";

/// Build a dispatcher and register it for change and removal notifications.
pub fn register<S>(
    source: &S,
    config: ControllerConfig,
    store: Arc<dyn TableStore>,
    credentials: Arc<dyn CredentialStore>,
) -> Result<Arc<Dispatcher>>
where
    S: NodeEventSource + ?Sized,
{
    config.validate()?;
    let dispatcher = Arc::new(Dispatcher::new(config, store, credentials));
    source.on_change(HANDLER_NAME, Arc::clone(&dispatcher) as Arc<dyn NodeHandler>);
    source.on_remove(HANDLER_NAME, Arc::clone(&dispatcher) as Arc<dyn NodeHandler>);
    Ok(dispatcher)
}

/// Keeps the published hosts table in line with node lifecycle events.
pub struct Dispatcher {
    config: ControllerConfig,
    gate: PublicationGate,
    store: Arc<dyn TableStore>,
    credentials: Arc<dyn CredentialStore>,
}

impl Dispatcher {
    /// Create a dispatcher
    #[must_use]
    pub fn new(
        config: ControllerConfig,
        store: Arc<dyn TableStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            gate: PublicationGate::new(config.modify_coredns),
            config,
            store,
            credentials,
        }
    }

    /// Handle one node observation.
    ///
    /// On removal the credential cleanup and the table update run
    /// concurrently; a cleanup failure is logged and never fails the event.
    pub async fn update_hosts(&self, node: &Node, removed: bool) -> Result<Option<HostChange>> {
        let event = NodeEvent::from_node(node, removed);

        if removed {
            let ((), hosts) = join(
                self.remove_credential(&event.name),
                self.sync_hosts(&event),
            )
            .await;
            hosts
        } else {
            self.sync_hosts(&event).await
        }
    }

    async fn remove_credential(&self, node_name: &str) {
        if let Err(e) = self.credentials.delete(node_name).await {
            warn!(node = %node_name, error = %e, "unable to remove node credential");
        }
    }

    /// Reconcile the published table with one event.
    ///
    /// Returns the change that was published, or `None` when nothing was
    /// written. Store failures abandon the pass and are returned so the
    /// caller can redeliver.
    #[instrument(skip(self, event), fields(node = %event.name, removed = event.removed))]
    pub async fn sync_hosts(&self, event: &NodeEvent) -> Result<Option<HostChange>> {
        if !self.gate.is_enabled() {
            debug!("coredns hosts publication disabled");
            return Ok(None);
        }

        if !event.removed && !event.has_address() {
            warn!(node = %event.name, "no internal address found for node");
            return Ok(None);
        }

        let mut conflicts = 0;
        loop {
            match self.publish_once(event).await {
                Err(NodeHostsError::Conflict { .. })
                    if self.config.write_mode == WriteMode::CompareAndSwap
                        && conflicts < self.config.max_conflict_retries =>
                {
                    conflicts += 1;
                    debug!(attempt = conflicts, "hosts table changed underneath, retrying");
                }
                other => return other,
            }
        }
    }

    async fn publish_once(&self, event: &NodeEvent) -> Result<Option<HostChange>> {
        let mut resource = self
            .store
            .get(&self.config.namespace, &self.config.config_map)
            .await
            .map_err(|e| {
                warn!(error = %e, "unable to fetch coredns config map");
                e
            })?;

        let before = codec::parse(resource.get(&self.config.hosts_key).unwrap_or_default());
        let reconciled = reconcile(&before, event);

        let change = match self.gate.decide(event, &before, &reconciled) {
            Publication::Skip(reason) => {
                debug!(reason = %reason, "coredns node hosts left as is");
                return Ok(None);
            }
            Publication::Publish(change) => change,
        };

        resource.set(
            self.config.hosts_key.as_str(),
            codec::serialize(&reconciled.table),
        );
        if self.config.write_mode == WriteMode::Overwrite {
            resource.resource_version = None;
        }
        self.store.update(resource).await?;

        info!(
            entry = %change.entry(),
            "{} coredns node hosts entry",
            change.action()
        );
        Ok(Some(change))
    }
}

#[async_trait]
impl NodeHandler for Dispatcher {
    async fn on_change(&self, _key: &str, node: Option<&Node>) -> Result<()> {
        match node {
            Some(node) => self.update_hosts(node, false).await.map(|_| ()),
            None => Ok(()),
        }
    }

    async fn on_remove(&self, _key: &str, node: &Node) -> Result<()> {
        self.update_hosts(node, true).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryCredentialStore, MemoryTableStore};
    use crate::store::ConfigResource;
    use nodehosts_core::{AddressType, HostEntry, HostTable};
    use tokio_test::{assert_err, assert_ok};

    fn node(name: &str, address: &str) -> Node {
        Node::new(name).with_address(AddressType::InternalIp, address)
    }

    async fn fixture(
        config: ControllerConfig,
        hosts: Option<&str>,
    ) -> (Dispatcher, Arc<MemoryTableStore>, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryTableStore::new());
        if let Some(hosts) = hosts {
            store
                .insert(ConfigResource::new("kube-system", "coredns").with_data("NodeHosts", hosts))
                .await;
        }
        let credentials = Arc::new(MemoryCredentialStore::new());
        let dispatcher = Dispatcher::new(
            config,
            Arc::clone(&store) as Arc<dyn TableStore>,
            Arc::clone(&credentials) as Arc<dyn CredentialStore>,
        );
        (dispatcher, store, credentials)
    }

    async fn hosts(store: &MemoryTableStore) -> String {
        store
            .get("kube-system", "coredns")
            .await
            .unwrap()
            .get("NodeHosts")
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn test_add_publishes_entry() {
        let (dispatcher, store, _) = fixture(ControllerConfig::default(), Some("")).await;

        let change = assert_ok!(dispatcher.update_hosts(&node("node-a", "10.0.0.1"), false).await);
        assert_eq!(
            change,
            Some(HostChange::Updated {
                entry: HostEntry::new("10.0.0.1", "node-a"),
                previous: None,
            })
        );
        assert_eq!(hosts(&store).await, "10.0.0.1 node-a\n");
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test]
    async fn test_removal_publishes_and_cleans_credential() {
        let (dispatcher, store, credentials) = fixture(
            ControllerConfig::default(),
            Some("10.0.0.1 node-a\n10.0.0.2 node-b\n"),
        )
        .await;
        credentials.insert("node-b").await;

        let change = assert_ok!(dispatcher.update_hosts(&Node::new("node-b"), true).await);
        assert_eq!(
            change,
            Some(HostChange::Removed {
                entry: HostEntry::new("10.0.0.2", "node-b"),
            })
        );
        assert_eq!(hosts(&store).await, "10.0.0.1 node-a\n");
        assert_eq!(credentials.deleted().await, vec!["node-b".to_string()]);
        assert!(!credentials.contains("node-b").await);
    }

    #[tokio::test]
    async fn test_duplicate_add_does_not_write() {
        let (dispatcher, store, _) =
            fixture(ControllerConfig::default(), Some("10.0.0.1 node-a\n")).await;

        let change = assert_ok!(dispatcher.update_hosts(&node("node-a", "10.0.0.1"), false).await);
        assert_eq!(change, None);
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_add_without_address_skips_fetch() {
        let (dispatcher, store, _) = fixture(ControllerConfig::default(), None).await;

        // The resource is missing, so a fetch would fail.
        let change = assert_ok!(dispatcher.update_hosts(&Node::new("node-a"), false).await);
        assert_eq!(change, None);
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_removal_of_absent_host_does_not_write() {
        let (dispatcher, store, credentials) =
            fixture(ControllerConfig::default(), Some("10.0.0.1 node-a\n")).await;

        let change = assert_ok!(dispatcher.update_hosts(&Node::new("node-z"), true).await);
        assert_eq!(change, None);
        assert_eq!(store.update_count(), 0);
        // Cleanup still ran.
        assert_eq!(credentials.deleted().await, vec!["node-z".to_string()]);
    }

    #[tokio::test]
    async fn test_disabled_skips_table_but_cleans_credential() {
        let config = ControllerConfig::default().with_modify_coredns(false);
        let (dispatcher, store, credentials) = fixture(config, Some("10.0.0.1 node-a\n")).await;

        let change = assert_ok!(dispatcher.update_hosts(&node("node-a", "10.0.0.1"), true).await);
        assert_eq!(change, None);
        assert_eq!(store.update_count(), 0);
        assert_eq!(hosts(&store).await, "10.0.0.1 node-a\n");
        assert_eq!(credentials.deleted().await, vec!["node-a".to_string()]);
    }

    #[tokio::test]
    async fn test_credential_failure_does_not_block_table() {
        let (dispatcher, store, credentials) =
            fixture(ControllerConfig::default(), Some("10.0.0.1 node-a\n")).await;
        credentials.set_failing(true);

        let change = assert_ok!(dispatcher.update_hosts(&Node::new("node-a"), true).await);
        assert!(change.is_some());
        assert_eq!(hosts(&store).await, "");
    }

    #[tokio::test]
    async fn test_missing_resource_fails_event() {
        let (dispatcher, store, _) = fixture(ControllerConfig::default(), None).await;

        let err = assert_err!(dispatcher.update_hosts(&node("node-a", "10.0.0.1"), false).await);
        assert!(err.is_not_found());
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_event() {
        let (dispatcher, store, _) = fixture(ControllerConfig::default(), Some("")).await;
        store.set_unavailable(true);

        let err = assert_err!(dispatcher.update_hosts(&node("node-a", "10.0.0.1"), false).await);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_preserves_other_fields_and_creates_data() {
        let store = Arc::new(MemoryTableStore::new());
        store
            .insert(ConfigResource::new("kube-system", "coredns").with_data("Corefile", ".:53 {}"))
            .await;
        store
            .insert(ConfigResource::new("kube-system", "bare"))
            .await;

        let dispatcher = Dispatcher::new(
            ControllerConfig::default(),
            Arc::clone(&store) as Arc<dyn TableStore>,
            Arc::new(MemoryCredentialStore::new()),
        );
        assert_ok!(dispatcher.update_hosts(&node("node-a", "10.0.0.1"), false).await);

        let resource = store.get("kube-system", "coredns").await.unwrap();
        assert_eq!(resource.get("Corefile"), Some(".:53 {}"));
        assert_eq!(resource.get("NodeHosts"), Some("10.0.0.1 node-a\n"));

        let config = ControllerConfig {
            config_map: "bare".into(),
            ..ControllerConfig::default()
        };
        let dispatcher = Dispatcher::new(
            config,
            Arc::clone(&store) as Arc<dyn TableStore>,
            Arc::new(MemoryCredentialStore::new()),
        );
        assert_ok!(dispatcher.update_hosts(&node("node-b", "10.0.0.2"), false).await);
        let resource = store.get("kube-system", "bare").await.unwrap();
        assert_eq!(resource.get("NodeHosts"), Some("10.0.0.2 node-b\n"));
    }

    #[tokio::test]
    async fn test_malformed_lines_are_dropped_on_publish() {
        let (dispatcher, store, _) =
            fixture(ControllerConfig::default(), Some("garbage\n10.0.0.1 node-a\n")).await;

        assert_ok!(dispatcher.update_hosts(&node("node-b", "10.0.0.2"), false).await);
        assert_eq!(hosts(&store).await, "10.0.0.1 node-a\n10.0.0.2 node-b\n");
    }

    #[tokio::test]
    async fn test_change_without_node_is_noop() {
        let (dispatcher, store, _) = fixture(ControllerConfig::default(), None).await;
        assert_ok!(dispatcher.on_change("node-a", None).await);
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_compare_and_swap_retries_conflicts() {
        let config = ControllerConfig::default().with_write_mode(WriteMode::CompareAndSwap);
        let (dispatcher, store, _) = fixture(config, Some("10.0.0.1 node-a\n")).await;
        store.inject_conflicts(2);

        assert_ok!(dispatcher.update_hosts(&node("node-b", "10.0.0.2"), false).await);
        assert_eq!(hosts(&store).await, "10.0.0.1 node-a\n10.0.0.2 node-b\n");
    }

    #[tokio::test]
    async fn test_compare_and_swap_gives_up() {
        let config = ControllerConfig {
            write_mode: WriteMode::CompareAndSwap,
            max_conflict_retries: 1,
            ..ControllerConfig::default()
        };
        let (dispatcher, store, _) = fixture(config, Some("")).await;
        store.inject_conflicts(5);

        let err = assert_err!(dispatcher.update_hosts(&node("node-b", "10.0.0.2"), false).await);
        assert!(matches!(err, NodeHostsError::Conflict { .. }));
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_mode_ignores_conflicts() {
        let (dispatcher, store, _) = fixture(ControllerConfig::default(), Some("")).await;
        store.inject_conflicts(1);

        assert_ok!(dispatcher.update_hosts(&node("node-b", "10.0.0.2"), false).await);
        assert_eq!(store.update_count(), 1);
    }

    /// Holds every fetch until two callers have fetched, so both read the
    /// same table before either writes.
    struct LockstepStore {
        inner: Arc<MemoryTableStore>,
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl TableStore for LockstepStore {
        async fn get(&self, namespace: &str, name: &str) -> Result<ConfigResource> {
            self.barrier.wait().await;
            self.inner.get(namespace, name).await
        }

        async fn update(&self, resource: ConfigResource) -> Result<ConfigResource> {
            self.inner.update(resource).await
        }
    }

    type Outcome = Result<Option<HostChange>>;

    async fn race(config: ControllerConfig) -> (Outcome, Outcome, HostTable) {
        let inner = Arc::new(MemoryTableStore::new());
        inner
            .insert(ConfigResource::new("kube-system", "coredns").with_data("NodeHosts", ""))
            .await;
        let dispatcher = Dispatcher::new(
            config,
            Arc::new(LockstepStore {
                inner: Arc::clone(&inner),
                barrier: tokio::sync::Barrier::new(2),
            }),
            Arc::new(MemoryCredentialStore::new()),
        );

        let event_a = NodeEvent::changed("a", "10.0.0.1");
        let event_b = NodeEvent::changed("b", "10.0.0.2");
        let (a, b) = tokio::join!(
            dispatcher.sync_hosts(&event_a),
            dispatcher.sync_hosts(&event_b),
        );
        (a, b, codec::parse(&hosts(&inner).await))
    }

    #[tokio::test]
    async fn test_overwrite_mode_loses_concurrent_update() {
        let (a, b, table) = race(ControllerConfig::default()).await;

        assert_ok!(a);
        assert_ok!(b);
        // Both writes landed blind; the second replaced the first.
        assert_eq!(table.len(), 1);
        assert!(table.contains("a") ^ table.contains("b"));
    }

    #[tokio::test]
    async fn test_compare_and_swap_detects_concurrent_update() {
        let config = ControllerConfig {
            write_mode: WriteMode::CompareAndSwap,
            max_conflict_retries: 0,
            ..ControllerConfig::default()
        };
        let (a, b, table) = race(config).await;

        let conflicts = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(NodeHostsError::Conflict { .. })))
            .count();
        assert_eq!(conflicts, 1);
        assert!(a.is_ok() ^ b.is_ok());
        assert_eq!(table.len(), 1);
    }
}
