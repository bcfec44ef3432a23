//! Publishes cluster node addresses as a hosts table for in-cluster DNS.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use nodehosts::memory::{ChannelEventSource, MemoryCredentialStore, MemoryTableStore, NodeNotification};
//! use nodehosts::{register, AddressType, ControllerConfig, Node};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> nodehosts::Result<()> {
//!     let source = Arc::new(ChannelEventSource::new());
//!     register(
//!         source.as_ref(),
//!         ControllerConfig::default(),
//!         Arc::new(MemoryTableStore::new()),
//!         Arc::new(MemoryCredentialStore::new()),
//!     )?;
//!
//!     let (tx, rx) = ChannelEventSource::channel(64);
//!     let worker = tokio::spawn(Arc::clone(&source).run(rx));
//!
//!     let node = Node::new("node-a").with_address(AddressType::InternalIp, "10.0.0.1");
//!     tx.send(NodeNotification::changed(node)).await.ok();
//!     drop(tx);
//!
//!     let report = worker.await.expect("worker panicked");
//!     println!("delivered {} notifications", report.delivered);
//!     Ok(())
//! }
//! ```
//!
//! # Crates
//!
//! - `nodehosts-core`: types, codec and reconciler (pure, synchronous)
//! - `nodehosts-controller`: dispatcher, publication gate, config and collaborators

// Re-export core types
pub use nodehosts_core::*;

// Re-export controller
pub use nodehosts_controller::{
    config, gate, memory, register, ConfigResource, ControllerConfig, CredentialStore,
    Dispatcher, NodeEventSource, NodeHandler, Publication, PublicationGate, SkipReason,
    TableStore, WriteMode, HANDLER_NAME,
};

// Re-export runtime for convenience
pub use tokio;
