//! Node lifecycle handlers that keep the cluster hosts table published.
//!
//! A [`Dispatcher`] receives node change and removal notifications,
//! reconciles the hosts table stored in a config resource and writes it
//! back when the [`PublicationGate`] allows it. Removals also delete the
//! node's credential.
//!
//! # Collaborators
//!
//! - [`TableStore`]: the config resource holding the hosts blob
//! - [`CredentialStore`]: per-node credentials
//! - [`NodeEventSource`]: where notifications come from
//!
//! In-memory versions of all three live in [`memory`].
//!
//! # Example
//!
//! ```rust,ignore
//! use nodehosts_controller::{register, ControllerConfig};
//! use nodehosts_controller::memory::{ChannelEventSource, MemoryCredentialStore, MemoryTableStore};
//! use std::sync::Arc;
//!
//! let source = Arc::new(ChannelEventSource::new());
//! let (tx, rx) = ChannelEventSource::channel(64);
//! register(
//!     source.as_ref(),
//!     ControllerConfig::default(),
//!     Arc::new(MemoryTableStore::new()),
//!     Arc::new(MemoryCredentialStore::new()),
//! )?;
//! tokio::spawn(source.run(rx));
//! ```

pub mod config;
mod dispatcher;
pub mod gate;
pub mod memory;
mod source;
mod store;

pub use config::{ControllerConfig, WriteMode};
pub use dispatcher::{register, Dispatcher, HANDLER_NAME};
pub use gate::{Publication, PublicationGate, SkipReason};
pub use nodehosts_core::{NodeHostsError, Result};
pub use source::{NodeEventSource, NodeHandler};
pub use store::{ConfigResource, CredentialStore, TableStore};
