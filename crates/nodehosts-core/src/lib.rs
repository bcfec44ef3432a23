//! Core types for publishing cluster node addresses as a hosts table.
//!
//! This crate is pure and synchronous:
//!
//! - **Types**: [`Node`], [`NodeEvent`] and the [`HostTable`] keyed by hostname
//! - **Codec**: the flat `address hostname` line format ([`codec`])
//! - **Reconciler**: applying one node event to a table ([`reconcile()`])
//! - **Errors**: the shared [`NodeHostsError`] used by the store collaborators
//!
//! # Example
//!
//! ```rust
//! use nodehosts_core::{codec, reconcile, NodeEvent};
//!
//! let table = codec::parse("10.0.0.1 node-a\n10.0.0.2 node-b\n");
//! let outcome = reconcile(&table, &NodeEvent::removed("node-b", ""));
//!
//! assert!(outcome.changed());
//! assert_eq!(codec::serialize(&outcome.table), "10.0.0.1 node-a\n");
//! ```

pub mod codec;
mod error;
pub mod reconcile;
pub mod types;

pub use error::{NodeHostsError, Result};
pub use reconcile::{reconcile, HostChange, Reconciled};
pub use types::*;
