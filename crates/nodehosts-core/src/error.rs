use thiserror::Error;

/// Result type alias for node hosts operations
pub type Result<T> = std::result::Result<T, NodeHostsError>;

/// Errors surfaced by the collaborators around the reconciler.
///
/// The codec and reconciler themselves never fail; malformed input is
/// dropped and reported instead.
#[derive(Error, Debug)]
pub enum NodeHostsError {
    /// The config resource holding the hosts table does not exist
    #[error("resource not found: {namespace}/{name}")]
    NotFound {
        /// Namespace that was searched
        namespace: String,
        /// Resource name that was searched
        name: String,
    },

    /// An update carried a stale resource version
    #[error("update conflict on {namespace}/{name}")]
    Conflict {
        /// Namespace of the contended resource
        namespace: String,
        /// Name of the contended resource
        name: String,
    },

    /// The table store could not be reached or rejected the call
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Deleting a node credential failed
    #[error("credential store error: {0}")]
    Credential(String),

    /// Configuration is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeHostsError {
    /// Returns true if redelivering the event may succeed.
    ///
    /// A missing resource counts: it may not have been created yet.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Conflict { .. } | Self::Unavailable(_)
        )
    }

    /// Returns true if the resource was missing
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
