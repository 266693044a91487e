//! # Atrium Core Extension Errors
//!
//! Defines error types for the extension system.
//!
//! [`ExtensionError`] is what the loader returns. Configuration and
//! registration failures are ordinary results here, rendered as an inline
//! diagnostic card by the slot composer; nothing in this taxonomy is fatal to
//! the host. [`SharedDependencyError`] covers broker lookups and
//! [`DeliveryError`] is raised by the out-of-band delivery collaborator.
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    #[error("Module '{module_id}' is not known to the host")]
    ModuleNotFound { module_id: String },

    #[error("Module '{module_id}' is declared more than once")]
    DuplicateModule { module_id: String },

    #[error("Invalid descriptor for module '{module_id}': {message}")]
    InvalidDescriptor { module_id: String, message: String },

    /// The module has neither a bundled implementation nor a remote entry.
    #[error("Configuration error for module '{module_id}': {message}")]
    Configuration { module_id: String, message: String },

    #[error("Delivery of '{remote_entry}' for module '{module_id}' failed: {message}")]
    Delivery {
        module_id: String,
        remote_entry: String,
        message: String,
    },

    /// Delivered code did not register itself in time.
    #[error(
        "Module '{module_id}' did not register within {}ms after delivering '{remote_entry}' (registered: [{}])",
        .waited.as_millis(),
        .registered_ids.join(", ")
    )]
    NotRegistered {
        module_id: String,
        remote_entry: String,
        waited: Duration,
        registered_ids: Vec<String>,
    },

    #[error("Module '{module_id}' does not export '{component_ref}' for widget '{widget_id}'")]
    WidgetNotExported {
        module_id: String,
        widget_id: String,
        component_ref: String,
    },

    #[error("Shared dependency error: {0}")]
    SharedDependency(#[from] SharedDependencyError),
}

impl ExtensionError {
    /// Whether a manual refresh may succeed where this attempt failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExtensionError::NotRegistered { .. } | ExtensionError::Delivery { .. }
        )
    }

    /// Registered ids attached to a registration timeout, empty otherwise.
    pub fn registered_ids(&self) -> &[String] {
        match self {
            ExtensionError::NotRegistered { registered_ids, .. } => registered_ids,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SharedDependencyError {
    #[error("Shared dependency '{name}' has an invalid version '{version}': {message}")]
    InvalidVersion {
        name: String,
        version: String,
        message: String,
    },

    #[error("Shared dependency '{name}' is not published (published: [{}])", .published.join(", "))]
    NotPublished { name: String, published: Vec<String> },

    #[error("Shared dependency '{name}' is published at {published}, which does not satisfy '{requested}'")]
    VersionMismatch {
        name: String,
        requested: String,
        published: String,
    },

    #[error("Shared dependency '{name}' is not of the requested type")]
    TypeMismatch { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DeliveryError {
    pub message: String,
}

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
