//! # Atrium Core Kernel Errors
//!
//! Defines the top-level error type of the host.
//!
//! [`Error`] aggregates the typed errors of every subsystem (extension,
//! slots, configuration) and adds the kernel's own failures: lifecycle
//! errors tagged with the [`KernelLifecyclePhase`] they happened in, and
//! component registry lookups that came back empty.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::config::error::ConfigError;
use crate::extension::error::{ExtensionError, SharedDependencyError};
use crate::slots::error::SlotError;

/// Custom error type for the Atrium host
#[derive(Debug, ThisError)]
pub enum Error {
    /// Module registry, loader or delivery error
    #[error("Extension error: {0}")]
    Extension(#[from] ExtensionError),

    /// Shared-dependency publication or resolution error
    #[error("Shared dependency error: {0}")]
    SharedDependency(#[from] SharedDependencyError),

    #[error("Slot error: {0}")]
    Slot(#[from] SlotError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        component_name: Option<String>,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Error related to component registry lookups.
    #[error("Component registry error during operation '{operation}': {message}")]
    ComponentRegistryError {
        operation: String,
        component_name: Option<String>,
        message: String,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase in the kernel's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Bootstrap")]
    Bootstrap,
    #[error("Initialize")]
    Initialize,
    #[error("Start")]
    Start,
    #[error("Shutdown")]
    Shutdown,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl Error {
    /// Wrap `source` as a lifecycle failure of `phase`.
    pub fn lifecycle(
        phase: KernelLifecyclePhase,
        component_name: Option<&str>,
        message: impl Into<String>,
        source: Option<Error>,
    ) -> Self {
        Error::KernelLifecycleError {
            phase,
            component_name: component_name.map(str::to_string),
            message: message.into(),
            source: source.map(Box::new),
        }
    }

    /// The extension error at the root of this error, if any.
    pub fn as_extension(&self) -> Option<&ExtensionError> {
        match self {
            Error::Extension(e) => Some(e),
            Error::KernelLifecycleError { source: Some(inner), .. } => inner.as_extension(),
            _ => None,
        }
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}
