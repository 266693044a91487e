use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::extension::broker::SharedDependencyBroker;
use crate::extension::error::DeliveryError;
use crate::extension::export::ModuleUnit;
use crate::extension::runtime_table::Registrar;

/// Entry file names that say nothing about the module they belong to.
const GENERIC_ENTRY_NAMES: &[&str] = &["remoteEntry", "remote-entry", "index", "main", "bundle", "entry"];

/// What delivered code gets to see of the host.
#[derive(Clone)]
pub struct DeliveryContext {
    remote_entry: String,
    broker: Arc<SharedDependencyBroker>,
    registrar: Registrar,
}

impl DeliveryContext {
    pub fn new(remote_entry: impl Into<String>, broker: Arc<SharedDependencyBroker>, registrar: Registrar) -> Self {
        Self {
            remote_entry: remote_entry.into(),
            broker,
            registrar,
        }
    }

    /// The locator being delivered.
    pub fn remote_entry(&self) -> &str {
        &self.remote_entry
    }

    /// Shared runtime dependencies published by the host.
    pub fn broker(&self) -> &SharedDependencyBroker {
        &self.broker
    }

    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    /// Shorthand for `registrar().register(..)`.
    pub fn register(&self, id: impl Into<String>, unit: ModuleUnit) {
        self.registrar.register(id, unit);
    }
}

impl fmt::Debug for DeliveryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryContext")
            .field("remote_entry", &self.remote_entry)
            .finish_non_exhaustive()
    }
}

/// Fetches and executes out-of-band module code.
///
/// Returning `Ok` means the code was fetched and handed over for execution.
/// Registration happens whenever the code runs and may come later; the loader
/// waits for it separately.
#[async_trait]
pub trait CodeDelivery: Send + Sync {
    async fn deliver(&self, context: DeliveryContext) -> Result<(), DeliveryError>;
}

/// Delivery for hosts that only run bundled modules.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelivery;

#[async_trait]
impl CodeDelivery for NoDelivery {
    async fn deliver(&self, context: DeliveryContext) -> Result<(), DeliveryError> {
        Err(DeliveryError::new(format!(
            "out-of-band delivery is not available on this host (requested '{}')",
            context.remote_entry()
        )))
    }
}

/// Registration keys tried for a module, most specific first.
///
/// The module id always comes first. After it come keys guessed from the
/// remote entry: the last path segment without extension, or the parent
/// segment when the file name is a generic entry name such as
/// `remoteEntry.js`.
pub fn registration_keys(module_id: &str, remote_entry: &str) -> Vec<String> {
    let mut keys = vec![module_id.to_string()];

    let path = remote_entry.split(['?', '#']).next().unwrap_or_default();
    // Drop scheme and host from URL-like locators
    let path = match path.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, p)| p),
        None => path,
    };
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let mut candidates = Vec::new();
    if let Some((last, parents)) = segments.split_last() {
        let stem = last.split('.').next().unwrap_or(last);
        if GENERIC_ENTRY_NAMES.contains(&stem) {
            if let Some(parent) = parents.last() {
                candidates.push(parent.to_string());
            }
        } else if !stem.is_empty() {
            candidates.push(stem.to_string());
        }
    }

    for candidate in candidates {
        let lowered = candidate.to_lowercase();
        for key in [candidate, lowered] {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}
