use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use semver::{Version, VersionReq};

use crate::extension::error::SharedDependencyError;

/// A shared singleton as handed out by the broker.
pub type SharedInstance = Arc<dyn Any + Send + Sync>;

type SharedGetter = Arc<dyn Fn() -> SharedInstance + Send + Sync>;

/// One published singleton.
#[derive(Clone)]
pub struct SharedDependencyEntry {
    pub name: String,
    pub version: Version,
    getter: SharedGetter,
}

impl SharedDependencyEntry {
    pub fn get(&self) -> SharedInstance {
        (self.getter)()
    }
}

impl fmt::Debug for SharedDependencyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedDependencyEntry")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Collects publications during host start-up.
///
/// Sealing turns it into the read-only [`SharedDependencyBroker`]; the loader
/// only accepts a sealed broker, so every publication is complete before any
/// out-of-band code can run.
#[derive(Debug, Default)]
pub struct BrokerBuilder {
    entries: BTreeMap<String, SharedDependencyEntry>,
}

impl BrokerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a getter for `name` at semver `version_key`.
    pub fn publish<F>(
        &mut self,
        name: impl Into<String>,
        version_key: &str,
        getter: F,
    ) -> Result<&mut Self, SharedDependencyError>
    where
        F: Fn() -> SharedInstance + Send + Sync + 'static,
    {
        let name = name.into();
        let version = Version::parse(version_key).map_err(|e| SharedDependencyError::InvalidVersion {
            name: name.clone(),
            version: version_key.to_string(),
            message: e.to_string(),
        })?;
        log::info!("Publishing shared dependency {}@{}", name, version);
        let entry = SharedDependencyEntry {
            name: name.clone(),
            version,
            getter: Arc::new(getter),
        };
        if let Some(previous) = self.entries.insert(name.clone(), entry) {
            log::warn!(
                "Shared dependency '{}' republished, replacing version {}",
                name,
                previous.version
            );
        }
        Ok(self)
    }

    /// Publish an existing instance; every resolution returns the same `Arc`.
    pub fn publish_instance<T>(
        &mut self,
        name: impl Into<String>,
        version_key: &str,
        instance: Arc<T>,
    ) -> Result<&mut Self, SharedDependencyError>
    where
        T: Any + Send + Sync,
    {
        self.publish(name, version_key, move || instance.clone() as SharedInstance)
    }

    pub fn seal(self) -> SharedDependencyBroker {
        SharedDependencyBroker {
            entries: self.entries,
        }
    }
}

/// Resolves shared runtime dependencies for delivered modules.
#[derive(Debug, Default)]
pub struct SharedDependencyBroker {
    entries: BTreeMap<String, SharedDependencyEntry>,
}

impl SharedDependencyBroker {
    /// Resolve `name` for a module that needs a version matching `requirement`
    /// (a semver requirement such as `^18`).
    ///
    /// Modules must treat an error as fatal for their initialization rather
    /// than instantiate a private copy.
    pub fn resolve_shared(
        &self,
        name: &str,
        requirement: &str,
    ) -> Result<SharedInstance, SharedDependencyError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| SharedDependencyError::NotPublished {
                name: name.to_string(),
                published: self.entries.keys().cloned().collect(),
            })?;

        let requirement_parsed =
            VersionReq::parse(requirement).map_err(|e| SharedDependencyError::InvalidVersion {
                name: name.to_string(),
                version: requirement.to_string(),
                message: e.to_string(),
            })?;
        if !requirement_parsed.matches(&entry.version) {
            return Err(SharedDependencyError::VersionMismatch {
                name: name.to_string(),
                requested: requirement.to_string(),
                published: entry.version.to_string(),
            });
        }

        log::debug!("Resolved shared dependency {}@{} for '{}'", name, entry.version, requirement);
        Ok(entry.get())
    }

    /// Typed form of [`resolve_shared`](Self::resolve_shared).
    pub fn resolve<T>(&self, name: &str, requirement: &str) -> Result<Arc<T>, SharedDependencyError>
    where
        T: Any + Send + Sync,
    {
        self.resolve_shared(name, requirement)?
            .downcast::<T>()
            .map_err(|_| SharedDependencyError::TypeMismatch {
                name: name.to_string(),
            })
    }

    pub fn entry(&self, name: &str) -> Option<&SharedDependencyEntry> {
        self.entries.get(name)
    }

    /// Published names with their versions.
    pub fn published(&self) -> Vec<(String, Version)> {
        self.entries
            .values()
            .map(|e| (e.name.clone(), e.version.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
