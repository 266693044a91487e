use std::collections::HashMap;
use std::sync::Arc;

use crate::extension::descriptor::ModuleDescriptor;
use crate::extension::error::ExtensionError;

/// The authoritative list of modules known to the host.
///
/// Built once at start-up from static configuration and discovery and never
/// mutated afterwards, so a successful [`get_module`](Self::get_module) always
/// sees a fully populated descriptor.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    /// Modules in registration order
    modules: Vec<Arc<ModuleDescriptor>>,
    /// Module id -> position in `modules`
    index: HashMap<String, usize>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate a registry, validating every descriptor.
    pub fn from_descriptors<I>(descriptors: I) -> Result<Self, ExtensionError>
    where
        I: IntoIterator<Item = ModuleDescriptor>,
    {
        let mut registry = Self::new();
        for descriptor in descriptors {
            descriptor.validate()?;
            if registry.index.contains_key(&descriptor.id) {
                return Err(ExtensionError::DuplicateModule {
                    module_id: descriptor.id,
                });
            }
            if !descriptor.is_local && descriptor.remote_entry_ref.is_none() {
                log::warn!(
                    "Module '{}' is neither local nor has a remote entry; loading it will fail",
                    descriptor.id
                );
            }
            log::debug!(
                "Registered module '{}' ({} widget(s), {})",
                descriptor.id,
                descriptor.widgets().count(),
                if descriptor.is_local { "local" } else { "remote" }
            );
            registry
                .index
                .insert(descriptor.id.clone(), registry.modules.len());
            registry.modules.push(Arc::new(descriptor));
        }
        Ok(registry)
    }

    /// All modules, in registration order.
    pub fn list_modules(&self) -> &[Arc<ModuleDescriptor>] {
        &self.modules
    }

    pub fn get_module(&self, id: &str) -> Result<Arc<ModuleDescriptor>, ExtensionError> {
        self.index
            .get(id)
            .map(|&position| self.modules[position].clone())
            .ok_or_else(|| ExtensionError::ModuleNotFound {
                module_id: id.to_string(),
            })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
