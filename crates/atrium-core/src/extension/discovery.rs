use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::ConfigData;
use crate::extension::descriptor::ModuleDescriptor;
use crate::kernel::error::Result;

/// Source of module descriptors, queried once at host start-up.
#[async_trait]
pub trait ModuleDiscovery: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn list_modules(&self) -> Result<Vec<ModuleDescriptor>>;
}

/// Fixed, in-memory list of descriptors.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    modules: Vec<ModuleDescriptor>,
}

impl StaticDiscovery {
    pub fn new(modules: Vec<ModuleDescriptor>) -> Self {
        Self { modules }
    }
}

#[async_trait]
impl ModuleDiscovery for StaticDiscovery {
    fn name(&self) -> &str {
        "static"
    }

    async fn list_modules(&self) -> Result<Vec<ModuleDescriptor>> {
        Ok(self.modules.clone())
    }
}

/// Module catalog file with a top-level `modules` list (JSON, YAML or TOML).
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    path: PathBuf,
}

impl FileDiscovery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ModuleDiscovery for FileDiscovery {
    fn name(&self) -> &str {
        "file"
    }

    async fn list_modules(&self) -> Result<Vec<ModuleDescriptor>> {
        let data = ConfigData::load(&self.path).await?;
        let modules = data
            .try_get::<Vec<ModuleDescriptor>>("modules")?
            .unwrap_or_default();
        log::info!("Discovered {} module(s) in {}", modules.len(), self.path.display());
        Ok(modules)
    }
}
