use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::extension::broker::SharedDependencyBroker;
use crate::extension::delivery::{registration_keys, CodeDelivery, DeliveryContext};
use crate::extension::descriptor::{ModuleDescriptor, SlotWidgetDeclaration};
use crate::extension::error::ExtensionError;
use crate::extension::export::{LocalBundle, ModuleUnit};
use crate::extension::registry::ModuleRegistry;
use crate::extension::runtime_table::{Registrar, RuntimeRegistrationTable};
use crate::kernel::component::HostComponent;
use crate::kernel::constants;
use crate::kernel::error::Result as KernelResult;
use crate::ui::{ComponentRef, PlaceholderView};
use crate::utils;

/// Timing of remote module resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSettings {
    /// Re-check interval while waiting for a registration.
    pub poll_interval: Duration,
    /// Hard bound on delivery plus the registration wait, from the moment
    /// resolution starts.
    pub registration_timeout: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(constants::DEFAULT_POLL_INTERVAL_MS),
            registration_timeout: Duration::from_millis(constants::DEFAULT_REGISTRATION_TIMEOUT_MS),
        }
    }
}

/// Resolves module ids into executable units and components.
///
/// Bundled modules resolve without suspending. Everything else goes through
/// out-of-band delivery (at most once per remote entry) followed by a bounded
/// wait on the runtime registration table.
pub struct ModuleLoader {
    modules: Arc<ModuleRegistry>,
    bundle: Arc<LocalBundle>,
    table: Arc<RuntimeRegistrationTable>,
    broker: Arc<SharedDependencyBroker>,
    delivery: Arc<dyn CodeDelivery>,
    /// One cell per remote entry; initialized once its delivery succeeded.
    deliveries: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
    settings: LoaderSettings,
}

impl ModuleLoader {
    pub fn new(
        modules: Arc<ModuleRegistry>,
        bundle: Arc<LocalBundle>,
        table: Arc<RuntimeRegistrationTable>,
        broker: Arc<SharedDependencyBroker>,
        delivery: Arc<dyn CodeDelivery>,
        settings: LoaderSettings,
    ) -> Self {
        Self {
            modules,
            bundle,
            table,
            broker,
            delivery,
            deliveries: Mutex::new(HashMap::new()),
            settings,
        }
    }

    pub fn modules(&self) -> &Arc<ModuleRegistry> {
        &self.modules
    }

    pub fn settings(&self) -> LoaderSettings {
        self.settings
    }

    /// Resolve the main view of a module, picking the export named by its
    /// descriptor's `main_view_ref` when the main export is keyed.
    ///
    /// A module that registered without a main view resolves to a placeholder
    /// reporting that the module is active; that is not an error.
    pub async fn load(&self, module_id: &str) -> Result<ComponentRef, ExtensionError> {
        let descriptor = self.modules.get_module(module_id)?;
        let unit = self.resolve_unit(module_id).await?;
        Ok(unit.main_view(descriptor.main_view_ref.as_deref()).unwrap_or_else(|| {
            log::info!("Module '{}' is active but has no main view", module_id);
            PlaceholderView::new(module_id).into_ref()
        }))
    }

    /// Resolve the component behind one slot widget.
    pub async fn load_widget(
        &self,
        declaration: &SlotWidgetDeclaration,
    ) -> Result<ComponentRef, ExtensionError> {
        let unit = self.resolve_unit(&declaration.owner_module_id).await?;
        Self::widget_from_unit(&unit, declaration)
    }

    /// Pick a widget's component out of an already resolved unit.
    pub fn widget_from_unit(
        unit: &ModuleUnit,
        declaration: &SlotWidgetDeclaration,
    ) -> Result<ComponentRef, ExtensionError> {
        unit.widget_component(&declaration.component_ref)
            .ok_or_else(|| ExtensionError::WidgetNotExported {
                module_id: declaration.owner_module_id.clone(),
                widget_id: declaration.widget_id.clone(),
                component_ref: declaration.component_ref.clone(),
            })
    }

    /// The bundled unit of a local module, without suspending.
    pub fn resolve_local(&self, module_id: &str) -> Option<Arc<ModuleUnit>> {
        let descriptor = self.modules.get_module(module_id).ok()?;
        self.bundled_unit(&descriptor)
    }

    /// Resolve the executable unit of a module.
    pub async fn resolve_unit(&self, module_id: &str) -> Result<Arc<ModuleUnit>, ExtensionError> {
        let descriptor = self.modules.get_module(module_id)?;

        if let Some(unit) = self.bundled_unit(&descriptor) {
            log::debug!("Module '{}' resolved from the local bundle", module_id);
            return Ok(unit);
        }

        let remote_entry = descriptor.remote_entry_ref.as_deref().ok_or_else(|| {
            let message = if descriptor.is_local {
                "module is marked local but is not in the bundle, and has no remote entry"
            } else {
                "module has no remote entry"
            };
            log::error!("Cannot load module '{}': {}", module_id, message);
            ExtensionError::Configuration {
                module_id: module_id.to_string(),
                message: message.to_string(),
            }
        })?;

        // Code that already ran needs no delivery
        if let Some(entry) = self.table.get(module_id) {
            return Ok(entry.unit.clone());
        }

        // One deadline covers delivery and the registration wait together
        let started = Instant::now();
        let deadline = started + self.settings.registration_timeout;
        match tokio::time::timeout_at(deadline, self.ensure_delivered(module_id, remote_entry)).await {
            Ok(delivered) => delivered?,
            Err(_) => {
                let message = format!(
                    "delivery did not complete within {}ms",
                    self.settings.registration_timeout.as_millis()
                );
                log::error!("Delivery of '{}' for module '{}' stalled: {}", remote_entry, module_id, message);
                return Err(ExtensionError::Delivery {
                    module_id: module_id.to_string(),
                    remote_entry: remote_entry.to_string(),
                    message,
                });
            }
        }
        self.await_registration(module_id, remote_entry, started, deadline).await
    }

    /// Number of distinct remote entries delivered successfully so far.
    pub fn delivered_count(&self) -> usize {
        utils::lock(&self.deliveries)
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    fn bundled_unit(&self, descriptor: &ModuleDescriptor) -> Option<Arc<ModuleUnit>> {
        if descriptor.is_local {
            self.bundle.get(&descriptor.id)
        } else {
            None
        }
    }

    /// Trigger delivery of `remote_entry` unless it already succeeded.
    ///
    /// Concurrent callers for the same entry share one delivery. A failed
    /// delivery leaves the cell empty so a later refresh tries again.
    async fn ensure_delivered(&self, module_id: &str, remote_entry: &str) -> Result<(), ExtensionError> {
        let cell = utils::lock(&self.deliveries)
            .entry(remote_entry.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        cell.get_or_try_init(|| async {
            log::info!("Delivering '{}' for module '{}'", remote_entry, module_id);
            let context = DeliveryContext::new(
                remote_entry,
                self.broker.clone(),
                Registrar::new(self.table.clone()),
            );
            self.delivery.deliver(context).await
        })
        .await
        .map(|_| ())
        .map_err(|e| {
            log::error!("Delivery of '{}' for module '{}' failed: {}", remote_entry, module_id, e);
            ExtensionError::Delivery {
                module_id: module_id.to_string(),
                remote_entry: remote_entry.to_string(),
                message: e.to_string(),
            }
        })
    }

    /// Wait until the module shows up in the registration table.
    ///
    /// Wakes on every registration and at least every `poll_interval`; gives
    /// up at `deadline`. A registration arriving after that cannot turn this
    /// result into a success.
    async fn await_registration(
        &self,
        module_id: &str,
        remote_entry: &str,
        started: Instant,
        deadline: Instant,
    ) -> Result<Arc<ModuleUnit>, ExtensionError> {
        let keys = registration_keys(module_id, remote_entry);
        // Subscribe before the first check so no registration slips between them
        let mut signal = self.table.subscribe();

        loop {
            if let Some((key, entry)) = keys
                .iter()
                .find_map(|key| self.table.get(key).map(|entry| (key, entry)))
            {
                if key != module_id {
                    log::info!(
                        "Module '{}' found under fallback registration key '{}'",
                        module_id,
                        key
                    );
                }
                return Ok(entry.unit.clone());
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = (deadline - now).min(self.settings.poll_interval);
            log::debug!(
                "Module '{}' not registered yet, waiting up to {}ms",
                module_id,
                wait.as_millis()
            );
            if let Ok(Err(_)) = tokio::time::timeout(wait, signal.changed()).await {
                // The table is gone; fall back to plain interval polling.
                tokio::time::sleep(wait).await;
            }
        }

        let registered_ids = self.table.registered_ids();
        log::error!(
            "Module '{}' did not register within {}ms (registered: {:?})",
            module_id,
            self.settings.registration_timeout.as_millis(),
            registered_ids
        );
        Err(ExtensionError::NotRegistered {
            module_id: module_id.to_string(),
            remote_entry: remote_entry.to_string(),
            waited: started.elapsed(),
            registered_ids,
        })
    }
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("modules", &self.modules.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl HostComponent for ModuleLoader {
    fn name(&self) -> &'static str {
        "ModuleLoader"
    }

    async fn initialize(&self) -> KernelResult<()> {
        let (local, remote): (Vec<_>, Vec<_>) = self
            .modules
            .list_modules()
            .iter()
            .partition(|m| self.bundled_unit(m).is_some());
        log::info!(
            "Module loader ready: {} bundled, {} delivered out of band",
            local.len(),
            remote.len()
        );
        for module in remote.iter().filter(|m| m.remote_entry_ref.is_none()) {
            log::warn!(
                "Module '{}' is neither bundled nor has a remote entry; loading it will fail",
                module.id
            );
        }
        Ok(())
    }

    /// Forget completed deliveries so a restarted host delivers again.
    async fn stop(&self) -> KernelResult<()> {
        let mut deliveries = utils::lock(&self.deliveries);
        log::debug!("Forgetting {} remote entry delivery state(s)", deliveries.len());
        deliveries.clear();
        Ok(())
    }
}
