use std::any::Any;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::config::HostConfig;
use crate::extension::broker::{BrokerBuilder, SharedDependencyBroker, SharedInstance};
use crate::extension::delivery::{CodeDelivery, NoDelivery};
use crate::extension::descriptor::ModuleDescriptor;
use crate::extension::discovery::ModuleDiscovery;
use crate::extension::export::{LocalBundle, ModuleUnit};
use crate::extension::loader::ModuleLoader;
use crate::extension::registry::ModuleRegistry;
use crate::extension::runtime_table::{Registrar, RuntimeRegistrationTable};
use crate::kernel::component::{ComponentRegistry, HostComponent};
use crate::kernel::constants;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::slots::boundary::IsolationBoundary;
use crate::slots::composer::SlotComposer;
use crate::slots::context::{ContextHandle, HostContext};
use crate::slots::registry::SlotRegistry;
use crate::slots::types::SlotType;
use crate::ui::{ComponentRef, Props, View};

/// Collects everything a host needs before it starts.
///
/// Shared dependencies are published here, before [`start`](Self::start)
/// seals the broker, so no delivered module can observe a partial set.
pub struct HostBuilder {
    config: HostConfig,
    discovery: Vec<Box<dyn ModuleDiscovery>>,
    bundle: LocalBundle,
    broker: BrokerBuilder,
    delivery: Arc<dyn CodeDelivery>,
    context: Option<HostContext>,
    table: Option<Arc<RuntimeRegistrationTable>>,
}

impl HostBuilder {
    pub fn new() -> Self {
        Self {
            config: HostConfig::default(),
            discovery: Vec::new(),
            bundle: LocalBundle::new(),
            broker: BrokerBuilder::new(),
            delivery: Arc::new(NoDelivery),
            context: None,
            table: None,
        }
    }

    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a discovery source. Sources are queried in the order added, after
    /// the modules listed inline in the configuration.
    pub fn discovery<D: ModuleDiscovery + 'static>(mut self, discovery: D) -> Self {
        self.discovery.push(Box::new(discovery));
        self
    }

    /// Add a module that is compiled into the host.
    pub fn bundle_module(mut self, module_id: impl Into<String>, unit: ModuleUnit) -> Self {
        self.bundle.insert(module_id, unit);
        self
    }

    pub fn publish_shared<F>(mut self, name: impl Into<String>, version_key: &str, getter: F) -> Result<Self>
    where
        F: Fn() -> SharedInstance + Send + Sync + 'static,
    {
        self.broker.publish(name, version_key, getter)?;
        Ok(self)
    }

    pub fn publish_instance<T>(mut self, name: impl Into<String>, version_key: &str, instance: Arc<T>) -> Result<Self>
    where
        T: Any + Send + Sync,
    {
        self.broker.publish_instance(name, version_key, instance)?;
        Ok(self)
    }

    pub fn delivery<D: CodeDelivery + 'static>(mut self, delivery: D) -> Self {
        self.delivery = Arc::new(delivery);
        self
    }

    /// Initial session context. When it enables no module explicitly, every
    /// discovered module starts enabled.
    pub fn context(mut self, context: HostContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Use an existing registration table instead of a fresh one.
    pub fn registration_table(mut self, table: Arc<RuntimeRegistrationTable>) -> Self {
        self.table = Some(table);
        self
    }

    /// Bootstrap, initialize and start the host.
    pub async fn start(self) -> Result<Host> {
        log::info!("Starting {} v{} (host API {})", constants::APP_NAME, constants::APP_VERSION, constants::HOST_API_VERSION);

        let HostBuilder {
            config,
            discovery,
            bundle,
            broker,
            delivery,
            context,
            table,
        } = self;

        config
            .validate()
            .map_err(|e| Error::lifecycle(KernelLifecyclePhase::Bootstrap, None, "invalid host configuration", Some(e.into())))?;

        let modules = Arc::new(discover_modules(&config, &discovery).await?);
        log::info!("Module registry populated with {} module(s)", modules.len());

        let mut context = context.unwrap_or_default();
        if context.enabled_modules.is_empty() {
            context.enabled_modules = modules.ids().into_iter().collect();
        }
        let context = ContextHandle::new(context);

        let runtime = Handle::try_current().map_err(|e| {
            Error::lifecycle(KernelLifecyclePhase::Bootstrap, None, format!("no tokio runtime: {}", e), None)
        })?;

        let table = table.unwrap_or_default();
        let broker = Arc::new(broker.seal());
        let loader = Arc::new(ModuleLoader::new(
            modules.clone(),
            Arc::new(bundle),
            table.clone(),
            broker.clone(),
            delivery,
            config.loader_settings(),
        ));
        let composer = Arc::new(SlotComposer::new(
            SlotRegistry::new(modules.clone(), context.clone()),
            loader.clone(),
            config.reset_props.clone(),
            runtime,
        ));

        let mut components = ComponentRegistry::new();
        components.register_instance(table.clone());
        components.register_instance(loader.clone());
        components.register_instance(composer.clone());

        let mut host = Host {
            config,
            components,
            modules,
            table,
            broker,
            loader,
            composer,
            context,
            running: false,
        };
        host.run_phase(KernelLifecyclePhase::Initialize).await?;
        host.run_phase(KernelLifecyclePhase::Start).await?;
        host.running = true;
        log::info!("Host started");
        Ok(host)
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Population barrier: the registry is built once, complete, from every source.
async fn discover_modules(config: &HostConfig, sources: &[Box<dyn ModuleDiscovery>]) -> Result<ModuleRegistry> {
    let mut descriptors: Vec<ModuleDescriptor> = config.modules.clone();
    for source in sources {
        let found = source.list_modules().await.map_err(|e| {
            Error::lifecycle(
                KernelLifecyclePhase::Bootstrap,
                Some(source.name()),
                "module discovery failed",
                Some(e),
            )
        })?;
        log::debug!("Discovery '{}' returned {} module(s)", source.name(), found.len());
        descriptors.extend(found);
    }
    ModuleRegistry::from_descriptors(descriptors).map_err(|e| {
        Error::lifecycle(KernelLifecyclePhase::Bootstrap, None, "module registry population failed", Some(e.into()))
    })
}

/// A running extension host.
pub struct Host {
    config: HostConfig,
    components: ComponentRegistry,
    modules: Arc<ModuleRegistry>,
    table: Arc<RuntimeRegistrationTable>,
    broker: Arc<SharedDependencyBroker>,
    loader: Arc<ModuleLoader>,
    composer: Arc<SlotComposer>,
    context: ContextHandle,
    running: bool,
}

impl Host {
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn modules(&self) -> &Arc<ModuleRegistry> {
        &self.modules
    }

    pub fn table(&self) -> &Arc<RuntimeRegistrationTable> {
        &self.table
    }

    /// Registration entry point for code executed outside of delivery.
    pub fn registrar(&self) -> Registrar {
        Registrar::new(self.table.clone())
    }

    pub fn broker(&self) -> &Arc<SharedDependencyBroker> {
        &self.broker
    }

    pub fn loader(&self) -> &Arc<ModuleLoader> {
        &self.loader
    }

    pub fn composer(&self) -> &Arc<SlotComposer> {
        &self.composer
    }

    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    pub fn component<T: HostComponent + 'static>(&self) -> Option<Arc<T>> {
        self.components.get_concrete::<T>()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Resolve a module's main view.
    pub async fn load(&self, module_id: &str) -> Result<ComponentRef> {
        Ok(self.loader.load(module_id).await?)
    }

    /// Resolve and render a module's main view behind an isolation boundary.
    pub async fn render_main(&self, module_id: &str, props: &Props) -> Result<View> {
        let component = self.load(module_id).await?;
        let mut boundary = IsolationBoundary::for_widget(module_id, "main");
        Ok(boundary.render(&[], || component.render(props)))
    }

    pub fn render_slot(&self, slot: SlotType, props: &Props) -> Option<View> {
        self.composer.render_slot(slot, props)
    }

    /// Wait for every module load started by slot rendering.
    pub async fn settle(&self) {
        self.composer.settle().await;
    }

    /// Stop every component in reverse start order.
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        log::info!("Shutting down host...");
        for component in self.components.components().into_iter().rev() {
            log::info!("Stopping component: {}", component.name());
            if let Err(e) = component.stop().await {
                log::error!("Error stopping component {}: {}", component.name(), e);
                return Err(Error::lifecycle(
                    KernelLifecyclePhase::Shutdown,
                    Some(component.name()),
                    "component failed to stop",
                    Some(e),
                ));
            }
        }
        self.running = false;
        log::info!("Host shut down");
        Ok(())
    }

    async fn run_phase(&self, phase: KernelLifecyclePhase) -> Result<()> {
        for component in self.components.components() {
            log::debug!("{} component: {}", phase, component.name());
            let outcome = match phase {
                KernelLifecyclePhase::Initialize => component.initialize().await,
                KernelLifecyclePhase::Start => component.start().await,
                _ => Ok(()),
            };
            outcome.map_err(|e| {
                Error::lifecycle(phase, Some(component.name()), format!("component failed to {}", phase), Some(e))
            })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("modules", &self.modules.ids())
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}
