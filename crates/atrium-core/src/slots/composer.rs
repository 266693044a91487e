use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::extension::descriptor::{ModuleDescriptor, SlotWidgetDeclaration};
use crate::extension::error::ExtensionError;
use crate::extension::export::ModuleUnit;
use crate::extension::loader::ModuleLoader;
use crate::kernel::component::HostComponent;
use crate::kernel::error::Result as KernelResult;
use crate::slots::boundary::IsolationBoundary;
use crate::slots::registry::SlotRegistry;
use crate::slots::types::SlotType;
use crate::ui::{merge_props, Props, ProviderInstance, ProviderScope, View};
use crate::utils;

enum LoadState {
    Pending,
    Resolved(Arc<ModuleUnit>),
    Failed(ExtensionError),
}

/// Mutable render state of a group. Widget boundaries are declared first so
/// they are dropped before the provider that wraps them.
struct GroupView {
    widgets: HashMap<String, IsolationBoundary>,
    provider: Option<Box<dyn ProviderInstance>>,
    provider_boundary: IsolationBoundary,
}

/// Everything one module contributes to one slot while it stays visible:
/// its load state, its shared provider and the boundaries of its widgets.
struct GroupMount {
    module_id: String,
    load: Arc<Mutex<LoadState>>,
    /// Cleared on unmount; a load finishing afterwards is discarded.
    mounted: Arc<AtomicBool>,
    done: watch::Receiver<bool>,
    view: Mutex<GroupView>,
}

impl GroupMount {
    fn resolved(module_id: &str, unit: Arc<ModuleUnit>) -> Self {
        let (_, done) = watch::channel(true);
        Self::with_state(module_id, LoadState::Resolved(unit), done)
    }

    fn with_state(module_id: &str, state: LoadState, done: watch::Receiver<bool>) -> Self {
        Self {
            module_id: module_id.to_string(),
            load: Arc::new(Mutex::new(state)),
            mounted: Arc::new(AtomicBool::new(true)),
            done,
            view: Mutex::new(GroupView {
                widgets: HashMap::new(),
                provider: None,
                provider_boundary: IsolationBoundary::for_provider(module_id),
            }),
        }
    }

    fn is_failed(&self) -> bool {
        matches!(*utils::lock(&self.load), LoadState::Failed(_))
    }

    fn is_loading(&self) -> bool {
        !*self.done.borrow()
    }

    fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    fn render(
        &self,
        descriptor: &ModuleDescriptor,
        widgets: &[&SlotWidgetDeclaration],
        extra_props: &Props,
        reset_keys: &[Value],
    ) -> View {
        let unit = match &*utils::lock(&self.load) {
            LoadState::Pending => {
                return View::Fragment {
                    children: widgets
                        .iter()
                        .map(|w| View::Loading {
                            module_id: self.module_id.clone(),
                            widget_id: Some(w.widget_id.clone()),
                        })
                        .collect(),
                };
            }
            LoadState::Failed(error) => return diagnostic(&self.module_id, error),
            LoadState::Resolved(unit) => unit.clone(),
        };

        let mut view = utils::lock(&self.view);
        let GroupView {
            widgets: boundaries,
            provider,
            provider_boundary,
        } = &mut *view;
        let module_id = self.module_id.as_str();

        // Bundled modules share the host's context directly and get no provider.
        let factory = match (&unit.provider, descriptor.is_local) {
            (Some(factory), false) => factory.clone(),
            _ => {
                let scope = ProviderScope::empty();
                let children = widgets
                    .iter()
                    .map(|widget| render_widget(module_id, boundaries, &unit, widget, extra_props, reset_keys, &scope))
                    .collect();
                return View::Fragment { children };
            }
        };

        // The provider exists before any widget under it renders.
        let scope = match provider_boundary.guard(reset_keys, || {
            let instance = provider.get_or_insert_with(|| {
                log::debug!("Creating provider for module '{}'", module_id);
                factory.create(module_id)
            });
            Ok(instance.scope())
        }) {
            Ok(scope) => scope,
            Err(fallback) => return fallback,
        };

        let children: Vec<View> = widgets
            .iter()
            .map(|widget| render_widget(module_id, boundaries, &unit, widget, extra_props, reset_keys, &scope))
            .collect();

        provider_boundary
            .guard(reset_keys, || match provider.as_deref() {
                Some(instance) => instance.render(children),
                None => Ok(View::Fragment { children }),
            })
            .unwrap_or_else(|fallback| fallback)
    }
}

impl Drop for GroupMount {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn render_widget(
    module_id: &str,
    boundaries: &mut HashMap<String, IsolationBoundary>,
    unit: &ModuleUnit,
    widget: &SlotWidgetDeclaration,
    extra_props: &Props,
    reset_keys: &[Value],
    scope: &ProviderScope,
) -> View {
    let child = match ModuleLoader::widget_from_unit(unit, widget) {
        Ok(component) => {
            let props = merge_props(&widget.default_props, extra_props);
            boundaries
                .entry(widget.widget_id.clone())
                .or_insert_with(|| IsolationBoundary::for_widget(module_id, widget.widget_id.as_str()))
                .render(reset_keys, || component.render_in(&props, scope))
        }
        Err(error) => diagnostic(module_id, &error),
    };
    View::Contained {
        module_id: module_id.to_string(),
        widget_id: widget.widget_id.clone(),
        child: Box::new(child),
    }
}

fn diagnostic(module_id: &str, error: &ExtensionError) -> View {
    View::Diagnostic {
        module_id: module_id.to_string(),
        message: error.to_string(),
        retryable: error.is_retryable(),
        registered_ids: error.registered_ids().to_vec(),
    }
}

#[derive(Default)]
struct Mounts {
    groups: HashMap<(SlotType, String), Arc<GroupMount>>,
    /// Completion signals of loads whose group was unmounted mid-flight.
    abandoned: Vec<watch::Receiver<bool>>,
}

impl Mounts {
    fn unmount_where<F>(&mut self, mut remove: F) -> usize
    where
        F: FnMut(SlotType, &str, &GroupMount) -> bool,
    {
        let before = self.groups.len();
        let abandoned = &mut self.abandoned;
        self.groups.retain(|(slot, module_id), mount| {
            if !remove(*slot, module_id.as_str(), &**mount) {
                return true;
            }
            log::debug!("Unmounting module '{}' from slot '{}'", module_id, slot);
            mount.unmount();
            if mount.is_loading() {
                abandoned.push(mount.done.clone());
            }
            false
        });
        before - self.groups.len()
    }
}

/// Unmount every group whose module no longer contributes to its slot.
fn prune_hidden(slots: &SlotRegistry, mounts: &Mutex<Mounts>) -> usize {
    let context = slots.context().snapshot();
    let pruned = utils::lock(mounts).unmount_where(|slot, module_id, _| {
        !slots
            .visible_widgets_in(slot, &context)
            .iter()
            .any(|widget| widget.owner_module_id == module_id)
    });
    if pruned > 0 {
        log::info!("Context changed, unmounted {} slot group(s)", pruned);
    }
    pruned
}

/// Renders extension points.
///
/// Mount state persists between [`render_slot`](Self::render_slot) calls the
/// way mounted UI does: a module's load runs once, its provider is created
/// once, and boundaries remember faults until their reset keys change.
/// Addon code never runs while the mount table is locked, so a widget may
/// render another slot through the same composer.
pub struct SlotComposer {
    slots: SlotRegistry,
    loader: Arc<ModuleLoader>,
    reset_props: Vec<String>,
    runtime: Handle,
    mounts: Arc<Mutex<Mounts>>,
    discarded: Arc<AtomicUsize>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl SlotComposer {
    pub fn new(slots: SlotRegistry, loader: Arc<ModuleLoader>, reset_props: Vec<String>, runtime: Handle) -> Self {
        Self {
            slots,
            loader,
            reset_props,
            runtime,
            mounts: Arc::new(Mutex::new(Mounts::default())),
            discarded: Arc::new(AtomicUsize::new(0)),
            watcher: Mutex::new(None),
        }
    }

    pub fn slots(&self) -> &SlotRegistry {
        &self.slots
    }

    /// Render a slot, deriving reset keys from the configured reset props.
    ///
    /// Returns `None` when no widget is visible, so the caller renders nothing
    /// at all rather than an empty container.
    pub fn render_slot(&self, slot: SlotType, extra_props: &Props) -> Option<View> {
        let reset_keys = self.reset_keys(extra_props);
        self.render_slot_with_keys(slot, extra_props, &reset_keys)
    }

    /// Render a slot with explicit isolation-boundary reset keys.
    pub fn render_slot_with_keys(&self, slot: SlotType, extra_props: &Props, reset_keys: &[Value]) -> Option<View> {
        let widgets = self.slots.visible_widgets(slot);
        let groups = group_by_owner(&widgets);

        let plan: Vec<_> = {
            let mut mounts = utils::lock(&self.mounts);
            mounts.unmount_where(|mounted_slot, module_id, _| {
                mounted_slot == slot && !groups.iter().any(|(id, _)| *id == module_id)
            });
            if groups.is_empty() {
                return None;
            }
            groups
                .into_iter()
                .map(|(module_id, group)| {
                    let target = self.loader.modules().get_module(module_id).map(|descriptor| {
                        let mount = mounts
                            .groups
                            .entry((slot, module_id.to_string()))
                            .or_insert_with(|| Arc::new(self.mount(module_id)))
                            .clone();
                        (descriptor, mount)
                    });
                    (module_id, group, target)
                })
                .collect()
        };

        let children = plan
            .into_iter()
            .map(|(module_id, group, target)| match target {
                Ok((descriptor, mount)) => mount.render(&descriptor, &group, extra_props, reset_keys),
                Err(error) => diagnostic(module_id, &error),
            })
            .collect();

        Some(View::Slot { slot, children })
    }

    /// Wait for every pending module load, including loads of groups that
    /// were unmounted before they finished.
    pub async fn settle(&self) {
        let pending: Vec<watch::Receiver<bool>> = {
            let mut mounts = utils::lock(&self.mounts);
            let mut pending: Vec<_> = mounts.groups.values().map(|mount| mount.done.clone()).collect();
            pending.append(&mut mounts.abandoned);
            pending
        };
        for mut done in pending {
            // An error means the load task is gone; nothing left to wait for.
            let _ = done.wait_for(|finished| *finished).await;
        }
    }

    /// Drop failed mounts of `slot` so the next render loads them again.
    pub fn refresh(&self, slot: SlotType) -> usize {
        let dropped = utils::lock(&self.mounts).unmount_where(|mounted_slot, _, mount| mounted_slot == slot && mount.is_failed());
        if dropped > 0 {
            log::info!("Refreshing {} failed module(s) in slot '{}'", dropped, slot);
        }
        dropped
    }

    /// Unmount everything.
    pub fn unmount_all(&self) {
        utils::lock(&self.mounts).unmount_where(|_, _, _| true);
    }

    /// Number of (slot, module) groups currently mounted.
    pub fn mounted_count(&self) -> usize {
        utils::lock(&self.mounts).groups.len()
    }

    /// Loads that finished after their group had been unmounted.
    pub fn discarded_loads(&self) -> usize {
        self.discarded.load(Ordering::SeqCst)
    }

    fn reset_keys(&self, props: &Props) -> Vec<Value> {
        self.reset_props
            .iter()
            .map(|key| props.get(key).cloned().unwrap_or(Value::Null))
            .collect()
    }

    fn mount(&self, module_id: &str) -> GroupMount {
        if let Some(unit) = self.loader.resolve_local(module_id) {
            return GroupMount::resolved(module_id, unit);
        }

        let (done_tx, done) = watch::channel(false);
        let mount = GroupMount::with_state(module_id, LoadState::Pending, done);
        let load = mount.load.clone();
        let mounted = mount.mounted.clone();
        let discarded = self.discarded.clone();
        let loader = self.loader.clone();
        let module_id = module_id.to_string();

        self.runtime.spawn(async move {
            let outcome = loader.resolve_unit(&module_id).await;
            if mounted.load(Ordering::SeqCst) {
                *utils::lock(&load) = match outcome {
                    Ok(unit) => LoadState::Resolved(unit),
                    Err(error) => LoadState::Failed(error),
                };
            } else {
                log::debug!("Discarding load result of unmounted module '{}'", module_id);
                discarded.fetch_add(1, Ordering::SeqCst);
            }
            done_tx.send_replace(true);
        });
        mount
    }
}

impl fmt::Debug for SlotComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotComposer")
            .field("reset_props", &self.reset_props)
            .field("mounted", &self.mounted_count())
            .finish_non_exhaustive()
    }
}

/// Group widgets by owning module, keeping first-appearance order.
fn group_by_owner(widgets: &[SlotWidgetDeclaration]) -> Vec<(&str, Vec<&SlotWidgetDeclaration>)> {
    let mut groups: Vec<(&str, Vec<&SlotWidgetDeclaration>)> = Vec::new();
    for widget in widgets {
        match groups.iter_mut().find(|(id, _)| *id == widget.owner_module_id) {
            Some((_, members)) => members.push(widget),
            None => groups.push((widget.owner_module_id.as_str(), vec![widget])),
        }
    }
    groups
}

#[async_trait]
impl HostComponent for SlotComposer {
    fn name(&self) -> &'static str {
        "SlotComposer"
    }

    /// Watch the host context and unmount groups as soon as they become
    /// hidden, instead of waiting for the next render of their slot.
    async fn start(&self) -> KernelResult<()> {
        let slots = self.slots.clone();
        let mounts = self.mounts.clone();
        let mut changes = self.slots.context().subscribe();
        let watcher = self.runtime.spawn(async move {
            while changes.changed().await.is_ok() {
                prune_hidden(&slots, &mounts);
            }
        });
        if let Some(previous) = utils::lock(&self.watcher).replace(watcher) {
            previous.abort();
        }
        Ok(())
    }

    async fn stop(&self) -> KernelResult<()> {
        if let Some(watcher) = utils::lock(&self.watcher).take() {
            watcher.abort();
        }
        log::info!("Unmounting {} slot group(s)", self.mounted_count());
        self.unmount_all();
        Ok(())
    }
}
