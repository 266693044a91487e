use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::ui::{ComponentRef, ProviderFactory};

/// Name looked up in keyed exports when no explicit name matches.
pub const DEFAULT_EXPORT: &str = "default";

/// The shape a module exposes a component under.
///
/// Resolution precedence, applied recursively:
/// 1. `Component`: the component itself.
/// 2. `Default`: resolve the wrapped export.
/// 3. `Keyed`: the entry under the requested name, else the `"default"` entry.
#[derive(Clone)]
pub enum Export {
    Component(ComponentRef),
    Default(Box<Export>),
    Keyed(BTreeMap<String, Export>),
}

impl Export {
    pub fn keyed<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Export)>,
        S: Into<String>,
    {
        Export::Keyed(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn default_of(inner: Export) -> Self {
        Export::Default(Box::new(inner))
    }

    pub fn resolve(&self, name: Option<&str>) -> Option<ComponentRef> {
        match self {
            Export::Component(component) => Some(component.clone()),
            Export::Default(inner) => inner.resolve(name),
            Export::Keyed(entries) => name
                .and_then(|n| entries.get(n))
                .or_else(|| entries.get(DEFAULT_EXPORT))
                .and_then(|export| export.resolve(None)),
        }
    }
}

impl From<ComponentRef> for Export {
    fn from(component: ComponentRef) -> Self {
        Export::Component(component)
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Component(_) => f.write_str("Component(..)"),
            Export::Default(inner) => f.debug_tuple("Default").field(inner).finish(),
            Export::Keyed(entries) => f.debug_map().entries(entries.iter()).finish(),
        }
    }
}

/// The executable unit of a module, either bundled or self-registered.
#[derive(Clone, Default)]
pub struct ModuleUnit {
    pub main: Option<Export>,
    /// Widget exports keyed by the declaration's `component_ref`.
    pub widgets: BTreeMap<String, Export>,
    /// Module-level provider shared by all of the module's widgets in a slot.
    pub provider: Option<Arc<dyn ProviderFactory>>,
}

impl ModuleUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_main(mut self, main: impl Into<Export>) -> Self {
        self.main = Some(main.into());
        self
    }

    pub fn with_widget(mut self, component_ref: impl Into<String>, export: impl Into<Export>) -> Self {
        self.widgets.insert(component_ref.into(), export.into());
        self
    }

    pub fn with_provider<P>(mut self, provider: P) -> Self
    where
        P: ProviderFactory + 'static,
    {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// The main view, if the module has one.
    pub fn main_component(&self) -> Option<ComponentRef> {
        self.main_view(None)
    }

    /// The main view selected by a descriptor's `main_view_ref`: the keyed
    /// entry of that name, else the `"default"` entry. Non-keyed exports
    /// ignore the name.
    pub fn main_view(&self, main_view_ref: Option<&str>) -> Option<ComponentRef> {
        self.main.as_ref().and_then(|main| main.resolve(main_view_ref))
    }

    /// Component for a widget: the widget export under `component_ref`,
    /// falling back to a keyed main export of the same name.
    pub fn widget_component(&self, component_ref: &str) -> Option<ComponentRef> {
        if let Some(export) = self.widgets.get(component_ref) {
            return export.resolve(None);
        }
        match &self.main {
            Some(Export::Keyed(entries)) => entries.get(component_ref).and_then(|e| e.resolve(None)),
            _ => None,
        }
    }
}

impl fmt::Debug for ModuleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleUnit")
            .field("main", &self.main)
            .field("widgets", &self.widgets.keys().collect::<Vec<_>>())
            .field("provider", &self.provider.is_some())
            .finish()
    }
}

/// Modules compiled into the host build, keyed by module id.
#[derive(Debug, Clone, Default)]
pub struct LocalBundle {
    units: HashMap<String, Arc<ModuleUnit>>,
}

impl LocalBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module_id: impl Into<String>, unit: ModuleUnit) {
        self.units.insert(module_id.into(), Arc::new(unit));
    }

    pub fn with_module(mut self, module_id: impl Into<String>, unit: ModuleUnit) -> Self {
        self.insert(module_id, unit);
        self
    }

    pub fn get(&self, module_id: &str) -> Option<Arc<ModuleUnit>> {
        self.units.get(module_id).cloned()
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.units.contains_key(module_id)
    }
}
