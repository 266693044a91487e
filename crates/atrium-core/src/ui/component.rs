use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::kernel::constants;
use crate::ui::error::RenderFault;
use crate::ui::view::{Props, View};

/// State a module-level provider shares with every widget it wraps.
///
/// Cloning shares the same state. Widgets rendered without a provider get an
/// empty scope.
#[derive(Clone, Default)]
pub struct ProviderScope {
    state: Option<Arc<dyn Any + Send + Sync>>,
}

impl ProviderScope {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new<T: Any + Send + Sync>(state: Arc<T>) -> Self {
        Self { state: Some(state) }
    }

    /// The shared state, if there is one of type `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.state.clone().and_then(|state| Arc::downcast::<T>(state).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none()
    }
}

impl fmt::Debug for ProviderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderScope")
            .field("empty", &self.is_empty())
            .finish()
    }
}

/// A renderable unit contributed by an addon.
pub trait Component: Send + Sync {
    fn render(&self, props: &Props) -> Result<View, RenderFault>;

    /// Render under a module provider. Components that do not read provider
    /// state keep the default, which ignores the scope.
    fn render_in(&self, props: &Props, scope: &ProviderScope) -> Result<View, RenderFault> {
        let _ = scope;
        self.render(props)
    }
}

impl<F> Component for F
where
    F: Fn(&Props) -> Result<View, RenderFault> + Send + Sync,
{
    fn render(&self, props: &Props) -> Result<View, RenderFault> {
        self(props)
    }
}

/// Shared handle to a component.
pub type ComponentRef = Arc<dyn Component>;

/// Wrap a closure as a [`ComponentRef`].
pub fn component<F>(render: F) -> ComponentRef
where
    F: Fn(&Props) -> Result<View, RenderFault> + Send + Sync + 'static,
{
    Arc::new(render)
}

/// Wrap a closure that also reads its provider's scope.
pub fn scoped_component<F>(render: F) -> ComponentRef
where
    F: Fn(&Props, &ProviderScope) -> Result<View, RenderFault> + Send + Sync + 'static,
{
    Arc::new(Scoped(render))
}

struct Scoped<F>(F);

impl<F> Component for Scoped<F>
where
    F: Fn(&Props, &ProviderScope) -> Result<View, RenderFault> + Send + Sync,
{
    fn render(&self, props: &Props) -> Result<View, RenderFault> {
        (self.0)(props, &ProviderScope::empty())
    }

    fn render_in(&self, props: &Props, scope: &ProviderScope) -> Result<View, RenderFault> {
        (self.0)(props, scope)
    }
}

/// A live module-level provider wrapping every widget a module contributes to
/// one slot.
///
/// The host creates it before any of those widgets render, hands its
/// [`scope`](Self::scope) to each of them, then lets it wrap their output.
pub trait ProviderInstance: Send + Sync {
    /// State shared with the wrapped widgets.
    fn scope(&self) -> ProviderScope {
        ProviderScope::empty()
    }

    fn render(&self, children: Vec<View>) -> Result<View, RenderFault>;
}

/// Creates provider instances. Exported by dynamically delivered modules.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, module_id: &str) -> Box<dyn ProviderInstance>;
}

impl<F> ProviderFactory for F
where
    F: Fn(&str) -> Box<dyn ProviderInstance> + Send + Sync,
{
    fn create(&self, module_id: &str) -> Box<dyn ProviderInstance> {
        self(module_id)
    }
}

/// Main view used for modules that registered without one.
pub struct PlaceholderView {
    module_id: String,
}

impl PlaceholderView {
    pub fn new(module_id: impl Into<String>) -> Self {
        Self { module_id: module_id.into() }
    }

    pub fn into_ref(self) -> ComponentRef {
        Arc::new(self)
    }
}

impl fmt::Debug for PlaceholderView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaceholderView")
            .field("module_id", &self.module_id)
            .finish()
    }
}

impl Component for PlaceholderView {
    fn render(&self, _props: &Props) -> Result<View, RenderFault> {
        Ok(View::Placeholder {
            module_id: self.module_id.clone(),
            message: constants::NO_MAIN_VIEW_MESSAGE.to_string(),
        })
    }
}
