//! # Vegetation Prime
//!
//! Remote addon. It is not bundled with the host: the host only knows its
//! [`descriptor()`], and its code arrives out of band from [`REMOTE_ENTRY`].
//! When that code runs it calls [`register`], which resolves the host's shared
//! [`Theme`] and registers the module's unit under [`REGISTRATION_NAME`].
//!
//! The module has no main view, so opening it shows the host's placeholder.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use atrium_core::extension::{DeliveryContext, DeliveryError, Export, ModuleDescriptor, ModuleUnit, SlotWidgetDeclaration};
use atrium_core::slots::{SlotType, VisibilityRule};
use atrium_core::ui::{
    component, scoped_component, Props, ProviderInstance, ProviderScope, RenderFault, Theme, View, THEME_DEPENDENCY,
};
use serde_json::Value;

pub const MODULE_ID: &str = "vegetation-prime";

pub const REMOTE_ENTRY: &str = "https://addons.atrium.example/VegetationPrime/remoteEntry.js";

/// Container name the entry registers under. Differs from [`MODULE_ID`]; the
/// host finds it through the remote entry's parent segment.
pub const REGISTRATION_NAME: &str = "VegetationPrime";

/// Theme versions this build was written against.
pub const THEME_REQUIREMENT: &str = "^1";

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::remote(MODULE_ID, "Vegetation Prime", REMOTE_ENTRY)
        .with_icon("leaf")
        .with_declaration(
            SlotWidgetDeclaration::new(MODULE_ID, SlotType::ContextPanel, "canopy", "CanopyPanel")
                .with_default_prop("index", "ndvi"),
        )
        .with_widget(SlotType::MapLayer, "ndvi", "NdviLayer")
        .with_widget(SlotType::LayerToggle, "ndvi-toggle", "NdviToggle")
        .with_declaration(
            SlotWidgetDeclaration::new(MODULE_ID, SlotType::EntityTree, "parcel-health", "ParcelHealth")
                .with_visibility(VisibilityRule::any_role(["agronomist", "admin"])),
        )
}

/// Entry point run by delivered code.
pub fn register(context: &DeliveryContext) -> Result<(), DeliveryError> {
    let theme = context
        .broker()
        .resolve::<Theme>(THEME_DEPENDENCY, THEME_REQUIREMENT)
        .map_err(|e| DeliveryError::new(format!("{} cannot start: {}", MODULE_ID, e)))?;
    log::info!("{} entry running with theme '{}'", MODULE_ID, theme.name);
    context.register(REGISTRATION_NAME, unit(theme));
    Ok(())
}

/// The executable unit, styled with the host's theme.
///
/// Widgets mounted in a slot read the theme from their [`VegetationSession`];
/// the canopy panel also renders standalone.
pub fn unit(theme: Arc<Theme>) -> ModuleUnit {
    ModuleUnit::new()
        .with_widget(
            "CanopyPanel",
            Export::keyed([("default", Export::Component(scoped_component(render_canopy)))]),
        )
        .with_widget(
            "NdviLayer",
            Export::default_of(scoped_component(render_ndvi_layer).into()),
        )
        .with_widget(
            "NdviToggle",
            component(|_props: &Props| {
                Ok(View::element("layer-toggle")
                    .with_prop("layer", "vegetation/ndvi")
                    .with_prop("label", "NDVI"))
            }),
        )
        .with_widget(
            "ParcelHealth",
            component(|_props: &Props| Ok(View::element("tree-node").with_prop("label", "Parcel health"))),
        )
        .with_provider(move |module_id: &str| -> Box<dyn ProviderInstance> {
            Box::new(VegetationSession::new(module_id, theme.clone()))
        })
}

fn render_canopy(props: &Props, scope: &ProviderScope) -> Result<View, RenderFault> {
    let entity = match props.get("entityId") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(RenderFault::failed("canopy panel needs an entityId")),
    };
    let index = props.get("index").and_then(Value::as_str).unwrap_or("ndvi");
    let card = View::element("card")
        .with_prop("title", "Canopy")
        .with_prop("entityId", entity)
        .with_prop("index", index);
    Ok(match scope.get::<SessionState>() {
        Some(session) => card.with_prop("accent", session.theme.accent.clone()),
        None => card,
    })
}

fn render_ndvi_layer(props: &Props, scope: &ProviderScope) -> Result<View, RenderFault> {
    let session = scope
        .get::<SessionState>()
        .ok_or_else(|| RenderFault::failed("NDVI layer rendered outside a vegetation session"))?;
    let opacity = props.get("opacity").and_then(Value::as_f64).unwrap_or(0.7);
    Ok(View::element("map-layer")
        .with_prop("source", "vegetation/ndvi")
        .with_prop("tint", session.theme.accent.clone())
        .with_prop("opacity", opacity))
}

/// What a session hands to the widgets under it.
pub struct SessionState {
    pub module_id: String,
    pub theme: Arc<Theme>,
    renders: AtomicU64,
}

impl SessionState {
    pub fn renders(&self) -> u64 {
        self.renders.load(Ordering::Relaxed)
    }
}

/// Session shared by every vegetation widget mounted in one slot.
pub struct VegetationSession {
    state: Arc<SessionState>,
}

impl VegetationSession {
    pub fn new(module_id: &str, theme: Arc<Theme>) -> Self {
        Self {
            state: Arc::new(SessionState {
                module_id: module_id.to_string(),
                theme,
                renders: AtomicU64::new(0),
            }),
        }
    }

    pub fn renders(&self) -> u64 {
        self.state.renders()
    }
}

impl ProviderInstance for VegetationSession {
    fn scope(&self) -> ProviderScope {
        ProviderScope::new(self.state.clone())
    }

    fn render(&self, children: Vec<View>) -> Result<View, RenderFault> {
        let state = &self.state;
        let render = state.renders.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(View::Element {
            name: "session".to_string(),
            props: Props::from_iter([
                ("module".to_string(), Value::from(state.module_id.clone())),
                ("theme".to_string(), Value::from(state.theme.name.clone())),
                ("render".to_string(), Value::from(render)),
            ]),
            children,
        })
    }
}
