use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::extension::broker::BrokerBuilder;
use crate::extension::delivery::{CodeDelivery, DeliveryContext};
use crate::extension::descriptor::{ModuleDescriptor, SlotWidgetDeclaration};
use crate::extension::error::{DeliveryError, ExtensionError};
use crate::extension::export::{Export, LocalBundle, ModuleUnit};
use crate::extension::loader::{LoaderSettings, ModuleLoader};
use crate::extension::registry::ModuleRegistry;
use crate::extension::runtime_table::RuntimeRegistrationTable;
use crate::kernel::component::HostComponent;
use crate::slots::SlotType;
use crate::ui::{component, Props, View};

const VEG_ENTRY: &str = "https://cdn.example.com/vegetation-prime/remoteEntry.js";

/// Delivery double: counts calls and registers `register_as` after `delay`,
/// or never when `register_as` is `None`. A stalled delivery never returns.
#[derive(Clone)]
struct ScriptedDelivery {
    calls: Arc<AtomicUsize>,
    register_as: Option<String>,
    delay: Duration,
    failures_left: Arc<AtomicUsize>,
    stalled: bool,
}

impl ScriptedDelivery {
    fn registering(id: &str, delay_ms: u64) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            register_as: Some(id.to_string()),
            delay: Duration::from_millis(delay_ms),
            failures_left: Arc::new(AtomicUsize::new(0)),
            stalled: false,
        }
    }

    fn stalled() -> Self {
        Self {
            stalled: true,
            ..Self::silent()
        }
    }

    fn silent() -> Self {
        Self {
            register_as: None,
            ..Self::registering("", 0)
        }
    }

    fn failing_first(mut self, failures: usize) -> Self {
        self.failures_left = Arc::new(AtomicUsize::new(failures));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeDelivery for ScriptedDelivery {
    async fn deliver(&self, context: DeliveryContext) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DeliveryError::new("connection reset"));
        }
        if self.stalled {
            std::future::pending::<()>().await;
        }
        // Fetching takes a moment even when registration is immediate
        tokio::time::sleep(Duration::from_millis(10)).await;

        if let Some(id) = self.register_as.clone() {
            let registrar = context.registrar().clone();
            let delay = self.delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                registrar.register(
                    id,
                    ModuleUnit::new()
                        .with_main(component(|_props: &Props| Ok(View::text("vegetation"))))
                        .with_widget("CanopyPanel", component(|_props: &Props| Ok(View::text("canopy")))),
                );
            });
        }
        Ok(())
    }
}

fn modules() -> Vec<ModuleDescriptor> {
    vec![
        ModuleDescriptor::local("weather", "Weather").with_widget(SlotType::MapLayer, "radar", "Radar"),
        ModuleDescriptor::remote("vegetation-prime", "Vegetation Prime", VEG_ENTRY)
            .with_widget(SlotType::ContextPanel, "canopy", "CanopyPanel")
            .with_widget(SlotType::ContextPanel, "soil", "SoilPanel"),
        ModuleDescriptor::remote("veg", "Veg (renamed)", "https://cdn.example.com/modules/VegetationPrime.js"),
        ModuleDescriptor::local("reports", "Reports").with_main_view("ReportsPage"),
        {
            let mut broken = ModuleDescriptor::remote("broken", "Broken", "unused");
            broken.remote_entry_ref = None;
            broken
        },
    ]
}

fn loader_with(delivery: ScriptedDelivery) -> (ModuleLoader, Arc<RuntimeRegistrationTable>) {
    let table = Arc::new(RuntimeRegistrationTable::new());
    let bundle = LocalBundle::new()
        .with_module(
            "weather",
            ModuleUnit::new()
                .with_main(component(|_props: &Props| Ok(View::text("weather"))))
                .with_widget("Radar", component(|_props: &Props| Ok(View::text("radar")))),
        )
        .with_module(
            "reports",
            ModuleUnit::new().with_main(Export::keyed([
                ("default", Export::from(component(|_props: &Props| Ok(View::text("overview"))))),
                ("ReportsPage", Export::from(component(|_props: &Props| Ok(View::text("reports page"))))),
                ("Settings", Export::from(component(|_props: &Props| Ok(View::text("settings"))))),
            ])),
        );
    let loader = ModuleLoader::new(
        Arc::new(ModuleRegistry::from_descriptors(modules()).expect("registry")),
        Arc::new(bundle),
        table.clone(),
        Arc::new(BrokerBuilder::new().seal()),
        Arc::new(delivery),
        LoaderSettings::default(),
    );
    (loader, table)
}

#[tokio::test(start_paused = true)]
async fn test_local_module_resolves_without_delivery() {
    let delivery = ScriptedDelivery::silent();
    let (loader, _table) = loader_with(delivery.clone());
    let started = Instant::now();

    let main = loader.load("weather").await.expect("bundled module loads");

    assert_eq!(main.render(&Props::new()).expect("render"), View::text("weather"));
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(delivery.calls(), 0);
    assert!(loader.resolve_local("weather").is_some());
    assert!(loader.resolve_local("vegetation-prime").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_remote_module_registering_late_resolves() {
    let delivery = ScriptedDelivery::registering("vegetation-prime", 300);
    let (loader, _table) = loader_with(delivery.clone());
    let started = Instant::now();

    let main = loader.load("vegetation-prime").await.expect("registers in time");

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(300), "resolved too early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(500), "resolved too late: {:?}", elapsed);
    assert_eq!(main.render(&Props::new()).expect("render"), View::text("vegetation"));
    assert_eq!(delivery.calls(), 1);
    assert_eq!(loader.delivered_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_remote_module_never_registering_fails_after_timeout() {
    let delivery = ScriptedDelivery::silent();
    let (loader, table) = loader_with(delivery.clone());
    table.register("something-else", ModuleUnit::new());
    let started = Instant::now();

    let err = loader.load("vegetation-prime").await.err().expect("must time out");

    assert!(started.elapsed() >= Duration::from_millis(2000));
    match &err {
        ExtensionError::NotRegistered {
            module_id,
            remote_entry,
            registered_ids,
            ..
        } => {
            assert_eq!(module_id, "vegetation-prime");
            assert_eq!(remote_entry, VEG_ENTRY);
            assert_eq!(registered_ids, &vec!["something-else".to_string()]);
        }
        other => panic!("expected NotRegistered, got {:?}", other),
    }
    assert!(err.is_retryable());
    assert_eq!(err.registered_ids(), ["something-else".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_registration_after_timeout_does_not_flip_the_failure() {
    let delivery = ScriptedDelivery::registering("vegetation-prime", 2500);
    let (loader, table) = loader_with(delivery.clone());

    let first = loader.resolve_unit("vegetation-prime").await;
    assert!(matches!(first, Err(ExtensionError::NotRegistered { .. })));

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(table.contains("vegetation-prime"));
    assert!(first.is_err());

    // A retry finds the registration without delivering again
    loader.resolve_unit("vegetation-prime").await.expect("registered by now");
    assert_eq!(delivery.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_loads_share_one_delivery() {
    let delivery = ScriptedDelivery::registering("vegetation-prime", 200);
    let (loader, _table) = loader_with(delivery.clone());

    let canopy = SlotWidgetDeclaration::new("vegetation-prime", SlotType::ContextPanel, "canopy", "CanopyPanel");
    let (main, widget, again) = futures::join!(
        loader.load("vegetation-prime"),
        loader.load_widget(&canopy),
        loader.resolve_unit("vegetation-prime"),
    );

    assert!(main.is_ok());
    assert_eq!(
        widget.expect("widget").render(&Props::new()).expect("render"),
        View::text("canopy")
    );
    assert!(again.is_ok());
    assert_eq!(delivery.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_delivery_is_retried() {
    let delivery = ScriptedDelivery::registering("vegetation-prime", 0).failing_first(1);
    let (loader, _table) = loader_with(delivery.clone());

    let err = loader.resolve_unit("vegetation-prime").await.err().expect("first delivery fails");
    assert!(matches!(err, ExtensionError::Delivery { .. }));
    assert!(err.is_retryable());
    assert_eq!(loader.delivered_count(), 0);

    loader.resolve_unit("vegetation-prime").await.expect("second delivery works");
    assert_eq!(delivery.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_registration_key() {
    let delivery = ScriptedDelivery::registering("VegetationPrime", 50);
    let (loader, table) = loader_with(delivery);

    loader.resolve_unit("veg").await.expect("found under the entry's file stem");
    assert!(!table.contains("veg"));
}

#[tokio::test(start_paused = true)]
async fn test_already_registered_module_skips_delivery() {
    let delivery = ScriptedDelivery::silent();
    let (loader, table) = loader_with(delivery.clone());
    table.register("vegetation-prime", ModuleUnit::new());

    let main = loader.load("vegetation-prime").await.expect("table hit");

    assert_eq!(delivery.calls(), 0);
    // Registered without a main view: placeholder, not an error
    match main.render(&Props::new()).expect("render") {
        View::Placeholder { module_id, message } => {
            assert_eq!(module_id, "vegetation-prime");
            assert_eq!(message, crate::kernel::constants::NO_MAIN_VIEW_MESSAGE);
        }
        other => panic!("expected placeholder, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_missing_remote_entry_is_a_configuration_error() {
    let delivery = ScriptedDelivery::silent();
    let (loader, _table) = loader_with(delivery.clone());
    let started = Instant::now();

    let err = loader.load("broken").await.err().expect("misconfigured");

    assert!(matches!(err, ExtensionError::Configuration { .. }));
    assert!(!err.is_retryable());
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(delivery.calls(), 0);
}

#[tokio::test]
async fn test_unknown_module() {
    let (loader, _table) = loader_with(ScriptedDelivery::silent());
    assert!(matches!(
        loader.load("nope").await,
        Err(ExtensionError::ModuleNotFound { .. })
    ));
}

#[tokio::test]
async fn test_widget_not_exported() {
    let (loader, _table) = loader_with(ScriptedDelivery::silent());
    let declaration = SlotWidgetDeclaration::new("weather", SlotType::MapLayer, "wind", "Wind");
    match loader.load_widget(&declaration).await {
        Err(ExtensionError::WidgetNotExported {
            module_id,
            widget_id,
            component_ref,
        }) => {
            assert_eq!(module_id, "weather");
            assert_eq!(widget_id, "wind");
            assert_eq!(component_ref, "Wind");
        }
        other => panic!("expected WidgetNotExported, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_main_view_ref_picks_the_keyed_main_export() {
    let (loader, _table) = loader_with(ScriptedDelivery::silent());

    let main = loader.load("reports").await.expect("bundled module loads");
    assert_eq!(main.render(&Props::new()).expect("render"), View::text("reports page"));

    // Without a main view reference the keyed default applies
    let unit = loader.resolve_local("reports").expect("bundled");
    let default = unit.main_component().expect("default entry");
    assert_eq!(default.render(&Props::new()).expect("render"), View::text("overview"));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_delivery_fails_within_the_timeout() {
    let delivery = ScriptedDelivery::stalled();
    let (loader, _table) = loader_with(delivery.clone());
    let started = Instant::now();

    let err = loader.load("vegetation-prime").await.err().expect("must give up");

    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(2000) && waited < Duration::from_millis(2100), "{:?}", waited);
    match &err {
        ExtensionError::Delivery { module_id, remote_entry, .. } => {
            assert_eq!(module_id, "vegetation-prime");
            assert_eq!(remote_entry, VEG_ENTRY);
        }
        other => panic!("expected Delivery, got {:?}", other),
    }
    assert!(err.is_retryable());
    assert_eq!(loader.delivered_count(), 0);

    // The abandoned delivery is not memoized; a retry delivers again
    assert!(loader.resolve_unit("vegetation-prime").await.is_err());
    assert_eq!(delivery.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_forgets_completed_deliveries() {
    let delivery = ScriptedDelivery::registering("vegetation-prime", 0);
    let (loader, table) = loader_with(delivery.clone());

    loader.resolve_unit("vegetation-prime").await.expect("delivered");
    assert_eq!(loader.delivered_count(), 1);

    loader.stop().await.expect("stop");
    table.clear();
    assert_eq!(loader.delivered_count(), 0);

    loader.resolve_unit("vegetation-prime").await.expect("delivered again");
    assert_eq!(delivery.calls(), 2);
}
