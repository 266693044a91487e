#![cfg(test)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::extension::delivery::{CodeDelivery, DeliveryContext};
use crate::extension::descriptor::{ModuleDescriptor, SlotWidgetDeclaration};
use crate::extension::error::DeliveryError;
use crate::extension::export::{Export, ModuleUnit};
use crate::kernel::bootstrap::{Host, HostBuilder};
use crate::kernel::error::Result as KernelResult;
use crate::slots::SlotType;
use crate::ui::{component, Props, ProviderInstance, RenderFault, View};

pub const VEG_ENTRY: &str = "https://cdn/x.js";

/// Stand-in for the dashboard's map engine, published as a shared dependency.
#[derive(Debug)]
pub struct MapEngine {
    pub version: &'static str,
}

pub fn weather_descriptor() -> ModuleDescriptor {
    ModuleDescriptor::local("weather", "Weather")
        .with_route("/weather")
        .with_main_view("WeatherPage")
        .with_widget(SlotType::ContextPanel, "forecast", "Forecast")
        .with_widget(SlotType::MapLayer, "radar", "Radar")
}

pub fn weather_unit() -> ModuleUnit {
    ModuleUnit::new()
        .with_main(component(|_props: &Props| Ok(View::element("weather-page"))))
        .with_widget("Forecast", component(|_props: &Props| Ok(View::text("forecast"))))
        .with_widget("Radar", component(|_props: &Props| Ok(View::element("radar-layer"))))
}

pub fn vegetation_descriptor() -> ModuleDescriptor {
    ModuleDescriptor::remote("vegetation-prime", "Vegetation Prime", VEG_ENTRY)
        .with_declaration(
            SlotWidgetDeclaration::new("vegetation-prime", SlotType::ContextPanel, "canopy", "CanopyPanel")
                .with_default_prop("units", "m"),
        )
        .with_widget(SlotType::ContextPanel, "soil", "SoilPanel")
}

struct SessionProvider;

impl ProviderInstance for SessionProvider {
    fn render(&self, children: Vec<View>) -> Result<View, RenderFault> {
        Ok(View::Element {
            name: "vegetation-session".to_string(),
            props: Props::new(),
            children,
        })
    }
}

/// What vegetation-prime's entry does when it runs: resolve the shared map
/// engine, then register. No main view, only slot widgets.
pub fn run_vegetation_entry(context: &DeliveryContext) -> Result<(), DeliveryError> {
    let engine = context
        .broker()
        .resolve::<MapEngine>("map-engine", "^18")
        .map_err(|e| DeliveryError::new(e.to_string()))?;

    context.register(
        "vegetation-prime",
        ModuleUnit::new()
            .with_widget(
                "CanopyPanel",
                Export::default_of(
                    component(move |props: &Props| {
                        Ok(View::element("canopy")
                            .with_prop("engine", engine.version)
                            .with_prop("units", props.get("units").cloned().unwrap_or(Value::Null)))
                    })
                    .into(),
                ),
            )
            .with_widget(
                "SoilPanel",
                component(|props: &Props| match props.get("entityData") {
                    Some(Value::String(entity)) if entity == "A" => {
                        Err(RenderFault::failed("soil survey missing for A"))
                    }
                    Some(Value::String(entity)) => Ok(View::text(format!("soil for {}", entity))),
                    _ => Ok(View::text("no entity")),
                }),
            )
            .with_provider(|_module_id: &str| -> Box<dyn ProviderInstance> { Box::new(SessionProvider) }),
    );
    Ok(())
}

/// Delivery that runs vegetation-prime's entry after `delay`, or never.
#[derive(Clone)]
pub struct DelayedDelivery {
    pub delay: Option<Duration>,
    pub calls: Arc<AtomicUsize>,
}

impl DelayedDelivery {
    pub fn after(ms: u64) -> Self {
        Self {
            delay: Some(Duration::from_millis(ms)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn never() -> Self {
        Self {
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeDelivery for DelayedDelivery {
    async fn deliver(&self, context: DeliveryContext) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = run_vegetation_entry(&context) {
                    log::error!("vegetation-prime entry failed: {}", e);
                }
            });
        }
        Ok(())
    }
}

pub async fn start_host(delivery: DelayedDelivery) -> KernelResult<Host> {
    HostBuilder::new()
        .publish_instance("map-engine", "18.3.1", Arc::new(MapEngine { version: "18.3.1" }))?
        .discovery(crate::extension::StaticDiscovery::new(vec![
            weather_descriptor(),
            vegetation_descriptor(),
        ]))
        .bundle_module("weather", weather_unit())
        .delivery(delivery)
        .start()
        .await
}
