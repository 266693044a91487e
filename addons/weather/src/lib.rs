//! # Weather
//!
//! Local addon compiled into the host build. The host bundles [`unit()`]
//! under [`MODULE_ID`] and lists [`descriptor()`] in its catalog.
use atrium_core::slots::{SlotType, VisibilityRule};
use atrium_core::ui::{component, Props, RenderFault, View};
use atrium_core::{ModuleDescriptor, ModuleUnit, SlotWidgetDeclaration};
use serde_json::Value;

pub const MODULE_ID: &str = "weather";

/// Feature flag gating the radar overlay and its toggle.
pub const RADAR_FLAG: &str = "weather-radar";

const MAX_FORECAST_DAYS: u64 = 7;

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::local(MODULE_ID, "Weather")
        .with_icon("cloud-sun")
        .with_route("/weather")
        .with_main_view("WeatherPage")
        .with_declaration(
            SlotWidgetDeclaration::new(MODULE_ID, SlotType::ContextPanel, "forecast", "Forecast")
                .with_default_prop("units", "metric")
                .with_default_prop("days", 3),
        )
        .with_declaration(
            SlotWidgetDeclaration::new(MODULE_ID, SlotType::MapLayer, "radar", "Radar")
                .with_visibility(VisibilityRule::feature_flag(RADAR_FLAG)),
        )
        .with_declaration(
            SlotWidgetDeclaration::new(MODULE_ID, SlotType::LayerToggle, "radar-toggle", "RadarToggle")
                .with_visibility(VisibilityRule::feature_flag(RADAR_FLAG)),
        )
}

pub fn unit() -> ModuleUnit {
    ModuleUnit::new()
        .with_main(component(render_page))
        .with_widget("Forecast", component(render_forecast))
        .with_widget(
            "Radar",
            component(|_props: &Props| Ok(View::element("map-layer").with_prop("source", "weather/radar"))),
        )
        .with_widget(
            "RadarToggle",
            component(|_props: &Props| {
                Ok(View::element("layer-toggle")
                    .with_prop("layer", "weather/radar")
                    .with_prop("label", "Radar"))
            }),
        )
}

fn render_page(props: &Props) -> Result<View, RenderFault> {
    let title = props.get("title").and_then(Value::as_str).unwrap_or("Weather");
    Ok(View::element("page")
        .with_prop("title", title)
        .with_child(View::element("weather-overview")))
}

/// Forecast card for the selected entity.
fn render_forecast(props: &Props) -> Result<View, RenderFault> {
    let Some(entity) = props.get("entityId") else {
        return Ok(View::text("Select an entity to see its forecast"));
    };
    let entity = match entity {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return Err(RenderFault::failed(format!("unsupported entityId {}", other))),
    };
    let days = props.get("days").and_then(Value::as_u64).unwrap_or(3);
    if days == 0 || days > MAX_FORECAST_DAYS {
        return Err(RenderFault::failed(format!(
            "forecast covers 1 to {} days, got {}",
            MAX_FORECAST_DAYS, days
        )));
    }
    let units = props.get("units").and_then(Value::as_str).unwrap_or("metric");
    log::debug!("Rendering {}-day forecast for {}", days, entity);

    let mut card = View::element("card")
        .with_prop("title", "Forecast")
        .with_prop("entityId", entity)
        .with_prop("units", units);
    for day in 0..days {
        card = card.with_child(View::element("forecast-day").with_prop("offset", day));
    }
    Ok(card)
}
