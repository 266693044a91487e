#![cfg(test)]

use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;

use super::common::{start_host, DelayedDelivery, VEG_ENTRY};
use crate::extension::error::ExtensionError;
use crate::kernel::constants;
use crate::slots::SlotType;
use crate::ui::{Props, View};

fn props(value: serde_json::Value) -> Props {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test(start_paused = true)]
async fn test_local_module_loads_without_polling() {
    let delivery = DelayedDelivery::never();
    let host = start_host(delivery.clone()).await.expect("host starts");
    let started = Instant::now();

    let view = host.render_main("weather", &Props::new()).await.expect("loads");

    assert_eq!(view, View::element("weather-page"));
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(delivery.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_remote_module_registering_after_300ms() {
    let delivery = DelayedDelivery::after(300);
    let host = start_host(delivery.clone()).await.expect("host starts");
    let started = Instant::now();

    let view = host.render_main("vegetation-prime", &Props::new()).await.expect("registers in time");

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(2000));
    // Registered without a main view
    assert_eq!(
        view,
        View::Placeholder {
            module_id: "vegetation-prime".to_string(),
            message: constants::NO_MAIN_VIEW_MESSAGE.to_string(),
        }
    );
    assert_eq!(delivery.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_remote_module_never_registering() {
    let host = start_host(DelayedDelivery::never()).await.expect("host starts");
    host.registrar().register("other-addon", crate::extension::ModuleUnit::new());
    let started = Instant::now();

    let err = host.load("vegetation-prime").await.err().expect("times out");

    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert!(started.elapsed() < Duration::from_millis(2200));
    match err.as_extension() {
        Some(ExtensionError::NotRegistered {
            remote_entry,
            registered_ids,
            ..
        }) => {
            assert_eq!(remote_entry, VEG_ENTRY);
            assert_eq!(registered_ids, &vec!["other-addon".to_string()]);
        }
        other => panic!("expected NotRegistered, got {:?}", other),
    }
    assert!(err.to_string().contains("other-addon"));
}

#[tokio::test(start_paused = true)]
async fn test_slot_combines_local_and_remote_modules() {
    let host = start_host(DelayedDelivery::after(300)).await.expect("host starts");
    let entity = props(json!({ "entityData": "B", "units": "cm" }));

    let first = host.render_slot(SlotType::ContextPanel, &entity).expect("visible");
    assert!(first.descendants().iter().any(|n| matches!(n, View::Loading { .. })));
    assert!(first.descendants().contains(&&View::text("forecast")));

    host.settle().await;
    let view = host.render_slot(SlotType::ContextPanel, &entity).expect("visible");

    let View::Slot { slot, children } = &view else {
        panic!("expected slot node, got {:?}", view);
    };
    assert_eq!(*slot, SlotType::ContextPanel);
    assert_eq!(children.len(), 2);
    match &children[1] {
        View::Element { name, children, .. } => {
            assert_eq!(name, "vegetation-session");
            assert_eq!(children.len(), 2);
        }
        other => panic!("expected provider, got {:?}", other),
    }
    // Caller props win over declaration defaults; the shared engine is visible
    assert!(view.descendants().contains(&&View::element("canopy")
        .with_prop("engine", "18.3.1")
        .with_prop("units", "cm")));
    assert!(view.descendants().contains(&&View::text("soil for B")));
}

#[tokio::test(start_paused = true)]
async fn test_reset_key_change_recovers_faulted_panel() {
    let host = start_host(DelayedDelivery::after(0)).await.expect("host starts");
    host.render_slot(SlotType::ContextPanel, &Props::new());
    host.settle().await;

    let soil = |entity: &str| {
        let view = host
            .render_slot(SlotType::ContextPanel, &props(json!({ "entityData": entity })))
            .expect("visible");
        view.descendants()
            .into_iter()
            .find_map(|node| match node {
                View::Contained { widget_id, child, .. } if widget_id == "soil" => Some((**child).clone()),
                _ => None,
            })
            .expect("soil widget mounted")
    };

    let faulted = soil("A");
    assert!(faulted.is_fallback());
    assert!(soil("A").is_fallback(), "same key must keep the fallback");
    assert_eq!(soil("B"), View::text("soil for B"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_module_shows_diagnostic_and_recovers_on_refresh() {
    let host = start_host(DelayedDelivery::after(2500)).await.expect("host starts");

    host.render_slot(SlotType::ContextPanel, &Props::new());
    host.settle().await;
    let failed = host.render_slot(SlotType::ContextPanel, &Props::new()).expect("visible");
    assert!(failed
        .descendants()
        .iter()
        .any(|n| matches!(n, View::Diagnostic { retryable: true, .. })));

    // The late registration did not flip the failed mount...
    tokio::time::sleep(Duration::from_millis(1000)).await;
    let still_failed = host.render_slot(SlotType::ContextPanel, &Props::new()).expect("visible");
    assert!(still_failed
        .descendants()
        .iter()
        .any(|n| matches!(n, View::Diagnostic { .. })));

    // ...but a manual refresh picks it up
    assert_eq!(host.composer().refresh(SlotType::ContextPanel), 1);
    host.render_slot(SlotType::ContextPanel, &Props::new());
    host.settle().await;
    let recovered = host.render_slot(SlotType::ContextPanel, &Props::new()).expect("visible");
    assert!(!recovered
        .descendants()
        .iter()
        .any(|n| matches!(n, View::Diagnostic { .. } | View::Loading { .. })));
}
