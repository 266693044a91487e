#![cfg(test)]

use std::sync::Arc;

use super::common::{run_vegetation_entry, MapEngine};
use crate::extension::broker::BrokerBuilder;
use crate::extension::delivery::DeliveryContext;
use crate::extension::runtime_table::{Registrar, RuntimeRegistrationTable};

#[test]
fn test_entry_fails_without_the_shared_engine() {
    let table = Arc::new(RuntimeRegistrationTable::new());
    let context = DeliveryContext::new(
        "https://cdn/x.js",
        Arc::new(BrokerBuilder::new().seal()),
        Registrar::new(table.clone()),
    );

    let err = run_vegetation_entry(&context).unwrap_err();
    assert!(err.to_string().contains("map-engine"));
    assert!(table.is_empty(), "a module must not register with a private copy");
}

#[test]
fn test_entry_fails_on_incompatible_engine() {
    let mut builder = BrokerBuilder::new();
    builder
        .publish_instance("map-engine", "17.9.0", Arc::new(MapEngine { version: "17.9.0" }))
        .expect("valid version");
    let table = Arc::new(RuntimeRegistrationTable::new());
    let context = DeliveryContext::new("https://cdn/x.js", Arc::new(builder.seal()), Registrar::new(table.clone()));

    assert!(run_vegetation_entry(&context).is_err());
    assert!(!table.contains("vegetation-prime"));
}

#[test]
fn test_modules_share_one_engine_instance() {
    let engine = Arc::new(MapEngine { version: "18.0.0" });
    let mut builder = BrokerBuilder::new();
    builder
        .publish_instance("map-engine", "18.0.0", engine.clone())
        .expect("valid version");
    let broker = builder.seal();

    let a = broker.resolve::<MapEngine>("map-engine", "^18").expect("a");
    let b = broker.resolve::<MapEngine>("map-engine", "18.0").expect("b");
    assert!(Arc::ptr_eq(&a, &engine) && Arc::ptr_eq(&b, &engine));
}
