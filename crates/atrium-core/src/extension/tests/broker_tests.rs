use std::sync::Arc;

use crate::extension::broker::{BrokerBuilder, SharedInstance};
use crate::extension::error::SharedDependencyError;

#[derive(Debug)]
struct MapEngine {
    name: &'static str,
}

fn sealed_with_engine() -> (Arc<MapEngine>, crate::extension::SharedDependencyBroker) {
    let engine = Arc::new(MapEngine { name: "maplibre" });
    let mut builder = BrokerBuilder::new();
    builder
        .publish_instance("map-engine", "18.2.0", engine.clone())
        .expect("valid version");
    (engine, builder.seal())
}

#[test]
fn test_resolve_returns_the_published_instance() {
    let (engine, broker) = sealed_with_engine();

    let first = broker.resolve::<MapEngine>("map-engine", "^18").expect("resolves");
    let second = broker.resolve::<MapEngine>("map-engine", ">=18.1").expect("resolves");

    assert!(Arc::ptr_eq(&first, &engine));
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.name, "maplibre");
}

#[test]
fn test_getter_is_called_per_resolution() {
    let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let shared: SharedInstance = Arc::new(42u32);
    let mut builder = BrokerBuilder::new();
    builder
        .publish("answer", "1.0.0", move || {
            calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            shared.clone()
        })
        .expect("valid version");
    let broker = builder.seal();

    broker.resolve_shared("answer", "1").expect("first");
    broker.resolve_shared("answer", "1").expect("second");
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[test]
fn test_version_mismatch_is_an_error() {
    let (_engine, broker) = sealed_with_engine();
    assert_eq!(
        broker.resolve::<MapEngine>("map-engine", "^17").unwrap_err(),
        SharedDependencyError::VersionMismatch {
            name: "map-engine".to_string(),
            requested: "^17".to_string(),
            published: "18.2.0".to_string(),
        }
    );
}

#[test]
fn test_unpublished_dependency_lists_published_names() {
    let (_engine, broker) = sealed_with_engine();
    match broker.resolve_shared("state-store", "^1") {
        Err(SharedDependencyError::NotPublished { name, published }) => {
            assert_eq!(name, "state-store");
            assert_eq!(published, vec!["map-engine".to_string()]);
        }
        other => panic!("expected NotPublished, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_type_mismatch() {
    let (_engine, broker) = sealed_with_engine();
    assert!(matches!(
        broker.resolve::<String>("map-engine", "*"),
        Err(SharedDependencyError::TypeMismatch { .. })
    ));
}

#[test]
fn test_invalid_versions() {
    let mut builder = BrokerBuilder::new();
    assert!(matches!(
        builder.publish_instance("map-engine", "eighteen", Arc::new(1u8)),
        Err(SharedDependencyError::InvalidVersion { .. })
    ));

    let (_engine, broker) = sealed_with_engine();
    assert!(matches!(
        broker.resolve_shared("map-engine", "not a requirement"),
        Err(SharedDependencyError::InvalidVersion { .. })
    ));
}

#[test]
fn test_republish_replaces_entry() {
    let mut builder = BrokerBuilder::new();
    builder
        .publish_instance("map-engine", "17.0.0", Arc::new(1u8))
        .expect("publish")
        .publish_instance("map-engine", "18.0.0", Arc::new(2u8))
        .expect("republish");
    let broker = builder.seal();

    let published = broker.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].1.to_string(), "18.0.0");
    assert_eq!(*broker.resolve::<u8>("map-engine", "^18").expect("resolves"), 2);
}

#[test]
fn test_empty_broker() {
    let broker = BrokerBuilder::new().seal();
    assert!(broker.is_empty());
    assert!(broker.entry("map-engine").is_none());
}
