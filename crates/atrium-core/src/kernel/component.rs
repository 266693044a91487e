use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::kernel::error::{Error, Result};

/// Lifecycle trait for the long-lived parts of a host
///
/// Components only override the phases they take part in.
#[async_trait]
pub trait HostComponent: Any + Send + Sync + Debug {
    fn name(&self) -> &'static str;

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

/// Host components keyed by their concrete type, kept in registration order.
#[derive(Default, Debug)]
pub struct ComponentRegistry {
    instances: HashMap<TypeId, Arc<dyn HostComponent>>,
    order: Vec<TypeId>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component instance, keyed by the TypeId of `V`.
    ///
    /// Registering the same type twice replaces the instance but keeps its
    /// original position in the lifecycle order.
    pub fn register_instance<V>(&mut self, instance: Arc<V>)
    where
        V: HostComponent + 'static,
    {
        let type_id = TypeId::of::<V>();
        if self.instances.insert(type_id, instance).is_none() {
            self.order.push(type_id);
        }
    }

    pub fn get_component_by_id(&self, type_id: &TypeId) -> Option<Arc<dyn HostComponent>> {
        self.instances.get(type_id).cloned()
    }

    /// Get a component by its concrete type.
    pub fn get_concrete<T: HostComponent + 'static>(&self) -> Option<Arc<T>> {
        self.instances.get(&TypeId::of::<T>()).and_then(|component| {
            let any: Arc<dyn Any + Send + Sync> = component.clone();
            Arc::downcast::<T>(any).ok()
        })
    }

    /// Like [`get_concrete`](Self::get_concrete), but a missing component is an error.
    pub fn require<T: HostComponent + 'static>(&self) -> Result<Arc<T>> {
        self.get_concrete::<T>().ok_or_else(|| Error::ComponentRegistryError {
            operation: "require".to_string(),
            component_name: Some(std::any::type_name::<T>().to_string()),
            message: "component is not registered".to_string(),
        })
    }

    /// Components in registration order.
    pub fn components(&self) -> Vec<Arc<dyn HostComponent>> {
        self.order
            .iter()
            .filter_map(|id| self.instances.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
        self.order.clear();
    }
}
