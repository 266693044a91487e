//! # Atrium Core
//!
//! The extension host of the Atrium operations dashboard: it discovers addon
//! modules, loads them either from the local bundle or through out-of-band
//! delivery plus self-registration, shares the host's singleton runtime
//! dependencies with them, and composes their widgets into the dashboard's
//! extension points behind per-widget isolation boundaries.
pub mod config;
pub mod extension;
pub mod kernel;
pub mod slots;
pub mod ui;
pub mod utils;

// Re-export key public types/traits for easier use by the binary and addons
pub use kernel::{Host, HostBuilder};
pub use kernel::error::{Error, Result};
pub use extension::{
    CodeDelivery, DeliveryContext, Export, ModuleDescriptor, ModuleLoader, ModuleRegistry,
    ModuleUnit, Registrar, RuntimeRegistrationTable, SharedDependencyBroker, SlotWidgetDeclaration,
};
pub use slots::{HostContext, IsolationBoundary, SlotComposer, SlotRegistry, SlotType, VisibilityRule};
pub use ui::{Component, ComponentRef, Props, RenderFault, View};

#[cfg(test)]
mod tests;
