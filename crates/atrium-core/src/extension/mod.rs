//! # Atrium Core Extension System
//!
//! This module hosts third-party addon modules. It covers everything between
//! "the host knows a module exists" and "the host holds an executable unit for
//! it": the module registry, the shared-dependency broker, the runtime
//! registration table that delivered code registers itself into, and the
//! loader that ties them together.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`descriptor`]**: [`ModuleDescriptor`] and [`SlotWidgetDeclaration`],
//!   the static declaration of a module, parsed from module catalogs.
//! - **[`registry`]**: [`ModuleRegistry`], the immutable list of known modules.
//! - **[`broker`]**: [`SharedDependencyBroker`], publishes the host's singleton
//!   runtime dependencies so delivered modules reuse them.
//! - **[`export`]**: [`Export`] and [`ModuleUnit`], the executable shape of a
//!   module, and the [`LocalBundle`] of build-time modules.
//! - **[`runtime_table`]**: [`RuntimeRegistrationTable`], filled by delivered
//!   code through the [`Registrar`] entry point.
//! - **[`delivery`]**: the [`CodeDelivery`] collaborator trait.
//! - **[`discovery`]**: the [`ModuleDiscovery`] collaborator trait and the
//!   static and file-backed sources.
//! - **[`loader`]**: [`ModuleLoader`], resolves a module id into a component.
//! - **[`error`]**: [`ExtensionError`], [`SharedDependencyError`],
//!   [`DeliveryError`].
pub mod broker;
pub mod delivery;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod export;
pub mod loader;
pub mod registry;
pub mod runtime_table;

pub use broker::{BrokerBuilder, SharedDependencyBroker, SharedDependencyEntry, SharedInstance};
pub use delivery::{registration_keys, CodeDelivery, DeliveryContext, NoDelivery};
pub use descriptor::{ModuleDescriptor, SlotWidgetDeclaration};
pub use discovery::{FileDiscovery, ModuleDiscovery, StaticDiscovery};
pub use error::{DeliveryError, ExtensionError, SharedDependencyError};
pub use export::{Export, LocalBundle, ModuleUnit};
pub use loader::{LoaderSettings, ModuleLoader};
pub use registry::ModuleRegistry;
pub use runtime_table::{Registrar, RegistrationEntry, RuntimeRegistrationTable};

#[cfg(test)]
mod tests;
