//! # Atrium Core Kernel
//!
//! Boots and tears down an extension host.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Bootstrapping**: [`HostBuilder`](bootstrap::HostBuilder) gathers
//!   configuration, discovery sources, bundled modules and shared
//!   dependencies; `start()` populates the module registry, wires the loader
//!   and the slot composer and produces a running [`Host`](bootstrap::Host).
//! - **Component Lifecycle**: the [`HostComponent`](component::HostComponent)
//!   trait and a [`ComponentRegistry`](component::ComponentRegistry) keyed by
//!   concrete type.
//! - **Core Constants**: defaults shared by configuration and loader.
//! - **Error Handling**: the aggregate [`Error`](error::Error) and `Result`.
pub mod bootstrap;
pub mod component;
pub mod constants;
pub mod error;

pub use bootstrap::{Host, HostBuilder};
pub use component::{ComponentRegistry, HostComponent};
pub use error::{Error, KernelLifecyclePhase, Result};
