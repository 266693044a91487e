//! # Atrium Core Slots
//!
//! Extension points ("slots") are fixed locations in the dashboard where
//! modules contribute widgets. This module decides which widgets are visible
//! for a slot and composes them into a view.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`types`]**: [`SlotType`], the closed set of extension points.
//! - **[`context`]**: [`HostContext`], the role/tenant/flag snapshot owned by
//!   the dashboard shell, and the [`ContextHandle`] it is published through.
//! - **[`visibility`]**: [`VisibilityRule`] predicates attached to widgets.
//! - **[`registry`]**: [`SlotRegistry`], the visible widget set per slot.
//! - **[`boundary`]**: [`IsolationBoundary`], fault containment around one
//!   widget or one module provider.
//! - **[`composer`]**: [`SlotComposer`], groups widgets by module, shares one
//!   provider per module and mounts every widget behind its own boundary.
//! - **[`error`]**: [`SlotError`].
pub mod boundary;
pub mod composer;
pub mod context;
pub mod error;
pub mod registry;
pub mod types;
pub mod visibility;

pub use boundary::{BoundaryState, IsolationBoundary};
pub use composer::SlotComposer;
pub use context::{ContextHandle, HostContext};
pub use error::SlotError;
pub use registry::SlotRegistry;
pub use types::SlotType;
pub use visibility::VisibilityRule;

#[cfg(test)]
mod tests;
