//! # Atrium Core UI Model
//!
//! The host does not draw anything itself. Addon components produce a [`View`]
//! tree, the slot composer assembles those trees, and the dashboard shell
//! (an external collaborator) turns the result into pixels.
//!
//! - **[`view`]**: the [`View`] tree and the [`Props`] bag passed to components.
//! - **[`component`]**: the [`Component`] trait addons implement, plus the
//!   module-level provider traits.
//! - **[`error`]**: [`RenderFault`], the fault a component raises while rendering.
//! - **[`theme`]**: [`Theme`], the design tokens hosts share with addons.
pub mod component;
pub mod error;
pub mod theme;
pub mod view;

pub use component::{
    component, scoped_component, Component, ComponentRef, PlaceholderView, ProviderFactory,
    ProviderInstance, ProviderScope,
};
pub use error::RenderFault;
pub use theme::{Theme, THEME_DEPENDENCY};
pub use view::{merge_props, Props, View};
