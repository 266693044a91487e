use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Snapshot of the session state that decides widget visibility.
///
/// Owned by the dashboard shell (authentication, tenant switcher, module
/// settings); the host only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostContext {
    pub roles: BTreeSet<String>,
    pub tenant: Option<String>,
    pub feature_flags: BTreeSet<String>,
    pub enabled_modules: BTreeSet<String>,
}

impl HostContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn with_feature_flag(mut self, flag: impl Into<String>) -> Self {
        self.feature_flags.insert(flag.into());
        self
    }

    pub fn with_enabled_module(mut self, module_id: impl Into<String>) -> Self {
        self.enabled_modules.insert(module_id.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_feature_flag(&self, flag: &str) -> bool {
        self.feature_flags.contains(flag)
    }

    pub fn is_module_enabled(&self, module_id: &str) -> bool {
        self.enabled_modules.contains(module_id)
    }
}

/// Publishes the current [`HostContext`] to the host.
///
/// Cloning the handle shares the same underlying channel. Every read takes a
/// fresh snapshot, so visibility is never computed from a stale context.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    sender: Arc<watch::Sender<HostContext>>,
}

impl ContextHandle {
    pub fn new(initial: HostContext) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Copy of the current context.
    pub fn snapshot(&self) -> HostContext {
        self.sender.borrow().clone()
    }

    /// Replace the whole context.
    pub fn replace(&self, context: HostContext) {
        self.sender.send_replace(context);
    }

    /// Modify the context in place, e.g. to disable a module.
    pub fn update<F>(&self, modify: F)
    where
        F: FnOnce(&mut HostContext),
    {
        self.sender.send_modify(modify);
    }

    /// Observe context changes.
    pub fn subscribe(&self) -> watch::Receiver<HostContext> {
        self.sender.subscribe()
    }
}

impl Default for ContextHandle {
    fn default() -> Self {
        Self::new(HostContext::default())
    }
}
