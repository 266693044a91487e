use std::sync::Arc;

use crate::extension::descriptor::SlotWidgetDeclaration;
use crate::extension::registry::ModuleRegistry;
use crate::slots::context::{ContextHandle, HostContext};
use crate::slots::types::SlotType;

/// Answers "which widgets are eligible for this slot right now".
///
/// Visibility is recomputed from the current context on every query; there
/// is no cached result to go stale when roles or enabled modules change.
#[derive(Debug, Clone)]
pub struct SlotRegistry {
    modules: Arc<ModuleRegistry>,
    context: ContextHandle,
}

impl SlotRegistry {
    pub fn new(modules: Arc<ModuleRegistry>, context: ContextHandle) -> Self {
        Self { modules, context }
    }

    /// Visible widgets for `slot` under the current context.
    pub fn visible_widgets(&self, slot: SlotType) -> Vec<SlotWidgetDeclaration> {
        let context = self.context.snapshot();
        self.visible_widgets_in(slot, &context)
    }

    /// Visible widgets for `slot` under an explicit context snapshot.
    ///
    /// Ordered by module registration order, then declaration order.
    pub fn visible_widgets_in(&self, slot: SlotType, context: &HostContext) -> Vec<SlotWidgetDeclaration> {
        self.modules
            .list_modules()
            .iter()
            .filter(|module| context.is_module_enabled(&module.id))
            .flat_map(|module| module.widgets_for(slot))
            .filter(|widget| widget.visibility_rule.evaluate(context))
            .cloned()
            .collect()
    }

    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    pub fn modules(&self) -> &Arc<ModuleRegistry> {
        &self.modules
    }
}
