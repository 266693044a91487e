use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;

use crate::ui::{RenderFault, View};

#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryState {
    Healthy,
    Faulted(RenderFault),
}

/// Fault containment around one render subtree: a single widget, or the
/// shared provider of one module.
///
/// A fault (error result or panic) is logged and replaced by a fallback view.
/// The boundary then stays faulted, without re-rendering, until the reset
/// keys it is rendered with change; the next render after such a change
/// retries the subtree once.
#[derive(Debug)]
pub struct IsolationBoundary {
    module_id: String,
    widget_id: Option<String>,
    state: BoundaryState,
    reset_keys: Option<Vec<Value>>,
}

impl IsolationBoundary {
    pub fn for_widget(module_id: impl Into<String>, widget_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            widget_id: Some(widget_id.into()),
            state: BoundaryState::Healthy,
            reset_keys: None,
        }
    }

    pub fn for_provider(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            widget_id: None,
            state: BoundaryState::Healthy,
            reset_keys: None,
        }
    }

    pub fn render<F>(&mut self, reset_keys: &[Value], render: F) -> View
    where
        F: FnOnce() -> Result<View, RenderFault>,
    {
        self.guard(reset_keys, render).unwrap_or_else(|fallback| fallback)
    }

    /// Run `work` inside the boundary. `Err` carries the fallback view, both
    /// for a fresh fault and for a boundary still faulted under these keys.
    pub fn guard<T, F>(&mut self, reset_keys: &[Value], work: F) -> Result<T, View>
    where
        F: FnOnce() -> Result<T, RenderFault>,
    {
        if self.reset_keys.as_deref() != Some(reset_keys) {
            if self.is_faulted() {
                log::info!("Reset keys changed for {}, retrying render", self.label());
                self.state = BoundaryState::Healthy;
            }
            self.reset_keys = Some(reset_keys.to_vec());
        }

        if let BoundaryState::Faulted(fault) = &self.state {
            return Err(self.fallback(fault));
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(work))
            .unwrap_or_else(|payload| Err(RenderFault::from_panic(payload)));

        outcome.map_err(|fault| {
            log::error!("Render fault in {}: {}", self.label(), fault);
            let view = self.fallback(&fault);
            self.state = BoundaryState::Faulted(fault);
            view
        })
    }

    pub fn state(&self) -> &BoundaryState {
        &self.state
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self.state, BoundaryState::Faulted(_))
    }

    pub fn fault(&self) -> Option<&RenderFault> {
        match &self.state {
            BoundaryState::Faulted(fault) => Some(fault),
            BoundaryState::Healthy => None,
        }
    }

    fn label(&self) -> String {
        match &self.widget_id {
            Some(widget_id) => format!("widget '{}' of module '{}'", widget_id, self.module_id),
            None => format!("provider of module '{}'", self.module_id),
        }
    }

    fn fallback(&self, fault: &RenderFault) -> View {
        View::Fallback {
            module_id: self.module_id.clone(),
            widget_id: self.widget_id.clone(),
            message: fault.to_string(),
        }
    }
}
