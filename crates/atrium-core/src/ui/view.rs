use serde::Serialize;
use serde_json::{Map, Value};

use crate::slots::SlotType;

/// Properties handed to a component. Always a JSON object.
pub type Props = Map<String, Value>;

/// Merge widget default props with caller-supplied props.
///
/// Caller values win over defaults key by key (shallow merge).
pub fn merge_props(defaults: &Props, extra: &Props) -> Props {
    let mut merged = defaults.clone();
    for (key, value) in extra {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// A node in the rendered UI tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum View {
    /// A named element with props and children, e.g. `card` or `layer`.
    Element {
        name: String,
        #[serde(skip_serializing_if = "Map::is_empty")]
        props: Props,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        children: Vec<View>,
    },
    /// Plain text.
    Text { text: String },
    /// Children without a wrapper.
    Fragment { children: Vec<View> },
    /// The outer node of a rendered extension point.
    Slot { slot: SlotType, children: Vec<View> },
    /// Layout container around one mounted widget. The shell must keep the
    /// widget's layout inside this node.
    Contained {
        module_id: String,
        widget_id: String,
        child: Box<View>,
    },
    /// The widget's module is still being resolved.
    Loading {
        module_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        widget_id: Option<String>,
    },
    /// The module registered without a main view.
    Placeholder { module_id: String, message: String },
    /// A render fault contained by an isolation boundary.
    Fallback {
        module_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        widget_id: Option<String>,
        message: String,
    },
    /// Inline card for configuration and registration failures.
    Diagnostic {
        module_id: String,
        message: String,
        retryable: bool,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        registered_ids: Vec<String>,
    },
}

impl View {
    pub fn element(name: impl Into<String>) -> Self {
        View::Element {
            name: name.into(),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        View::Text { text: text.into() }
    }

    /// Add a prop to an `Element`. No-op for other variants.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let View::Element { props, .. } = &mut self {
            props.insert(key.into(), value.into());
        }
        self
    }

    /// Append a child to an `Element` or `Fragment`. No-op for other variants.
    pub fn with_child(mut self, child: View) -> Self {
        match &mut self {
            View::Element { children, .. } | View::Fragment { children } => children.push(child),
            _ => {}
        }
        self
    }

    /// Direct children of this node.
    pub fn children(&self) -> &[View] {
        match self {
            View::Element { children, .. }
            | View::Fragment { children }
            | View::Slot { children, .. } => children,
            View::Contained { child, .. } => std::slice::from_ref(child.as_ref()),
            _ => &[],
        }
    }

    /// This node and all of its descendants, in pre-order.
    pub fn descendants(&self) -> Vec<&View> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.descendants());
        }
        out
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, View::Fallback { .. })
    }
}
