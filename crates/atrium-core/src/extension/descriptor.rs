use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::extension::error::ExtensionError;
use crate::slots::{SlotType, VisibilityRule};
use crate::ui::Props;

/// One widget a module contributes to one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotWidgetDeclaration {
    /// Unique within the owning module.
    pub widget_id: String,
    pub owner_module_id: String,
    pub slot_name: SlotType,
    /// Name of the component inside the module's executable unit.
    pub component_ref: String,
    #[serde(skip_serializing_if = "Props::is_empty")]
    pub default_props: Props,
    pub visibility_rule: VisibilityRule,
}

impl SlotWidgetDeclaration {
    pub fn new(
        owner_module_id: impl Into<String>,
        slot_name: SlotType,
        widget_id: impl Into<String>,
        component_ref: impl Into<String>,
    ) -> Self {
        Self {
            widget_id: widget_id.into(),
            owner_module_id: owner_module_id.into(),
            slot_name,
            component_ref: component_ref.into(),
            default_props: Props::new(),
            visibility_rule: VisibilityRule::Always,
        }
    }

    pub fn with_default_prop(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.default_props.insert(key.into(), value.into());
        self
    }

    pub fn with_visibility(mut self, rule: VisibilityRule) -> Self {
        self.visibility_rule = rule;
        self
    }
}

/// Identity and declaration of one addon module.
///
/// Immutable once the host has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawModuleDescriptor")]
pub struct ModuleDescriptor {
    pub id: String,
    pub display_name: String,
    pub icon_ref: Option<String>,
    pub is_local: bool,
    /// Locator of out-of-band code. Required unless the module is bundled.
    pub remote_entry_ref: Option<String>,
    /// Route of a full-page module.
    pub route_path: Option<String>,
    pub declared_slots: BTreeMap<SlotType, Vec<SlotWidgetDeclaration>>,
    pub main_view_ref: Option<String>,
}

impl ModuleDescriptor {
    /// A module bundled with the host build.
    pub fn local(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            icon_ref: None,
            is_local: true,
            remote_entry_ref: None,
            route_path: None,
            declared_slots: BTreeMap::new(),
            main_view_ref: None,
        }
    }

    /// A module delivered out of band from `remote_entry_ref`.
    pub fn remote(
        id: impl Into<String>,
        display_name: impl Into<String>,
        remote_entry_ref: impl Into<String>,
    ) -> Self {
        Self {
            is_local: false,
            remote_entry_ref: Some(remote_entry_ref.into()),
            ..Self::local(id, display_name)
        }
    }

    pub fn with_icon(mut self, icon_ref: impl Into<String>) -> Self {
        self.icon_ref = Some(icon_ref.into());
        self
    }

    pub fn with_route(mut self, route_path: impl Into<String>) -> Self {
        self.route_path = Some(route_path.into());
        self
    }

    pub fn with_main_view(mut self, main_view_ref: impl Into<String>) -> Self {
        self.main_view_ref = Some(main_view_ref.into());
        self
    }

    /// Declare a widget with default props and no visibility restriction.
    pub fn with_widget(
        self,
        slot: SlotType,
        widget_id: impl Into<String>,
        component_ref: impl Into<String>,
    ) -> Self {
        let declaration = SlotWidgetDeclaration::new(self.id.clone(), slot, widget_id, component_ref);
        self.with_declaration(declaration)
    }

    /// Declare a fully specified widget. The owner and slot are taken from
    /// the declaration itself; [`validate`](Self::validate) checks the owner.
    pub fn with_declaration(mut self, declaration: SlotWidgetDeclaration) -> Self {
        self.declared_slots
            .entry(declaration.slot_name)
            .or_default()
            .push(declaration);
        self
    }

    /// Widgets declared for `slot`, in declaration order.
    pub fn widgets_for(&self, slot: SlotType) -> &[SlotWidgetDeclaration] {
        self.declared_slots
            .get(&slot)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All declared widgets across slots.
    pub fn widgets(&self) -> impl Iterator<Item = &SlotWidgetDeclaration> {
        self.declared_slots.values().flatten()
    }

    pub fn validate(&self) -> Result<(), ExtensionError> {
        let invalid = |message: String| ExtensionError::InvalidDescriptor {
            module_id: self.id.clone(),
            message,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("module id must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for (slot, declarations) in &self.declared_slots {
            for declaration in declarations {
                if declaration.owner_module_id != self.id {
                    return Err(invalid(format!(
                        "widget '{}' claims owner '{}'",
                        declaration.widget_id, declaration.owner_module_id
                    )));
                }
                if declaration.slot_name != *slot {
                    return Err(invalid(format!(
                        "widget '{}' is declared under '{}' but names slot '{}'",
                        declaration.widget_id, slot, declaration.slot_name
                    )));
                }
                if !seen.insert(declaration.widget_id.as_str()) {
                    return Err(invalid(format!(
                        "widget id '{}' is used more than once",
                        declaration.widget_id
                    )));
                }
            }
        }
        Ok(())
    }
}

// --- Intermediate structs for deserialization ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawWidgetDeclaration {
    widget_id: String,
    #[serde(default)]
    owner_module_id: Option<String>,
    #[serde(default)]
    slot_name: Option<SlotType>,
    component_ref: String,
    #[serde(default)]
    default_props: Props,
    #[serde(default)]
    visibility_rule: VisibilityRule,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawModuleDescriptor {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    icon_ref: Option<String>,
    #[serde(default)]
    is_local: bool,
    #[serde(default)]
    remote_entry_ref: Option<String>,
    #[serde(default)]
    route_path: Option<String>,
    #[serde(default)]
    declared_slots: BTreeMap<SlotType, Vec<RawWidgetDeclaration>>,
    #[serde(default)]
    main_view_ref: Option<String>,
}

impl TryFrom<RawModuleDescriptor> for ModuleDescriptor {
    type Error = ExtensionError;

    fn try_from(raw: RawModuleDescriptor) -> Result<Self, Self::Error> {
        let mut declared_slots = BTreeMap::new();
        for (slot, raw_widgets) in raw.declared_slots {
            let widgets = raw_widgets
                .into_iter()
                .map(|w| SlotWidgetDeclaration {
                    widget_id: w.widget_id,
                    // Catalogs usually omit these; they follow from where the widget is declared.
                    owner_module_id: w.owner_module_id.unwrap_or_else(|| raw.id.clone()),
                    slot_name: w.slot_name.unwrap_or(slot),
                    component_ref: w.component_ref,
                    default_props: w.default_props,
                    visibility_rule: w.visibility_rule,
                })
                .collect();
            declared_slots.insert(slot, widgets);
        }

        let descriptor = ModuleDescriptor {
            display_name: raw.display_name.unwrap_or_else(|| raw.id.clone()),
            id: raw.id,
            icon_ref: raw.icon_ref,
            is_local: raw.is_local,
            remote_entry_ref: raw.remote_entry_ref,
            route_path: raw.route_path,
            declared_slots,
            main_view_ref: raw.main_view_ref,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}
