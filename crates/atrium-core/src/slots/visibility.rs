use serde::{Deserialize, Serialize};

use crate::slots::context::HostContext;

/// Predicate deciding whether a widget is shown for a given context.
///
/// Serialized as a tagged object so module catalogs can declare rules, e.g.
/// `{ "kind": "any-role", "roles": ["admin"] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum VisibilityRule {
    #[default]
    Always,
    /// Visible when the user holds at least one of the roles.
    AnyRole { roles: Vec<String> },
    /// Visible for the listed tenants only.
    Tenant { tenants: Vec<String> },
    /// Visible when the feature flag is on.
    FeatureFlag { flag: String },
    All { rules: Vec<VisibilityRule> },
    Any { rules: Vec<VisibilityRule> },
    Not { rule: Box<VisibilityRule> },
}

impl VisibilityRule {
    pub fn any_role<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        VisibilityRule::AnyRole {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn feature_flag(flag: impl Into<String>) -> Self {
        VisibilityRule::FeatureFlag { flag: flag.into() }
    }

    pub fn evaluate(&self, context: &HostContext) -> bool {
        match self {
            VisibilityRule::Always => true,
            VisibilityRule::AnyRole { roles } => roles.iter().any(|r| context.has_role(r)),
            VisibilityRule::Tenant { tenants } => context
                .tenant
                .as_ref()
                .is_some_and(|tenant| tenants.contains(tenant)),
            VisibilityRule::FeatureFlag { flag } => context.has_feature_flag(flag),
            VisibilityRule::All { rules } => rules.iter().all(|r| r.evaluate(context)),
            VisibilityRule::Any { rules } => rules.iter().any(|r| r.evaluate(context)),
            VisibilityRule::Not { rule } => !rule.evaluate(context),
        }
    }
}
