use serde_json::json;

use crate::slots::{HostContext, VisibilityRule};

fn operator() -> HostContext {
    HostContext::new()
        .with_role("operator")
        .with_tenant("north")
        .with_feature_flag("soil-beta")
}

#[test]
fn test_always_is_default() {
    assert_eq!(VisibilityRule::default(), VisibilityRule::Always);
    assert!(VisibilityRule::Always.evaluate(&HostContext::new()));
}

#[test]
fn test_role_tenant_and_flag_rules() {
    let ctx = operator();
    assert!(VisibilityRule::any_role(["admin", "operator"]).evaluate(&ctx));
    assert!(!VisibilityRule::any_role(["admin"]).evaluate(&ctx));
    assert!(VisibilityRule::Tenant { tenants: vec!["north".into()] }.evaluate(&ctx));
    assert!(!VisibilityRule::Tenant { tenants: vec!["south".into()] }.evaluate(&ctx));
    assert!(!VisibilityRule::Tenant { tenants: vec!["north".into()] }.evaluate(&HostContext::new()));
    assert!(VisibilityRule::feature_flag("soil-beta").evaluate(&ctx));
    assert!(!VisibilityRule::feature_flag("radar-v2").evaluate(&ctx));
}

#[test]
fn test_combinators() {
    let ctx = operator();
    let admin_or_beta = VisibilityRule::Any {
        rules: vec![VisibilityRule::any_role(["admin"]), VisibilityRule::feature_flag("soil-beta")],
    };
    let admin_and_beta = VisibilityRule::All {
        rules: vec![VisibilityRule::any_role(["admin"]), VisibilityRule::feature_flag("soil-beta")],
    };
    assert!(admin_or_beta.evaluate(&ctx));
    assert!(!admin_and_beta.evaluate(&ctx));
    assert!(VisibilityRule::Not { rule: Box::new(admin_and_beta) }.evaluate(&ctx));
    assert!(VisibilityRule::All { rules: vec![] }.evaluate(&ctx));
    assert!(!VisibilityRule::Any { rules: vec![] }.evaluate(&ctx));
}

#[test]
fn test_rules_deserialize_from_catalog_form() {
    let rule: VisibilityRule = serde_json::from_value(json!({
        "kind": "all",
        "rules": [
            { "kind": "any-role", "roles": ["operator"] },
            { "kind": "not", "rule": { "kind": "feature-flag", "flag": "legacy" } }
        ]
    }))
    .expect("rule parses");
    assert!(rule.evaluate(&operator()));
    assert!(!rule.evaluate(&operator().with_feature_flag("legacy")));
}
