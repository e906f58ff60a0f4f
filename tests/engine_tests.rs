//! Permission resolution integration tests
//!
//! Exercises the complete query pipeline: identity verification, role
//! hierarchy expansion, rule-chain evaluation, and stored-mask lookup.

use aclkit::{
    AclConfig, AclManager, AnyRoleEvaluator, DomainInstance, DomainObject, HostRoleMatcher,
    HostRule, IdentityExpander, IdentityKind, InMemoryDomainDirectory, InMemoryFieldCatalog,
    InMemoryGroupDirectory, InMemoryIdentityDirectory, InMemoryMaskStore, Permissions, QueryMode,
    Right, RightMask, RoleHierarchy, RoleRule, RuleChain, RuleRegistry, SecurityIdentity,
    StaticToken, Subject,
};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn hierarchy(entries: &[(&str, &[&str])]) -> RoleHierarchy {
    let map: BTreeMap<String, Vec<String>> = entries
        .iter()
        .map(|(role, children)| {
            (
                role.to_string(),
                children.iter().map(|c| c.to_string()).collect(),
            )
        })
        .collect();
    RoleHierarchy::new(map).unwrap()
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// ============================================================================
// STORED-MODE QUERIES
// ============================================================================

#[test]
fn test_stored_class_permission_for_user() {
    let identities = Arc::new(InMemoryIdentityDirectory::new());
    identities.insert_user("alice", Vec::new());

    let masks = Arc::new(InMemoryMaskStore::new());
    let alice = SecurityIdentity::user("alice");
    masks.record(
        &alice,
        &DomainObject::Class("Document"),
        RightMask::from_names(["VIEW", "EDIT"]).unwrap(),
    );

    let manager = AclManager::builder()
        .identity_directory(identities)
        .mask_store(masks)
        .build();

    let permissions = manager
        .class_permissions(&Subject::new(alice), "Document", QueryMode::Stored)
        .unwrap();
    assert_eq!(permissions.to_names(), vec!["VIEW", "EDIT"]);
}

#[test]
fn test_stored_object_permission_distinct_from_class() {
    let identities = Arc::new(InMemoryIdentityDirectory::new());
    identities.insert_user("alice", Vec::new());

    let domains = Arc::new(InMemoryDomainDirectory::new());
    let instance = DomainInstance::new("Document", "42");
    domains.insert(instance.clone());

    let masks = Arc::new(InMemoryMaskStore::new());
    let alice = SecurityIdentity::user("alice");
    masks.record(&alice, &DomainObject::Class("Document"), RightMask::VIEW);
    masks.record(&alice, &DomainObject::Object(&instance), RightMask::DELETE);

    let manager = AclManager::builder()
        .identity_directory(identities)
        .domain_directory(domains)
        .mask_store(masks)
        .build();

    let subject = Subject::new(alice);
    let class = manager
        .class_permissions(&subject, "Document", QueryMode::Stored)
        .unwrap();
    let object = manager
        .object_permissions(&subject, "Document", "42", QueryMode::Stored)
        .unwrap();

    assert_eq!(class.to_names(), vec!["VIEW"]);
    assert_eq!(object.to_names(), vec!["DELETE"]);
}

#[test]
fn test_field_queries_enumerate_catalog_order() {
    let identities = Arc::new(InMemoryIdentityDirectory::new());
    identities.insert_user("alice", Vec::new());

    let fields = Arc::new(InMemoryFieldCatalog::new());
    fields.insert("Document", strings(&["title", "body", "status"]));

    let masks = Arc::new(InMemoryMaskStore::new());
    let alice = SecurityIdentity::user("alice");
    let class = DomainObject::Class("Document");
    masks.record(
        &alice,
        &DomainObject::Field {
            scope: &class,
            field: "body",
        },
        RightMask::EDIT,
    );

    let manager = AclManager::builder()
        .identity_directory(identities)
        .field_catalog(fields)
        .mask_store(masks)
        .build();

    let results = manager
        .class_field_permissions(&Subject::new(alice), "Document", None, QueryMode::Stored)
        .unwrap();

    let names: Vec<&str> = results.iter().map(|fp| fp.field.as_str()).collect();
    assert_eq!(names, vec!["title", "body", "status"]);
    assert_eq!(results[0].permissions, Permissions::Stored(RightMask::empty()));
    assert_eq!(results[1].permissions, Permissions::Stored(RightMask::EDIT));
}

#[test]
fn test_explicit_field_query_is_single_entry() {
    let identities = Arc::new(InMemoryIdentityDirectory::new());
    identities.insert_user("alice", Vec::new());

    let fields = Arc::new(InMemoryFieldCatalog::new());
    fields.insert("Document", strings(&["title", "body"]));

    let manager = AclManager::builder()
        .identity_directory(identities)
        .field_catalog(fields)
        .build();

    let subject = Subject::new(SecurityIdentity::user("alice"));
    let results = manager
        .class_field_permissions(&subject, "Document", Some("title"), QueryMode::Stored)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].field, "title");
}

// ============================================================================
// CALCULATED-MODE QUERIES
// ============================================================================

#[test]
fn test_deny_before_allow_tie_break() {
    // Rule priority [deny, allow] over a mask granting VIEW: the deny rule
    // answers first, so VIEW is refused
    let identities = Arc::new(InMemoryIdentityDirectory::new());
    identities.insert_user("alice", Vec::new());

    let masks = Arc::new(InMemoryMaskStore::new());
    let alice = SecurityIdentity::user("alice");
    masks.record(&alice, &DomainObject::Class("Document"), RightMask::VIEW);

    let registry = RuleRegistry::with_builtins();
    let chain = registry.chain(&strings(&["deny", "allow"])).unwrap();

    let manager = AclManager::builder()
        .identity_directory(identities)
        .mask_store(masks)
        .chain(chain)
        .build();

    let permissions = manager
        .class_permissions(&Subject::new(alice), "Document", QueryMode::Calculated)
        .unwrap();
    assert_eq!(permissions, Permissions::Calculated(Vec::new()));
}

#[test]
fn test_group_identity_forces_calculated_mode() {
    let identities = Arc::new(InMemoryIdentityDirectory::new());
    identities.insert_group("editors");

    let manager = AclManager::builder()
        .identity_directory(identities)
        .build();

    let subject = Subject::new(SecurityIdentity::group("editors"));
    // Stored mode requested, calculated result returned
    let permissions = manager
        .class_permissions(&subject, "Document", QueryMode::Stored)
        .unwrap();
    assert!(matches!(permissions, Permissions::Calculated(_)));
}

#[test]
fn test_role_rule_grants_through_hierarchy() {
    let identities = Arc::new(InMemoryIdentityDirectory::new());
    identities.insert_user("alice", strings(&["ADMIN"]));

    let mut registry = RuleRegistry::with_builtins();
    registry
        .register(Arc::new(RoleRule::new(
            "viewer-access",
            strings(&["VIEWER"]),
        )))
        .unwrap();
    let chain = registry.chain(&strings(&["viewer-access"])).unwrap();

    let manager = AclManager::builder()
        .identity_directory(identities)
        .hierarchy(hierarchy(&[("ADMIN", &["EDITOR"]), ("EDITOR", &["VIEWER"])]))
        .chain(chain)
        .build();

    // ADMIN implies VIEWER, so the role rule grants every right
    let subject = manager.subject_for(IdentityKind::User, "alice").unwrap();
    let permissions = manager
        .class_permissions(&subject, "Document", QueryMode::Calculated)
        .unwrap();
    assert_eq!(permissions, Permissions::Calculated(Right::DISPLAY.to_vec()));

    // bob holds no roles at all
    identities_without_roles_denied(&manager);
}

fn identities_without_roles_denied(manager: &AclManager) {
    let token: Arc<StaticToken> = Arc::new(StaticToken::authenticated("bob", Vec::new()));
    let subject = Subject::new(SecurityIdentity::user("bob")).with_token(token);
    // bob is not registered in the directory
    assert!(manager
        .class_permissions(&subject, "Document", QueryMode::Calculated)
        .is_err());
}

#[test]
fn test_anonymous_host_role_injection_end_to_end() {
    let identities = Arc::new(InMemoryIdentityDirectory::new());

    let mut registry = RuleRegistry::with_builtins();
    registry
        .register(Arc::new(RoleRule::new("api-access", strings(&["API_ROLE"]))))
        .unwrap();
    let chain = registry.chain(&strings(&["api-access"])).unwrap();

    let hosts = HostRoleMatcher::new(&[
        HostRule::new(r"api\.example\.com", "API_ROLE"),
        HostRule::new(r".*", "GUEST"),
    ])
    .unwrap();

    let manager = AclManager::builder()
        .identity_directory(identities)
        .host_matcher(hosts)
        .chain(chain)
        .build();

    let token = Arc::new(StaticToken::anonymous().with_host("api.example.com"));
    let subject = Subject::new(SecurityIdentity::role("ANONYMOUS")).with_token(token);
    let permissions = manager
        .class_permissions(&subject, "Document", QueryMode::Calculated)
        .unwrap();
    assert_eq!(permissions, Permissions::Calculated(Right::DISPLAY.to_vec()));
}

#[test]
fn test_field_rights_union_across_right_loop() {
    // A field mask granting two separate rights must surface both in one
    // calculated result
    let identities = Arc::new(InMemoryIdentityDirectory::new());
    identities.insert_user("alice", Vec::new());

    let fields = Arc::new(InMemoryFieldCatalog::new());
    fields.insert("Document", strings(&["title"]));

    let masks = Arc::new(InMemoryMaskStore::new());
    let alice = SecurityIdentity::user("alice");
    let class = DomainObject::Class("Document");
    masks.record(
        &alice,
        &DomainObject::Field {
            scope: &class,
            field: "title",
        },
        RightMask::VIEW | RightMask::UNDELETE,
    );

    let manager = AclManager::builder()
        .identity_directory(identities)
        .field_catalog(fields)
        .mask_store(masks)
        .build();

    let results = manager
        .class_field_permissions(
            &Subject::new(alice),
            "Document",
            None,
            QueryMode::Calculated,
        )
        .unwrap();
    assert_eq!(
        results[0].permissions,
        Permissions::Calculated(vec![Right::View, Right::Undelete])
    );
}

// ============================================================================
// HIERARCHY AND MEMBERSHIP
// ============================================================================

#[test]
fn test_has_any_role_through_two_level_hierarchy() {
    let expander = Arc::new(IdentityExpander::new(
        Arc::new(hierarchy(&[("ADMIN", &["EDITOR"]), ("EDITOR", &["VIEWER"])])),
        Arc::new(InMemoryGroupDirectory::new()),
        Arc::new(HostRoleMatcher::empty()),
    ));
    let token: Arc<StaticToken> =
        Arc::new(StaticToken::authenticated("alice", strings(&["ADMIN"])));
    let evaluator = AnyRoleEvaluator::new(expander, token);

    assert!(evaluator.has_any_role(&strings(&["VIEWER"])).unwrap());
}

#[test]
fn test_cyclic_hierarchy_expansion_terminates() {
    let mut map = BTreeMap::new();
    map.insert("A".to_string(), vec!["B".to_string()]);
    map.insert("B".to_string(), vec!["A".to_string()]);
    let roles = RoleHierarchy::new_unchecked(map);

    let expanded = roles.expand("A");
    assert_eq!(
        expanded.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["A", "B"]
    );
}

#[test]
fn test_memoized_result_matches_fresh_derivation() {
    let expander = Arc::new(IdentityExpander::new(
        Arc::new(hierarchy(&[("ADMIN", &["EDITOR"])])),
        Arc::new(InMemoryGroupDirectory::new()),
        Arc::new(HostRoleMatcher::empty()),
    ));
    let token: Arc<StaticToken> =
        Arc::new(StaticToken::authenticated("alice", strings(&["ADMIN"])));

    let evaluator = AnyRoleEvaluator::new(expander.clone(), token.clone());
    let candidates = strings(&["EDITOR"]);
    let memoized = {
        let first = evaluator.has_any_role(&candidates).unwrap();
        let second = evaluator.has_any_role(&candidates).unwrap();
        assert_eq!(first, second);
        second
    };

    // Replacement instance, cold cache
    let fresh = AnyRoleEvaluator::new(expander, token)
        .has_any_role(&candidates)
        .unwrap();
    assert_eq!(memoized, fresh);
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_engine_from_config_document() {
    let config = AclConfig::from_json(
        r#"{
            "hierarchy": {"ADMIN": ["EDITOR"], "EDITOR": ["VIEWER"]},
            "host_rules": [{"pattern": "api\\.example\\.com", "role": "API_ROLE"}],
            "rule_chain": ["deny", "allow"],
            "default_rule": "owner"
        }"#,
    )
    .unwrap();

    let identities = Arc::new(InMemoryIdentityDirectory::new());
    identities.insert_user("alice", Vec::new());

    let mut registry = RuleRegistry::with_builtins();
    let manager = AclManager::builder()
        .with_config(&config, &mut registry)
        .unwrap()
        .identity_directory(identities)
        .build();

    let subject = Subject::new(SecurityIdentity::user("alice"));
    let permissions = manager
        .class_permissions(&subject, "Document", QueryMode::Calculated)
        .unwrap();
    assert_eq!(permissions, Permissions::Calculated(Vec::new()));
}

#[test]
fn test_host_first_match_wins() {
    let matcher = HostRoleMatcher::new(&[
        HostRule::new(r"api\.example\.com", "API_ROLE"),
        HostRule::new(r".*", "GUEST"),
    ])
    .unwrap();
    assert_eq!(matcher.role_for("api.example.com"), Some("API_ROLE"));
}

#[test]
fn test_deny_chain_ordering_is_configuration() {
    let registry = RuleRegistry::with_builtins();
    let deny_first = registry.chain(&strings(&["deny", "allow"])).unwrap();
    let allow_first = registry.chain(&strings(&["allow", "deny"])).unwrap();
    assert_eq!(deny_first.rule_names(), vec!["deny", "allow"]);
    assert_eq!(allow_first.rule_names(), vec!["allow", "deny"]);

    // Same ingredients, opposite decisions
    let chain_is = |chain: &RuleChain| {
        let ctx = aclkit::RuleContext::new(Right::View, RightMask::VIEW, false);
        chain.decide(&ctx).unwrap()
    };
    assert!(!chain_is(&deny_first));
    assert!(chain_is(&allow_first));
}

// ============================================================================
// PROPERTY-BASED TESTS (PROPTEST)
// ============================================================================

const DISPLAY_NAMES: [&str; 8] = [
    "VIEW", "CREATE", "EDIT", "DELETE", "UNDELETE", "OPERATOR", "MASTER", "OWNER",
];

fn arbitrary_mask() -> impl Strategy<Value = RightMask> {
    (0u32..512).prop_map(RightMask::from_bits_truncate)
}

proptest! {
    #[test]
    fn prop_all_bit_dominates(mask in arbitrary_mask()) {
        let with_all = mask | RightMask::ALL;
        for right in Right::DISPLAY {
            prop_assert!(with_all.grants(right));
        }
    }

    #[test]
    fn prop_union_commutative(a in arbitrary_mask(), b in arbitrary_mask()) {
        prop_assert_eq!(a | b, b | a);
    }

    #[test]
    fn prop_union_identity(mask in arbitrary_mask()) {
        prop_assert_eq!(mask | RightMask::empty(), mask);
    }

    #[test]
    fn prop_names_round_trip(names in proptest::sample::subsequence(DISPLAY_NAMES.to_vec(), 0..=8)) {
        let mask = RightMask::from_names(&names).unwrap();
        // from_names accepts any order; to_names is declaration-ordered and
        // the subsequence strategy preserves declaration order
        prop_assert_eq!(mask.to_names(), names);
    }

    #[test]
    fn prop_grants_matches_name_presence(mask in arbitrary_mask()) {
        let names = mask.to_names();
        for right in Right::DISPLAY {
            prop_assert_eq!(mask.grants(right), names.contains(&right.name()));
        }
    }
}
