//! External collaborator contracts
//!
//! The engine consumes these traits but never implements the real lookups:
//! identity and domain resolution, field enumeration, stored-mask storage,
//! and group membership belong to the host application. In-memory
//! implementations are provided for tests and embedders.

use crate::rights::RightMask;
use crate::types::{DomainInstance, DomainObject, IdentityKind, SecurityIdentity};
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

/// A directory-resolved identity together with the roles it holds
///
/// For users the roles are the directly assigned ones; for roles the set is
/// the role itself. Used to synthesize tokens for calculated queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub identity: SecurityIdentity,
    pub roles: Vec<String>,
}

/// Resolves an identity name into a concrete identity record
pub trait IdentityDirectory: Send + Sync {
    fn resolve(&self, kind: IdentityKind, name: &str) -> Option<ResolvedIdentity>;
}

/// Resolves a class name and id into a domain object instance
pub trait DomainDirectory: Send + Sync {
    fn resolve(&self, class_name: &str, id: &str) -> Option<DomainInstance>;
}

/// Enumerates the fields of a domain class, in stable order
pub trait FieldCatalog: Send + Sync {
    fn list_fields(&self, class_name: &str) -> Vec<String>;
}

/// Loads the stored mask for an (identity, domain) pair
///
/// The domain argument carries the optional field. Implementations return
/// the zero mask when nothing is recorded.
pub trait MaskStore: Send + Sync {
    fn load_mask(&self, identity: &SecurityIdentity, domain: &DomainObject<'_>) -> RightMask;
}

/// Group membership lookup for a principal
pub trait GroupDirectory: Send + Sync {
    fn groups_of(&self, principal: &str) -> BTreeSet<String>;
}

/// Best-effort class-name alias resolution (e.g. bundle notation)
pub trait ClassAliasResolver: Send + Sync {
    fn resolve_alias(&self, name: &str) -> Option<String>;
}

fn read_map<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_map<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory identity directory
///
/// Role identities always resolve (a role is a name, not a record); users
/// and groups must be registered first.
#[derive(Debug, Default)]
pub struct InMemoryIdentityDirectory {
    users: RwLock<HashMap<String, Vec<String>>>,
    groups: RwLock<BTreeSet<String>>,
}

impl InMemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with its directly assigned roles
    pub fn insert_user(&self, name: impl Into<String>, roles: Vec<String>) {
        write_map(&self.users).insert(name.into(), roles);
    }

    /// Register a group
    pub fn insert_group(&self, name: impl Into<String>) {
        write_map(&self.groups).insert(name.into());
    }
}

impl IdentityDirectory for InMemoryIdentityDirectory {
    fn resolve(&self, kind: IdentityKind, name: &str) -> Option<ResolvedIdentity> {
        match kind {
            IdentityKind::Role => Some(ResolvedIdentity {
                identity: SecurityIdentity::role(name),
                roles: vec![name.to_string()],
            }),
            IdentityKind::User => read_map(&self.users).get(name).map(|roles| ResolvedIdentity {
                identity: SecurityIdentity::user(name),
                roles: roles.clone(),
            }),
            IdentityKind::Group => read_map(&self.groups).contains(name).then(|| {
                ResolvedIdentity {
                    identity: SecurityIdentity::group(name),
                    roles: Vec::new(),
                }
            }),
        }
    }
}

/// In-memory domain directory
#[derive(Debug, Default)]
pub struct InMemoryDomainDirectory {
    instances: RwLock<HashMap<(String, String), DomainInstance>>,
}

impl InMemoryDomainDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, instance: DomainInstance) {
        write_map(&self.instances).insert(
            (instance.class_name.clone(), instance.id.clone()),
            instance,
        );
    }
}

impl DomainDirectory for InMemoryDomainDirectory {
    fn resolve(&self, class_name: &str, id: &str) -> Option<DomainInstance> {
        read_map(&self.instances)
            .get(&(class_name.to_string(), id.to_string()))
            .cloned()
    }
}

/// In-memory field catalog
#[derive(Debug, Default)]
pub struct InMemoryFieldCatalog {
    fields: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemoryFieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, class_name: impl Into<String>, fields: Vec<String>) {
        write_map(&self.fields).insert(class_name.into(), fields);
    }
}

impl FieldCatalog for InMemoryFieldCatalog {
    fn list_fields(&self, class_name: &str) -> Vec<String> {
        read_map(&self.fields)
            .get(class_name)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MaskKey {
    identity: SecurityIdentity,
    class_name: String,
    object_id: Option<String>,
    field: Option<String>,
}

impl MaskKey {
    fn for_domain(identity: &SecurityIdentity, domain: &DomainObject<'_>) -> Self {
        Self {
            identity: identity.clone(),
            class_name: domain.class_name().to_string(),
            object_id: domain.object_id().map(str::to_string),
            field: domain.field().map(str::to_string),
        }
    }
}

/// In-memory stored-mask table
#[derive(Debug, Default)]
pub struct InMemoryMaskStore {
    masks: RwLock<HashMap<MaskKey, RightMask>>,
}

impl InMemoryMaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mask for an (identity, domain) pair, unioning with any
    /// previously recorded entry
    pub fn record(
        &self,
        identity: &SecurityIdentity,
        domain: &DomainObject<'_>,
        mask: RightMask,
    ) {
        let key = MaskKey::for_domain(identity, domain);
        let mut masks = write_map(&self.masks);
        let entry = masks.entry(key).or_insert_with(RightMask::empty);
        *entry |= mask;
    }
}

impl MaskStore for InMemoryMaskStore {
    fn load_mask(&self, identity: &SecurityIdentity, domain: &DomainObject<'_>) -> RightMask {
        read_map(&self.masks)
            .get(&MaskKey::for_domain(identity, domain))
            .copied()
            .unwrap_or_else(RightMask::empty)
    }
}

/// In-memory group membership table
#[derive(Debug, Default)]
pub struct InMemoryGroupDirectory {
    memberships: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl InMemoryGroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, principal: impl Into<String>, group: impl Into<String>) {
        write_map(&self.memberships)
            .entry(principal.into())
            .or_default()
            .insert(group.into());
    }
}

impl GroupDirectory for InMemoryGroupDirectory {
    fn groups_of(&self, principal: &str) -> BTreeSet<String> {
        read_map(&self.memberships)
            .get(principal)
            .cloned()
            .unwrap_or_default()
    }
}

/// Alias resolver backed by a fixed map
#[derive(Debug, Default)]
pub struct StaticAliasResolver {
    aliases: HashMap<String, String>,
}

impl StaticAliasResolver {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }
}

impl ClassAliasResolver for StaticAliasResolver {
    fn resolve_alias(&self, name: &str) -> Option<String> {
        self.aliases.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rights::Right;

    #[test]
    fn test_identity_directory_roles_always_resolve() {
        let directory = InMemoryIdentityDirectory::new();
        let resolved = directory.resolve(IdentityKind::Role, "ADMIN").unwrap();
        assert_eq!(resolved.identity, SecurityIdentity::role("ADMIN"));
        assert_eq!(resolved.roles, vec!["ADMIN".to_string()]);
    }

    #[test]
    fn test_identity_directory_users_must_be_registered() {
        let directory = InMemoryIdentityDirectory::new();
        assert!(directory.resolve(IdentityKind::User, "alice").is_none());

        directory.insert_user("alice", vec!["EDITOR".to_string()]);
        let resolved = directory.resolve(IdentityKind::User, "alice").unwrap();
        assert_eq!(resolved.roles, vec!["EDITOR".to_string()]);
    }

    #[test]
    fn test_mask_store_defaults_to_zero() {
        let store = InMemoryMaskStore::new();
        let identity = SecurityIdentity::user("alice");
        let domain = DomainObject::Class("Document");
        assert!(store.load_mask(&identity, &domain).is_empty());
    }

    #[test]
    fn test_mask_store_record_unions() {
        let store = InMemoryMaskStore::new();
        let identity = SecurityIdentity::user("alice");
        let domain = DomainObject::Class("Document");

        store.record(&identity, &domain, Right::View.mask());
        store.record(&identity, &domain, Right::Edit.mask());

        let mask = store.load_mask(&identity, &domain);
        assert!(mask.grants(Right::View));
        assert!(mask.grants(Right::Edit));
        assert!(!mask.grants(Right::Delete));
    }

    #[test]
    fn test_mask_store_field_entries_are_distinct() {
        let store = InMemoryMaskStore::new();
        let identity = SecurityIdentity::user("alice");
        let class = DomainObject::Class("Document");
        let field = DomainObject::Field {
            scope: &class,
            field: "title",
        };

        store.record(&identity, &field, Right::Edit.mask());
        assert!(store.load_mask(&identity, &class).is_empty());
        assert!(store.load_mask(&identity, &field).grants(Right::Edit));
    }

    #[test]
    fn test_group_directory() {
        let groups = InMemoryGroupDirectory::new();
        groups.insert("alice", "editors");
        groups.insert("alice", "staff");

        let memberships = groups.groups_of("alice");
        assert_eq!(
            memberships.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["editors", "staff"]
        );
        assert!(groups.groups_of("bob").is_empty());
    }
}
