//! # aclkit
//!
//! Bitmask ACL authorization engine. Given a security identity (user, role,
//! or group) and a protected domain object (a class, an object instance, or
//! a field on either), it determines which rights that identity holds.
//!
//! ## Features
//!
//! - **Bitmask rights model** with stable bit positions and an ALL sentinel
//! - **Stored and calculated evaluation**: read persisted masks as-is, or
//!   re-derive rights through a configurable rule chain
//! - **Role hierarchy expansion** with fail-fast cycle rejection
//! - **Memoized any-role membership tests** backed by a lock-free cache
//! - **Host-based default roles** for anonymous callers
//! - **Pluggable collaborators** for identity, domain, field, mask, and
//!   group lookups
//!
//! ## Example
//!
//! ```rust
//! use aclkit::{
//!     AclManager, DomainObject, InMemoryIdentityDirectory, InMemoryMaskStore, QueryMode,
//!     RightMask, SecurityIdentity, Subject,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> aclkit::Result<()> {
//!     let identities = Arc::new(InMemoryIdentityDirectory::new());
//!     identities.insert_user("alice", vec!["EDITOR".to_string()]);
//!
//!     let masks = Arc::new(InMemoryMaskStore::new());
//!     let alice = SecurityIdentity::user("alice");
//!     masks.record(
//!         &alice,
//!         &DomainObject::Class("Document"),
//!         RightMask::from_names(["VIEW", "EDIT"])?,
//!     );
//!
//!     let manager = AclManager::builder()
//!         .identity_directory(identities)
//!         .mask_store(masks)
//!         .build();
//!
//!     let subject = Subject::new(alice);
//!     let permissions = manager.class_permissions(&subject, "Document", QueryMode::Stored)?;
//!     assert_eq!(permissions.to_names(), vec!["VIEW", "EDIT"]);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod expand;
pub mod hierarchy;
pub mod host;
pub mod providers;
pub mod rights;
pub mod rules;
pub mod types;

// Re-export commonly used types
pub use config::AclConfig;
pub use engine::{AclManager, AclManagerBuilder, FieldPermissions, Permissions, QueryMode, Subject};
pub use error::{AclError, Result};
pub use expand::{AnyRoleEvaluator, EvaluatorCacheStats, IdentityExpander};
pub use hierarchy::RoleHierarchy;
pub use host::{HostRoleMatcher, HostRule};
pub use providers::{
    ClassAliasResolver, DomainDirectory, FieldCatalog, GroupDirectory, IdentityDirectory,
    InMemoryDomainDirectory, InMemoryFieldCatalog, InMemoryGroupDirectory,
    InMemoryIdentityDirectory, InMemoryMaskStore, MaskStore, ResolvedIdentity,
    StaticAliasResolver,
};
pub use rights::{Right, RightMask};
pub use rules::{
    AllowRule, DenyRule, OverrideRule, OwnerRule, PrecedenceRule, RoleRule, RuleChain,
    RuleContext, RuleDecision, RuleDefinition, RuleRegistry,
};
pub use types::{
    AuthToken, DomainInstance, DomainObject, IdentityKind, SecurityIdentity, StaticToken,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
