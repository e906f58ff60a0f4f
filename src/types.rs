//! Core identity and domain object types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity variant tag, used for directory lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Role,
    User,
    Group,
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKind::Role => f.write_str("role"),
            IdentityKind::User => f.write_str("user"),
            IdentityKind::Group => f.write_str("group"),
        }
    }
}

/// An entity that can be granted rights
///
/// Immutable once constructed; equality is variant tag plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum SecurityIdentity {
    Role(String),
    User(String),
    Group(String),
}

impl SecurityIdentity {
    /// Create a role identity
    pub fn role(name: impl Into<String>) -> Self {
        SecurityIdentity::Role(name.into())
    }

    /// Create a user identity
    pub fn user(name: impl Into<String>) -> Self {
        SecurityIdentity::User(name.into())
    }

    /// Create a group identity
    pub fn group(name: impl Into<String>) -> Self {
        SecurityIdentity::Group(name.into())
    }

    /// Construct from a variant tag and name
    pub fn new(kind: IdentityKind, name: impl Into<String>) -> Self {
        match kind {
            IdentityKind::Role => SecurityIdentity::Role(name.into()),
            IdentityKind::User => SecurityIdentity::User(name.into()),
            IdentityKind::Group => SecurityIdentity::Group(name.into()),
        }
    }

    pub fn kind(&self) -> IdentityKind {
        match self {
            SecurityIdentity::Role(_) => IdentityKind::Role,
            SecurityIdentity::User(_) => IdentityKind::User,
            SecurityIdentity::Group(_) => IdentityKind::Group,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SecurityIdentity::Role(name)
            | SecurityIdentity::User(name)
            | SecurityIdentity::Group(name) => name,
        }
    }
}

impl fmt::Display for SecurityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.name())
    }
}

/// A resolved domain object instance, as returned by the domain directory
///
/// The engine holds it only for the duration of a single permission query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainInstance {
    /// Fully qualified class name
    pub class_name: String,

    /// Instance identifier
    pub id: String,

    /// Recorded owner, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<SecurityIdentity>,
}

impl DomainInstance {
    /// Create an instance handle without an owner
    pub fn new(class_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            id: id.into(),
            owner: None,
        }
    }

    /// Record the instance owner
    pub fn with_owner(mut self, owner: SecurityIdentity) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// The protected target of a permission query
///
/// Borrows the underlying class name or instance; a `DomainObject` never
/// outlives the query it was built for. Rule evaluation matches exhaustively
/// over the three variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainObject<'a> {
    /// Class-level target
    Class(&'a str),

    /// Object-level target
    Object(&'a DomainInstance),

    /// Field-level target on a class or object scope
    Field {
        scope: &'a DomainObject<'a>,
        field: &'a str,
    },
}

impl<'a> DomainObject<'a> {
    /// Class name of the target, through any field wrapper
    pub fn class_name(&self) -> &'a str {
        match self {
            DomainObject::Class(class_name) => class_name,
            DomainObject::Object(instance) => &instance.class_name,
            DomainObject::Field { scope, .. } => scope.class_name(),
        }
    }

    /// Object id, when the target is (a field on) an instance
    pub fn object_id(&self) -> Option<&'a str> {
        match self {
            DomainObject::Class(_) => None,
            DomainObject::Object(instance) => Some(&instance.id),
            DomainObject::Field { scope, .. } => scope.object_id(),
        }
    }

    /// Field name, when the target is field-level
    pub fn field(&self) -> Option<&'a str> {
        match self {
            DomainObject::Field { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Recorded owner of the underlying instance, if any
    pub fn owner(&self) -> Option<&'a SecurityIdentity> {
        match self {
            DomainObject::Class(_) => None,
            DomainObject::Object(instance) => instance.owner.as_ref(),
            DomainObject::Field { scope, .. } => scope.owner(),
        }
    }
}

impl fmt::Display for DomainObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainObject::Class(class_name) => write!(f, "{class_name}"),
            DomainObject::Object(instance) => {
                write!(f, "{}#{}", instance.class_name, instance.id)
            }
            DomainObject::Field { scope, field } => write!(f, "{scope}.{field}"),
        }
    }
}

/// Minimal authentication token contract
///
/// The engine never inspects framework token internals; it only needs the
/// principal name, the directly held roles, the anonymous flag, and the
/// caller host used for default-role injection of anonymous callers.
pub trait AuthToken: Send + Sync {
    /// Principal name, absent for anonymous tokens
    fn principal(&self) -> Option<&str>;

    /// Roles held directly by the token, before hierarchy expansion
    fn held_roles(&self) -> &[String];

    /// Whether the caller is unauthenticated
    fn is_anonymous(&self) -> bool;

    /// Caller host, consulted only for anonymous tokens
    fn host(&self) -> Option<&str> {
        None
    }
}

/// Self-contained token, used by embedders and tests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticToken {
    #[serde(skip_serializing_if = "Option::is_none")]
    principal: Option<String>,

    #[serde(default)]
    roles: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
}

impl StaticToken {
    /// Token for an authenticated principal with the given roles
    pub fn authenticated(principal: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            principal: Some(principal.into()),
            roles,
            host: None,
        }
    }

    /// Unauthenticated token
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Attach a directly held role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Attach the caller host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

impl AuthToken for StaticToken {
    fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    fn held_roles(&self) -> &[String] {
        &self.roles
    }

    fn is_anonymous(&self) -> bool {
        self.principal.is_none()
    }

    fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }
}
