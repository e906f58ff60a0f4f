//! Error types for the ACL engine

use thiserror::Error;

/// ACL engine errors
#[derive(Debug, Error)]
pub enum AclError {
    /// A right name outside the fixed enumeration
    #[error("Unknown right: {0}")]
    UnknownRight(String),

    /// Identity lookup returned no result
    #[error("Identity not found: {kind} \"{name}\"")]
    IdentityNotFound { kind: String, name: String },

    /// Domain object lookup returned no result
    #[error("Domain object not found: {class_name}#{id}")]
    DomainNotFound { class_name: String, id: String },

    /// Cyclic role hierarchy rejected at configuration time
    #[error("Cyclic role hierarchy: {0}")]
    CyclicHierarchy(String),

    /// Malformed host pattern, fatal during initialization
    #[error("Invalid host pattern \"{pattern}\": {source}")]
    InvalidHostPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Role name contains the reserved cache-key delimiter
    #[error("Invalid role name: {0:?}")]
    InvalidRoleName(String),

    /// Rule name not present in the registry
    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    /// Rule name already registered
    #[error("Duplicate rule: {0}")]
    DuplicateRule(String),

    /// Configuration document error
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for ACL operations
pub type Result<T> = std::result::Result<T, AclError>;
