//! Query and result types for the permission resolver

use crate::rights::{Right, RightMask};
use crate::types::{AuthToken, SecurityIdentity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Evaluation strategy requested by the caller
///
/// Group identities always evaluate calculated, regardless of this flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Read the persisted mask as-is
    Stored,

    /// Re-derive rights through the rule chain
    Calculated,
}

/// Result of a permission query, never partially populated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permissions {
    /// The mask recorded for the identity/domain pair
    Stored(RightMask),

    /// Rights granted by the rule chain, in declaration order
    Calculated(Vec<Right>),
}

impl Permissions {
    /// Displayable right names, in declaration order for either variant
    pub fn to_names(&self) -> Vec<&'static str> {
        match self {
            Permissions::Stored(mask) => mask.to_names(),
            Permissions::Calculated(rights) => {
                rights.iter().copied().map(Right::name).collect()
            }
        }
    }

    /// Whether the result grants the given right
    pub fn grants(&self, right: Right) -> bool {
        match self {
            Permissions::Stored(mask) => mask.grants(right),
            Permissions::Calculated(rights) => rights.contains(&right),
        }
    }
}

/// Per-field permission result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPermissions {
    pub field: String,
    pub permissions: Permissions,
}

/// The identity a query runs for, with an optional token for calculated
/// evaluation
#[derive(Clone)]
pub struct Subject {
    pub identity: SecurityIdentity,
    pub token: Option<Arc<dyn AuthToken>>,
}

impl Subject {
    pub fn new(identity: SecurityIdentity) -> Self {
        Self {
            identity,
            token: None,
        }
    }

    /// Attach the token consulted by role-aware rules in calculated mode
    pub fn with_token(mut self, token: Arc<dyn AuthToken>) -> Self {
        self.token = Some(token);
        self
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("identity", &self.identity)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}
