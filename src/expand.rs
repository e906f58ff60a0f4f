//! Token expansion and the memoized any-role membership test

use crate::error::{AclError, Result};
use crate::hierarchy::RoleHierarchy;
use crate::host::HostRoleMatcher;
use crate::providers::GroupDirectory;
use crate::types::{AuthToken, SecurityIdentity};
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Converts an authentication token into the full set of security
/// identities to test against stored permissions and rules
///
/// Expansion order: the token's held roles, each expanded through the role
/// hierarchy; the principal as a user identity (skipped for anonymous
/// tokens); a group identity per membership of the principal; and, for
/// anonymous callers with a known host, the host-matched default role.
/// Duplicates are removed by identity equality, first occurrence wins.
pub struct IdentityExpander {
    hierarchy: Arc<RoleHierarchy>,
    groups: Arc<dyn GroupDirectory>,
    hosts: Arc<HostRoleMatcher>,
}

impl IdentityExpander {
    pub fn new(
        hierarchy: Arc<RoleHierarchy>,
        groups: Arc<dyn GroupDirectory>,
        hosts: Arc<HostRoleMatcher>,
    ) -> Self {
        Self {
            hierarchy,
            groups,
            hosts,
        }
    }

    /// Expand a token into its security identities
    pub fn expand(&self, token: &dyn AuthToken) -> Vec<SecurityIdentity> {
        fn push(out: &mut Vec<SecurityIdentity>, identity: SecurityIdentity) {
            if !out.contains(&identity) {
                out.push(identity);
            }
        }

        let mut identities: Vec<SecurityIdentity> = Vec::new();

        for role in token.held_roles() {
            for expanded in self.hierarchy.expand(role) {
                push(&mut identities, SecurityIdentity::Role(expanded));
            }
        }

        if !token.is_anonymous() {
            if let Some(principal) = token.principal() {
                push(&mut identities, SecurityIdentity::user(principal));
                for group in self.groups.groups_of(principal) {
                    push(&mut identities, SecurityIdentity::Group(group));
                }
            }
        } else if let Some(host) = token.host() {
            if let Some(role) = self.hosts.role_for(host) {
                debug!(host, role, "injected host-matched role for anonymous caller");
                push(&mut identities, SecurityIdentity::role(role));
            }
        }

        identities
    }
}

/// Delimiter joining candidate role names into a cache key. Chosen to never
/// appear in a legal role name; names containing it are rejected.
const SIGNATURE_DELIMITER: char = '\u{1f}';

/// Memoization cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorCacheStats {
    /// Number of memoized candidate-set results
    pub entries: usize,
}

/// Memoized "does this token hold any of these roles" test
///
/// Bound to a single token. The cache key is the canonical signature of the
/// candidate set; the token's expanded identities are computed once, on
/// first use. The cache is a [`DashMap`], so one evaluator instance can be
/// shared across concurrent queries; it is invalidated only by replacing
/// the instance.
pub struct AnyRoleEvaluator {
    expander: Arc<IdentityExpander>,
    token: Arc<dyn AuthToken>,
    expanded: OnceLock<Vec<SecurityIdentity>>,
    cache: DashMap<String, bool>,
}

impl AnyRoleEvaluator {
    pub fn new(expander: Arc<IdentityExpander>, token: Arc<dyn AuthToken>) -> Self {
        Self {
            expander,
            token,
            expanded: OnceLock::new(),
            cache: DashMap::new(),
        }
    }

    /// True iff the token's expanded identity set contains any candidate as
    /// a role identity
    ///
    /// # Errors
    ///
    /// Returns [`AclError::InvalidRoleName`] when a candidate contains the
    /// reserved signature delimiter.
    pub fn has_any_role(&self, candidates: &[String]) -> Result<bool> {
        let signature = Self::signature(candidates)?;

        if let Some(memoized) = self.cache.get(&signature) {
            return Ok(*memoized);
        }

        let held = self.identities().iter().any(|identity| {
            matches!(identity, SecurityIdentity::Role(name) if candidates.iter().any(|c| c == name))
        });

        self.cache.insert(signature, held);
        Ok(held)
    }

    /// The token's expanded identities, computed on first use
    pub fn identities(&self) -> &[SecurityIdentity] {
        self.expanded
            .get_or_init(|| self.expander.expand(self.token.as_ref()))
    }

    pub fn cache_stats(&self) -> EvaluatorCacheStats {
        EvaluatorCacheStats {
            entries: self.cache.len(),
        }
    }

    fn signature(candidates: &[String]) -> Result<String> {
        let mut signature = String::new();
        for candidate in candidates {
            if candidate.contains(SIGNATURE_DELIMITER) {
                return Err(AclError::InvalidRoleName(candidate.clone()));
            }
            if !signature.is_empty() {
                signature.push(SIGNATURE_DELIMITER);
            }
            signature.push_str(candidate);
        }
        Ok(signature)
    }
}
