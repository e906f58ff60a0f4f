//! Host-based default role matching for anonymous callers

use crate::error::{AclError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One `(host pattern, role)` configuration pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRule {
    /// Regular expression matched against the caller host
    pub pattern: String,

    /// Role injected when the pattern matches
    pub role: String,
}

impl HostRule {
    pub fn new(pattern: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            role: role.into(),
        }
    }
}

/// Maps an anonymous caller's host to a configured default role
///
/// Rules are consulted in declared order and the first matching pattern
/// wins. Broader patterns must therefore be ordered after narrower ones by
/// the configurer. Patterns are compiled once at startup; a malformed
/// pattern is fatal to initialization.
#[derive(Debug, Clone, Default)]
pub struct HostRoleMatcher {
    rules: Vec<(Regex, String)>,
}

impl HostRoleMatcher {
    /// Compile the configured rules
    ///
    /// # Errors
    ///
    /// Returns [`AclError::InvalidHostPattern`] for the first pattern that
    /// fails to compile.
    pub fn new(rules: &[HostRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let regex = Regex::new(&rule.pattern).map_err(|source| {
                AclError::InvalidHostPattern {
                    pattern: rule.pattern.clone(),
                    source,
                }
            })?;
            compiled.push((regex, rule.role.clone()));
        }
        Ok(Self { rules: compiled })
    }

    /// Matcher with no rules; never yields a role
    pub fn empty() -> Self {
        Self::default()
    }

    /// Role of the first rule whose pattern matches the host
    pub fn role_for(&self, host: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|(regex, _)| regex.is_match(host))
            .map(|(_, role)| role.as_str())
    }
}
