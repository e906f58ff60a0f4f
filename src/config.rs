//! Configuration document and component assembly
//!
//! Everything here fails at startup: hierarchy cycles, bad host patterns,
//! and unknown rule names are construction-time errors, never query-time
//! ones.

use crate::error::Result;
use crate::hierarchy::RoleHierarchy;
use crate::host::{HostRoleMatcher, HostRule};
use crate::rules::{RuleChain, RuleRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Engine configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclConfig {
    /// Role name to directly implied role names
    #[serde(default)]
    pub hierarchy: BTreeMap<String, Vec<String>>,

    /// Ordered host-to-role rules for anonymous callers
    #[serde(default)]
    pub host_rules: Vec<HostRule>,

    /// Rule names in evaluation priority order
    #[serde(default)]
    pub rule_chain: Vec<String>,

    /// Rule consulted when every chained rule abstains
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_rule: Option<String>,

    /// Class-name aliases (e.g. bundle notation to fully qualified name)
    #[serde(default)]
    pub class_aliases: BTreeMap<String, String>,
}

impl AclConfig {
    /// Parse a JSON configuration document
    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }

    /// Build the role hierarchy, rejecting cycles
    pub fn build_hierarchy(&self) -> Result<RoleHierarchy> {
        RoleHierarchy::new(self.hierarchy.clone())
    }

    /// Compile the host-role matcher
    pub fn build_host_matcher(&self) -> Result<HostRoleMatcher> {
        HostRoleMatcher::new(&self.host_rules)
    }

    /// Resolve the configured rule chain against a registry
    pub fn build_chain(&self, registry: &mut RuleRegistry) -> Result<RuleChain> {
        if let Some(default_rule) = &self.default_rule {
            registry.set_default(default_rule)?;
        }
        registry.chain(&self.rule_chain)
    }
}
