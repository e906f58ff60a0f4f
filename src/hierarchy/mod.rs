//! Role hierarchy expansion
//!
//! A hierarchy maps a role to the roles it directly implies. Expansion
//! returns the transitive superset of a role. The map is built once from
//! configuration and never mutated, so concurrent reads need no
//! synchronization.

mod graph;

use crate::error::{AclError, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Static role implication map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleHierarchy {
    implied: BTreeMap<String, Vec<String>>,
}

impl RoleHierarchy {
    /// Build a hierarchy, rejecting cyclic implication maps
    ///
    /// # Errors
    ///
    /// Returns [`AclError::CyclicHierarchy`] naming the cycle path when the
    /// map contains one.
    pub fn new(implied: BTreeMap<String, Vec<String>>) -> Result<Self> {
        if let Some(cycle) = graph::find_cycle(&implied) {
            return Err(AclError::CyclicHierarchy(cycle.join(" -> ")));
        }
        Ok(Self { implied })
    }

    /// Build a hierarchy without cycle validation
    ///
    /// Expansion tracks visited roles either way, so a cyclic map still
    /// terminates; the cycle is truncated instead of rejected.
    pub fn new_unchecked(implied: BTreeMap<String, Vec<String>>) -> Self {
        Self { implied }
    }

    /// Hierarchy with no implications; every role expands to itself
    pub fn empty() -> Self {
        Self::default()
    }

    /// The role itself plus every role it transitively implies
    pub fn expand(&self, role: &str) -> BTreeSet<String> {
        let mut expanded = BTreeSet::new();
        let mut pending = vec![role.to_string()];

        while let Some(current) = pending.pop() {
            if let Some(children) = self.implied.get(&current) {
                // Visited-set check: only descend on first insertion
                if expanded.insert(current) {
                    pending.extend(children.iter().cloned());
                }
            } else {
                expanded.insert(current);
            }
        }

        expanded
    }

    /// Number of roles with direct implications
    pub fn len(&self) -> usize {
        self.implied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.implied.is_empty()
    }
}
