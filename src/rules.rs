//! Rule definitions and the rule chain
//!
//! A rule inspects the evaluation context and grants, denies, or abstains.
//! The chain consults configured rules in priority order; the first
//! non-abstaining decision wins, the designated default rule breaks an
//! all-abstain tie, and an undecided chain denies.

use crate::error::{AclError, Result};
use crate::expand::AnyRoleEvaluator;
use crate::rights::{Right, RightMask};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a single rule evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleDecision {
    Grant,
    Deny,
    Abstain,
}

/// Evaluation context handed to each rule
///
/// Carries the requested right, the stored mask for the (identity, domain)
/// pair, whether the querying identity is the domain's recorded owner, the
/// optional field name, and the per-query role evaluator when a calculated
/// query carries a token.
pub struct RuleContext<'a> {
    pub right: Right,
    pub mask: RightMask,
    pub is_owner: bool,
    pub field: Option<&'a str>,
    evaluator: Option<&'a AnyRoleEvaluator>,
}

impl<'a> RuleContext<'a> {
    pub fn new(right: Right, mask: RightMask, is_owner: bool) -> Self {
        Self {
            right,
            mask,
            is_owner,
            field: None,
            evaluator: None,
        }
    }

    pub fn with_field(mut self, field: &'a str) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_evaluator(mut self, evaluator: &'a AnyRoleEvaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Whether the query's token holds any of the candidate roles
    ///
    /// False when no token is in scope (stored-identity context).
    pub fn has_any_role(&self, candidates: &[String]) -> Result<bool> {
        match self.evaluator {
            Some(evaluator) => evaluator.has_any_role(candidates),
            None => Ok(false),
        }
    }
}

impl fmt::Debug for RuleContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleContext")
            .field("right", &self.right)
            .field("mask", &self.mask)
            .field("is_owner", &self.is_owner)
            .field("field", &self.field)
            .field("has_evaluator", &self.evaluator.is_some())
            .finish()
    }
}

/// A composable grant/deny strategy
pub trait RuleDefinition: Send + Sync {
    /// Stable identifier used in configuration and diagnostics
    fn name(&self) -> &str;

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleDecision>;
}

/// Grants when the mask grants the requested right; never denies
#[derive(Debug, Default)]
pub struct AllowRule;

impl RuleDefinition for AllowRule {
    fn name(&self) -> &str {
        "allow"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleDecision> {
        if ctx.mask.grants(ctx.right) {
            Ok(RuleDecision::Grant)
        } else {
            Ok(RuleDecision::Abstain)
        }
    }
}

/// Denies when the mask grants the requested right
#[derive(Debug, Default)]
pub struct DenyRule;

impl RuleDefinition for DenyRule {
    fn name(&self) -> &str {
        "deny"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleDecision> {
        if ctx.mask.grants(ctx.right) {
            Ok(RuleDecision::Deny)
        } else {
            Ok(RuleDecision::Abstain)
        }
    }
}

/// Grants any right to the domain's recorded owner
#[derive(Debug, Default)]
pub struct OwnerRule;

impl RuleDefinition for OwnerRule {
    fn name(&self) -> &str {
        "owner"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleDecision> {
        if ctx.is_owner {
            Ok(RuleDecision::Grant)
        } else {
            Ok(RuleDecision::Abstain)
        }
    }
}

/// Grants a right when the mask holds a right that dominates it
///
/// OWNER covers MASTER, MASTER covers OPERATOR, OPERATOR covers the five
/// object-level rights.
#[derive(Debug, Default)]
pub struct PrecedenceRule;

impl RuleDefinition for PrecedenceRule {
    fn name(&self) -> &str {
        "operator-precedence"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleDecision> {
        if ctx.mask.intersects(ctx.right.dominators()) {
            Ok(RuleDecision::Grant)
        } else {
            Ok(RuleDecision::Abstain)
        }
    }
}

/// Grants every right to tokens holding any of the configured roles
#[derive(Debug)]
pub struct RoleRule {
    name: String,
    candidates: Vec<String>,
}

impl RoleRule {
    pub fn new(name: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            name: name.into(),
            candidates,
        }
    }
}

impl RuleDefinition for RoleRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleDecision> {
        if ctx.has_any_role(&self.candidates)? {
            Ok(RuleDecision::Grant)
        } else {
            Ok(RuleDecision::Abstain)
        }
    }
}

/// Explicit per-right overrides; deny wins over grant
#[derive(Debug)]
pub struct OverrideRule {
    name: String,
    grant: RightMask,
    deny: RightMask,
}

impl OverrideRule {
    pub fn new(name: impl Into<String>, grant: RightMask, deny: RightMask) -> Self {
        Self {
            name: name.into(),
            grant,
            deny,
        }
    }
}

impl RuleDefinition for OverrideRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleDecision> {
        if self.deny.grants(ctx.right) {
            Ok(RuleDecision::Deny)
        } else if self.grant.grants(ctx.right) {
            Ok(RuleDecision::Grant)
        } else {
            Ok(RuleDecision::Abstain)
        }
    }
}

/// Name-to-rule registry, populated at startup and read-only afterwards
///
/// At most one rule is designated as the default; the chain consults it
/// when every configured rule abstains.
#[derive(Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Arc<dyn RuleDefinition>>,
    default_rule: Option<String>,
}

impl RuleRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in rules: `allow`, `deny`,
    /// `owner`, and `operator-precedence`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        // Built-in names are distinct, registration cannot fail
        let _ = registry.register(Arc::new(AllowRule));
        let _ = registry.register(Arc::new(DenyRule));
        let _ = registry.register(Arc::new(OwnerRule));
        let _ = registry.register(Arc::new(PrecedenceRule));
        registry
    }

    /// Register a rule under its own name
    ///
    /// # Errors
    ///
    /// Returns [`AclError::DuplicateRule`] when the name is taken.
    pub fn register(&mut self, rule: Arc<dyn RuleDefinition>) -> Result<()> {
        let name = rule.name().to_string();
        if self.rules.contains_key(&name) {
            return Err(AclError::DuplicateRule(name));
        }
        self.rules.insert(name, rule);
        Ok(())
    }

    /// Designate the default rule
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownRule`] when the name is not registered.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.rules.contains_key(name) {
            return Err(AclError::UnknownRule(name.to_string()));
        }
        self.default_rule = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RuleDefinition>> {
        self.rules.get(name).cloned()
    }

    /// Resolve a configured priority order into an evaluation chain
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownRule`] for any unregistered name. Rule
    /// names resolve once here, never during query evaluation.
    pub fn chain(&self, names: &[String]) -> Result<RuleChain> {
        let mut rules = Vec::with_capacity(names.len());
        for name in names {
            let rule = self
                .get(name)
                .ok_or_else(|| AclError::UnknownRule(name.clone()))?;
            rules.push(rule);
        }

        let default_rule = match &self.default_rule {
            Some(name) => Some(
                self.get(name)
                    .ok_or_else(|| AclError::UnknownRule(name.clone()))?,
            ),
            None => None,
        };

        Ok(RuleChain::new(rules, default_rule))
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("RuleRegistry")
            .field("rules", &names)
            .field("default_rule", &self.default_rule)
            .finish()
    }
}

/// Priority-ordered rule chain with a fail-closed tie-break
#[derive(Clone)]
pub struct RuleChain {
    rules: Vec<Arc<dyn RuleDefinition>>,
    default_rule: Option<Arc<dyn RuleDefinition>>,
}

impl RuleChain {
    pub fn new(
        rules: Vec<Arc<dyn RuleDefinition>>,
        default_rule: Option<Arc<dyn RuleDefinition>>,
    ) -> Self {
        Self {
            rules,
            default_rule,
        }
    }

    /// Chain consisting of the allow rule alone
    pub fn allow_only() -> Self {
        Self::new(vec![Arc::new(AllowRule)], None)
    }

    /// Names of the configured rules, in priority order
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Decide a single right: first non-abstaining rule wins, then the
    /// default rule, then deny
    pub fn decide(&self, ctx: &RuleContext<'_>) -> Result<bool> {
        for rule in &self.rules {
            match rule.evaluate(ctx)? {
                RuleDecision::Grant => {
                    debug!(rule = rule.name(), right = %ctx.right, "rule granted");
                    return Ok(true);
                }
                RuleDecision::Deny => {
                    debug!(rule = rule.name(), right = %ctx.right, "rule denied");
                    return Ok(false);
                }
                RuleDecision::Abstain => {}
            }
        }

        if let Some(default_rule) = &self.default_rule {
            match default_rule.evaluate(ctx)? {
                RuleDecision::Grant => return Ok(true),
                RuleDecision::Deny | RuleDecision::Abstain => return Ok(false),
            }
        }

        Ok(false)
    }
}

impl fmt::Debug for RuleChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleChain")
            .field("rules", &self.rule_names())
            .field(
                "default_rule",
                &self.default_rule.as_ref().map(|rule| rule.name()),
            )
            .finish()
    }
}
