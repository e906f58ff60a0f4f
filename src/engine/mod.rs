//! The permission resolver
//!
//! `AclManager` orchestrates the collaborators into a single grant
//! decision:
//!
//! ```text
//! query -> identity check -> class-name normalization -> domain resolution
//!       -> [stored]     mask lookup
//!       -> [calculated] per-right rule chain (mask, ownership, roles)
//! ```

pub mod query;

pub use query::{FieldPermissions, Permissions, QueryMode, Subject};

use crate::config::AclConfig;
use crate::error::{AclError, Result};
use crate::expand::{AnyRoleEvaluator, IdentityExpander};
use crate::hierarchy::RoleHierarchy;
use crate::host::HostRoleMatcher;
use crate::providers::{
    ClassAliasResolver, DomainDirectory, FieldCatalog, GroupDirectory, IdentityDirectory,
    InMemoryDomainDirectory, InMemoryFieldCatalog, InMemoryGroupDirectory,
    InMemoryIdentityDirectory, InMemoryMaskStore, MaskStore, StaticAliasResolver,
};
use crate::rights::Right;
use crate::rules::{RuleChain, RuleContext, RuleRegistry};
use crate::types::{DomainInstance, DomainObject, IdentityKind, SecurityIdentity, StaticToken};
use std::sync::Arc;
use tracing::{debug, info};

/// ACL permission resolution engine
///
/// Construction wires the immutable configuration (role hierarchy, rule
/// chain, host rules) together with the host application's lookup
/// collaborators. The engine itself holds no mutable state; a per-query
/// [`AnyRoleEvaluator`] carries the only cache.
pub struct AclManager {
    expander: Arc<IdentityExpander>,
    chain: RuleChain,
    identities: Arc<dyn IdentityDirectory>,
    domains: Arc<dyn DomainDirectory>,
    fields: Arc<dyn FieldCatalog>,
    masks: Arc<dyn MaskStore>,
    aliases: Option<Arc<dyn ClassAliasResolver>>,
}

impl AclManager {
    pub fn builder() -> AclManagerBuilder {
        AclManagerBuilder::default()
    }

    /// Resolve a subject by kind and name through the identity directory,
    /// synthesizing a token from the resolved roles
    ///
    /// # Errors
    ///
    /// Returns [`AclError::IdentityNotFound`] when the directory has no
    /// record for the name.
    pub fn subject_for(&self, kind: IdentityKind, name: &str) -> Result<Subject> {
        let resolved = self
            .identities
            .resolve(kind, name)
            .ok_or_else(|| AclError::IdentityNotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            })?;

        let token = match kind {
            IdentityKind::User => StaticToken::authenticated(name, resolved.roles),
            _ => {
                let mut token = StaticToken::anonymous();
                for role in resolved.roles {
                    token = token.with_role(role);
                }
                token
            }
        };

        Ok(Subject::new(resolved.identity).with_token(Arc::new(token)))
    }

    /// Class-level permission query
    pub fn class_permissions(
        &self,
        subject: &Subject,
        class_name: &str,
        mode: QueryMode,
    ) -> Result<Permissions> {
        self.verify_identity(subject)?;
        let class_name = self.normalize_class(class_name);
        let domain = DomainObject::Class(&class_name);
        self.resolve_permissions(subject, &domain, mode)
    }

    /// Object-level permission query
    ///
    /// # Errors
    ///
    /// Returns [`AclError::DomainNotFound`] when the instance cannot be
    /// resolved.
    pub fn object_permissions(
        &self,
        subject: &Subject,
        class_name: &str,
        object_id: &str,
        mode: QueryMode,
    ) -> Result<Permissions> {
        self.verify_identity(subject)?;
        let class_name = self.normalize_class(class_name);
        let instance = self.resolve_instance(&class_name, object_id)?;
        let domain = DomainObject::Object(&instance);
        self.resolve_permissions(subject, &domain, mode)
    }

    /// Field-level permission query against a class
    ///
    /// With an explicit field only that field is evaluated; otherwise every
    /// field of the class is enumerated through the field catalog, in
    /// catalog order.
    pub fn class_field_permissions(
        &self,
        subject: &Subject,
        class_name: &str,
        field: Option<&str>,
        mode: QueryMode,
    ) -> Result<Vec<FieldPermissions>> {
        self.verify_identity(subject)?;
        let class_name = self.normalize_class(class_name);
        let scope = DomainObject::Class(&class_name);
        self.field_permissions(subject, &scope, &class_name, field, mode)
    }

    /// Field-level permission query against an object instance
    pub fn object_field_permissions(
        &self,
        subject: &Subject,
        class_name: &str,
        object_id: &str,
        field: Option<&str>,
        mode: QueryMode,
    ) -> Result<Vec<FieldPermissions>> {
        self.verify_identity(subject)?;
        let class_name = self.normalize_class(class_name);
        let instance = self.resolve_instance(&class_name, object_id)?;
        let scope = DomainObject::Object(&instance);
        self.field_permissions(subject, &scope, &class_name, field, mode)
    }

    fn field_permissions(
        &self,
        subject: &Subject,
        scope: &DomainObject<'_>,
        class_name: &str,
        field: Option<&str>,
        mode: QueryMode,
    ) -> Result<Vec<FieldPermissions>> {
        let fields = match field {
            Some(field) => vec![field.to_string()],
            None => self.fields.list_fields(class_name),
        };

        let mut results = Vec::with_capacity(fields.len());
        for field in &fields {
            let domain = DomainObject::Field { scope, field };
            let permissions = self.resolve_permissions(subject, &domain, mode)?;
            results.push(FieldPermissions {
                field: field.clone(),
                permissions,
            });
        }
        Ok(results)
    }

    fn resolve_permissions(
        &self,
        subject: &Subject,
        domain: &DomainObject<'_>,
        mode: QueryMode,
    ) -> Result<Permissions> {
        // Group rights are always derived, never read back as stored masks
        let mode = if matches!(subject.identity, SecurityIdentity::Group(_)) {
            if mode == QueryMode::Stored {
                debug!(identity = %subject.identity, "group identity forces calculated mode");
            }
            QueryMode::Calculated
        } else {
            mode
        };

        match mode {
            QueryMode::Stored => {
                let mask = self.masks.load_mask(&subject.identity, domain);
                debug!(identity = %subject.identity, %domain, %mask, "stored mask");
                Ok(Permissions::Stored(mask))
            }
            QueryMode::Calculated => {
                let granted = self.calculate(subject, domain)?;
                Ok(Permissions::Calculated(granted))
            }
        }
    }

    fn calculate(&self, subject: &Subject, domain: &DomainObject<'_>) -> Result<Vec<Right>> {
        let evaluator = subject
            .token
            .clone()
            .map(|token| AnyRoleEvaluator::new(self.expander.clone(), token));

        let mask = self.masks.load_mask(&subject.identity, domain);
        let is_owner = domain
            .owner()
            .is_some_and(|owner| *owner == subject.identity);

        // Declaration order: consumers depend on deterministic output
        let mut granted = Vec::new();
        for right in Right::DISPLAY {
            let mut ctx = RuleContext::new(right, mask, is_owner);
            if let Some(field) = domain.field() {
                ctx = ctx.with_field(field);
            }
            if let Some(evaluator) = evaluator.as_ref() {
                ctx = ctx.with_evaluator(evaluator);
            }
            if self.chain.decide(&ctx)? {
                granted.push(right);
            }
        }

        debug!(
            identity = %subject.identity,
            %domain,
            granted = ?granted,
            "calculated rights"
        );
        Ok(granted)
    }

    fn verify_identity(&self, subject: &Subject) -> Result<()> {
        let identity = &subject.identity;
        self.identities
            .resolve(identity.kind(), identity.name())
            .map(|_| ())
            .ok_or_else(|| AclError::IdentityNotFound {
                kind: identity.kind().to_string(),
                name: identity.name().to_string(),
            })
    }

    fn resolve_instance(&self, class_name: &str, object_id: &str) -> Result<DomainInstance> {
        self.domains
            .resolve(class_name, object_id)
            .ok_or_else(|| AclError::DomainNotFound {
                class_name: class_name.to_string(),
                id: object_id.to_string(),
            })
    }

    /// Best-effort alias normalization; a miss falls back to the original
    /// name rather than failing the query
    fn normalize_class(&self, class_name: &str) -> String {
        if let Some(resolver) = &self.aliases {
            match resolver.resolve_alias(class_name) {
                Some(resolved) => return resolved,
                None => {
                    debug!(class_name, "alias resolution missed, using original name");
                }
            }
        }
        class_name.to_string()
    }
}

/// Builder assembling an [`AclManager`] from configuration and
/// collaborators, with in-memory defaults for everything
pub struct AclManagerBuilder {
    hierarchy: RoleHierarchy,
    hosts: HostRoleMatcher,
    chain: RuleChain,
    identities: Arc<dyn IdentityDirectory>,
    domains: Arc<dyn DomainDirectory>,
    fields: Arc<dyn FieldCatalog>,
    masks: Arc<dyn MaskStore>,
    groups: Arc<dyn GroupDirectory>,
    aliases: Option<Arc<dyn ClassAliasResolver>>,
}

impl Default for AclManagerBuilder {
    fn default() -> Self {
        Self {
            hierarchy: RoleHierarchy::empty(),
            hosts: HostRoleMatcher::empty(),
            chain: RuleChain::allow_only(),
            identities: Arc::new(InMemoryIdentityDirectory::new()),
            domains: Arc::new(InMemoryDomainDirectory::new()),
            fields: Arc::new(InMemoryFieldCatalog::new()),
            masks: Arc::new(InMemoryMaskStore::new()),
            groups: Arc::new(InMemoryGroupDirectory::new()),
            aliases: None,
        }
    }
}

impl AclManagerBuilder {
    /// Apply a parsed configuration document: hierarchy, host rules, rule
    /// chain, and class aliases
    ///
    /// # Errors
    ///
    /// Surfaces every configuration defect immediately: cyclic hierarchies,
    /// malformed host patterns, unknown rule names.
    pub fn with_config(mut self, config: &AclConfig, registry: &mut RuleRegistry) -> Result<Self> {
        self.hierarchy = config.build_hierarchy()?;
        self.hosts = config.build_host_matcher()?;
        self.chain = config.build_chain(registry)?;
        if !config.class_aliases.is_empty() {
            let aliases = config.class_aliases.clone().into_iter().collect();
            self.aliases = Some(Arc::new(StaticAliasResolver::new(aliases)));
        }
        Ok(self)
    }

    pub fn hierarchy(mut self, hierarchy: RoleHierarchy) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn host_matcher(mut self, hosts: HostRoleMatcher) -> Self {
        self.hosts = hosts;
        self
    }

    pub fn chain(mut self, chain: RuleChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn identity_directory(mut self, identities: Arc<dyn IdentityDirectory>) -> Self {
        self.identities = identities;
        self
    }

    pub fn domain_directory(mut self, domains: Arc<dyn DomainDirectory>) -> Self {
        self.domains = domains;
        self
    }

    pub fn field_catalog(mut self, fields: Arc<dyn FieldCatalog>) -> Self {
        self.fields = fields;
        self
    }

    pub fn mask_store(mut self, masks: Arc<dyn MaskStore>) -> Self {
        self.masks = masks;
        self
    }

    pub fn group_directory(mut self, groups: Arc<dyn GroupDirectory>) -> Self {
        self.groups = groups;
        self
    }

    pub fn alias_resolver(mut self, aliases: Arc<dyn ClassAliasResolver>) -> Self {
        self.aliases = Some(aliases);
        self
    }

    pub fn build(self) -> AclManager {
        let expander = Arc::new(IdentityExpander::new(
            Arc::new(self.hierarchy),
            self.groups,
            Arc::new(self.hosts),
        ));

        info!(rules = ?self.chain.rule_names(), "AclManager initialized");

        AclManager {
            expander,
            chain: self.chain,
            identities: self.identities,
            domains: self.domains,
            fields: self.fields,
            masks: self.masks,
            aliases: self.aliases,
        }
    }
}
