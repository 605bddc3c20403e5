//! The authorization engine.

use crate::cache::{CacheStats, DecisionCache};
use crate::catalog::Catalog;
use crate::principal::PrincipalContext;
use crate::role::{Permission, RoleSet};
use serde::{Deserialize, Serialize};
use stagehand_common_core::ProjectId;
use std::sync::Arc;

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    Allow,
    Deny,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl From<bool> for AccessDecision {
    fn from(granted: bool) -> Self {
        if granted {
            Self::Allow
        } else {
            Self::Deny
        }
    }
}

/// Check `permission` for `context` against the standard catalog.
///
/// `project` narrows the decision to one project: roles the principal holds
/// on that project are added to its global roles. A project the principal
/// has no scoped roles on behaves exactly like passing `None`.
pub fn authorize(
    context: &PrincipalContext,
    permission: Permission,
    project: Option<&ProjectId>,
) -> AccessDecision {
    decide(&Catalog::global(), context.effective_roles(project), permission)
}

fn decide(catalog: &Catalog, roles: RoleSet, permission: Permission) -> AccessDecision {
    roles
        .iter()
        .any(|role| catalog.grants(role, permission))
        .into()
}

/// Authorization engine bound to a catalog, with an optional decision cache.
pub struct Authorizer {
    catalog: Arc<Catalog>,
    cache: Option<DecisionCache>,
}

impl Authorizer {
    /// Engine over the standard catalog, uncached.
    pub fn new() -> Self {
        Self::with_catalog(Catalog::global())
    }

    /// Engine over a specific catalog, uncached.
    pub fn with_catalog(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            cache: None,
        }
    }

    /// Memoise decisions per (role set, permission), up to `capacity` entries.
    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = Some(DecisionCache::new(capacity));
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Same contract as [`authorize`], against this engine's catalog.
    pub fn authorize(
        &self,
        context: &PrincipalContext,
        permission: Permission,
        project: Option<&ProjectId>,
    ) -> AccessDecision {
        let roles = context.effective_roles(project);
        if roles.is_empty() {
            return AccessDecision::Deny;
        }

        match &self.cache {
            Some(cache) => cache.get_or_insert_with(roles, permission, || {
                decide(&self.catalog, roles, permission)
            }),
            None => decide(&self.catalog, roles, permission),
        }
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(DecisionCache::stats)
    }
}

impl Default for Authorizer {
    fn default() -> Self {
        Self::new()
    }
}
