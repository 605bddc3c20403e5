//! Role/permission authorization for Stagehand.
//!
//! The [`Catalog`] is the process-wide, immutable role→permission table. The
//! [`Authorizer`] resolves a [`PrincipalContext`]'s effective roles (global
//! roles plus any roles scoped to the requested project) and answers
//! allow/deny by exact permission membership. Grants are purely additive:
//! there is no explicit deny and no precedence between roles.

pub mod cache;
pub mod catalog;
pub mod engine;
pub mod principal;
pub mod role;

pub use cache::{CacheStats, DecisionCache};
pub use catalog::Catalog;
pub use engine::{authorize, AccessDecision, Authorizer};
pub use principal::{
    OrganizationMembership, PrincipalContext, PrincipalContextBuilder, ProjectMembership,
};
pub use role::{Permission, Role, RoleSet};
