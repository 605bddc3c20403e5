//! Principal contexts.

use crate::role::{Role, RoleSet};
use serde::{Deserialize, Serialize};
use stagehand_common_core::{OrganizationId, ProjectId, UserId};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::warn;

/// An authenticated caller acting within one organization.
///
/// Built fresh for every request and never mutated afterwards; there are no
/// setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    organization_id: OrganizationId,
    global_roles: RoleSet,
    project_roles: HashMap<ProjectId, RoleSet>,
}

impl PrincipalContext {
    /// Start building a context.
    pub fn builder(user_id: UserId, organization_id: OrganizationId) -> PrincipalContextBuilder {
        PrincipalContextBuilder::new(user_id, organization_id)
    }

    /// Assemble a context from membership records.
    ///
    /// Project memberships belonging to another user or organization are
    /// ignored.
    pub fn from_memberships(
        organization: &OrganizationMembership,
        projects: &[ProjectMembership],
    ) -> Self {
        let mut builder = Self::builder(organization.user_id, organization.organization_id);
        for role in &organization.roles {
            builder = builder.global_role_name(role);
        }

        for membership in projects {
            if membership.user_id != organization.user_id
                || membership.organization_id != organization.organization_id
            {
                warn!(
                    user_id = %organization.user_id,
                    project_id = %membership.project_id,
                    "Ignoring project membership for a different principal"
                );
                continue;
            }
            for role in &membership.roles {
                builder = builder.project_role_name(membership.project_id, role);
            }
        }

        builder.build()
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    /// Roles held across the whole organization.
    pub fn global_roles(&self) -> RoleSet {
        self.global_roles
    }

    /// Roles scoped to one project (empty if none).
    pub fn project_roles(&self, project_id: &ProjectId) -> RoleSet {
        self.project_roles.get(project_id).copied().unwrap_or_default()
    }

    /// Roles in effect for a decision about `project`.
    ///
    /// Without a project, or for a project with no scoped roles, this is just
    /// the global role set.
    pub fn effective_roles(&self, project: Option<&ProjectId>) -> RoleSet {
        match project.and_then(|id| self.project_roles.get(id)) {
            Some(scoped) => self.global_roles.union(*scoped),
            None => self.global_roles,
        }
    }
}

/// Builder for [`PrincipalContext`].
#[derive(Debug)]
pub struct PrincipalContextBuilder {
    user_id: UserId,
    organization_id: OrganizationId,
    global_roles: RoleSet,
    project_roles: HashMap<ProjectId, RoleSet>,
}

impl PrincipalContextBuilder {
    pub fn new(user_id: UserId, organization_id: OrganizationId) -> Self {
        Self {
            user_id,
            organization_id,
            global_roles: RoleSet::empty(),
            project_roles: HashMap::new(),
        }
    }

    /// Add an organization-wide role.
    pub fn global_role(mut self, role: Role) -> Self {
        self.global_roles.insert(role);
        self
    }

    /// Add an organization-wide role by name. Unknown names are dropped.
    pub fn global_role_name(self, name: &str) -> Self {
        match parse_role(name, self.user_id) {
            Some(role) => self.global_role(role),
            None => self,
        }
    }

    /// Add a role scoped to one project.
    pub fn project_role(mut self, project_id: ProjectId, role: Role) -> Self {
        self.project_roles.entry(project_id).or_default().insert(role);
        self
    }

    /// Add a project-scoped role by name. Unknown names are dropped.
    pub fn project_role_name(self, project_id: ProjectId, name: &str) -> Self {
        match parse_role(name, self.user_id) {
            Some(role) => self.project_role(project_id, role),
            None => self,
        }
    }

    pub fn build(self) -> PrincipalContext {
        PrincipalContext {
            user_id: self.user_id,
            organization_id: self.organization_id,
            global_roles: self.global_roles,
            project_roles: self.project_roles,
        }
    }
}

fn parse_role(name: &str, user_id: UserId) -> Option<Role> {
    match Role::from_str(name.trim()) {
        Ok(role) => Some(role),
        Err(_) => {
            warn!(user_id = %user_id, role = name, "Unknown role name, ignoring assignment");
            None
        }
    }
}

/// A user's membership in an organization, as stored by membership management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMembership {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub roles: Vec<String>,
}

/// A user's membership in a single project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMembership {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub project_id: ProjectId,
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_roles_without_project() {
        let p1 = ProjectId::new();
        let ctx = PrincipalContext::builder(UserId::new(), OrganizationId::new())
            .global_role(Role::Viewer)
            .project_role(p1, Role::Manager)
            .build();

        let roles = ctx.effective_roles(None);
        assert!(roles.contains(Role::Viewer));
        assert!(!roles.contains(Role::Manager));
    }

    #[test]
    fn test_effective_roles_with_project() {
        let p1 = ProjectId::new();
        let ctx = PrincipalContext::builder(UserId::new(), OrganizationId::new())
            .global_role(Role::Viewer)
            .project_role(p1, Role::Manager)
            .build();

        let roles = ctx.effective_roles(Some(&p1));
        assert!(roles.contains(Role::Viewer));
        assert!(roles.contains(Role::Manager));
    }

    #[test]
    fn test_unscoped_project_falls_back_to_global() {
        let ctx = PrincipalContext::builder(UserId::new(), OrganizationId::new())
            .global_role(Role::Contributor)
            .build();

        let other = ProjectId::new();
        assert_eq!(ctx.effective_roles(Some(&other)), ctx.effective_roles(None));
    }

    #[test]
    fn test_unknown_role_names_are_dropped() {
        let ctx = PrincipalContext::builder(UserId::new(), OrganizationId::new())
            .global_role_name("viewer")
            .global_role_name("root")
            .build();

        assert_eq!(ctx.global_roles(), RoleSet::empty().with(Role::Viewer));
    }

    #[test]
    fn test_from_memberships() {
        let user = UserId::new();
        let org = OrganizationId::new();
        let p1 = ProjectId::new();
        let p2 = ProjectId::new();

        let organization = OrganizationMembership {
            user_id: user,
            organization_id: org,
            roles: vec!["viewer".into()],
        };
        let projects = vec![
            ProjectMembership {
                user_id: user,
                organization_id: org,
                project_id: p1,
                roles: vec!["manager".into(), "contributor".into()],
            },
            ProjectMembership {
                user_id: UserId::new(),
                organization_id: org,
                project_id: p2,
                roles: vec!["owner".into()],
            },
        ];

        let ctx = PrincipalContext::from_memberships(&organization, &projects);
        assert_eq!(ctx.user_id(), user);
        assert_eq!(ctx.organization_id(), org);
        assert!(ctx.project_roles(&p1).contains(Role::Manager));
        assert!(ctx.project_roles(&p1).contains(Role::Contributor));
        assert!(ctx.project_roles(&p2).is_empty());
    }
}
