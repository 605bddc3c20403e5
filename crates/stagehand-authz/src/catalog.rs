//! The static role→permission table.

use crate::role::{Permission, Role};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

static STANDARD: Lazy<Arc<Catalog>> = Lazy::new(|| Arc::new(Catalog::standard()));

static NO_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(HashSet::new);

/// Role definitions with associated permissions.
///
/// Built once and never mutated afterwards; concurrent readers need no
/// synchronization.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    grants: HashMap<Role, HashSet<Permission>>,
}

impl Catalog {
    /// The process-wide standard catalog.
    pub fn global() -> Arc<Catalog> {
        STANDARD.clone()
    }

    /// Build a catalog from explicit grants.
    ///
    /// Roles left out of `grants` are treated as granting nothing.
    pub fn from_grants<I, P>(grants: I) -> Self
    where
        I: IntoIterator<Item = (Role, P)>,
        P: IntoIterator<Item = Permission>,
    {
        Self {
            grants: grants
                .into_iter()
                .map(|(role, perms)| (role, perms.into_iter().collect()))
                .collect(),
        }
    }

    fn standard() -> Self {
        use Permission::*;

        let mut catalog = Self::default();

        catalog.register(Role::Owner, Permission::all());
        catalog.register(
            Role::Admin,
            Permission::all().filter(|p| *p != BillingManage),
        );
        catalog.register(
            Role::Manager,
            [
                OrganizationRead,
                MembersRead,
                ProjectsCreate,
                ProjectsRead,
                ProjectsWrite,
                TasksRead,
                TasksWrite,
                BudgetRead,
                BudgetWrite,
                FilesRead,
                FilesWrite,
                ScheduleRead,
                ScheduleWrite,
                VendorsRead,
                VendorsManage,
            ],
        );
        catalog.register(
            Role::Contributor,
            [
                OrganizationRead,
                ProjectsRead,
                TasksRead,
                TasksWrite,
                FilesRead,
                FilesWrite,
                ScheduleRead,
                VendorsRead,
            ],
        );
        catalog.register(
            Role::Viewer,
            [OrganizationRead, ProjectsRead, TasksRead, FilesRead, ScheduleRead],
        );
        catalog.register(Role::Vendor, [ProjectsRead, TasksRead, FilesRead, FilesWrite]);

        catalog
    }

    fn register(&mut self, role: Role, permissions: impl IntoIterator<Item = Permission>) {
        self.grants
            .entry(role)
            .or_default()
            .extend(permissions);
    }

    /// Permissions granted by `role`.
    ///
    /// A role with no entry yields the empty set, so it can never widen
    /// access. The miss is logged because it usually means the catalog and
    /// the role assignments have drifted apart.
    pub fn permissions_for(&self, role: Role) -> &HashSet<Permission> {
        match self.grants.get(&role) {
            Some(perms) => perms,
            None => {
                warn!(role = %role, "Role has no catalog entry, granting nothing");
                &NO_PERMISSIONS
            }
        }
    }

    /// Whether `role` grants `permission`.
    pub fn grants(&self, role: Role, permission: Permission) -> bool {
        self.permissions_for(role).contains(&permission)
    }

    /// Roles that grant `permission`, in declaration order.
    pub fn roles_granting(&self, permission: Permission) -> Vec<Role> {
        Role::all()
            .filter(|role| {
                self.grants
                    .get(role)
                    .is_some_and(|perms| perms.contains(&permission))
            })
            .collect()
    }
}
