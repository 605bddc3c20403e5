//! Roles, permissions and role sets.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// A named bundle of permissions, assignable globally or per project.
///
/// The set is closed; adding a role means shipping a new catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter, EnumCount, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Manager,
    Contributor,
    Viewer,
    Vendor,
}

impl Role {
    /// All roles, in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Stable string form, e.g. `"manager"`.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// An atomic capability token.
///
/// The `a:b:c` naming is a convention for readers only; the engine compares
/// permissions by exact identity and never walks the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Display, EnumString, EnumIter, IntoStaticStr)]
pub enum Permission {
    #[strum(serialize = "organization:read")]
    OrganizationRead,
    #[strum(serialize = "organization:manage")]
    OrganizationManage,
    #[strum(serialize = "members:read")]
    MembersRead,
    #[strum(serialize = "members:manage")]
    MembersManage,
    #[strum(serialize = "billing:manage")]
    BillingManage,
    #[strum(serialize = "projects:create")]
    ProjectsCreate,
    #[strum(serialize = "projects:read")]
    ProjectsRead,
    #[strum(serialize = "projects:write")]
    ProjectsWrite,
    #[strum(serialize = "projects:delete")]
    ProjectsDelete,
    #[strum(serialize = "projects:tasks:read")]
    TasksRead,
    #[strum(serialize = "projects:tasks:write")]
    TasksWrite,
    #[strum(serialize = "projects:budget:read")]
    BudgetRead,
    #[strum(serialize = "projects:budget:write")]
    BudgetWrite,
    #[strum(serialize = "projects:files:read")]
    FilesRead,
    #[strum(serialize = "projects:files:write")]
    FilesWrite,
    #[strum(serialize = "projects:schedule:read")]
    ScheduleRead,
    #[strum(serialize = "projects:schedule:write")]
    ScheduleWrite,
    #[strum(serialize = "vendors:read")]
    VendorsRead,
    #[strum(serialize = "vendors:manage")]
    VendorsManage,
    #[strum(serialize = "audit:read")]
    AuditRead,
}

impl Permission {
    /// All permissions, in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Stable string form, e.g. `"projects:tasks:write"`.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Permission::from_str(&s)
            .map_err(|_| serde::de::Error::custom(format!("unknown permission: {}", s)))
    }
}

/// A set of roles, stored as a bitmask.
///
/// Insertion is idempotent and union collapses duplicates, so a `RoleSet`
/// has set semantics regardless of how it was assembled.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Insert a role.
    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    /// Return a copy with `role` added.
    pub fn with(mut self, role: Role) -> Self {
        self.insert(role);
        self
    }

    /// Set union.
    pub fn union(self, other: RoleSet) -> RoleSet {
        RoleSet(self.0 | other.0)
    }

    /// Membership test.
    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Raw bitmask; identical sets always produce identical bits.
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Iterate roles in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::all().filter(move |r| self.contains(*r))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::empty();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for RoleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for RoleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let roles = Vec::<Role>::deserialize(deserializer)?;
        Ok(roles.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_strings() {
        assert_eq!(Role::Manager.as_str(), "manager");
        assert_eq!(Role::from_str("vendor").unwrap(), Role::Vendor);
        assert!(Role::from_str("superuser").is_err());
    }

    #[test]
    fn test_permission_strings() {
        assert_eq!(Permission::TasksWrite.as_str(), "projects:tasks:write");
        assert_eq!(
            Permission::from_str("projects:write").unwrap(),
            Permission::ProjectsWrite
        );
        assert!(Permission::from_str("projects:*").is_err());
    }

    #[test]
    fn test_permission_serde_uses_token() {
        let json = serde_json::to_string(&Permission::BudgetRead).unwrap();
        assert_eq!(json, "\"projects:budget:read\"");
        let parsed: Permission = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Permission::BudgetRead);
    }

    #[test]
    fn test_role_set_collapses_duplicates() {
        let set: RoleSet = [Role::Viewer, Role::Viewer, Role::Manager].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(Role::Viewer));
        assert!(set.contains(Role::Manager));
        assert!(!set.contains(Role::Owner));
    }

    #[test]
    fn test_role_set_union() {
        let a = RoleSet::empty().with(Role::Viewer);
        let b = RoleSet::empty().with(Role::Viewer).with(Role::Vendor);
        let u = a.union(b);
        assert_eq!(u.iter().collect::<Vec<_>>(), vec![Role::Viewer, Role::Vendor]);
    }

    #[test]
    fn test_role_set_fits_all_roles() {
        assert!(Role::COUNT <= 8);
        let all: RoleSet = Role::all().collect();
        assert_eq!(all.len(), Role::COUNT);
    }

    #[test]
    fn test_role_set_serde() {
        let set = RoleSet::empty().with(Role::Admin).with(Role::Contributor);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[\"admin\",\"contributor\"]");
        let parsed: RoleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, set);
    }
}
