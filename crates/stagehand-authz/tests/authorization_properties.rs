//! Algebraic properties of the authorization engine.

use proptest::prelude::*;
use stagehand_authz::{authorize, AccessDecision, Catalog, Permission, PrincipalContext, Role, RoleSet};
use stagehand_common_core::{OrganizationId, ProjectId, UserId};

fn any_role() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::all().collect::<Vec<_>>())
}

fn any_permission() -> impl Strategy<Value = Permission> {
    prop::sample::select(Permission::all().collect::<Vec<_>>())
}

fn any_roles() -> impl Strategy<Value = Vec<Role>> {
    prop::collection::vec(any_role(), 0..6)
}

fn context(global: &[Role], scoped: &[(ProjectId, Role)]) -> PrincipalContext {
    let mut builder = PrincipalContext::builder(UserId::new(), OrganizationId::new());
    for role in global {
        builder = builder.global_role(*role);
    }
    for (project, role) in scoped {
        builder = builder.project_role(*project, *role);
    }
    builder.build()
}

proptest! {
    #[test]
    fn single_role_matches_catalog(role in any_role(), permission in any_permission()) {
        let ctx = context(&[role], &[]);
        let expected = AccessDecision::from(Catalog::global().grants(role, permission));
        prop_assert_eq!(authorize(&ctx, permission, None), expected);
    }

    #[test]
    fn adding_a_role_never_revokes(roles in any_roles(), extra in any_role(), permission in any_permission()) {
        let before = context(&roles, &[]);
        let mut widened = roles.clone();
        widened.push(extra);
        let after = context(&widened, &[]);

        if authorize(&before, permission, None).is_allowed() {
            prop_assert!(authorize(&after, permission, None).is_allowed());
        }
    }

    #[test]
    fn decisions_are_idempotent(roles in any_roles(), permission in any_permission()) {
        let ctx = context(&roles, &[]);
        prop_assert_eq!(authorize(&ctx, permission, None), authorize(&ctx, permission, None));
    }

    #[test]
    fn scoped_roles_stay_in_their_project(global in any_roles(), scoped in any_role(), permission in any_permission()) {
        let p1 = ProjectId::new();
        let p2 = ProjectId::new();
        let with_scope = context(&global, &[(p1, scoped)]);
        let without_scope = context(&global, &[]);

        prop_assert_eq!(
            authorize(&with_scope, permission, Some(&p2)),
            authorize(&without_scope, permission, None)
        );
        prop_assert_eq!(
            authorize(&with_scope, permission, None),
            authorize(&without_scope, permission, None)
        );
    }

    #[test]
    fn duplicate_roles_collapse(roles in any_roles()) {
        let mut doubled = roles.clone();
        doubled.extend(roles.iter().copied());
        prop_assert_eq!(
            context(&roles, &[]).global_roles(),
            context(&doubled, &[]).global_roles()
        );
    }
}

#[test]
fn empty_role_set_denies_everything() {
    let ctx = context(&[], &[]);
    assert_eq!(ctx.global_roles(), RoleSet::empty());
    for permission in Permission::all() {
        assert_eq!(authorize(&ctx, permission, None), AccessDecision::Deny);
        assert_eq!(authorize(&ctx, permission, Some(&ProjectId::new())), AccessDecision::Deny);
    }
}

#[test]
fn viewer_with_project_manager_scenario() {
    let p1 = ProjectId::new();
    let p2 = ProjectId::new();

    let viewer = context(&[Role::Viewer], &[]);
    assert_eq!(authorize(&viewer, Permission::ProjectsWrite, None), AccessDecision::Deny);

    let scoped = context(&[Role::Viewer], &[(p1, Role::Manager)]);
    assert_eq!(authorize(&scoped, Permission::ProjectsWrite, Some(&p1)), AccessDecision::Allow);
    assert_eq!(authorize(&scoped, Permission::ProjectsWrite, Some(&p2)), AccessDecision::Deny);
}
