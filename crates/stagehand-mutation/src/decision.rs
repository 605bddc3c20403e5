//! Authorization decision logging.

use stagehand_authz::{AccessDecision, Permission, PrincipalContext};
use stagehand_common_core::ProjectId;
use tracing::{debug, info};

/// Log an authorization decision.
///
/// Denials are logged at info so they show up in normal operation; grants
/// only at debug.
pub fn log_decision(
    context: &PrincipalContext,
    permission: Permission,
    project: Option<&ProjectId>,
    decision: AccessDecision,
) {
    let project_id = project.map(ToString::to_string);
    if decision.is_allowed() {
        debug!(
            event = "authz_granted",
            user_id = %context.user_id(),
            organization_id = %context.organization_id(),
            permission = %permission,
            project_id = ?project_id,
            "Authorization granted"
        );
    } else {
        info!(
            event = "authz_denied",
            user_id = %context.user_id(),
            organization_id = %context.organization_id(),
            permission = %permission,
            project_id = ?project_id,
            roles = ?context.effective_roles(project),
            "Authorization denied"
        );
    }
}
