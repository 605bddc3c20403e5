//! Spans for the authorization, mutation and audit paths.

use tracing::{field, info_span, Span};

/// Span covering one authorization decision.
pub fn authorize_span(user_id: &str, permission: &str) -> Span {
    info_span!("authorize", user_id = %user_id, permission = %permission, decision = field::Empty)
}

/// Span covering one guarded mutation, from authorization to audit.
pub fn mutation_span(resource_type: &str, record_id: &str, operation: &str) -> Span {
    info_span!(
        "mutation",
        resource_type = %resource_type,
        record_id = %record_id,
        op = %operation,
        outcome = field::Empty,
        error = field::Empty,
    )
}

/// Span covering one audit append.
pub fn audit_span(action: &str, resource_type: &str) -> Span {
    info_span!("audit", action = %action, resource_type = %resource_type)
}

/// Record an error on the current span.
pub fn record_error(error: &dyn std::error::Error) {
    Span::current().record("error", field::display(error));
}

/// Record how a mutation ended on the current span.
pub fn record_outcome(outcome: &str) {
    Span::current().record("outcome", outcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_are_constructible_without_subscriber() {
        let span = mutation_span("task", "rec_1", "update");
        let _entered = span.enter();
        record_outcome("applied");
        record_error(&std::io::Error::new(std::io::ErrorKind::Other, "boom"));

        let _ = authorize_span("usr_1", "projects:write");
        let _ = audit_span("update", "task");
    }
}
