use crate::model::{AssertionRecord, InvocationAction, FAILED_STATE, MISSING_VALUE, UNKNOWN_STATE};

const ASSERTION_MARKER: &str = "assertion";

/// An action qualifies when its target name carries the assertion marker,
/// case-insensitively. Build and transform steps never qualify.
pub fn is_assertion_action(action: &InvocationAction) -> bool {
    action.target.name.to_lowercase().contains(ASSERTION_MARKER)
}

/// Flattens one qualifying action into a fact-table row; `None` for
/// non-qualifying actions. Upstream failure reasons are suppressed unless
/// the action actually failed.
pub fn record_from_action(
    invocation_name: &str,
    action: &InvocationAction,
) -> Option<AssertionRecord> {
    if !is_assertion_action(action) {
        return None;
    }

    let state = action
        .state
        .clone()
        .unwrap_or_else(|| UNKNOWN_STATE.to_string());
    let failure_reason = if state == FAILED_STATE {
        action
            .failure_reason
            .clone()
            .unwrap_or_else(|| MISSING_VALUE.to_string())
    } else {
        MISSING_VALUE.to_string()
    };

    Some(AssertionRecord {
        start_time: action.timing.start_time.clone(),
        end_time: action.timing.end_time.clone(),
        invocation_name: invocation_name.to_string(),
        action_name: action.target.name.clone(),
        database: action
            .target
            .database
            .clone()
            .unwrap_or_else(|| MISSING_VALUE.to_string()),
        schema: action
            .target
            .schema
            .clone()
            .unwrap_or_else(|| MISSING_VALUE.to_string()),
        state,
        failure_reason,
    })
}

pub fn records_from_actions(
    invocation_name: &str,
    actions: &[InvocationAction],
) -> Vec<AssertionRecord> {
    actions
        .iter()
        .filter_map(|action| record_from_action(invocation_name, action))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionTarget, ActionTiming};

    fn action(name: &str) -> InvocationAction {
        InvocationAction {
            target: ActionTarget {
                name: name.to_string(),
                database: None,
                schema: None,
            },
            timing: ActionTiming::default(),
            state: None,
            failure_reason: None,
        }
    }

    #[test]
    fn marker_match_is_case_insensitive() {
        assert!(is_assertion_action(&action("orders_ASSERTION_not_null")));
        assert!(is_assertion_action(&action("Assertion_row_count")));
        assert!(!is_assertion_action(&action("orders_daily_build")));
    }

    #[test]
    fn non_qualifying_actions_emit_nothing() {
        let actions = vec![
            action("stg_orders"),
            action("orders_assertion_unique"),
            action("fct_revenue"),
        ];
        let records = records_from_actions("inv-1", &actions);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action_name, "orders_assertion_unique");
        assert_eq!(records[0].invocation_name, "inv-1");
    }

    #[test]
    fn absent_fields_fall_back_to_defaults() {
        let record = record_from_action("inv-1", &action("assertion_a")).expect("qualifies");
        assert_eq!(record.database, "N/A");
        assert_eq!(record.schema, "N/A");
        assert_eq!(record.state, "UNKNOWN");
        assert_eq!(record.failure_reason, "N/A");
        assert!(record.start_time.is_none());
        assert!(record.end_time.is_none());
    }

    #[test]
    fn failure_reason_kept_only_for_failed_state() {
        let mut failed = action("assertion_a");
        failed.state = Some("FAILED".to_string());
        failed.failure_reason = Some("duplicate keys".to_string());
        let record = record_from_action("inv-1", &failed).expect("qualifies");
        assert_eq!(record.failure_reason, "duplicate keys");

        let mut succeeded = action("assertion_a");
        succeeded.state = Some("SUCCEEDED".to_string());
        succeeded.failure_reason = Some("stale reason from upstream".to_string());
        let record = record_from_action("inv-1", &succeeded).expect("qualifies");
        assert_eq!(record.failure_reason, "N/A");
    }

    #[test]
    fn failed_without_reason_defaults_to_placeholder() {
        let mut failed = action("assertion_a");
        failed.state = Some("FAILED".to_string());
        let record = record_from_action("inv-1", &failed).expect("qualifies");
        assert_eq!(record.failure_reason, "N/A");
    }

    #[test]
    fn target_metadata_is_carried_through() {
        let mut qualifying = action("assertion_fresh");
        qualifying.target.database = Some("analytics".to_string());
        qualifying.target.schema = Some("quality".to_string());
        qualifying.timing.start_time = Some("2024-01-01T00:00:00Z".to_string());
        let record = record_from_action("inv-9", &qualifying).expect("qualifies");
        assert_eq!(record.database, "analytics");
        assert_eq!(record.schema, "quality");
        assert_eq!(record.start_time.as_deref(), Some("2024-01-01T00:00:00Z"));
    }
}
