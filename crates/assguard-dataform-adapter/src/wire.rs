use assguard_core::{
    ActionTarget, ActionTiming, InvocationAction, WorkflowInvocation,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListInvocationsResponse {
    #[serde(default)]
    pub workflow_invocations: Vec<WireInvocation>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireInvocation {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryActionsResponse {
    #[serde(default)]
    pub workflow_invocation_actions: Vec<WireAction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAction {
    #[serde(default)]
    pub target: WireTarget,
    #[serde(default)]
    pub invocation_timing: WireTiming,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireTarget {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTiming {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl From<WireInvocation> for WorkflowInvocation {
    fn from(wire: WireInvocation) -> Self {
        Self { name: wire.name }
    }
}

impl From<WireAction> for InvocationAction {
    fn from(wire: WireAction) -> Self {
        Self {
            target: ActionTarget {
                name: wire.target.name,
                database: wire.target.database,
                schema: wire.target.schema,
            },
            timing: ActionTiming {
                start_time: wire.invocation_timing.start_time,
                end_time: wire.invocation_timing.end_time,
            },
            state: wire.state,
            failure_reason: wire.failure_reason,
        }
    }
}
