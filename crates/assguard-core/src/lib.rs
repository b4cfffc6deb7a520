mod extract;
mod model;
mod normalize;
mod pipeline;
mod run_log;

pub use extract::{is_assertion_action, record_from_action, records_from_actions};
pub use model::{
    ActionTarget, ActionTiming, AssertionRecord, InvocationAction, NormalizedRecord,
    RepositoryScope, WorkflowInvocation, FAILED_STATE, MISSING_VALUE, UNKNOWN_STATE,
};
pub use normalize::{normalize_records, parse_event_time};
pub use pipeline::{
    run_sync, ActionQuerier, InvocationLister, RunContext, SyncOutcome, SyncReport, Warehouse,
    WarehouseError,
};
pub use run_log::{RunLog, SyncEvent, SyncStage};
