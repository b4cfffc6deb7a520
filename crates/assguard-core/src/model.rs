use chrono::NaiveDateTime;

/// Placeholder stored when an upstream string field is absent.
pub const MISSING_VALUE: &str = "N/A";
/// State recorded when the upstream action reports none.
pub const UNKNOWN_STATE: &str = "UNKNOWN";
pub const FAILED_STATE: &str = "FAILED";

/// Addressing for the upstream repository whose invocations are synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryScope {
    pub project_id: String,
    pub location: String,
    pub repository_id: String,
}

/// One execution run of an orchestrated workflow. The name is globally
/// unique and serves as the dedup key; everything else upstream attaches
/// to an invocation is opaque to this pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowInvocation {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTarget {
    pub name: String,
    pub database: Option<String>,
    pub schema: Option<String>,
}

/// RFC 3339 text as delivered by the API; coercion happens in normalize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTiming {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// One discrete step within an invocation, validated at the API boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationAction {
    pub target: ActionTarget,
    pub timing: ActionTiming,
    pub state: Option<String>,
    pub failure_reason: Option<String>,
}

/// Flat fact-table row as extracted, timestamps still textual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionRecord {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub invocation_name: String,
    pub action_name: String,
    pub database: String,
    pub schema: String,
    pub state: String,
    pub failure_reason: String,
}

/// Fact-table row after normalization: timezone-naive timestamps at
/// microsecond resolution, batch ordered by start time descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub invocation_name: String,
    pub action_name: String,
    pub database: String,
    pub schema: String,
    pub state: String,
    pub failure_reason: String,
}
