use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::extract::records_from_actions;
use crate::model::{InvocationAction, NormalizedRecord, RepositoryScope, WorkflowInvocation};
use crate::normalize::normalize_records;
use crate::run_log::{RunLog, SyncStage};

/// Lists available workflow invocations. Transport failures are absorbed
/// by the implementation into an empty list.
pub trait InvocationLister {
    fn list_invocations(&self, scope: &RepositoryScope) -> Vec<WorkflowInvocation>;
}

/// Returns the constituent actions of one invocation. Same absorption
/// policy as listing: failure reads as "no actions".
pub trait ActionQuerier {
    fn query_actions(&self, invocation_name: &str) -> Vec<InvocationAction>;
}

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("dataset {0} does not exist and is never auto-created")]
    DatasetMissing(String),
    #[error("warehouse query failed: {0}")]
    Query(String),
    #[error("batch append failed: {0}")]
    Load(String),
    #[error("view definition failed: {0}")]
    View(String),
}

/// Warehouse side of the pipeline: processed-key dedup source, append-only
/// batch sink, and the derived-view definitions.
pub trait Warehouse {
    /// Provisions the fact table if absent and returns the set of
    /// invocation names already persisted. A missing dataset is fatal.
    fn processed_invocations(&mut self) -> Result<BTreeSet<String>, WarehouseError>;

    /// Appends the whole normalized batch or nothing.
    fn append_records(&mut self, batch: &[NormalizedRecord]) -> Result<(), WarehouseError>;

    /// Redefines the synthesis and recap views over the fact table.
    fn materialize_views(&mut self) -> Result<(), WarehouseError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Upstream listed nothing (or listing failed and was absorbed).
    NoInvocations,
    /// Every listed invocation was already persisted or yielded no
    /// qualifying actions; nothing was appended.
    NothingNew,
    Loaded { records: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub listed_invocations: usize,
    pub skipped_processed: usize,
    pub invocations_without_actions: usize,
    pub extracted_records: usize,
    pub outcome: SyncOutcome,
}

/// Explicit per-run state: the repository being synced plus the
/// structured event log, passed down instead of ambient globals.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub scope: RepositoryScope,
    pub log: RunLog,
}

impl RunContext {
    pub fn new(scope: RepositoryScope) -> Self {
        Self {
            scope,
            log: RunLog::default(),
        }
    }
}

/// Runs one incremental sync: dedup keys, listing, per-invocation
/// extraction, normalization, the single batch append, then the view
/// refresh. Strictly sequential; invocations are visited in listing order.
pub fn run_sync(
    ctx: &mut RunContext,
    lister: &dyn InvocationLister,
    querier: &dyn ActionQuerier,
    warehouse: &mut dyn Warehouse,
) -> Result<SyncReport, WarehouseError> {
    let processed = warehouse.processed_invocations()?;
    ctx.log.emit_field(
        SyncStage::Provision,
        "processed_keys_loaded",
        "count",
        processed.len().to_string(),
    );

    let invocations = lister.list_invocations(&ctx.scope);
    ctx.log.emit_field(
        SyncStage::List,
        "invocations_listed",
        "count",
        invocations.len().to_string(),
    );
    if invocations.is_empty() {
        return Ok(SyncReport {
            listed_invocations: 0,
            skipped_processed: 0,
            invocations_without_actions: 0,
            extracted_records: 0,
            outcome: SyncOutcome::NoInvocations,
        });
    }

    let mut skipped_processed = 0;
    let mut invocations_without_actions = 0;
    let mut batch = Vec::new();
    for invocation in &invocations {
        if processed.contains(&invocation.name) {
            skipped_processed += 1;
            ctx.log.emit_field(
                SyncStage::Extract,
                "invocation_already_processed",
                "invocation",
                invocation.name.clone(),
            );
            continue;
        }

        let actions = querier.query_actions(&invocation.name);
        if actions.is_empty() {
            // Soft warning: one silent invocation never aborts the rest.
            invocations_without_actions += 1;
            ctx.log.emit_field(
                SyncStage::Extract,
                "no_actions_for_invocation",
                "invocation",
                invocation.name.clone(),
            );
            continue;
        }

        for record in records_from_actions(&invocation.name, &actions) {
            ctx.log.emit(
                SyncStage::Extract,
                "assertion_action_found",
                BTreeMap::from([
                    ("action".to_string(), record.action_name.clone()),
                    ("state".to_string(), record.state.clone()),
                ]),
            );
            batch.push(record);
        }
    }

    let extracted_records = batch.len();
    if batch.is_empty() {
        ctx.log.emit(
            SyncStage::Normalize,
            "no_new_assertion_records",
            BTreeMap::new(),
        );
        return Ok(SyncReport {
            listed_invocations: invocations.len(),
            skipped_processed,
            invocations_without_actions,
            extracted_records,
            outcome: SyncOutcome::NothingNew,
        });
    }

    let normalized = normalize_records(batch);
    ctx.log.emit_field(
        SyncStage::Normalize,
        "batch_normalized",
        "records",
        normalized.len().to_string(),
    );

    warehouse.append_records(&normalized)?;
    ctx.log.emit_field(
        SyncStage::Load,
        "batch_appended",
        "records",
        normalized.len().to_string(),
    );

    warehouse.materialize_views()?;
    ctx.log
        .emit(SyncStage::Materialize, "views_refreshed", BTreeMap::new());

    Ok(SyncReport {
        listed_invocations: invocations.len(),
        skipped_processed,
        invocations_without_actions,
        extracted_records,
        outcome: SyncOutcome::Loaded {
            records: normalized.len(),
        },
    })
}
