use std::path::PathBuf;

use anyhow::{Context, Result};
use assguard_core::{run_sync, RepositoryScope, RunContext, SyncOutcome};
use assguard_dataform_adapter::{exchange_token, DataformClient, ServiceAccountKey};
use assguard_store::AssertionStore;
use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SERVICE_ACCOUNT_VAR: &str = "GCP_SERVICE_ACCOUNT_JSON";
const PROJECT_ID_VAR: &str = "PROJECT_ID";
const LOCATION_VAR: &str = "LOCATION";
const REPOSITORY_ID_VAR: &str = "REPOSITORY_ID";

#[derive(Parser, Debug)]
#[command(name = "assguard")]
#[command(about = "Incremental sync of workflow assertion results into the analytics warehouse", long_about = None)]
struct Args {
    /// Warehouse database file (the dataset). Must already exist; only
    /// the fact table inside it is created on demand.
    #[arg(long, default_value = "dataform_assguard.db")]
    warehouse: PathBuf,
    /// Orchestration API base URL override.
    #[arg(long, default_value = assguard_dataform_adapter::DEFAULT_BASE_URL)]
    api_base_url: String,
}

#[derive(Debug, Error)]
enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),
}

#[derive(Debug)]
struct Config {
    service_account_json: String,
    scope: RepositoryScope,
}

impl Config {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_values(
            env_var(SERVICE_ACCOUNT_VAR),
            env_var(PROJECT_ID_VAR),
            env_var(LOCATION_VAR),
            env_var(REPOSITORY_ID_VAR),
        )
    }

    /// Every missing parameter is reported at once so a misconfigured
    /// deployment is fixed in one pass, before any network call.
    fn from_values(
        service_account_json: Option<String>,
        project_id: Option<String>,
        location: Option<String>,
        repository_id: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        if service_account_json.is_none() {
            missing.push(SERVICE_ACCOUNT_VAR.to_string());
        }
        if project_id.is_none() {
            missing.push(PROJECT_ID_VAR.to_string());
        }
        if location.is_none() {
            missing.push(LOCATION_VAR.to_string());
        }
        if repository_id.is_none() {
            missing.push(REPOSITORY_ID_VAR.to_string());
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        Ok(Self {
            service_account_json: service_account_json.unwrap_or_default(),
            scope: RepositoryScope {
                project_id: project_id.unwrap_or_default(),
                location: location.unwrap_or_default(),
                repository_id: repository_id.unwrap_or_default(),
            },
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let key = ServiceAccountKey::from_json(&config.service_account_json)
        .context("parsing service account key")?;
    let token = exchange_token(&key).context("exchanging service account credential")?;

    let mut store = AssertionStore::open(&args.warehouse)
        .with_context(|| format!("opening warehouse dataset {}", args.warehouse.display()))?;
    let client = DataformClient::with_base_url(&args.api_base_url, token);

    let mut ctx = RunContext::new(config.scope);
    let report = run_sync(&mut ctx, &client, &client, &mut store).context("sync run failed")?;

    for event in ctx.log.events() {
        info!(stage = ?event.stage, name = %event.name, fields = ?event.fields, "run event");
    }

    match report.outcome {
        SyncOutcome::NoInvocations => {
            info!("no workflow invocations found; nothing to do");
        }
        SyncOutcome::NothingNew => {
            info!(
                listed = report.listed_invocations,
                already_processed = report.skipped_processed,
                without_actions = report.invocations_without_actions,
                "no new assertion records in this run"
            );
        }
        SyncOutcome::Loaded { records } => {
            info!(
                records,
                listed = report.listed_invocations,
                already_processed = report.skipped_processed,
                "sync completed and views refreshed"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_configuration_builds_the_scope() {
        let config = Config::from_values(
            Some("{\"client_email\":\"a\"}".to_string()),
            Some("proj".to_string()),
            Some("europe-west1".to_string()),
            Some("repo".to_string()),
        )
        .expect("valid");
        assert_eq!(config.scope.project_id, "proj");
        assert_eq!(config.scope.location, "europe-west1");
        assert_eq!(config.scope.repository_id, "repo");
        assert!(!config.service_account_json.is_empty());
    }

    #[test]
    fn every_missing_parameter_is_named() {
        let err = Config::from_values(None, Some("proj".to_string()), None, None)
            .expect_err("must fail");
        let ConfigError::Missing(names) = err;
        assert_eq!(
            names,
            vec![
                SERVICE_ACCOUNT_VAR.to_string(),
                LOCATION_VAR.to_string(),
                REPOSITORY_ID_VAR.to_string(),
            ]
        );
    }
}
