use std::time::Duration;

use assguard_core::{
    ActionQuerier, InvocationAction, InvocationLister, RepositoryScope, WorkflowInvocation,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{error, info};

use crate::wire::{ListInvocationsResponse, QueryActionsResponse};

pub const DEFAULT_BASE_URL: &str = "https://dataform.googleapis.com/v1beta1";

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] ureq::Error),
    #[error("failed reading response body: {0}")]
    Body(String),
    #[error("failed decoding response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Blocking client for the orchestration API. Transport, HTTP-status, and
/// decode failures never escape: they are logged and absorbed into an
/// empty result, so a broken upstream reads as "nothing to sync".
pub struct DataformClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl DataformClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
            .build();
        Self {
            agent: config.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransportError> {
        let authorization = format!("Bearer {}", self.token);
        let response = self
            .agent
            .get(url)
            .header("Authorization", authorization)
            .call()?;
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|err| TransportError::Body(err.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl InvocationLister for DataformClient {
    fn list_invocations(&self, scope: &RepositoryScope) -> Vec<WorkflowInvocation> {
        let url = format!(
            "{}/projects/{}/locations/{}/repositories/{}/workflowInvocations",
            self.base_url, scope.project_id, scope.location, scope.repository_id
        );
        match self.get_json::<ListInvocationsResponse>(&url) {
            Ok(response) => {
                info!(
                    count = response.workflow_invocations.len(),
                    "listed workflow invocations"
                );
                response
                    .workflow_invocations
                    .into_iter()
                    .map(Into::into)
                    .collect()
            }
            Err(err) => {
                error!(error = %err, "listing workflow invocations failed");
                Vec::new()
            }
        }
    }
}

impl ActionQuerier for DataformClient {
    fn query_actions(&self, invocation_name: &str) -> Vec<InvocationAction> {
        let url = format!("{}/{}:query", self.base_url, invocation_name);
        match self.get_json::<QueryActionsResponse>(&url) {
            Ok(response) => {
                info!(
                    invocation = invocation_name,
                    count = response.workflow_invocation_actions.len(),
                    "queried invocation actions"
                );
                response
                    .workflow_invocation_actions
                    .into_iter()
                    .map(Into::into)
                    .collect()
            }
            Err(err) => {
                error!(
                    invocation = invocation_name,
                    error = %err,
                    "querying invocation actions failed"
                );
                Vec::new()
            }
        }
    }
}
