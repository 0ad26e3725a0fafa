use anyhow::Result;
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::action::{ActionInputs, ActionOutputs, ActionRequest, FrequencyRequest};
use crate::error::{DoraLensError, GENERIC_FAILURE};
use crate::metrics::clock::{Clock, SystemClock};
use crate::metrics::deployment_frequency::DeploymentFrequencyProvider;
use crate::metrics::{FrequencyOptions, FrequencyResult, MetricsProvider};
use crate::providers::github::GitHubProvider;
use crate::providers::DeploymentSource;

#[derive(Parser)]
#[command(name = "doralens")]
#[command(author, version, about = "DORA metrics from GitHub deployments", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    inputs: ActionInputs,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    api_url: String,

    /// File the step outputs are appended to (set by the Actions runner)
    #[arg(long, env = "GITHUB_OUTPUT")]
    github_output: Option<PathBuf>,

    /// Output file path for the JSON report (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, default_value_t = false)]
    pretty: bool,
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        self.execute_with_clock(Arc::new(SystemClock)).await
    }

    /// Runs the action with `clock` as the end of the lookback window.
    pub async fn execute_with_clock(&self, clock: Arc<dyn Clock>) -> Result<()> {
        debug!("Starting action");

        match ActionRequest::from_inputs(&self.inputs)? {
            ActionRequest::Collect => {
                info!("Nothing to collect");
            }
            ActionRequest::DeploymentFrequency(FrequencyRequest {
                owner,
                repo,
                options,
                token,
            }) => {
                info!("Calculating deployment frequency for {owner}/{repo}");

                let provider = GitHubProvider::new(&self.api_url, Some(token))?;
                let result =
                    deployment_frequency(&provider, &owner, &repo, options, clock).await?;

                self.write_outputs(&ActionOutputs::from(&result))?;
                self.write_report(&result)?;
            }
        }

        debug!("Action completed");
        Ok(())
    }

    fn write_outputs(&self, outputs: &ActionOutputs) -> Result<()> {
        match &self.github_output {
            Some(path) => {
                outputs.append_to_file(path)?;
                debug!("Step outputs written to: {}", path.display());
            }
            None => debug!("GITHUB_OUTPUT not set, skipping step outputs"),
        }
        Ok(())
    }

    fn write_report(&self, result: &FrequencyResult) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(result)?
        } else {
            serde_json::to_string(result)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Report written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }
}

/// Fetches deployments from `source` and runs them through the frequency
/// calculation.
pub async fn deployment_frequency(
    source: &dyn DeploymentSource,
    owner: &str,
    repo: &str,
    options: FrequencyOptions,
    clock: Arc<dyn Clock>,
) -> Result<FrequencyResult> {
    let deployments = source
        .get_deployments(owner, repo, options.environment_filter())
        .await?;

    if deployments.is_empty() {
        warn!("No deployments found for {owner}/{repo}");
    }

    let result = DeploymentFrequencyProvider::with_clock(deployments, options, clock)
        .calculate()
        .await;

    info!(
        "{} deployments between {} and {} ({} {})",
        result.total_deployments, result.start_date, result.end_date, result.value, result.unit
    );

    Ok(result)
}

/// Message reported to the workflow for a failed run. Anything that is not a
/// configuration or credential problem collapses to a generic message.
pub fn failure_message(err: &anyhow::Error) -> String {
    err.downcast_ref::<DoraLensError>()
        .map_or_else(|| GENERIC_FAILURE.to_string(), DoraLensError::failure_message)
}
