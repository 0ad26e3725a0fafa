use async_trait::async_trait;
use log::{debug, info};

use super::client::{GitHubClient, GitHubDeploymentDto, GitHubDeploymentStatusDto};
use crate::auth::Token;
use crate::deployments::{parse_timestamp, DeploymentRecord, DeploymentStatus};
use crate::error::Result;
use crate::providers::DeploymentSource;

const PROVIDER_NAME: &str = "github";

pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = GitHubClient::new(base_url, token)?;

        Ok(Self { client })
    }

    fn transform_deployment(dto: GitHubDeploymentDto) -> Result<DeploymentRecord> {
        debug!(
            "Deployment {} of {} ({}) to {} by {}",
            dto.id,
            dto.sha,
            dto.ref_,
            dto.environment,
            dto.creator.as_ref().map_or("unknown", |c| c.login.as_str())
        );

        DeploymentRecord::parse(
            PROVIDER_NAME,
            &dto.environment,
            &dto.sha,
            &dto.created_at,
            &dto.updated_at,
        )
    }

    fn transform_status(
        deployment_id: u64,
        dto: GitHubDeploymentStatusDto,
    ) -> Result<DeploymentStatus> {
        debug!("Status {} of deployment {deployment_id}: {:?}", dto.id, dto.state);

        Ok(DeploymentStatus {
            deployment_id,
            state: dto.state,
            environment: dto.environment.unwrap_or_default(),
            created_at: parse_timestamp("created_at", &dto.created_at)?,
            updated_at: parse_timestamp("updated_at", &dto.updated_at)?,
        })
    }
}

#[async_trait]
impl DeploymentSource for GitHubProvider {
    async fn get_deployments(
        &self,
        owner: &str,
        repo: &str,
        environment: Option<&str>,
    ) -> Result<Vec<DeploymentRecord>> {
        info!(
            "Fetching deployments for {owner}/{repo} (environment: {})",
            environment.unwrap_or("all")
        );

        let deployments = self
            .client
            .fetch_deployments(owner, repo, environment)
            .await?
            .into_iter()
            .map(Self::transform_deployment)
            .collect::<Result<Vec<_>>>()?;

        info!("Fetched {} deployments", deployments.len());

        Ok(deployments)
    }

    async fn get_deployment_statuses(
        &self,
        owner: &str,
        repo: &str,
        deployment_id: u64,
    ) -> Result<Vec<DeploymentStatus>> {
        self.client
            .fetch_deployment_statuses(owner, repo, deployment_id)
            .await?
            .into_iter()
            .map(|dto| Self::transform_status(deployment_id, dto))
            .collect()
    }
}
