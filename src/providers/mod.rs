pub mod github;

use async_trait::async_trait;

use crate::deployments::{DeploymentRecord, DeploymentStatus};
use crate::error::Result;

/// Supplies deployment history for a repository. Fetching, paging and
/// translating provider payloads all stay behind this boundary.
#[async_trait]
pub trait DeploymentSource: Send + Sync {
    async fn get_deployments(
        &self,
        owner: &str,
        repo: &str,
        environment: Option<&str>,
    ) -> Result<Vec<DeploymentRecord>>;

    async fn get_deployment_statuses(
        &self,
        owner: &str,
        repo: &str,
        deployment_id: u64,
    ) -> Result<Vec<DeploymentStatus>>;
}
