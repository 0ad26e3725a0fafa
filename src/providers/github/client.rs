use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use url::Url;

use crate::auth::Token;
use crate::deployments::DeploymentState;
use crate::error::{DoraLensError, Result};

const API_VERSION: &str = "2022-11-28";
const PER_PAGE: u32 = 100;

pub struct GitHubClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubUserDto {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct GitHubDeploymentDto {
    pub id: u64,
    pub sha: String,
    #[serde(rename = "ref")]
    pub ref_: String,
    pub environment: String,
    pub creator: Option<GitHubUserDto>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct GitHubDeploymentStatusDto {
    pub id: u64,
    pub state: DeploymentState,
    #[serde(default)]
    pub environment: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("DoraLens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DoraLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        // A trailing slash keeps path prefixes such as `/api/v3` when joining.
        let api_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|e| DoraLensError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);

        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    fn repo_url(&self, owner: &str, repo: &str) -> Result<Url> {
        self.api_url
            .join(&format!(
                "repos/{}/{}/",
                urlencoding::encode(owner),
                urlencoding::encode(repo)
            ))
            .map_err(|e| DoraLensError::Config(format!("Invalid repository URL: {e}")))
    }

    async fn ensure_success(response: Response, what: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(DoraLensError::Api(format!(
            "Failed to fetch {what}: {status} - {body}"
        )))
    }

    /// Fetch the most recent page of deployments, optionally narrowed to one
    /// environment on the server side.
    pub async fn fetch_deployments(
        &self,
        owner: &str,
        repo: &str,
        environment: Option<&str>,
    ) -> Result<Vec<GitHubDeploymentDto>> {
        let url = self
            .repo_url(owner, repo)?
            .join("deployments")
            .map_err(|e| DoraLensError::Config(format!("Invalid deployments URL: {e}")))?;

        let mut request = self.client.get(url).query(&[("per_page", PER_PAGE)]);
        if let Some(environment) = environment {
            request = request.query(&[("environment", environment)]);
        }
        request = self.auth_request(request);

        let response = Self::ensure_success(request.send().await?, "deployments").await?;
        let deployments =
            serde_json::from_str::<Vec<GitHubDeploymentDto>>(&response.text().await?)?;
        Ok(deployments)
    }

    pub async fn fetch_deployment_statuses(
        &self,
        owner: &str,
        repo: &str,
        deployment_id: u64,
    ) -> Result<Vec<GitHubDeploymentStatusDto>> {
        let url = self
            .repo_url(owner, repo)?
            .join(&format!("deployments/{deployment_id}/statuses"))
            .map_err(|e| DoraLensError::Config(format!("Invalid statuses URL: {e}")))?;

        let request = self
            .auth_request(self.client.get(url))
            .query(&[("per_page", PER_PAGE)]);

        let response =
            Self::ensure_success(request.send().await?, "deployment statuses").await?;
        let statuses =
            serde_json::from_str::<Vec<GitHubDeploymentStatusDto>>(&response.text().await?)?;
        Ok(statuses)
    }
}
