use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DoraLensError, Result};

/// One historical release event, already translated out of the provider's
/// payload shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub provider: String,
    pub environment: String,
    pub sha: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeploymentRecord {
    /// Builds a record from raw provider fields, rejecting unparseable
    /// timestamps instead of letting them poison the window comparison.
    pub fn parse(
        provider: &str,
        environment: &str,
        sha: &str,
        created_at: &str,
        updated_at: &str,
    ) -> Result<Self> {
        Ok(Self {
            provider: provider.to_string(),
            environment: environment.to_string(),
            sha: sha.to_string(),
            created_at: parse_timestamp("created_at", created_at)?,
            updated_at: parse_timestamp("updated_at", updated_at)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    Error,
    Failure,
    Inactive,
    InProgress,
    Queued,
    Pending,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStatus {
    pub deployment_id: u64,
    pub state: DeploymentState,
    pub environment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|source| DoraLensError::InvalidTimestamp {
            field,
            value: value.to_string(),
            source,
        })
}
