use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;

use super::clock::{Clock, SystemClock};
use super::{
    FrequencyMetadata, FrequencyOptions, FrequencyResult, MetricsProvider, UNIT_PER_DAY,
};
use crate::deployments::DeploymentRecord;

/// Computes how often deployments happened over the lookback window ending
/// at `clock.now()`, expressed per day.
///
/// Records are filtered by environment (when one is set) and ordered by
/// creation time. A record counts when its `created_at` lies in
/// `[start_date, end_date]`, bounds included.
pub fn calculate_deployment_frequency(
    deployments: &[DeploymentRecord],
    options: &FrequencyOptions,
    clock: &dyn Clock,
) -> FrequencyResult {
    let environment = options.environment_filter();

    let mut filtered: Vec<&DeploymentRecord> = deployments
        .iter()
        .filter(|d| match environment {
            Some(env) => d.environment == env,
            None => true,
        })
        .collect();

    // Stable: equal timestamps keep their input order.
    filtered.sort_by_key(|d| d.created_at);

    let end_date = clock.now();
    let start_date = options.period.start_date(end_date);

    if filtered.is_empty() {
        debug!("No deployments left after environment filter, reporting zero frequency");
        return zero_result(options, start_date, end_date);
    }

    let deployment_dates: Vec<DateTime<Utc>> = filtered
        .iter()
        .map(|d| d.created_at)
        .filter(|created_at| (start_date..=end_date).contains(created_at))
        .collect();

    let total_deployments = deployment_dates.len();

    debug!(
        "{total_deployments} of {} deployments fall between {start_date} and {end_date}",
        filtered.len()
    );

    FrequencyResult {
        value: options.period.per_day_rate(total_deployments),
        unit: UNIT_PER_DAY.to_string(),
        period: options.period,
        environment: options.environment.clone(),
        total_deployments,
        start_date,
        end_date,
        metadata: FrequencyMetadata { deployment_dates },
    }
}

fn zero_result(
    options: &FrequencyOptions,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> FrequencyResult {
    FrequencyResult {
        value: 0.0,
        unit: UNIT_PER_DAY.to_string(),
        period: options.period,
        environment: options.environment.clone(),
        total_deployments: 0,
        start_date,
        end_date,
        metadata: FrequencyMetadata::default(),
    }
}

/// Adapter exposing [`calculate_deployment_frequency`] through
/// [`MetricsProvider`].
pub struct DeploymentFrequencyProvider {
    deployments: Vec<DeploymentRecord>,
    options: FrequencyOptions,
    clock: Arc<dyn Clock>,
}

impl DeploymentFrequencyProvider {
    pub fn new(deployments: Vec<DeploymentRecord>, options: FrequencyOptions) -> Self {
        Self::with_clock(deployments, options, Arc::new(SystemClock))
    }

    pub fn with_clock(
        deployments: Vec<DeploymentRecord>,
        options: FrequencyOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            deployments,
            options,
            clock,
        }
    }
}

#[async_trait]
impl MetricsProvider for DeploymentFrequencyProvider {
    type Output = FrequencyResult;

    async fn calculate(&self) -> FrequencyResult {
        calculate_deployment_frequency(&self.deployments, &self.options, self.clock.as_ref())
    }
}
