pub mod clock;
pub mod deployment_frequency;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DoraLensError;

/// Unit every frequency is reported in, whatever the lookback period.
pub const UNIT_PER_DAY: &str = "per_day";

/// Lookback window used both to select deployments and to normalize the
/// count into a per-day rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    #[default]
    Week,
    Month,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// Start of the window ending at `end`. Months are subtracted on the
    /// calendar; a day missing from the previous month rolls forward, so
    /// 03-31 becomes 03-03 (03-02 in leap years).
    pub fn start_date(self, end: DateTime<Utc>) -> DateTime<Utc> {
        let start = match self {
            Self::Day => end.checked_sub_days(Days::new(1)),
            Self::Week => end.checked_sub_days(Days::new(7)),
            Self::Month => previous_month(end),
        };

        start.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Month always divides by 30, regardless of the calendar month length.
    pub fn days(self) -> f64 {
        match self {
            Self::Day => 1.0,
            Self::Week => 7.0,
            Self::Month => 30.0,
        }
    }

    pub fn per_day_rate(self, total: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let total = total as f64;
        total / self.days()
    }
}

fn previous_month(end: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (year, month) = match end.month() {
        1 => (end.year() - 1, 12),
        m => (end.year(), m - 1),
    };

    // Counting from the 1st carries overflow days into the following month.
    let date = NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_days(Days::new(u64::from(end.day() - 1)))?;

    Some(Utc.from_utc_datetime(&date.and_time(end.time())))
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = DoraLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(DoraLensError::Validation(format!(
                "period must be one of day, week, month (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyOptions {
    pub period: Period,
    pub environment: Option<String>,
}

impl FrequencyOptions {
    /// Environment to filter on; blank means every environment counts.
    pub fn environment_filter(&self) -> Option<&str> {
        self.environment.as_deref().filter(|env| !env.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyMetadata {
    pub deployment_dates: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyResult {
    pub value: f64,
    pub unit: String,
    pub period: Period,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub total_deployments: usize,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub metadata: FrequencyMetadata,
}

/// Uniform asynchronous shape for anything that produces a metric, so cheap
/// in-memory calculations and slower backends are interchangeable.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    type Output: Send;

    async fn calculate(&self) -> Self::Output;
}
