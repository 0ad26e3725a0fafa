use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;
use indexmap::IndexMap;

use crate::auth::Token;
use crate::error::{DoraLensError, Result};
use crate::metrics::{FrequencyOptions, FrequencyResult, Period};

/// Action inputs. The runner exposes each `with:` entry as `INPUT_<NAME>`,
/// so every flag falls back to that variable.
#[derive(Args, Debug, Default, Clone)]
pub struct ActionInputs {
    /// Metric to compute (`collect` or `deployment-frequency`)
    #[arg(long, env = "INPUT_METHOD")]
    pub method: Option<String>,

    /// Lookback period: day, week or month
    #[arg(long, env = "INPUT_PERIOD")]
    pub period: Option<String>,

    /// Only count deployments to this environment
    #[arg(long, env = "INPUT_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Repository owner
    #[arg(long, env = "INPUT_OWNER")]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long, env = "INPUT_REPO")]
    pub repo: Option<String>,

    /// GitHub access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Collect,
    DeploymentFrequency,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::DeploymentFrequency => "deployment-frequency",
        }
    }
}

impl FromStr for Method {
    type Err = DoraLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "collect" => Ok(Self::Collect),
            "deployment-frequency" => Ok(Self::DeploymentFrequency),
            other => Err(DoraLensError::Validation(format!(
                "method must be one of collect, deployment-frequency (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug)]
pub struct FrequencyRequest {
    pub owner: String,
    pub repo: String,
    pub options: FrequencyOptions,
    pub token: Token,
}

/// Fully validated unit of work for one action run.
#[derive(Debug)]
pub enum ActionRequest {
    Collect,
    DeploymentFrequency(FrequencyRequest),
}

impl ActionRequest {
    /// Validates inputs in order: method, period, owner/repo, token.
    pub fn from_inputs(inputs: &ActionInputs) -> Result<Self> {
        let method = non_empty(inputs.method.as_deref())
            .ok_or_else(|| DoraLensError::Validation("method is required".to_string()))?
            .parse::<Method>()?;

        match method {
            Method::Collect => Ok(Self::Collect),
            Method::DeploymentFrequency => {
                let period = non_empty(inputs.period.as_deref())
                    .map(str::parse::<Period>)
                    .transpose()?
                    .unwrap_or_default();

                let (Some(owner), Some(repo)) = (
                    non_empty(inputs.owner.as_deref()),
                    non_empty(inputs.repo.as_deref()),
                ) else {
                    return Err(DoraLensError::MissingInput(format!(
                        "Owner and repo are required for {} method",
                        method.as_str()
                    )));
                };

                let token = Token::from_optional(inputs.token.as_deref()).ok_or_else(|| {
                    DoraLensError::MissingCredential(format!(
                        "GITHUB_TOKEN is required for {} method",
                        method.as_str()
                    ))
                })?;

                Ok(Self::DeploymentFrequency(FrequencyRequest {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    options: FrequencyOptions {
                        period,
                        environment: non_empty(inputs.environment.as_deref())
                            .map(str::to_string),
                    },
                    token,
                }))
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// RFC 3339 in UTC with millisecond precision, e.g. `2025-03-01T00:00:00.000Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Step outputs, kept in the order they are emitted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActionOutputs(IndexMap<String, String>);

impl ActionOutputs {
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Writes outputs in the `GITHUB_OUTPUT` file format. Multi-line values
    /// use the heredoc form.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for (name, value) in &self.0 {
            if value.contains('\n') {
                let delimiter = heredoc_delimiter(value);
                writeln!(writer, "{name}<<{delimiter}")?;
                writeln!(writer, "{value}")?;
                writeln!(writer, "{delimiter}")?;
            } else {
                writeln!(writer, "{name}={value}")?;
            }
        }
        Ok(())
    }

    /// Appends to the file named by `GITHUB_OUTPUT`, creating it if needed.
    pub fn append_to_file(&self, path: &Path) -> Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.write_to(file)?;
        Ok(())
    }
}

impl From<&FrequencyResult> for ActionOutputs {
    fn from(result: &FrequencyResult) -> Self {
        let mut outputs = Self::default();
        outputs.set("frequency", result.value.to_string());
        outputs.set("unit", result.unit.as_str());
        outputs.set("period", result.period.as_str());
        outputs.set("total_deployments", result.total_deployments.to_string());
        outputs.set("start_date", format_timestamp(result.start_date));
        outputs.set("end_date", format_timestamp(result.end_date));
        outputs
    }
}

fn heredoc_delimiter(value: &str) -> String {
    let mut delimiter = String::from("DORALENS_EOF");
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    delimiter
}

/// Workflow command marking the step as failed.
pub fn failure_command(message: &str) -> String {
    format!("::error::{}", escape_command_data(message))
}

fn escape_command_data(data: &str) -> String {
    data.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{FrequencyMetadata, UNIT_PER_DAY};
    use chrono::TimeZone;

    fn frequency_inputs() -> ActionInputs {
        ActionInputs {
            method: Some("deployment-frequency".to_string()),
            period: Some("week".to_string()),
            environment: Some("production".to_string()),
            owner: Some("tied-inc".to_string()),
            repo: Some("repo-knowledge".to_string()),
            token: Some("mock-token".to_string()),
        }
    }

    #[test]
    fn test_collect_method() {
        let inputs = ActionInputs {
            method: Some("collect".to_string()),
            ..ActionInputs::default()
        };

        let request = ActionRequest::from_inputs(&inputs).unwrap();

        assert!(matches!(request, ActionRequest::Collect));
    }

    #[test]
    fn test_deployment_frequency_request() {
        let request = ActionRequest::from_inputs(&frequency_inputs()).unwrap();

        let ActionRequest::DeploymentFrequency(request) = request else {
            panic!("expected deployment-frequency request");
        };
        assert_eq!(request.owner, "tied-inc");
        assert_eq!(request.repo, "repo-knowledge");
        assert_eq!(request.options.period, Period::Week);
        assert_eq!(request.options.environment.as_deref(), Some("production"));
        assert_eq!(request.token.as_str(), "mock-token");
    }

    #[test]
    fn test_period_defaults_to_week() {
        let inputs = ActionInputs {
            period: Some(String::new()),
            environment: None,
            ..frequency_inputs()
        };

        let ActionRequest::DeploymentFrequency(request) =
            ActionRequest::from_inputs(&inputs).unwrap()
        else {
            panic!("expected deployment-frequency request");
        };
        assert_eq!(request.options.period, Period::Week);
        assert_eq!(request.options.environment, None);
    }

    #[test]
    fn test_blank_environment_is_absent() {
        let inputs = ActionInputs {
            environment: Some("  ".to_string()),
            ..frequency_inputs()
        };

        let ActionRequest::DeploymentFrequency(request) =
            ActionRequest::from_inputs(&inputs).unwrap()
        else {
            panic!("expected deployment-frequency request");
        };
        assert_eq!(request.options.environment, None);
    }

    #[test]
    fn test_missing_owner_and_repo() {
        let inputs = ActionInputs {
            owner: None,
            repo: Some(String::new()),
            ..frequency_inputs()
        };

        let err = ActionRequest::from_inputs(&inputs).unwrap_err();

        assert!(matches!(err, DoraLensError::MissingInput(_)));
        assert_eq!(
            err.failure_message(),
            "Owner and repo are required for deployment-frequency method"
        );
    }

    #[test]
    fn test_missing_token() {
        let inputs = ActionInputs {
            period: None,
            environment: None,
            token: None,
            ..frequency_inputs()
        };

        let err = ActionRequest::from_inputs(&inputs).unwrap_err();

        assert!(matches!(err, DoraLensError::MissingCredential(_)));
        assert_eq!(
            err.failure_message(),
            "GITHUB_TOKEN is required for deployment-frequency method"
        );
    }

    #[test]
    fn test_owner_and_repo_are_checked_before_token() {
        let inputs = ActionInputs {
            owner: None,
            token: None,
            ..frequency_inputs()
        };

        let err = ActionRequest::from_inputs(&inputs).unwrap_err();

        assert!(matches!(err, DoraLensError::MissingInput(_)));
    }

    #[test]
    fn test_invalid_method_fails_generically() {
        let inputs = ActionInputs {
            method: Some("dummy".to_string()),
            ..ActionInputs::default()
        };

        let err = ActionRequest::from_inputs(&inputs).unwrap_err();

        assert!(matches!(err, DoraLensError::Validation(_)));
        assert_eq!(err.failure_message(), "Action failed");
    }

    #[test]
    fn test_missing_method_fails_generically() {
        let err = ActionRequest::from_inputs(&ActionInputs::default()).unwrap_err();

        assert_eq!(err.failure_message(), "Action failed");
    }

    #[test]
    fn test_invalid_period_fails_generically() {
        let inputs = ActionInputs {
            period: Some("quarter".to_string()),
            ..frequency_inputs()
        };

        let err = ActionRequest::from_inputs(&inputs).unwrap_err();

        assert!(matches!(err, DoraLensError::Validation(_)));
        assert_eq!(err.failure_message(), "Action failed");
    }

    #[test]
    fn test_outputs_from_result() {
        let result = FrequencyResult {
            value: 1.5,
            unit: UNIT_PER_DAY.to_string(),
            period: Period::Week,
            environment: Some("production".to_string()),
            total_deployments: 10,
            start_date: Utc.with_ymd_and_hms(2025, 2, 22, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            metadata: FrequencyMetadata::default(),
        };

        let outputs = ActionOutputs::from(&result);

        assert_eq!(outputs.get("frequency"), Some("1.5"));
        assert_eq!(outputs.get("unit"), Some("per_day"));
        assert_eq!(outputs.get("period"), Some("week"));
        assert_eq!(outputs.get("total_deployments"), Some("10"));
        assert_eq!(outputs.get("start_date"), Some("2025-02-22T00:00:00.000Z"));
        assert_eq!(outputs.get("end_date"), Some("2025-03-01T00:00:00.000Z"));
    }

    #[test]
    fn test_zero_frequency_renders_without_decimal() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let result = FrequencyResult {
            value: 0.0,
            unit: UNIT_PER_DAY.to_string(),
            period: Period::Month,
            environment: None,
            total_deployments: 0,
            start_date: Period::Month.start_date(at),
            end_date: at,
            metadata: FrequencyMetadata::default(),
        };

        let outputs = ActionOutputs::from(&result);

        assert_eq!(outputs.get("frequency"), Some("0"));
        assert_eq!(outputs.get("start_date"), Some("2025-02-01T00:00:00.000Z"));
    }

    #[test]
    fn test_write_outputs_in_order() {
        let mut outputs = ActionOutputs::default();
        outputs.set("frequency", "0.5714285714285714");
        outputs.set("unit", "per_day");

        let mut buffer = Vec::new();
        outputs.write_to(&mut buffer).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "frequency=0.5714285714285714\nunit=per_day\n"
        );
    }

    #[test]
    fn test_write_multiline_output_uses_heredoc() {
        let mut outputs = ActionOutputs::default();
        outputs.set("summary", "line one\nline two");

        let mut buffer = Vec::new();
        outputs.write_to(&mut buffer).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "summary<<DORALENS_EOF\nline one\nline two\nDORALENS_EOF\n"
        );
    }

    #[test]
    fn test_heredoc_delimiter_avoids_collision() {
        assert_eq!(heredoc_delimiter("DORALENS_EOF\n"), "DORALENS_EOF_");
    }

    #[test]
    fn test_append_to_file() {
        let path = std::env::temp_dir().join(format!(
            "doralens-output-{}-{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));

        let mut outputs = ActionOutputs::default();
        outputs.set("unit", "per_day");
        outputs.append_to_file(&path).unwrap();
        outputs.append_to_file(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(contents, "unit=per_day\nunit=per_day\n");
    }

    #[test]
    fn test_action_metadata_matches_inputs_and_outputs() {
        let metadata = include_str!("../action.yml");

        for input in ["method", "period", "environment", "owner", "repo"] {
            assert!(
                metadata.contains(&format!("\n  {input}:\n")),
                "input {input} not declared"
            );
        }
        assert!(metadata.contains("    default: week\n"));

        let at = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let outputs = ActionOutputs::from(&FrequencyResult {
            value: 0.0,
            unit: UNIT_PER_DAY.to_string(),
            period: Period::Week,
            environment: None,
            total_deployments: 0,
            start_date: Period::Week.start_date(at),
            end_date: at,
            metadata: FrequencyMetadata::default(),
        });
        for name in outputs.0.keys() {
            assert!(
                metadata.contains(&format!("\n  {name}:\n")),
                "output {name} not declared"
            );
        }
        assert!(metadata.contains("  using: docker\n"));
    }

    #[test]
    fn test_failure_command_escapes_newlines() {
        assert_eq!(failure_command("Action failed"), "::error::Action failed");
        assert_eq!(failure_command("a\nb 100%"), "::error::a%0Ab 100%25");
    }
}
