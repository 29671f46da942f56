use std::path::PathBuf;

use chrono::{Duration, NaiveDate, Utc};
use depositor_core::issn::checked_issns;

const DEFAULT_SCHEMA_PATH: &str = "schemas/crossref_deposit.xsd";
const DEFAULT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("Failed to read ISSNS_FILE {path}: {source}")]
    IssnsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// What a run deposits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Documents updated within a date range, optionally per ISSN.
    DateRange {
        issns: Vec<String>,
        from_date: NaiveDate,
        until_date: NaiveDate,
    },
    /// An explicit list of PIDs.
    Pids(Vec<String>),
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    /// DOI prefix registered for the collection.
    pub prefix: String,
    pub depositor_name: Option<String>,
    pub depositor_email: Option<String>,
    /// Agency credentials; not used until submission is wired up.
    pub api_user: Option<String>,
    pub api_password: Option<String>,
    pub test_mode: bool,
    pub schema_path: PathBuf,
    pub articlemeta_url: String,
    pub collection: String,
    pub mode: RunMode,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                    | Default                          |
    /// |----------------------------|----------------------------------|
    /// | `DATABASE_URL`             | required                         |
    /// | `CROSSREF_PREFIX`          | required                         |
    /// | `CROSSREF_DEPOSITOR_NAME`  | unset                            |
    /// | `CROSSREF_DEPOSITOR_EMAIL` | unset                            |
    /// | `CROSSREF_API_USER`        | unset                            |
    /// | `CROSSREF_API_PASSWORD`    | unset                            |
    /// | `CROSSREF_TEST_MODE`       | `false`                          |
    /// | `DEPOSIT_SCHEMA_PATH`      | `schemas/crossref_deposit.xsd`   |
    /// | `ARTICLEMETA_URL`          | `http://articlemeta.scielo.org`  |
    /// | `COLLECTION`               | required                         |
    /// | `ISSNS`                    | empty                            |
    /// | `ISSNS_FILE`               | unset                            |
    /// | `FROM_DATE` / `UNTIL_DATE` | 30 days ago / today              |
    /// | `DATE_RANGE`               | unset, overrides both dates      |
    /// | `DEPOSIT_PIDS`             | unset                            |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok(), Utc::now().date_naive())
    }

    /// Load from an arbitrary variable source. Blank values count as unset.
    pub fn from_source(
        lookup: impl Fn(&str) -> Option<String>,
        today: NaiveDate,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let database_url = required("DATABASE_URL")?;
        let prefix = required("CROSSREF_PREFIX")?;
        let collection = required("COLLECTION")?;

        let test_mode = match var("CROSSREF_TEST_MODE") {
            Some(value) => parse_flag("CROSSREF_TEST_MODE", &value)?,
            None => false,
        };

        let mode = match var("DEPOSIT_PIDS") {
            Some(pids) => RunMode::Pids(split_list(&pids)),
            None => {
                let mut candidates = var("ISSNS").map(|v| split_list(&v)).unwrap_or_default();
                if let Some(path) = var("ISSNS_FILE") {
                    let contents = std::fs::read_to_string(&path)
                        .map_err(|source| ConfigError::IssnsFile { path, source })?;
                    candidates.extend(contents.lines().map(str::to_string));
                }
                let (from_date, until_date) = date_window(&var, today)?;
                RunMode::DateRange {
                    issns: checked_issns(candidates),
                    from_date,
                    until_date,
                }
            }
        };

        Ok(Self {
            database_url,
            prefix,
            depositor_name: var("CROSSREF_DEPOSITOR_NAME"),
            depositor_email: var("CROSSREF_DEPOSITOR_EMAIL"),
            api_user: var("CROSSREF_API_USER"),
            api_password: var("CROSSREF_API_PASSWORD"),
            test_mode,
            schema_path: var("DEPOSIT_SCHEMA_PATH")
                .unwrap_or_else(|| DEFAULT_SCHEMA_PATH.into())
                .into(),
            articlemeta_url: var("ARTICLEMETA_URL")
                .unwrap_or_else(|| depositor_catalog::articlemeta::DEFAULT_BASE_URL.into()),
            collection,
            mode,
        })
    }
}

/// Split on commas and whitespace.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("expected true/false, got '{other}'"),
        }),
    }
}

fn parse_date(var: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| ConfigError::Invalid {
        var,
        reason: format!("'{value}' is not an ISO date: {e}"),
    })
}

/// `DATE_RANGE` days back from today wins over explicit dates.
fn date_window(
    var: &impl Fn(&str) -> Option<String>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), ConfigError> {
    if let Some(days) = var("DATE_RANGE") {
        let days: i64 = days.parse().map_err(|_| ConfigError::Invalid {
            var: "DATE_RANGE",
            reason: format!("'{days}' is not a number of days"),
        })?;
        if days < 0 {
            return Err(ConfigError::Invalid {
                var: "DATE_RANGE",
                reason: "must not be negative".to_string(),
            });
        }
        let from_date = Duration::try_days(days)
            .and_then(|window| today.checked_sub_signed(window))
            .ok_or_else(|| ConfigError::Invalid {
                var: "DATE_RANGE",
                reason: format!("{days} days reaches before the earliest supported date"),
            })?;
        return Ok((from_date, today));
    }

    let from_date = match var("FROM_DATE") {
        Some(value) => parse_date("FROM_DATE", &value)?,
        None => today - Duration::days(DEFAULT_WINDOW_DAYS),
    };
    let until_date = match var("UNTIL_DATE") {
        Some(value) => parse_date("UNTIL_DATE", &value)?,
        None => today,
    };
    if from_date > until_date {
        return Err(ConfigError::Invalid {
            var: "FROM_DATE",
            reason: format!("{from_date} is after UNTIL_DATE {until_date}"),
        });
    }
    Ok((from_date, until_date))
}
