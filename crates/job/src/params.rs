use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use subfetch_providers::ProviderConfigs;

use crate::error::JobError;

const WEEK_SECS: u64 = 7 * 24 * 60 * 60;

/// Argument names in scheduler order.
pub const ARGUMENT_NAMES: [&str; 10] = [
    "scan_path",
    "scan_age",
    "languages",
    "encoding",
    "min_score",
    "providers",
    "provider_configs",
    "max_workers",
    "plex_url",
    "plex_token",
];

/// Parameters of one scan job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParams {
    pub scan_path: PathBuf,
    /// Maximum file age in weeks.
    pub scan_age: i64,
    /// Alpha3 (or alpha2) language codes.
    pub languages: Vec<String>,
    /// Encoding label for saved subtitles, e.g. `utf-8`.
    pub encoding: String,
    /// Percentage of the hash score a subtitle must reach.
    pub min_score: u32,
    pub providers: Vec<String>,
    pub provider_configs: Option<ProviderConfigs>,
    pub max_workers: i64,
    pub plex_url: Option<String>,
    pub plex_token: Option<String>,
}

impl JobParams {
    /// Check preconditions in order, before any work starts.
    pub fn validate(&self) -> Result<(), JobError> {
        if !self.scan_path.is_dir() {
            return Err(JobError::InvalidPath(self.scan_path.clone()));
        }
        if self.scan_age < 1 {
            return Err(JobError::invalid("'scan_age' must be at least 1"));
        }
        if self.languages.is_empty() {
            return Err(JobError::invalid("'languages' list can't be empty"));
        }
        if self.providers.is_empty() {
            return Err(JobError::invalid("'providers' argument can't be empty"));
        }
        if self.max_workers < 1 {
            return Err(JobError::invalid("'max_workers' must be at least 1"));
        }
        Ok(())
    }

    /// `scan_age` weeks, saturating at the largest `Duration`.
    pub fn age(&self) -> Duration {
        let weeks = u64::try_from(self.scan_age).unwrap_or(0);
        Duration::from_secs(WEEK_SECS.saturating_mul(weeks))
    }

    /// Media-server URL and token, when both are set.
    pub fn media_server(&self) -> Option<(&str, &str)> {
        match (self.plex_url.as_deref(), self.plex_token.as_deref()) {
            (Some(url), Some(token)) if !url.is_empty() && !token.is_empty() => Some((url, token)),
            _ => None,
        }
    }

    /// Decode the scheduler's positional arguments. Arguments past the
    /// tenth are ignored.
    pub fn from_positional(args: &[Value]) -> Result<Self, JobError> {
        let arg = |i: usize| args.get(i).filter(|v| !v.is_null());

        Ok(Self {
            scan_path: PathBuf::from(required_string(arg(0), 0)?),
            scan_age: required_int(arg(1), 1)?,
            languages: string_list(arg(2), 2)?,
            encoding: required_string(arg(3), 3)?,
            min_score: u32::try_from(required_int(arg(4), 4)?)
                .map_err(|_| JobError::invalid("'min_score' must not be negative"))?,
            providers: string_list(arg(5), 5)?,
            provider_configs: provider_configs(arg(6))?,
            max_workers: required_int(arg(7), 7)?,
            plex_url: optional_string(arg(8), 8)?,
            plex_token: optional_string(arg(9), 9)?,
        })
    }
}

fn missing(index: usize) -> JobError {
    JobError::invalid(format!("missing argument '{}'", ARGUMENT_NAMES[index]))
}

fn wrong_type(index: usize, expected: &str) -> JobError {
    JobError::invalid(format!(
        "argument '{}' must be {expected}",
        ARGUMENT_NAMES[index]
    ))
}

fn required_string(value: Option<&Value>, index: usize) -> Result<String, JobError> {
    match value {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(wrong_type(index, "a string")),
        None => Err(missing(index)),
    }
}

fn optional_string(value: Option<&Value>, index: usize) -> Result<Option<String>, JobError> {
    match value {
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(wrong_type(index, "a string")),
        None => Ok(None),
    }
}

fn required_int(value: Option<&Value>, index: usize) -> Result<i64, JobError> {
    match value {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| wrong_type(index, "an integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| wrong_type(index, "an integer")),
        Some(_) => Err(wrong_type(index, "an integer")),
        None => Err(missing(index)),
    }
}

/// A JSON array of strings, or one comma-separated string.
fn string_list(value: Option<&Value>, index: usize) -> Result<Vec<String>, JobError> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| wrong_type(index, "a list of strings"))
            })
            .filter(|r| r.as_ref().map_or(true, |s| !s.is_empty()))
            .collect(),
        Some(Value::String(s)) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()),
        Some(_) => Err(wrong_type(index, "a list of strings")),
        None => Err(missing(index)),
    }
}

/// A JSON object of objects, or the same encoded as a string. Empty means none.
fn provider_configs(value: Option<&Value>) -> Result<Option<ProviderConfigs>, JobError> {
    let decoded = match value {
        None => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => serde_json::from_str::<Value>(s)
            .map_err(|e| JobError::invalid(format!("argument 'provider_configs' is not JSON: {e}")))?,
        Some(other) => other.clone(),
    };

    let configs: ProviderConfigs = serde_json::from_value(decoded)
        .map_err(|_| wrong_type(6, "an object of objects"))?;
    Ok((!configs.is_empty()).then_some(configs))
}
