//! On-disk configuration layout
//!
//! These types mirror what operators write in YAML or JSON. They are
//! decoded after placeholder substitution and converted into the engine's
//! [`FormConfig`] by the loader, which owns validation.

use action_fields::FieldSpec;
use action_flow::FormConfig;
use action_gate::{ConditionKind, SuccessCondition};
use action_primitives::{RetryPolicy, SelectBy};
use anyhow::{bail, Context, Result};
use formpilot_core_types::{FieldValue, Locator, SelectorKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FIELD_TYPE: &str = "input";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    pub url: String,
    pub fields: Vec<FileField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_selector_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_after_fill: Option<Seconds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_load_timeout: Option<Seconds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_condition: Option<FileCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<FileRetry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileField {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    pub value: FileValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_by: Option<SelectBy>,
}

/// Scalar field value as written; numbers become their decimal text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FileValue {
    pub fn into_field_value(self) -> FieldValue {
        match self {
            FileValue::Bool(flag) => FieldValue::Bool(flag),
            FileValue::Integer(number) => FieldValue::Text(number.to_string()),
            FileValue::Float(number) => FieldValue::Text(number.to_string()),
            FileValue::Text(text) => FieldValue::Text(text),
        }
    }
}

impl From<&FieldValue> for FileValue {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Bool(flag) => FileValue::Bool(*flag),
            FieldValue::Text(text) => FileValue::Text(text.clone()),
        }
    }
}

/// A wait: plain seconds, or a humantime string such as `"500ms"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seconds {
    Number(f64),
    Text(String),
}

impl Seconds {
    pub fn to_duration(&self) -> Result<Duration> {
        let secs = match self {
            Seconds::Number(secs) => *secs,
            Seconds::Text(text) => match text.trim().parse::<f64>() {
                Ok(secs) => secs,
                Err(_) => {
                    return humantime::parse_duration(text.trim())
                        .with_context(|| format!("Invalid duration: {}", text))
                }
            },
        };
        if !secs.is_finite() || secs < 0.0 {
            bail!("Wait times must be non-negative");
        }
        Ok(Duration::from_secs_f64(secs))
    }

    pub fn from_duration(duration: Duration) -> Self {
        Seconds::Text(humantime::format_duration(duration).to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCondition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Seconds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<Seconds>,
}

impl FileCondition {
    pub fn into_condition(self) -> Result<SuccessCondition> {
        let tag = self.kind.trim().to_ascii_lowercase().replace('_', "-");
        let value = || {
            self.value
                .clone()
                .with_context(|| format!("Success condition {} requires a value", tag))
        };
        let locator = || -> Result<Locator> {
            let selector = self
                .selector
                .clone()
                .with_context(|| format!("Success condition {} requires a selector", tag))?;
            Ok(Locator::new(selector, selector_kind(self.selector_type.as_deref())?))
        };

        let kind = match tag.as_str() {
            "url-contains" => ConditionKind::UrlContains { value: value()? },
            "url-equals" => ConditionKind::UrlEquals { value: value()? },
            "url-matches" => ConditionKind::UrlMatches { value: value()? },
            "element-present" => ConditionKind::ElementPresent { locator: locator()? },
            "element-absent" => ConditionKind::ElementAbsent { locator: locator()? },
            "element-text-equals" => ConditionKind::ElementTextEquals {
                locator: locator()?,
                value: value()?,
            },
            "element-text-contains" => ConditionKind::ElementTextContains {
                locator: locator()?,
                value: value()?,
            },
            other => bail!(
                "Invalid success_condition type: {} (expected one of {})",
                other,
                ConditionKind::tags().join(", ")
            ),
        };

        let mut condition = SuccessCondition::new(kind);
        if let Some(timeout) = &self.timeout {
            condition = condition.with_timeout(timeout.to_duration()?);
        }
        if let Some(interval) = &self.poll_interval {
            condition = condition.with_poll_interval(interval.to_duration()?);
        }
        Ok(condition)
    }

    pub fn from_condition(condition: &SuccessCondition) -> Self {
        let (value, locator) = match &condition.kind {
            ConditionKind::UrlContains { value }
            | ConditionKind::UrlEquals { value }
            | ConditionKind::UrlMatches { value } => (Some(value.clone()), None),
            ConditionKind::ElementPresent { locator } | ConditionKind::ElementAbsent { locator } => {
                (None, Some(locator))
            }
            ConditionKind::ElementTextEquals { locator, value }
            | ConditionKind::ElementTextContains { locator, value } => {
                (Some(value.clone()), Some(locator))
            }
        };
        Self {
            kind: condition.kind.tag().to_string(),
            value,
            selector: locator.map(|locator| locator.selector.clone()),
            selector_type: locator.map(|locator| locator.kind.to_string()),
            timeout: Some(Seconds::from_duration(condition.timeout())),
            poll_interval: Some(Seconds::from_duration(condition.poll_interval())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRetry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay: Option<Seconds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<Seconds>,
}

impl FileRetry {
    pub fn into_policy(self) -> Result<RetryPolicy> {
        let mut policy = RetryPolicy::default();
        if let Some(attempts) = self.max_attempts {
            policy.max_attempts = attempts;
        }
        if let Some(delay) = &self.base_delay {
            policy.base_delay_ms = delay.to_duration()?.as_millis() as u64;
        }
        if let Some(multiplier) = self.multiplier {
            policy.multiplier = multiplier;
        }
        if let Some(delay) = &self.max_delay {
            policy.max_delay_ms = delay.to_duration()?.as_millis() as u64;
        }
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_policy(policy: &RetryPolicy) -> Self {
        Self {
            max_attempts: Some(policy.max_attempts),
            base_delay: Some(Seconds::from_duration(policy.base_delay())),
            multiplier: Some(policy.multiplier),
            max_delay: Some(Seconds::from_duration(policy.max_delay())),
        }
    }
}

/// Parse a `selector_type`, defaulting to `id` like the field list does.
pub fn selector_kind(raw: Option<&str>) -> Result<SelectorKind> {
    match raw {
        None => Ok(SelectorKind::default()),
        Some(raw) => Ok(raw.parse::<SelectorKind>()?),
    }
}

impl FileConfig {
    /// Layout for writing `form` back to disk
    pub fn from_form(form: &FormConfig, retry: &RetryPolicy) -> Self {
        let fields = form
            .fields
            .iter()
            .map(|spec: &FieldSpec| FileField {
                selector: spec.locator.selector.clone(),
                selector_type: Some(spec.locator.kind.to_string()),
                field_type: Some(spec.field_type.clone()),
                value: FileValue::from(&spec.value),
                required: (!spec.required).then_some(false),
                select_by: (spec.select_by != SelectBy::default()).then_some(spec.select_by),
            })
            .collect();

        Self {
            url: form.url.clone(),
            fields,
            submit_selector: form.submit.as_ref().map(|locator| locator.selector.clone()),
            submit_selector_type: form.submit.as_ref().map(|locator| locator.kind.to_string()),
            wait_after_fill: (form.wait_after_fill_ms > 0)
                .then(|| Seconds::from_duration(form.wait_after_fill())),
            page_load_timeout: Some(Seconds::from_duration(form.page_load_timeout())),
            success_condition: form
                .success_condition
                .as_ref()
                .map(FileCondition::from_condition),
            screenshot_dir: form.screenshot_dir.clone(),
            retry: (retry != &RetryPolicy::default()).then(|| FileRetry::from_policy(retry)),
        }
    }
}
