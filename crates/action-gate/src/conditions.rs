//! Condition types for post-submission validation

use formpilot_core_types::Locator;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    errors::GateError,
    evaluator::{ConditionEvaluator, ElementCheck, ElementEvaluator, UrlEvaluator, UrlMatcher},
};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Condition enumeration, tagged by `type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ConditionKind {
    /// Current URL contains substring
    UrlContains { value: String },

    /// Current URL equals string
    UrlEquals { value: String },

    /// Current URL matches regex pattern
    UrlMatches { value: String },

    /// Element can be located
    ElementPresent { locator: Locator },

    /// Element can not be located
    ElementAbsent { locator: Locator },

    /// Element text equals value exactly
    ElementTextEquals { locator: Locator, value: String },

    /// Element text contains value
    ElementTextContains { locator: Locator, value: String },
}

impl ConditionKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ConditionKind::UrlContains { .. } => "url-contains",
            ConditionKind::UrlEquals { .. } => "url-equals",
            ConditionKind::UrlMatches { .. } => "url-matches",
            ConditionKind::ElementPresent { .. } => "element-present",
            ConditionKind::ElementAbsent { .. } => "element-absent",
            ConditionKind::ElementTextEquals { .. } => "element-text-equals",
            ConditionKind::ElementTextContains { .. } => "element-text-contains",
        }
    }

    /// Every accepted `type` tag
    pub fn tags() -> [&'static str; 7] {
        [
            "url-contains",
            "url-equals",
            "url-matches",
            "element-present",
            "element-absent",
            "element-text-equals",
            "element-text-contains",
        ]
    }

    pub fn locator(&self) -> Option<&Locator> {
        match self {
            ConditionKind::ElementPresent { locator }
            | ConditionKind::ElementAbsent { locator }
            | ConditionKind::ElementTextEquals { locator, .. }
            | ConditionKind::ElementTextContains { locator, .. } => Some(locator),
            _ => None,
        }
    }
}

/// Post-submission predicate plus its polling budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessCondition {
    #[serde(flatten)]
    pub kind: ConditionKind,

    /// Total polling budget in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay between evaluations in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl SuccessCondition {
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    pub fn url_contains(value: impl Into<String>) -> Self {
        Self::new(ConditionKind::UrlContains {
            value: value.into(),
        })
    }

    pub fn url_matches(pattern: impl Into<String>) -> Self {
        Self::new(ConditionKind::UrlMatches {
            value: pattern.into(),
        })
    }

    pub fn element_present(locator: Locator) -> Self {
        Self::new(ConditionKind::ElementPresent { locator })
    }

    pub fn element_text_equals(locator: Locator, value: impl Into<String>) -> Self {
        Self::new(ConditionKind::ElementTextEquals {
            locator,
            value: value.into(),
        })
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check timing and values, and build the evaluator
    ///
    /// Regex patterns are compiled here so a bad pattern fails before the
    /// run touches the browser.
    pub fn compile(&self) -> Result<Box<dyn ConditionEvaluator>, GateError> {
        if self.timeout_ms == 0 {
            return Err(GateError::InvalidCondition(
                "timeout must be greater than zero".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(GateError::InvalidCondition(
                "poll_interval must be greater than zero".into(),
            ));
        }
        if let Some(locator) = self.kind.locator() {
            if locator.selector.trim().is_empty() {
                return Err(GateError::InvalidCondition(format!(
                    "{} requires a selector",
                    self.kind.tag()
                )));
            }
        }

        let evaluator: Box<dyn ConditionEvaluator> = match &self.kind {
            ConditionKind::UrlContains { value } => {
                Box::new(UrlEvaluator::new(UrlMatcher::Contains(non_empty(self, value)?)))
            }
            ConditionKind::UrlEquals { value } => {
                Box::new(UrlEvaluator::new(UrlMatcher::Equals(non_empty(self, value)?)))
            }
            ConditionKind::UrlMatches { value } => {
                let regex = Regex::new(value).map_err(|err| GateError::InvalidPattern {
                    pattern: value.clone(),
                    reason: err.to_string(),
                })?;
                Box::new(UrlEvaluator::new(UrlMatcher::Matches(regex)))
            }
            ConditionKind::ElementPresent { locator } => {
                Box::new(ElementEvaluator::new(locator.clone(), ElementCheck::Present))
            }
            ConditionKind::ElementAbsent { locator } => {
                Box::new(ElementEvaluator::new(locator.clone(), ElementCheck::Absent))
            }
            ConditionKind::ElementTextEquals { locator, value } => Box::new(ElementEvaluator::new(
                locator.clone(),
                ElementCheck::TextEquals(value.clone()),
            )),
            ConditionKind::ElementTextContains { locator, value } => {
                Box::new(ElementEvaluator::new(
                    locator.clone(),
                    ElementCheck::TextContains(non_empty(self, value)?),
                ))
            }
        };
        Ok(evaluator)
    }
}

fn non_empty(condition: &SuccessCondition, value: &str) -> Result<String, GateError> {
    if value.is_empty() {
        return Err(GateError::InvalidCondition(format!(
            "{} requires a value",
            condition.kind.tag()
        )));
    }
    Ok(value.to_string())
}
