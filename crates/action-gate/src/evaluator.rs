//! Condition evaluators

use action_primitives::{DriverError, DriverPort};
use async_trait::async_trait;
use formpilot_core_types::Locator;
use regex::Regex;
use tracing::debug;

use crate::errors::GateError;

/// Result of one evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub satisfied: bool,

    /// What was seen (URL, element text), for the event trail
    pub observed: Option<String>,
}

impl Observation {
    pub fn new(satisfied: bool, observed: Option<String>) -> Self {
        Self {
            satisfied,
            observed,
        }
    }
}

/// One-shot predicate over driver state
#[async_trait]
pub trait ConditionEvaluator: Send + Sync {
    /// Short description for logs, e.g. `url-contains "/dashboard"`
    fn describe(&self) -> String;

    async fn evaluate(&self, driver: &dyn DriverPort) -> Result<Observation, GateError>;
}

#[derive(Debug, Clone)]
pub enum UrlMatcher {
    Contains(String),
    Equals(String),
    Matches(Regex),
}

impl UrlMatcher {
    fn matches(&self, url: &str) -> bool {
        match self {
            UrlMatcher::Contains(needle) => url.contains(needle.as_str()),
            UrlMatcher::Equals(expected) => url == expected,
            UrlMatcher::Matches(regex) => regex.is_match(url),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UrlEvaluator {
    matcher: UrlMatcher,
}

impl UrlEvaluator {
    pub fn new(matcher: UrlMatcher) -> Self {
        Self { matcher }
    }
}

#[async_trait]
impl ConditionEvaluator for UrlEvaluator {
    fn describe(&self) -> String {
        match &self.matcher {
            UrlMatcher::Contains(value) => format!("url-contains {:?}", value),
            UrlMatcher::Equals(value) => format!("url-equals {:?}", value),
            UrlMatcher::Matches(regex) => format!("url-matches {:?}", regex.as_str()),
        }
    }

    async fn evaluate(&self, driver: &dyn DriverPort) -> Result<Observation, GateError> {
        let url = driver.current_url().await?;
        let satisfied = self.matcher.matches(&url);
        debug!(%url, satisfied, "url condition evaluated");
        Ok(Observation::new(satisfied, Some(url)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementCheck {
    Present,
    Absent,
    TextEquals(String),
    TextContains(String),
}

#[derive(Debug, Clone)]
pub struct ElementEvaluator {
    locator: Locator,
    check: ElementCheck,
}

impl ElementEvaluator {
    pub fn new(locator: Locator, check: ElementCheck) -> Self {
        Self { locator, check }
    }
}

#[async_trait]
impl ConditionEvaluator for ElementEvaluator {
    fn describe(&self) -> String {
        match &self.check {
            ElementCheck::Present => format!("element-present {}", self.locator),
            ElementCheck::Absent => format!("element-absent {}", self.locator),
            ElementCheck::TextEquals(text) => {
                format!("element-text-equals {} {:?}", self.locator, text)
            }
            ElementCheck::TextContains(text) => {
                format!("element-text-contains {} {:?}", self.locator, text)
            }
        }
    }

    async fn evaluate(&self, driver: &dyn DriverPort) -> Result<Observation, GateError> {
        let element = match driver.locate(&self.locator).await {
            Ok(element) => element,
            Err(DriverError::NotFound(_)) => {
                let satisfied = self.check == ElementCheck::Absent;
                debug!(locator = %self.locator, satisfied, "element not found");
                return Ok(Observation::new(satisfied, None));
            }
            Err(err) => return Err(err.into()),
        };

        let observation = match &self.check {
            ElementCheck::Present => Observation::new(true, None),
            ElementCheck::Absent => Observation::new(false, None),
            ElementCheck::TextEquals(expected) => {
                let text = driver.read_text(&element).await?;
                Observation::new(&text == expected, Some(text))
            }
            ElementCheck::TextContains(needle) => {
                let text = driver.read_text(&element).await?;
                Observation::new(text.contains(needle.as_str()), Some(text))
            }
        };
        debug!(
            locator = %self.locator,
            satisfied = observation.satisfied,
            "element condition evaluated"
        );
        Ok(observation)
    }
}
