//! Pre-flight validation
//!
//! Resolves every field strategy and compiles the success condition before
//! the run starts, so configuration defects surface without any driver
//! interaction.

use action_fields::{FieldError, FieldStrategy, FieldStrategyRegistry};
use action_gate::ConditionEvaluator;
use action_primitives::RetryPolicy;
use formpilot_core_types::FieldValue;
use std::fmt;
use std::sync::Arc;

use crate::{errors::ConfigurationError, types::FormConfig};

/// Everything resolved up front for one configuration
pub struct ExecutionPlan {
    pub(crate) strategies: Vec<Arc<dyn FieldStrategy>>,
    pub(crate) condition: Option<Box<dyn ConditionEvaluator>>,
}

impl ExecutionPlan {
    /// Strategy names in field order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|strategy| strategy.name()).collect()
    }

    pub fn field_count(&self) -> usize {
        self.strategies.len()
    }

    /// Description of the compiled success condition
    pub fn condition(&self) -> Option<String> {
        self.condition.as_ref().map(|condition| condition.describe())
    }
}

impl fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("strategies", &self.strategy_names())
            .field("condition", &self.condition())
            .finish()
    }
}

fn has_placeholder(raw: &str) -> bool {
    raw.find("${")
        .map(|start| raw[start..].contains('}'))
        .unwrap_or(false)
}

pub fn build_plan(
    config: &FormConfig,
    registry: &FieldStrategyRegistry,
    retry: &RetryPolicy,
) -> Result<ExecutionPlan, ConfigurationError> {
    if config.url.trim().is_empty() {
        return Err(ConfigurationError::EmptyUrl);
    }
    if has_placeholder(&config.url) {
        return Err(ConfigurationError::UnresolvedPlaceholder {
            location: "url".into(),
        });
    }
    retry.validate()?;

    let mut strategies = Vec::with_capacity(config.fields.len());
    for (index, spec) in config.fields.iter().enumerate() {
        if spec.locator.selector.trim().is_empty() {
            return Err(ConfigurationError::EmptySelector { index });
        }
        if let FieldValue::Text(text) = &spec.value {
            if has_placeholder(text) {
                return Err(ConfigurationError::UnresolvedPlaceholder {
                    location: format!("field {}", spec.label()),
                });
            }
        }
        let strategy = registry.prepare(spec).map_err(|err| match err {
            FieldError::UnknownFieldType(field_type) => ConfigurationError::UnknownFieldType {
                field: spec.label(),
                field_type,
            },
            other => ConfigurationError::InvalidValue {
                field: spec.label(),
                reason: other.to_string(),
            },
        })?;
        strategies.push(strategy);
    }

    if let Some(submit) = &config.submit {
        if submit.selector.trim().is_empty() {
            return Err(ConfigurationError::EmptySubmitSelector);
        }
    }

    let condition = config
        .success_condition
        .as_ref()
        .map(|condition| condition.compile())
        .transpose()
        .map_err(ConfigurationError::InvalidCondition)?;

    Ok(ExecutionPlan {
        strategies,
        condition,
    })
}
