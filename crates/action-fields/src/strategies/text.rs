use action_primitives::{DriverError, DriverPort, ElementHandle};
use async_trait::async_trait;
use formpilot_core_types::FieldValue;
use tracing::debug;

use crate::{
    model::{AppliedValue, FieldSpec},
    registry::FieldStrategy,
};

/// Text inputs and textareas: overwrite the value, verify exact match
#[derive(Clone, Copy, Debug)]
pub struct TextStrategy {
    name: &'static str,
}

impl TextStrategy {
    pub fn input() -> Self {
        Self { name: "text" }
    }

    pub fn textarea() -> Self {
        Self { name: "textarea" }
    }
}

impl Default for TextStrategy {
    fn default() -> Self {
        Self::input()
    }
}

#[async_trait]
impl FieldStrategy for TextStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn check_value(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Text(_) => Ok(()),
            FieldValue::Bool(_) => {
                Err("Boolean values only allowed for checkbox and radio fields".to_string())
            }
        }
    }

    async fn apply(
        &self,
        driver: &dyn DriverPort,
        element: &ElementHandle,
        spec: &FieldSpec,
    ) -> Result<AppliedValue, DriverError> {
        let text = spec.value.to_string();
        debug!(field = %spec.label(), value = %spec.display_value(), "typing value");
        // set_value replaces the content, so repeating it is harmless
        driver.set_value(element, &text).await?;
        Ok(AppliedValue::Text(driver.read_value(element).await?))
    }

    fn verify(&self, applied: &AppliedValue, spec: &FieldSpec) -> bool {
        matches!(applied, AppliedValue::Text(actual) if spec.value.as_text() == Some(actual.as_str()))
    }
}
