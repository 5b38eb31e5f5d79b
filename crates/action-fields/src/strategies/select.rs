use action_primitives::{DriverError, DriverPort, ElementHandle};
use async_trait::async_trait;
use formpilot_core_types::FieldValue;
use tracing::debug;

use crate::{
    model::{AppliedValue, FieldSpec},
    registry::FieldStrategy,
};

/// `<select>` dropdown: choose by value or visible text, verify the selected option
#[derive(Clone, Copy, Debug, Default)]
pub struct SelectStrategy;

#[async_trait]
impl FieldStrategy for SelectStrategy {
    fn name(&self) -> &'static str {
        "select"
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
        let item = spec.value.to_string();
        debug!(
            field = %spec.label(),
            by = spec.select_by.as_str(),
            item = %spec.display_value(),
            "selecting option"
        );
        driver.select_option(element, spec.select_by, &item).await?;
        Ok(AppliedValue::Selection(driver.selected_option(element).await?))
    }

    fn verify(&self, applied: &AppliedValue, spec: &FieldSpec) -> bool {
        match (applied, spec.value.as_text()) {
            (AppliedValue::Selection(Some(option)), Some(expected)) => {
                option.by(spec.select_by) == expected
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::fake::FakeElementDriver;
    use action_primitives::{SelectBy, SelectedOption};
    use formpilot_core_types::Locator;

    fn driver() -> FakeElementDriver {
        let driver = FakeElementDriver::default();
        driver.element.lock().options = vec![
            SelectedOption::new("opt1", "Option 1"),
            SelectedOption::new("opt2", "Option 2"),
        ];
        driver
    }

    #[tokio::test]
    async fn selects_by_value() {
        let driver = driver();
        let spec = FieldSpec::new(Locator::id("plan"), "select", "opt2");

        let applied = SelectStrategy
            .apply(&driver, &FakeElementDriver::handle(), &spec)
            .await
            .unwrap();
        assert_eq!(
            applied,
            AppliedValue::Selection(Some(SelectedOption::new("opt2", "Option 2")))
        );
        assert!(SelectStrategy.verify(&applied, &spec));
    }

    #[tokio::test]
    async fn selects_by_visible_text() {
        let driver = driver();
        let spec =
            FieldSpec::new(Locator::id("plan"), "select", "Option 1").with_select_by(SelectBy::Text);

        let applied = SelectStrategy
            .apply(&driver, &FakeElementDriver::handle(), &spec)
            .await
            .unwrap();
        assert!(SelectStrategy.verify(&applied, &spec));

        let by_value = FieldSpec::new(Locator::id("plan"), "select", "Option 1");
        assert!(!SelectStrategy.verify(&applied, &by_value));
    }

    #[tokio::test]
    async fn missing_option_is_reported() {
        let driver = driver();
        let spec = FieldSpec::new(Locator::id("plan"), "select", "opt9");

        let err = SelectStrategy
            .apply(&driver, &FakeElementDriver::handle(), &spec)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::OptionNotFound(_)));
        assert!(!SelectStrategy.verify(&AppliedValue::Selection(None), &spec));
    }
}
