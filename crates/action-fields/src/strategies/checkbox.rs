use action_primitives::{DriverError, DriverPort, ElementHandle};
use async_trait::async_trait;
use formpilot_core_types::FieldValue;
use tracing::debug;

use crate::{
    model::{AppliedValue, FieldSpec},
    registry::FieldStrategy,
};

/// Click only when the current state differs, then read the state back.
async fn ensure_selected(
    driver: &dyn DriverPort,
    element: &ElementHandle,
    spec: &FieldSpec,
    desired: bool,
) -> Result<AppliedValue, DriverError> {
    let current = driver.is_selected(element).await?;
    if current != desired {
        debug!(field = %spec.label(), from = current, to = desired, "toggling");
        driver.click(element).await?;
    }
    Ok(AppliedValue::Checked(driver.is_selected(element).await?))
}

/// Checkbox: value is the desired checked state
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckboxStrategy;

#[async_trait]
impl FieldStrategy for CheckboxStrategy {
    fn name(&self) -> &'static str {
        "checkbox"
    }

    fn check_value(&self, value: &FieldValue) -> Result<(), String> {
        value
            .as_bool()
            .map(|_| ())
            .ok_or_else(|| format!("checkbox value must be a boolean, got {:?}", value.to_string()))
    }

    async fn apply(
        &self,
        driver: &dyn DriverPort,
        element: &ElementHandle,
        spec: &FieldSpec,
    ) -> Result<AppliedValue, DriverError> {
        let desired = spec.value.as_bool().unwrap_or(false);
        ensure_selected(driver, element, spec, desired).await
    }

    fn verify(&self, applied: &AppliedValue, spec: &FieldSpec) -> bool {
        matches!(applied, AppliedValue::Checked(state) if Some(*state) == spec.value.as_bool())
    }
}

/// Radio button: can only be selected, never deselected directly
#[derive(Clone, Copy, Debug, Default)]
pub struct RadioStrategy;

#[async_trait]
impl FieldStrategy for RadioStrategy {
    fn name(&self) -> &'static str {
        "radio"
    }

    fn check_value(&self, value: &FieldValue) -> Result<(), String> {
        match value.as_bool() {
            Some(true) => Ok(()),
            _ => Err("radio value must be true".to_string()),
        }
    }

    async fn apply(
        &self,
        driver: &dyn DriverPort,
        element: &ElementHandle,
        spec: &FieldSpec,
    ) -> Result<AppliedValue, DriverError> {
        ensure_selected(driver, element, spec, true).await
    }

    fn verify(&self, applied: &AppliedValue, _spec: &FieldSpec) -> bool {
        *applied == AppliedValue::Checked(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::fake::FakeElementDriver;
    use formpilot_core_types::Locator;

    #[tokio::test]
    async fn checkbox_apply_is_idempotent() {
        let driver = FakeElementDriver::default();
        let spec = FieldSpec::new(Locator::id("agree"), "checkbox", true);
        let handle = FakeElementDriver::handle();

        for _ in 0..3 {
            let applied = CheckboxStrategy.apply(&driver, &handle, &spec).await.unwrap();
            assert!(CheckboxStrategy.verify(&applied, &spec));
        }
        assert_eq!(driver.element.lock().clicks, 1);
    }

    #[tokio::test]
    async fn checkbox_unchecks_when_asked() {
        let driver = FakeElementDriver::default();
        driver.element.lock().selected = true;
        let spec = FieldSpec::new(Locator::id("newsletter"), "checkbox", "off");

        let applied = CheckboxStrategy
            .apply(&driver, &FakeElementDriver::handle(), &spec)
            .await
            .unwrap();
        assert_eq!(applied, AppliedValue::Checked(false));
        assert!(CheckboxStrategy.verify(&applied, &spec));
    }

    #[tokio::test]
    async fn radio_selects_once() {
        let driver = FakeElementDriver::default();
        let spec = FieldSpec::new(Locator::css("input[value=pro]"), "radio", true);
        let handle = FakeElementDriver::handle();

        RadioStrategy.apply(&driver, &handle, &spec).await.unwrap();
        let applied = RadioStrategy.apply(&driver, &handle, &spec).await.unwrap();
        assert!(RadioStrategy.verify(&applied, &spec));
        assert_eq!(driver.element.lock().clicks, 1);
    }

    #[test]
    fn value_checks() {
        assert!(CheckboxStrategy.check_value(&FieldValue::text("yes")).is_ok());
        assert!(CheckboxStrategy.check_value(&FieldValue::text("blue")).is_err());
        assert!(RadioStrategy.check_value(&FieldValue::Bool(false)).is_err());
    }
}
