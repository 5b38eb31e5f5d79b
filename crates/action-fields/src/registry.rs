//! Field strategy registry
//!
//! Maps a field-type tag to the handler that knows how to put a value into
//! an element of that kind and how to confirm it took. Tags are matched
//! case-insensitively. The engine resolves every tag during pre-flight, so
//! an unknown tag never surfaces mid-run.

use std::collections::HashMap;
use std::sync::Arc;

use action_primitives::{DriverError, DriverPort, ElementHandle};
use async_trait::async_trait;
use formpilot_core_types::FieldValue;

use crate::{
    errors::FieldError,
    model::{AppliedValue, FieldSpec},
    strategies::{CheckboxStrategy, RadioStrategy, SelectStrategy, TextStrategy},
};

/// Type-specific value application
#[async_trait]
pub trait FieldStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reject values this strategy can never apply
    fn check_value(&self, value: &FieldValue) -> Result<(), String>;

    /// Apply `spec.value` to `element` and read back what the element now holds
    ///
    /// Must be safe to call again after a transient failure: a second call
    /// may not observably apply the value twice.
    async fn apply(
        &self,
        driver: &dyn DriverPort,
        element: &ElementHandle,
        spec: &FieldSpec,
    ) -> Result<AppliedValue, DriverError>;

    /// Whether the read-back value matches the intended one
    fn verify(&self, applied: &AppliedValue, spec: &FieldSpec) -> bool;
}

#[derive(Clone, Default)]
pub struct FieldStrategyRegistry {
    strategies: HashMap<String, Arc<dyn FieldStrategy>>,
}

impl FieldStrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in tags: input, text, textarea, checkbox, radio, select
    pub fn with_builtins() -> Self {
        let text: Arc<dyn FieldStrategy> = Arc::new(TextStrategy::input());
        let mut registry = Self::new();
        registry.register("input", text.clone());
        registry.register("text", text);
        registry.register("textarea", Arc::new(TextStrategy::textarea()));
        registry.register("checkbox", Arc::new(CheckboxStrategy));
        registry.register("radio", Arc::new(RadioStrategy));
        registry.register("select", Arc::new(SelectStrategy));
        registry
    }

    /// Register (or replace) the strategy for `tag`
    pub fn register(&mut self, tag: &str, strategy: Arc<dyn FieldStrategy>) -> &mut Self {
        self.strategies
            .insert(tag.trim().to_ascii_lowercase(), strategy);
        self
    }

    pub fn resolve(&self, tag: &str) -> Result<Arc<dyn FieldStrategy>, FieldError> {
        self.strategies
            .get(&tag.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| FieldError::UnknownFieldType(tag.to_string()))
    }

    /// Resolve the strategy for `spec` and check its value up front
    pub fn prepare(&self, spec: &FieldSpec) -> Result<Arc<dyn FieldStrategy>, FieldError> {
        let strategy = self.resolve(&spec.field_type)?;
        strategy
            .check_value(&spec.value)
            .map_err(|reason| FieldError::InvalidValue {
                field_type: spec.type_key(),
                reason,
            })?;
        Ok(strategy)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.strategies
            .contains_key(&tag.trim().to_ascii_lowercase())
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.strategies.keys().cloned().collect();
        tags.sort();
        tags
    }
}

impl std::fmt::Debug for FieldStrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldStrategyRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpilot_core_types::Locator;

    #[test]
    fn builtin_tags_resolve_case_insensitively() {
        let registry = FieldStrategyRegistry::with_builtins();
        assert_eq!(registry.resolve("INPUT").unwrap().name(), "text");
        assert_eq!(registry.resolve(" Checkbox ").unwrap().name(), "checkbox");
        assert_eq!(registry.resolve("textarea").unwrap().name(), "textarea");
        assert_eq!(
            registry.tags(),
            vec!["checkbox", "input", "radio", "select", "text", "textarea"]
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let registry = FieldStrategyRegistry::with_builtins();
        let err = registry.resolve("slider").err().unwrap();
        assert_eq!(err, FieldError::UnknownFieldType("slider".into()));
        assert!(err.to_string().contains("Invalid field_type"));
    }

    #[test]
    fn prepare_checks_value() {
        let registry = FieldStrategyRegistry::with_builtins();
        let spec = FieldSpec::new(Locator::id("agree"), "checkbox", "perhaps");
        assert!(matches!(
            registry.prepare(&spec),
            Err(FieldError::InvalidValue { .. })
        ));

        let spec = FieldSpec::new(Locator::id("email"), "input", true);
        assert!(registry.prepare(&spec).is_err());

        let spec = FieldSpec::new(Locator::id("email"), "input", "a@b.c");
        assert!(registry.prepare(&spec).is_ok());
    }
}
