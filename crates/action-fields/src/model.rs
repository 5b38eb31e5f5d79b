use action_primitives::{SelectBy, SelectedOption};
use formpilot_core_types::{FieldValue, Locator};
use serde::{Deserialize, Serialize};

use crate::redact;

/// One form field as the engine consumes it. Placeholders are already resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub locator: Locator,
    pub field_type: String,
    pub value: FieldValue,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub select_by: SelectBy,
    /// Value came from a secret and must never be logged in clear.
    #[serde(default)]
    pub sensitive: bool,
}

fn default_required() -> bool {
    true
}

impl FieldSpec {
    pub fn new(locator: Locator, field_type: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            locator,
            field_type: field_type.into(),
            value: value.into(),
            required: true,
            select_by: SelectBy::default(),
            sensitive: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_select_by(mut self, select_by: SelectBy) -> Self {
        self.select_by = select_by;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Registry key for this field's type tag
    pub fn type_key(&self) -> String {
        self.field_type.trim().to_ascii_lowercase()
    }

    /// Human label used in results and events
    pub fn label(&self) -> String {
        self.locator.to_string()
    }

    /// Value as it may appear in logs and events
    pub fn display_value(&self) -> String {
        redact::value(&self.value.to_string(), self.sensitive)
    }
}

/// What a strategy read back from the element after applying a value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AppliedValue {
    Text(String),
    Checked(bool),
    Selection(Option<SelectedOption>),
}

impl AppliedValue {
    /// Rendering for verification failures; honours the field's sensitivity
    pub fn describe(&self, sensitive: bool) -> String {
        match self {
            AppliedValue::Text(text) => redact::value(text, sensitive),
            AppliedValue::Checked(state) => state.to_string(),
            AppliedValue::Selection(Some(option)) => format!(
                "{} ({})",
                redact::value(&option.value, sensitive),
                redact::value(&option.text, sensitive)
            ),
            AppliedValue::Selection(None) => "<no selection>".to_string(),
        }
    }
}
