use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// First eight characters, used to keep artifact names short.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

/// How a selector string is interpreted by the driver.
#[cfg_attr(
    feature = "serde-full",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum SelectorKind {
    #[default]
    Id,
    Css,
    #[cfg_attr(feature = "serde-full", serde(rename = "xpath"))]
    XPath,
    Name,
}

impl SelectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorKind::Id => "id",
            SelectorKind::Css => "css",
            SelectorKind::XPath => "xpath",
            SelectorKind::Name => "name",
        }
    }

    pub fn all() -> [SelectorKind; 4] {
        [
            SelectorKind::Id,
            SelectorKind::Css,
            SelectorKind::XPath,
            SelectorKind::Name,
        ]
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid selector_type: {0} (expected one of id, css, xpath, name)")]
pub struct ParseSelectorKindError(pub String);

impl FromStr for SelectorKind {
    type Err = ParseSelectorKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(SelectorKind::Id),
            "css" | "css_selector" => Ok(SelectorKind::Css),
            "xpath" => Ok(SelectorKind::XPath),
            "name" => Ok(SelectorKind::Name),
            _ => Err(ParseSelectorKindError(s.to_string())),
        }
    }
}

/// Selector plus the strategy used to resolve it.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Locator {
    pub selector: String,
    pub kind: SelectorKind,
}

impl Locator {
    pub fn new(selector: impl Into<String>, kind: SelectorKind) -> Self {
        Self {
            selector: selector.into(),
            kind,
        }
    }

    pub fn id(selector: impl Into<String>) -> Self {
        Self::new(selector, SelectorKind::Id)
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(selector, SelectorKind::Css)
    }

    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::new(selector, SelectorKind::XPath)
    }

    pub fn name(selector: impl Into<String>) -> Self {
        Self::new(selector, SelectorKind::Name)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind, self.selector)
    }
}

/// Value a field is filled with. Secrets are already substituted.
#[cfg_attr(
    feature = "serde-full",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Bool(_) => None,
        }
    }

    /// Booleans, plus the textual forms a config author is likely to write.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(flag) => Some(*flag),
            FieldValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "checked" => Some(true),
                "false" | "off" | "no" | "unchecked" => Some(false),
                _ => None,
            },
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, FieldValue::Bool(_))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(flag) => write!(f, "{}", flag),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_kind_parses_case_insensitively() {
        assert_eq!("ID".parse::<SelectorKind>().unwrap(), SelectorKind::Id);
        assert_eq!("xpath".parse::<SelectorKind>().unwrap(), SelectorKind::XPath);
        assert_eq!(" css ".parse::<SelectorKind>().unwrap(), SelectorKind::Css);

        let err = "invalid_type".parse::<SelectorKind>().unwrap_err();
        assert!(err.to_string().contains("Invalid selector_type"));
    }

    #[test]
    fn field_value_bool_forms() {
        assert_eq!(FieldValue::Bool(true).as_bool(), Some(true));
        assert_eq!(FieldValue::text("On").as_bool(), Some(true));
        assert_eq!(FieldValue::text("false").as_bool(), Some(false));
        assert_eq!(FieldValue::text("maybe").as_bool(), None);
        assert_eq!(FieldValue::Bool(true).as_text(), None);
    }

    #[test]
    fn run_id_short_prefix() {
        let id = RunId("0123456789abcdef".into());
        assert_eq!(id.short(), "01234567");
        assert_eq!(RunId("abc".into()).short(), "abc");
    }

    #[test]
    fn locator_display() {
        assert_eq!(Locator::css("#submit").to_string(), "css=#submit");
        assert_eq!(Locator::name("email").to_string(), "name=email");
    }
}
