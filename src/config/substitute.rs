//! `${VAR}` placeholder expansion over a parsed document

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubstituteError {
    #[error("Environment variable {0} not found")]
    MissingVariable(String),
}

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static placeholder pattern")
    })
}

/// Expand placeholders in one string. Returns `None` when it had none.
pub fn expand(
    text: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<String>, SubstituteError> {
    if !placeholder().is_match(text) {
        return Ok(None);
    }
    let mut missing = None;
    let expanded = placeholder().replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        match lookup(name) {
            Some(value) => value,
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(SubstituteError::MissingVariable(name)),
        None => Ok(Some(expanded.into_owned())),
    }
}

/// Expand every string in `doc` in place.
///
/// Returns the JSON pointers of the strings that contained a placeholder,
/// so callers can mark the values they came from as sensitive.
pub fn resolve(
    doc: &mut Value,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Vec<String>, SubstituteError> {
    let mut touched = Vec::new();
    walk(doc, String::new(), lookup, &mut touched)?;
    Ok(touched)
}

fn walk(
    node: &mut Value,
    pointer: String,
    lookup: &dyn Fn(&str) -> Option<String>,
    touched: &mut Vec<String>,
) -> Result<(), SubstituteError> {
    match node {
        Value::String(text) => {
            if let Some(expanded) = expand(text, lookup)? {
                *text = expanded;
                touched.push(pointer);
            }
        }
        Value::Array(items) => {
            for (idx, item) in items.iter_mut().enumerate() {
                walk(item, format!("{}/{}", pointer, idx), lookup, touched)?;
            }
        }
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                walk(item, format!("{}/{}", pointer, escape(key)), lookup, touched)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn expands_embedded_placeholders() {
        let lookup = env(&[("HOST", "https://example.com")]);
        let out = expand("${HOST}/form?x=1", &lookup).unwrap();
        assert_eq!(out.as_deref(), Some("https://example.com/form?x=1"));
        assert_eq!(expand("plain", &lookup).unwrap(), None);
    }

    #[test]
    fn missing_variable_is_named() {
        let lookup = env(&[]);
        let err = expand("${MISSING_VAR}/form", &lookup).unwrap_err();
        assert_eq!(err.to_string(), "Environment variable MISSING_VAR not found");
    }

    #[test]
    fn resolve_reports_touched_pointers() {
        let lookup = env(&[("PASSWORD", "secret123")]);
        let mut doc = json!({
            "url": "https://example.com",
            "fields": [
                {"selector": "user", "value": "bob"},
                {"selector": "pass", "value": "${PASSWORD}"}
            ]
        });
        let touched = resolve(&mut doc, &lookup).unwrap();
        assert_eq!(touched, vec!["/fields/1/value".to_string()]);
        assert_eq!(doc["fields"][1]["value"], "secret123");
    }

    #[test]
    fn non_string_nodes_are_left_alone() {
        let lookup = env(&[]);
        let mut doc = json!({"wait_after_fill": 2, "required": false, "x": null});
        assert!(resolve(&mut doc, &lookup).unwrap().is_empty());
        assert_eq!(doc["wait_after_fill"], 2);
    }
}
