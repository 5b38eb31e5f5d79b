use std::fmt;
use std::path::Path;

use action_fields::{FieldSpec, FieldStrategyRegistry};
use action_flow::FormConfig;
use action_primitives::RetryPolicy;
use anyhow::{bail, Context, Result};
use formpilot_core_types::Locator;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};
use url::Url;

use super::schema::{selector_kind, FileConfig, FileField, DEFAULT_FIELD_TYPE};
use super::substitute;

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

const REQUIRED_KEYS: [&str; 2] = ["url", "fields"];
const REQUIRED_FIELD_KEYS: [&str; 2] = ["selector", "value"];
const URL_SCHEMES: [&str; 3] = ["http", "https", "file"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => bail!(
                "Unsupported configuration format for {} (expected .yaml, .yml or .json)",
                path.display()
            ),
        }
    }
}

/// A validated form plus the retry policy it asked for
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub form: FormConfig,
    pub retry: RetryPolicy,
}

impl LoadedConfig {
    /// File layout with sensitive values masked
    pub fn redacted(&self) -> FileConfig {
        FileConfig::from_form(&self.form.redacted(), &self.retry)
    }
}

/// Reads YAML/JSON form descriptions into [`FormConfig`]
pub struct ConfigLoader {
    env: EnvLookup,
    registry: FieldStrategyRegistry,
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("field_types", &self.registry.tags())
            .finish_non_exhaustive()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader reading placeholders from the process environment
    pub fn new() -> Self {
        Self {
            env: Box::new(|name| std::env::var(name).ok()),
            registry: FieldStrategyRegistry::with_builtins(),
        }
    }

    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    /// Accept the field types of `registry` instead of the built-in ones
    pub fn with_registry(mut self, registry: FieldStrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub async fn load_from_path(&self, path: &Path) -> Result<LoadedConfig> {
        let format = ConfigFormat::from_path(path)?;
        self.load_file(path, format).await
    }

    pub async fn load_from_yaml(&self, path: &Path) -> Result<LoadedConfig> {
        self.load_file(path, ConfigFormat::Yaml).await
    }

    pub async fn load_from_json(&self, path: &Path) -> Result<LoadedConfig> {
        self.load_file(path, ConfigFormat::Json).await
    }

    async fn load_file(&self, path: &Path, format: ConfigFormat) -> Result<LoadedConfig> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let loaded = self
            .load_from_str(&contents, format)
            .with_context(|| format!("loading {}", path.display()))?;
        info!(
            path = %path.display(),
            fields = loaded.form.fields.len(),
            "Loaded form configuration"
        );
        Ok(loaded)
    }

    pub fn load_from_str(&self, contents: &str, format: ConfigFormat) -> Result<LoadedConfig> {
        let mut doc: Value = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(contents).context("Invalid YAML")?,
            ConfigFormat::Json => serde_json::from_str(contents).context("Invalid JSON")?,
        };
        let substituted = substitute::resolve(&mut doc, &*self.env)?;
        debug!(placeholders = substituted.len(), "Substituted environment placeholders");

        check_required(&doc)?;
        let file: FileConfig = serde_json::from_value(doc).context("Invalid configuration")?;
        self.build(file, &substituted)
    }

    fn build(&self, file: FileConfig, substituted: &[String]) -> Result<LoadedConfig> {
        let url = file.url.trim();
        if url.is_empty() {
            bail!("URL cannot be empty");
        }
        match Url::parse(url) {
            Ok(parsed) if URL_SCHEMES.contains(&parsed.scheme()) => {}
            _ => bail!("Invalid URL format: {}", url),
        }
        if file.fields.is_empty() {
            bail!("At least one field must be specified");
        }

        let mut form = FormConfig::new(url);
        for (index, raw) in file.fields.into_iter().enumerate() {
            let sensitive = substituted.contains(&format!("/fields/{}/value", index));
            let spec = self
                .build_field(raw, sensitive)
                .with_context(|| format!("field #{}", index + 1))?;
            form = form.with_field(spec);
        }

        if let Some(selector) = file.submit_selector {
            if selector.trim().is_empty() {
                bail!("Selector cannot be empty");
            }
            let kind = selector_kind(file.submit_selector_type.as_deref())?;
            form = form.with_submit(Locator::new(selector, kind));
        }
        if let Some(wait) = &file.wait_after_fill {
            form = form.with_wait_after_fill(wait.to_duration()?);
        }
        if let Some(timeout) = &file.page_load_timeout {
            form = form.with_page_load_timeout(timeout.to_duration()?);
        }
        if let Some(condition) = file.success_condition {
            form = form.with_success_condition(
                condition
                    .into_condition()
                    .context("Invalid success_condition")?,
            );
        }
        if let Some(dir) = file.screenshot_dir {
            form = form.with_screenshot_dir(dir);
        }

        let retry = match file.retry {
            Some(retry) => retry.into_policy().context("Invalid retry policy")?,
            None => RetryPolicy::default(),
        };

        Ok(LoadedConfig { form, retry })
    }

    fn build_field(&self, raw: FileField, sensitive: bool) -> Result<FieldSpec> {
        if raw.selector.trim().is_empty() {
            bail!("Selector cannot be empty");
        }
        let kind = selector_kind(raw.selector_type.as_deref())?;

        let field_type = raw
            .field_type
            .unwrap_or_else(|| DEFAULT_FIELD_TYPE.to_string());
        let tag = field_type.trim().to_ascii_lowercase();
        if !self.registry.contains(&tag) {
            bail!(
                "Invalid field_type: {} (expected one of {})",
                field_type,
                self.registry.tags().join(", ")
            );
        }

        let value = raw.value.into_field_value();
        if value.is_bool() && !matches!(tag.as_str(), "checkbox" | "radio") {
            bail!("Boolean values only allowed for checkbox and radio fields");
        }

        let mut spec = FieldSpec::new(Locator::new(raw.selector, kind), field_type, value);
        if raw.required == Some(false) {
            spec = spec.optional();
        }
        if let Some(select_by) = raw.select_by {
            spec = spec.with_select_by(select_by);
        }
        if sensitive {
            spec = spec.sensitive();
        }
        Ok(spec)
    }

    pub async fn save_to_yaml(&self, config: &LoadedConfig, path: &Path) -> Result<()> {
        let file = FileConfig::from_form(&config.form, &config.retry);
        let rendered = serde_yaml::to_string(&file)?;
        write_config(path, rendered).await
    }

    pub async fn save_to_json(&self, config: &LoadedConfig, path: &Path) -> Result<()> {
        let file = FileConfig::from_form(&config.form, &config.retry);
        let rendered = serde_json::to_string_pretty(&file)?;
        write_config(path, rendered).await
    }
}

async fn write_config(path: &Path, rendered: String) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, rendered)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Saved form configuration");
    Ok(())
}

/// Key presence checks that typed decoding would report less clearly
fn check_required(doc: &Value) -> Result<()> {
    let Some(root) = doc.as_object() else {
        bail!("Configuration must be a mapping");
    };
    for key in REQUIRED_KEYS {
        if !root.contains_key(key) {
            bail!("Missing required field: {}", key);
        }
    }
    let Some(fields) = root.get("fields").and_then(Value::as_array) else {
        bail!("fields must be a list");
    };
    for field in fields {
        let Some(field) = field.as_object() else {
            bail!("Each field must be a mapping");
        };
        for key in REQUIRED_FIELD_KEYS {
            if !field.contains_key(key) {
                bail!("Field missing required property: {}", key);
            }
        }
        if field.get("value").is_some_and(Value::is_null) {
            bail!("Value cannot be None");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::SelectBy;
    use formpilot_core_types::{FieldValue, SelectorKind};
    use std::collections::HashMap;
    use std::time::Duration;

    fn loader(vars: &[(&str, &str)]) -> ConfigLoader {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigLoader::new().with_env(move |name| vars.get(name).cloned())
    }

    fn yaml_err(contents: &str) -> String {
        let err = loader(&[])
            .load_from_str(contents, ConfigFormat::Yaml)
            .unwrap_err();
        format!("{:#}", err)
    }

    const MINIMAL: &str = r#"
url: "https://example.com"
fields:
  - selector: "test"
    value: "test"
"#;

    #[tokio::test]
    async fn yaml_with_env_substitution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
url: "${TEST_URL}/form"
fields:
  - selector: "username"
    value: "testuser"
    selector_type: "id"
    field_type: "input"
  - selector: "password"
    value: "${TEST_PASSWORD}"
    selector_type: "id"
    field_type: "input"
submit_selector: "submit_btn"
wait_after_fill: 2
"#,
        )
        .unwrap();

        let loaded = loader(&[("TEST_PASSWORD", "secret123"), ("TEST_URL", "https://example.com")])
            .load_from_path(&path)
            .await
            .unwrap();
        let form = &loaded.form;
        assert_eq!(form.url, "https://example.com/form");
        assert_eq!(form.fields.len(), 2);
        assert_eq!(form.fields[0].value, FieldValue::text("testuser"));
        assert!(!form.fields[0].sensitive);
        assert_eq!(form.fields[1].value, FieldValue::text("secret123"));
        assert!(form.fields[1].sensitive);
        assert_eq!(form.submit, Some(Locator::id("submit_btn")));
        assert_eq!(form.wait_after_fill(), Duration::from_secs(2));
        assert_eq!(loaded.retry, RetryPolicy::default());
    }

    #[test]
    fn missing_env_variable_is_reported() {
        let err = yaml_err("url: \"${MISSING_VAR}/form\"\nfields: []\n");
        assert!(err.contains("Environment variable MISSING_VAR not found"), "{}", err);
    }

    #[test]
    fn missing_top_level_keys() {
        let err = yaml_err("url: \"https://example.com\"\n");
        assert!(err.contains("Missing required field: fields"), "{}", err);
        let err = yaml_err("fields: []\n");
        assert!(err.contains("Missing required field: url"), "{}", err);
    }

    #[test]
    fn field_missing_value() {
        let err = yaml_err(
            "url: https://example.com\nfields:\n  - selector: test\n    selector_type: id\n",
        );
        assert!(err.contains("Field missing required property: value"), "{}", err);
    }

    #[test]
    fn null_value_is_rejected() {
        let err = yaml_err("url: https://example.com\nfields:\n  - selector: test\n    value:\n");
        assert!(err.contains("Value cannot be None"), "{}", err);
    }

    #[tokio::test]
    async fn json_with_env_substitution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "url": "https://api.example.com",
                "fields": [
                    {
                        "selector": "api_key",
                        "value": "${API_KEY}",
                        "selector_type": "name",
                        "field_type": "input"
                    }
                ]
            }"#,
        )
        .unwrap();

        let loaded = loader(&[("API_KEY", "abc123")])
            .load_from_json(&path)
            .await
            .unwrap();
        let field = &loaded.form.fields[0];
        assert_eq!(field.value, FieldValue::text("abc123"));
        assert_eq!(field.locator.kind, SelectorKind::Name);
        assert!(field.sensitive);
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let original = LoadedConfig {
            form: FormConfig::new("https://test.com")
                .with_field(FieldSpec::new(Locator::id("test_field"), "input", "test_value"))
                .with_field(
                    FieldSpec::new(Locator::css("#country"), "select", "Canada")
                        .with_select_by(SelectBy::Text)
                        .optional(),
                )
                .with_submit(Locator::id("submit")),
            retry: RetryPolicy::default(),
        };
        let loader = loader(&[]);

        let yaml = dir.path().join("nested").join("test_config.yaml");
        loader.save_to_yaml(&original, &yaml).await.unwrap();
        assert_eq!(loader.load_from_yaml(&yaml).await.unwrap(), original);

        let json = dir.path().join("test_config.json");
        loader.save_to_json(&original, &json).await.unwrap();
        assert_eq!(loader.load_from_path(&json).await.unwrap(), original);
    }

    #[test]
    fn integer_value_is_coerced() {
        let loaded = loader(&[])
            .load_from_str(
                "url: https://example.com\nfields:\n  - selector: age\n    value: 42\n",
                ConfigFormat::Yaml,
            )
            .unwrap();
        assert_eq!(loaded.form.fields[0].value, FieldValue::text("42"));
        assert_eq!(loaded.form.fields[0].field_type, "input");
    }

    #[test]
    fn boolean_allowed_for_checkbox_only() {
        let ok = loader(&[]).load_from_str(
            "url: https://example.com\nfields:\n  - selector: t\n    value: true\n    field_type: checkbox\n",
            ConfigFormat::Yaml,
        );
        assert_eq!(ok.unwrap().form.fields[0].value, FieldValue::Bool(true));

        let err = yaml_err(
            "url: https://example.com\nfields:\n  - selector: t\n    value: true\n    field_type: input\n",
        );
        assert!(
            err.contains("Boolean values only allowed for checkbox and radio fields"),
            "{}",
            err
        );
    }

    #[test]
    fn invalid_selector_and_field_types() {
        let err = yaml_err(
            "url: https://example.com\nfields:\n  - selector: t\n    value: t\n    selector_type: invalid_type\n",
        );
        assert!(err.contains("Invalid selector_type"), "{}", err);

        let err = yaml_err(
            "url: https://example.com\nfields:\n  - selector: t\n    value: t\n    field_type: invalid_type\n",
        );
        assert!(err.contains("Invalid field_type"), "{}", err);
    }

    #[test]
    fn empty_selector() {
        let err = yaml_err("url: https://example.com\nfields:\n  - selector: \"\"\n    value: t\n");
        assert!(err.contains("Selector cannot be empty"), "{}", err);
    }

    #[test]
    fn url_validation() {
        let err = yaml_err("url: \"\"\nfields: []\n");
        assert!(err.contains("URL cannot be empty"), "{}", err);
        let err = yaml_err("url: not-a-url\nfields: []\n");
        assert!(err.contains("Invalid URL format"), "{}", err);
        let err = yaml_err("url: ftp://example.com\nfields: []\n");
        assert!(err.contains("Invalid URL format"), "{}", err);
    }

    #[test]
    fn empty_field_list() {
        let err = yaml_err("url: https://example.com\nfields: []\n");
        assert!(err.contains("At least one field must be specified"), "{}", err);
    }

    #[test]
    fn negative_wait_time() {
        let err = yaml_err(&format!("{}wait_after_fill: -1\n", MINIMAL));
        assert!(err.contains("Wait times must be non-negative"), "{}", err);
    }

    #[test]
    fn optional_sections() {
        let contents = format!(
            "{}page_load_timeout: 15s\nscreenshot_dir: shots\nsuccess_condition:\n  type: url_contains\n  value: /done\n  timeout: 5\n  poll_interval: 250ms\nretry:\n  max_attempts: 4\n  base_delay: 100ms\n",
            MINIMAL
        );
        let loaded = loader(&[])
            .load_from_str(&contents, ConfigFormat::Yaml)
            .unwrap();
        let form = &loaded.form;
        assert_eq!(form.page_load_timeout(), Duration::from_secs(15));
        assert_eq!(form.screenshot_dir.as_deref(), Some(Path::new("shots")));
        let condition = form.success_condition.as_ref().unwrap();
        assert_eq!(condition.kind.tag(), "url-contains");
        assert_eq!(condition.timeout(), Duration::from_secs(5));
        assert_eq!(condition.poll_interval(), Duration::from_millis(250));
        assert_eq!(loaded.retry.max_attempts, 4);
        assert_eq!(loaded.retry.base_delay_ms, 100);
    }

    #[test]
    fn redacted_view_masks_secrets() {
        let loaded = loader(&[("PW", "hunter2")])
            .load_from_str(
                "url: https://example.com\nfields:\n  - selector: pw\n    value: \"${PW}\"\n",
                ConfigFormat::Yaml,
            )
            .unwrap();
        let rendered = serde_yaml::to_string(&loaded.redacted()).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert!(ConfigFormat::from_path(Path::new("a.toml")).is_err());
    }
}
