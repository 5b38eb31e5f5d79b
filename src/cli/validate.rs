use std::path::{Path, PathBuf};

use action_fields::FieldStrategyRegistry;
use action_flow::{preflight::build_plan, ExecutionPlan};
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::cli::output::{render_structured, OutputFormat};
use crate::config::{ConfigLoader, LoadedConfig};

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Form configuration file (.yaml, .yml or .json)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// What a validated configuration will make the engine do
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub file: PathBuf,
    pub url: String,
    pub fields: usize,
    pub field_types: Vec<String>,
    pub strategies: Vec<&'static str>,
    pub sensitive_fields: usize,
    pub optional_fields: usize,
    pub submit: Option<String>,
    pub success_condition: Option<String>,
    pub retry_max_attempts: u32,
    pub screenshot_dir: Option<PathBuf>,
}

impl ValidationReport {
    pub fn new(file: &Path, loaded: &LoadedConfig, plan: &ExecutionPlan) -> Self {
        let form = &loaded.form;
        Self {
            file: file.to_path_buf(),
            url: form.url.clone(),
            fields: plan.field_count(),
            field_types: form.fields.iter().map(|field| field.type_key()).collect(),
            strategies: plan.strategy_names(),
            sensitive_fields: form.fields.iter().filter(|field| field.sensitive).count(),
            optional_fields: form.fields.iter().filter(|field| !field.required).count(),
            submit: form.submit.as_ref().map(|locator| locator.to_string()),
            success_condition: plan.condition(),
            retry_max_attempts: loaded.retry.max_attempts,
            screenshot_dir: form.screenshot_dir.clone(),
        }
    }
}

pub async fn cmd_validate(args: ValidateArgs, output: OutputFormat) -> Result<()> {
    let loaded = ConfigLoader::new().load_from_path(&args.file).await?;
    let registry = FieldStrategyRegistry::with_builtins();
    let plan = build_plan(&loaded.form, &registry, &loaded.retry)
        .with_context(|| format!("pre-flight check failed for {}", args.file.display()))?;
    info!(file = %args.file.display(), fields = plan.field_count(), "Configuration is valid");

    let report = ValidationReport::new(&args.file, &loaded, &plan);
    match render_structured(&output, &report)? {
        Some(rendered) => println!("{}", rendered),
        None => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    println!("Configuration OK: {}", report.file.display());
    println!("  URL:               {}", report.url);
    println!(
        "  Fields:            {} ({})",
        report.fields,
        report.field_types.join(", ")
    );
    if report.optional_fields > 0 {
        println!("  Optional:          {}", report.optional_fields);
    }
    if report.sensitive_fields > 0 {
        println!("  Sensitive:         {}", report.sensitive_fields);
    }
    println!(
        "  Submit:            {}",
        report.submit.as_deref().unwrap_or("none")
    );
    println!(
        "  Success condition: {}",
        report.success_condition.as_deref().unwrap_or("none")
    );
    println!("  Retry attempts:    {}", report.retry_max_attempts);
    if let Some(dir) = &report.screenshot_dir {
        println!("  Screenshots:       {}", dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn report_summarises_plan() {
        let loaded = ConfigLoader::new()
            .with_env(|name| (name == "PW").then(|| "s3cret".to_string()))
            .load_from_str(
                r#"
url: https://example.com/login
fields:
  - selector: user
    value: alice
  - selector: pw
    value: "${PW}"
  - selector: terms
    field_type: checkbox
    value: true
    required: false
submit_selector: "button[type=submit]"
submit_selector_type: css
success_condition:
  type: url-contains
  value: /dashboard
"#,
                ConfigFormat::Yaml,
            )
            .unwrap();
        let plan = build_plan(
            &loaded.form,
            &FieldStrategyRegistry::with_builtins(),
            &loaded.retry,
        )
        .unwrap();

        let report = ValidationReport::new(Path::new("login.yaml"), &loaded, &plan);
        assert_eq!(report.fields, 3);
        assert_eq!(report.field_types, vec!["input", "input", "checkbox"]);
        assert_eq!(report.strategies, vec!["text", "text", "checkbox"]);
        assert_eq!(report.sensitive_fields, 1);
        assert_eq!(report.optional_fields, 1);
        assert_eq!(report.submit.as_deref(), Some("css=button[type=submit]"));
        assert!(report.success_condition.unwrap().contains("/dashboard"));
    }
}
