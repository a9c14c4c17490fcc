use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use workbench_core::config::{ENV_BASE_URL, ENV_LOG, ENV_STATE, ENV_VARIABLES};
use workbench_core::{ConfigError, VariablesSyntax, WorkbenchConfig};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = WorkbenchConfig::from_toml_str(
        r#"
        base_url = "https://wb.example.org/app/"
        variables_syntax = "expression"
        "#,
    )
    .unwrap();

    assert_eq!(config.base_url, "https://wb.example.org/app/");
    assert_eq!(config.variables_syntax, VariablesSyntax::Expression);
    assert_eq!(config.log_filter, "info");
    assert_eq!(config.default_template, "Hello, {{ name }}!");
}

#[test]
fn test_env_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "log_filter = \"warn\"\nstate_path = \"/tmp/a.json\"\n").unwrap();

    let config = WorkbenchConfig::load_from(
        Some(&path),
        env(&[
            (ENV_LOG, "workbench_core=debug"),
            (ENV_BASE_URL, "http://127.0.0.1:8000/"),
            (ENV_VARIABLES, "JSON"),
        ]),
    )
    .unwrap();

    assert_eq!(config.log_filter, "workbench_core=debug");
    assert_eq!(config.base_url, "http://127.0.0.1:8000/");
    assert_eq!(config.state_path, Some(PathBuf::from("/tmp/a.json")));
    assert_eq!(config.variables_syntax, VariablesSyntax::Json);
    assert_eq!(
        config.resolved_log_path(),
        Some(PathBuf::from("/tmp/workbench.log"))
    );
}

#[test]
fn test_empty_state_env_disables_persistence() {
    let config = WorkbenchConfig::load_from(None, env(&[(ENV_STATE, "")])).unwrap();
    assert_eq!(config.state_path, None);
    assert_eq!(config.resolved_log_path(), None);
}

#[test]
fn test_invalid_values_are_rejected() {
    let err = WorkbenchConfig::load_from(None, env(&[(ENV_VARIABLES, "yaml")])).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidValue { key: "variables_syntax", .. }
    ));

    let config = WorkbenchConfig {
        base_url: "not a url".into(),
        ..WorkbenchConfig::default()
    };
    assert!(config.location().is_err());

    assert!(matches!(
        WorkbenchConfig::from_toml_str("variables_syntax = 3"),
        Err(ConfigError::Toml(_))
    ));
}
