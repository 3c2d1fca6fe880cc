//! Configuration loading and validation tests
//!
//! Tests focus on observable outcomes of loading a TOML file: defaults,
//! overrides, validation failures and model identifier resolution.

use compliance_screener::config::{ConfigError, LlmProviderKind, ServiceConfig};
use compliance_screener::screening::ReportMode;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let temp_file = write_config(
        r#"
[server]
host = "127.0.0.1"
port = 9000
max_body_bytes = 4096

[llm]
provider = "anthropic"
model = "claude-3-5-sonnet-20241022"
api_key_env = "SCREENER_TEST_KEY"
temperature = 0.3
max_tokens = 2048
timeout_secs = 30

[pipeline]
report_mode = "combined"
"#,
    );

    let config = ServiceConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.max_body_bytes, 4096);
    assert_eq!(config.llm.provider, Some(LlmProviderKind::Anthropic));
    assert_eq!(
        config.llm.model.as_deref(),
        Some("claude-3-5-sonnet-20241022")
    );
    assert_eq!(config.llm.api_key_env.as_deref(), Some("SCREENER_TEST_KEY"));
    assert_eq!(config.llm.temperature, Some(0.3));
    assert_eq!(config.llm.max_tokens, Some(2048));
    assert_eq!(config.llm.timeout_secs, 30);
    assert_eq!(config.pipeline.report_mode, ReportMode::Combined);
    assert_eq!(config.bind_address(), "127.0.0.1:9000");
}

#[test]
fn test_empty_file_yields_defaults() {
    let temp_file = write_config("");

    let config = ServiceConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config, ServiceConfig::default());
    assert_eq!(config.bind_address(), "0.0.0.0:8000");
    assert_eq!(config.server.max_body_bytes, 65536);
    assert_eq!(config.llm.model_env, "MODEL_NAME");
    assert_eq!(config.llm.timeout_secs, 120);
    assert_eq!(config.pipeline.report_mode, ReportMode::FinalStage);
}

#[test]
fn test_partial_sections_keep_other_defaults() {
    let temp_file = write_config(
        r#"
[server]
port = 8088
"#,
    );

    let config = ServiceConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.server.port, 8088);
    assert_eq!(config.server.host, "0.0.0.0");
    assert!(config.llm.model.is_none());
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let result = ServiceConfig::load_from_file(&path);

    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let temp_file = write_config("[server\nport = ");

    let result = ServiceConfig::load_from_file(temp_file.path());

    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_unknown_provider_is_parse_error() {
    let temp_file = write_config(
        r#"
[llm]
provider = "mystery"
"#,
    );

    let result = ServiceConfig::load_from_file(temp_file.path());

    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_out_of_range_temperature_is_rejected() {
    let temp_file = write_config(
        r#"
[llm]
temperature = 3.5
"#,
    );

    match ServiceConfig::load_from_file(temp_file.path()) {
        Err(ConfigError::InvalidConfig(msg)) => assert!(msg.contains("temperature")),
        other => panic!("Expected InvalidConfig, got {other:?}"),
    }
}

#[test]
fn test_zero_body_limit_is_rejected() {
    let temp_file = write_config(
        r#"
[server]
max_body_bytes = 0
"#,
    );

    assert!(matches!(
        ServiceConfig::load_from_file(temp_file.path()),
        Err(ConfigError::InvalidConfig(_))
    ));
}

#[test]
fn test_model_resolved_from_custom_environment_variable() {
    let temp_file = write_config(
        r#"
[llm]
model_env = "SCREENER_MODEL"
"#,
    );
    let config = ServiceConfig::load_from_file(temp_file.path()).unwrap();

    let resolved = config
        .llm
        .resolve_model_with(|name| (name == "SCREENER_MODEL").then(|| "anthropic/claude-3-haiku".to_string()))
        .unwrap();

    assert_eq!(resolved.provider, LlmProviderKind::Anthropic);
    assert_eq!(resolved.model, "claude-3-haiku");
}

#[test]
fn test_unset_model_fails_resolution_naming_variable() {
    let config = ServiceConfig::default();

    match config.llm.resolve_model_with(|_| None) {
        Err(ConfigError::EnvVarNotFound(name)) => assert_eq!(name, "MODEL_NAME"),
        other => panic!("Expected EnvVarNotFound, got {other:?}"),
    }
}

#[test]
fn test_api_key_read_from_configured_variable() {
    let temp_file = write_config(
        r#"
[llm]
api_key_env = "SCREENER_CONFIG_TEST_API_KEY"
"#,
    );
    let config = ServiceConfig::load_from_file(temp_file.path()).unwrap();

    std::env::set_var("SCREENER_CONFIG_TEST_API_KEY", "sk-test");
    let key = config.llm.get_api_key(LlmProviderKind::OpenAi).unwrap();
    std::env::remove_var("SCREENER_CONFIG_TEST_API_KEY");

    assert_eq!(key, "sk-test");
}

#[test]
fn test_missing_api_key_names_variable() {
    let temp_file = write_config(
        r#"
[llm]
api_key_env = "SCREENER_CONFIG_TEST_ABSENT_KEY"
"#,
    );
    let config = ServiceConfig::load_from_file(temp_file.path()).unwrap();

    match config.llm.get_api_key(LlmProviderKind::Anthropic) {
        Err(ConfigError::EnvVarNotFound(name)) => {
            assert_eq!(name, "SCREENER_CONFIG_TEST_ABSENT_KEY")
        }
        other => panic!("Expected EnvVarNotFound, got {other:?}"),
    }
}

#[test]
fn test_config_round_trips_through_pretty_toml() {
    let temp_file = write_config(
        r#"
[llm]
model = "gpt-4o"

[pipeline]
report_mode = "combined"
"#,
    );
    let config = ServiceConfig::load_from_file(temp_file.path()).unwrap();

    let rendered = toml::to_string_pretty(&config).unwrap();
    let reparsed = ServiceConfig::from_toml_str(&rendered).unwrap();

    assert_eq!(reparsed, config);
}

#[test]
fn test_example_config_is_valid() {
    let config = ServiceConfig::from_toml_str(include_str!("../screener.example.toml")).unwrap();

    assert_eq!(config.server.port, 8000);
    assert_eq!(config.llm.model_env, "MODEL_NAME");
    assert_eq!(config.pipeline.report_mode, ReportMode::FinalStage);
}
