//! Config Integration Tests
//!
//! Loading registries and operator overrides from JSON, TOML and YAML files.

use std::io::Write;
use tempfile::NamedTempFile;

use searchql::{ConfigError, FilterType, InvalidReason, Operator, SearchConfig, Token};

const REGISTRY_TOML: &str = r#"
[options]
validate_keys = true

[fields.status]
type = "text"

[fields.duration]
type = "duration"
aggregatable = true
aggregate_functions = ["p95", "avg"]

[functions.count]
return_type = "number"
"#;

fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    write!(file, "{content}").expect("write temp file");
    file
}

#[test]
fn test_toml_config_drives_parser() {
    let file = write_temp(".toml", REGISTRY_TOML);
    let config = SearchConfig::load(file.path()).expect("load config");
    let parser = config.parser().expect("build parser");

    let result = parser.parse("status:open duration:>1s p95(duration):<2s unknown:1");
    let filters: Vec<&Token> = result.filters().collect();
    assert_eq!(filters.len(), 4);
    assert!(filters[0].invalid().is_none());
    assert!(filters[1].invalid().is_none());
    assert!(filters[2].invalid().is_none());
    assert_eq!(
        filters[3].invalid().map(|i| i.reason),
        Some(InvalidReason::UnknownKey)
    );
}

#[test]
fn test_detects_format_without_extension() {
    let yaml = "fields:\n  level:\n    type: text\noptions:\n  allow_boolean: false\n";
    let file = write_temp(".conf", yaml);
    let config = SearchConfig::load(file.path()).expect("load yaml config");
    assert!(!config.options.allow_boolean);
    assert_eq!(
        config.registry().field("level").map(|d| d.field_type),
        Some(FilterType::Text)
    );

    let json = r#"{"filter_types": {"date": {"operators": ["is", ">", "is not"]}}}"#;
    let file = write_temp("", json);
    let config = SearchConfig::load(file.path()).expect("load json config");
    let types = config.type_config().unwrap();
    assert!(types.operators_for(&[FilterType::Date]).contains(&Operator::NotEqual));
}

#[test]
fn test_bad_type_name_fails_at_load() {
    let file = write_temp(".json", r#"{"filter_types": {"money": {"operators": ["is"]}}}"#);
    let err = SearchConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownType(ref name) if name == "money"));
}

#[test]
fn test_malformed_file_reports_format_error() {
    let file = write_temp(".toml", "[fields.status\ntype = \"text\"\n");
    let err = SearchConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "unexpected error: {err}");

    let file = write_temp(".yaml", "fields:\n  status:\n    type: colour\n");
    let err = SearchConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)), "unexpected error: {err}");
}
