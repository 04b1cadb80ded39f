//! Configuration loading.
//!
//! A configuration document describes the field registry, overrides for the
//! operator table and the parse options. It can be written in JSON, TOML or
//! YAML; the format comes from the file extension when there is one, and is
//! otherwise detected from the content, trying the likeliest parser first.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

use crate::registry::{FieldDefinition, FieldRegistry, FunctionDefinition};
use crate::syntax::{ParseOptions, QueryParser};
use crate::types::{FilterType, FilterTypeConfig, TypeRule};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unknown filter type '{0}' in filter_types")]
    UnknownType(String),
    #[error("could not determine the configuration format")]
    UnknownFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub fields: BTreeMap<String, FieldDefinition>,
    pub functions: BTreeMap<String, FunctionDefinition>,
    /// Per-type replacements for the default operator table, keyed by type name.
    pub filter_types: BTreeMap<String, TypeRule>,
    pub options: ParseOptions,
}

impl SearchConfig {
    /// Reads a configuration file, choosing the format from its extension
    /// or, failing that, from its content.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let format = ConfigFormat::from_path(path);
        debug!("loading configuration from {} ({:?})", path.display(), format);
        let config = ConfigLoader::new().load_str(&content, format)?;
        // unknown type names fail here, not on first parse
        config.type_config()?;
        Ok(config)
    }

    pub fn from_str_with(input: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        ConfigLoader::new().load_str(input, Some(format))
    }

    pub fn registry(&self) -> FieldRegistry {
        FieldRegistry::from_parts(self.fields.clone(), self.functions.clone())
    }

    /// The default operator table with this configuration's overrides applied.
    pub fn type_config(&self) -> Result<FilterTypeConfig, ConfigError> {
        self.filter_types
            .iter()
            .try_fold(FilterTypeConfig::default(), |config, (name, rule)| {
                let ty: FilterType = name
                    .parse()
                    .map_err(|_| ConfigError::UnknownType(name.clone()))?;
                Ok(config.with_rule(ty, rule.clone()))
            })
    }

    /// A parser for this configuration. An empty registry means keys are
    /// not checked at all.
    pub fn parser(&self) -> Result<QueryParser, ConfigError> {
        let parser = QueryParser::new()
            .with_options(self.options)
            .with_type_config(self.type_config()?);
        let registry = self.registry();
        if registry.is_empty() {
            Ok(parser)
        } else {
            Ok(parser.with_registry(registry))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<ConfigFormat> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(ConfigFormat::Json),
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }

    /// Likely formats for `input`, most likely first.
    pub fn detect(input: &str) -> Vec<ConfigFormat> {
        let trimmed = input.trim_start();
        let mut candidates = Vec::new();

        if trimmed.starts_with('{') {
            candidates.push(ConfigFormat::Json);
        }
        if trimmed.starts_with("---") {
            candidates.push(ConfigFormat::Yaml);
        }
        if Self::is_likely_toml(input) {
            candidates.push(ConfigFormat::Toml);
        }
        if Self::is_likely_yaml(input) && !candidates.contains(&ConfigFormat::Yaml) {
            candidates.push(ConfigFormat::Yaml);
        }
        candidates
    }

    /// `key = value` assignments or `[table]` headers.
    pub fn is_likely_toml(input: &str) -> bool {
        input.lines().take(20).map(str::trim).any(|line| {
            !line.starts_with('#')
                && (line.contains(" = ")
                    || (line.starts_with('[') && line.ends_with(']') && !line.contains(':')))
        })
    }

    /// `key: value` lines or `- item` entries.
    pub fn is_likely_yaml(input: &str) -> bool {
        if input.trim_start().starts_with("---") {
            return true;
        }
        input.lines().take(20).map(str::trim).any(|line| {
            !line.starts_with('#')
                && !line.contains(" = ")
                && (line.ends_with(':') || line.contains(": ") || line.starts_with("- "))
        })
    }
}

/// Reads a [`SearchConfig`] written in one specific format.
pub trait ConfigParser: Send + Sync {
    fn can_parse(&self, input: &str) -> bool;

    fn parse(&self, input: &str) -> Result<SearchConfig, ConfigError>;

    fn format(&self) -> ConfigFormat;

    fn format_name(&self) -> &'static str;
}

pub struct JsonConfigParser;

impl ConfigParser for JsonConfigParser {
    fn can_parse(&self, input: &str) -> bool {
        input.trim_start().starts_with('{')
    }

    fn parse(&self, input: &str) -> Result<SearchConfig, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    fn format(&self) -> ConfigFormat {
        ConfigFormat::Json
    }

    fn format_name(&self) -> &'static str {
        "JSON"
    }
}

pub struct TomlConfigParser;

impl ConfigParser for TomlConfigParser {
    fn can_parse(&self, input: &str) -> bool {
        ConfigFormat::is_likely_toml(input)
    }

    fn parse(&self, input: &str) -> Result<SearchConfig, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    fn format(&self) -> ConfigFormat {
        ConfigFormat::Toml
    }

    fn format_name(&self) -> &'static str {
        "TOML"
    }
}

pub struct YamlConfigParser;

impl ConfigParser for YamlConfigParser {
    fn can_parse(&self, input: &str) -> bool {
        ConfigFormat::is_likely_yaml(input)
    }

    fn parse(&self, input: &str) -> Result<SearchConfig, ConfigError> {
        Ok(serde_yaml::from_str(input)?)
    }

    fn format(&self) -> ConfigFormat {
        ConfigFormat::Yaml
    }

    fn format_name(&self) -> &'static str {
        "YAML"
    }
}

/// Registry of configuration parsers, tried in detection order.
pub struct ConfigLoader {
    parsers: Vec<Box<dyn ConfigParser>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        let mut loader = Self {
            parsers: Vec::new(),
        };
        loader.register(Box::new(JsonConfigParser));
        loader.register(Box::new(TomlConfigParser));
        loader.register(Box::new(YamlConfigParser));
        loader
    }

    pub fn register(&mut self, parser: Box<dyn ConfigParser>) {
        self.parsers.push(parser);
    }

    pub fn supported_formats(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.format_name()).collect()
    }

    /// Parses `input` as `format`, or detects the format when `None`.
    /// Blank input is the default configuration.
    pub fn load_str(
        &self,
        input: &str,
        format: Option<ConfigFormat>,
    ) -> Result<SearchConfig, ConfigError> {
        if input.trim().is_empty() {
            return Ok(SearchConfig::default());
        }

        if let Some(format) = format {
            return self
                .parser_for(format)
                .ok_or(ConfigError::UnknownFormat)?
                .parse(input);
        }

        let mut last_error = None;
        for format in ConfigFormat::detect(input) {
            let Some(parser) = self.parser_for(format) else {
                continue;
            };
            if !parser.can_parse(input) {
                continue;
            }
            match parser.parse(input) {
                Ok(config) => {
                    trace!("configuration detected as {}", parser.format_name());
                    return Ok(config);
                }
                Err(err) => {
                    trace!("{} parser rejected configuration: {err}", parser.format_name());
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(ConfigError::UnknownFormat))
    }

    fn parser_for(&self, format: ConfigFormat) -> Option<&dyn ConfigParser> {
        self.parsers
            .iter()
            .find(|parser| parser.format() == format)
            .map(|parser| parser.as_ref())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
