//! Configuration DSL
//!
//! Projections can be written as YAML documents. Mappers, wrappers and
//! output constructors are referred to by name and resolved through a
//! [`Registry`].
//!
//! ```yaml
//! constructor: issue
//! keep_original: false
//! fields:
//!   - name: title
//!     selector: [fields, summary]
//!     mandatory: true
//!     mapper: trim
//!   - name: created
//!     selector: [fields, created]
//!     wrapper: date
//!   - name: comments
//!     selector: [fields, comments]
//!     config:
//!       fields:
//!         - name: author
//!           mandatory: true
//! ```

use crate::config::{Config, FieldDescriptor};
use crate::registry::Registry;
use crate::selector::Selector;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Serialized form of a [`Config`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Registered constructor applied to the assembled output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor: Option<String>,

    #[serde(default)]
    pub keep_original: bool,

    #[serde(default)]
    pub fields: Vec<FieldFile>,
}

/// Serialized form of a [`FieldDescriptor`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FieldFile {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,

    #[serde(default)]
    pub mandatory: bool,

    /// `default: null` is a real default; omitting the key means none.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapper: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Box<ConfigFile>>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl ConfigFile {
    /// Resolve names against `registry` and build a runtime configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when a mapper or constructor name is not registered.
    pub fn resolve(&self, registry: &Registry) -> Result<Config> {
        let mut config = Config::new().keep_original(self.keep_original);
        if let Some(name) = &self.constructor {
            config = config.with_constructor_shared(registry.constructor(name)?);
        }
        for field in &self.fields {
            config = config.with_field(field.resolve(registry)?);
        }
        Ok(config)
    }
}

impl FieldFile {
    fn resolve(&self, registry: &Registry) -> Result<FieldDescriptor> {
        let mut field = FieldDescriptor::new(self.name.clone());
        field.selector.clone_from(&self.selector);
        field.mandatory = self.mandatory;
        field.default.clone_from(&self.default);
        if let Some(name) = &self.mapper {
            field = field.mapper_shared(registry.mapper(name)?);
        }
        if let Some(name) = &self.wrapper {
            field = field.wrapper_shared(registry.constructor(name)?);
        }
        if let Some(nested) = &self.config {
            field = field.nested_shared(Arc::new(nested.resolve(registry)?));
        }
        Ok(field)
    }
}

/// Parser for configuration documents.
pub struct ConfigDsl;

impl ConfigDsl {
    /// Parse a YAML document into its serialized form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the YAML is invalid or has unknown keys.
    pub fn load(yaml: &str) -> Result<ConfigFile> {
        serde_yaml::from_str(yaml).map_err(|e| parse_error(&e))
    }

    /// Parse a YAML document and resolve it against `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error when parsing, name resolution or validation fails.
    pub fn parse(yaml: &str, registry: &Registry) -> Result<Config> {
        let file = Self::load(yaml)?;
        let config = file.resolve(registry)?;
        config.validate()?;
        debug!(fields = config.fields.len(), "parsed projection config");
        Ok(config)
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn parse_file(path: &Path, registry: &Registry) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, registry)
    }

    /// Serialize a configuration document to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization fails.
    pub fn to_yaml(file: &ConfigFile) -> Result<String> {
        serde_yaml::to_string(file).map_err(|e| Error::Serialize(e.to_string()))
    }
}

/// Convert a YAML error, moving its position out of the message text.
fn parse_error(err: &serde_yaml::Error) -> Error {
    let text = err.to_string();
    let Some(location) = err.location() else {
        return Error::parse(format!("Failed to parse config: {text}"));
    };
    let (line, column) = (location.line(), location.column());
    let suffix = format!(" at line {line} column {column}");
    let message = text.strip_suffix(suffix.as_str()).unwrap_or(&text);
    Error::Parse {
        message: format!("Failed to parse config: {message}"),
        line: Some(line),
        column: Some(column),
    }
}
