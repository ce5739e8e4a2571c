#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # reshape-core
//!
//! Declarative projection engine for nested documents.
//!
//! A [`Config`] lists named fields, each bound to a [`Selector`] into an
//! arbitrary `serde_json::Value`. A [`Transformer`] walks those fields,
//! recursing into nested configurations and arrays of sub-documents, and
//! returns either the projected value or every validation failure it found
//! along the way.
//!
//! ```
//! use reshape_core::{Config, FieldDescriptor, Transformer};
//! use serde_json::json;
//!
//! let config = Config::new()
//!     .with_field(FieldDescriptor::new("name").selector("foo").mandatory())
//!     .with_field(FieldDescriptor::new("count").selector("cnt"));
//! let transformer = Transformer::new(config).unwrap();
//!
//! let out = transformer.transform(&json!({"foo": "asd", "cnt": 2}));
//! assert_eq!(out.unwrap_right(), json!({"name": "asd", "count": 2}));
//! ```

/// Field descriptors and projection configurations.
pub mod config;
/// Caller-supplied constructors used to wrap field values and outputs.
pub mod construct;
/// YAML configuration files.
pub mod dsl;
/// Two-variant result used for accumulated validation failures.
pub mod either;
/// Named mapper and constructor lookup for data-driven configurations.
pub mod registry;
/// Selectors and precomputed path resolution.
pub mod selector;
/// The projection engine.
pub mod transformer;

pub use config::{Config, FieldDescriptor, Mapper};
pub use construct::{Construct, DateConstructor, FnConstructor, TimestampConstructor};
pub use dsl::ConfigDsl;
pub use either::{Either, is_left, is_right, left, mk_left, mk_right, right};
pub use registry::Registry;
pub use selector::{PathResolver, Selector};
pub use transformer::{ORIGINAL_KEY, Transformer};

use thiserror::Error;

/// Errors raised for programmer-contract violations and configuration loading.
///
/// Validation failures found while transforming data are never reported
/// through this type; see [`FieldError`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed configuration at {location}: {reason}")]
    MalformedConfig { location: String, reason: String },

    #[error("Unknown mapper '{0}'")]
    UnknownMapper(String),

    #[error("Unknown constructor '{0}'")]
    UnknownConstructor(String),

    #[error("Config parse error: {message}{}", position(.line, .column))]
    Parse {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },

    #[error("Config serialize error: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Build a malformed-config error for the descriptor at `location`.
    pub fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedConfig {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Build a parse error without position information.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            line: None,
            column: None,
        }
    }
}

fn position(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(col)) => format!(" at line {line}, column {col}"),
        _ => String::new(),
    }
}

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A single validation failure recorded during a transform call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// A mandatory field had no value after extraction, recursion and defaults.
    #[error(
        "Missing mandatory data expected at selector '{selector}'{}",
        for_constructor(.constructor)
    )]
    MissingMandatory {
        field: String,
        selector: Selector,
        constructor: Option<String>,
    },

    /// A wrapper or output constructor refused the value it was given.
    #[error("Constructor '{constructor}' rejected {}: {message}", target(.field))]
    Construction {
        field: Option<String>,
        constructor: String,
        message: String,
    },

    /// The projected value could not be read back as the requested type.
    #[error("Output does not match target shape: {message}")]
    Shape { message: String },
}

impl FieldError {
    /// Name of the output field this error belongs to, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingMandatory { field, .. } => Some(field),
            Self::Construction { field, .. } => field.as_deref(),
            Self::Shape { .. } => None,
        }
    }
}

fn for_constructor(constructor: &Option<String>) -> String {
    constructor
        .as_ref()
        .map(|name| format!(" for constructor '{name}'"))
        .unwrap_or_default()
}

fn target(field: &Option<String>) -> String {
    match field {
        Some(field) => format!("value of field '{field}'"),
        None => "assembled output".to_string(),
    }
}

/// Ordered list of validation failures for one transform call.
pub type ErrorList = Vec<FieldError>;
