//! Named mappers and constructors
//!
//! Configuration files refer to mappers and constructors by name; the
//! registry resolves those names to callables.

use crate::config::Mapper;
use crate::construct::{Construct, DateConstructor, TimestampConstructor};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Lookup table for mappers and constructors.
#[derive(Clone, Default)]
pub struct Registry {
    mappers: HashMap<String, Mapper>,
    constructors: HashMap<String, Arc<dyn Construct>>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the built-in mappers and constructors.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register_mapper("uppercase", map_uppercase)
            .register_mapper("lowercase", map_lowercase)
            .register_mapper("trim", map_trim)
            .register_mapper("to_string", map_to_string)
            .register_mapper("to_number", map_to_number)
            .register_mapper("length", map_length)
            .register_mapper("zero", |_| Value::from(0))
            .register_constructor(DateConstructor)
            .register_constructor(TimestampConstructor);
        registry
    }

    /// Register a mapper under `name`, replacing any previous one.
    pub fn register_mapper(
        &mut self,
        name: impl Into<String>,
        mapper: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> &mut Self {
        self.mappers.insert(name.into(), Arc::new(mapper));
        self
    }

    /// Register a constructor under its own name, replacing any previous one.
    pub fn register_constructor(&mut self, constructor: impl Construct + 'static) -> &mut Self {
        let constructor: Arc<dyn Construct> = Arc::new(constructor);
        self.constructors
            .insert(constructor.name().to_string(), constructor);
        self
    }

    /// Look up a mapper.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMapper`] if nothing is registered under `name`.
    pub fn mapper(&self, name: &str) -> Result<Mapper> {
        self.mappers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownMapper(name.to_string()))
    }

    /// Look up a constructor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownConstructor`] if nothing is registered under `name`.
    pub fn constructor(&self, name: &str) -> Result<Arc<dyn Construct>> {
        self.constructors
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownConstructor(name.to_string()))
    }

    /// Registered mapper names, sorted.
    #[must_use]
    pub fn mapper_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.mappers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Registered constructor names, sorted.
    #[must_use]
    pub fn constructor_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("mappers", &self.mapper_names())
            .field("constructors", &self.constructor_names())
            .finish()
    }
}

fn map_string(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

fn map_uppercase(value: Value) -> Value {
    map_string(value, str::to_uppercase)
}

fn map_lowercase(value: Value) -> Value {
    map_string(value, str::to_lowercase)
}

fn map_trim(value: Value) -> Value {
    map_string(value, |s| s.trim().to_string())
}

fn map_to_string(value: Value) -> Value {
    match value {
        Value::String(_) | Value::Null => value,
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => Value::String(other.to_string()),
    }
}

fn map_to_number(value: Value) -> Value {
    match value {
        Value::Number(_) => value,
        Value::Bool(b) => Value::from(u8::from(b)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Value::from(i)
            } else {
                s.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        _ => Value::Null,
    }
}

fn map_length(value: Value) -> Value {
    match value {
        Value::String(s) => Value::from(s.chars().count()),
        Value::Array(items) => Value::from(items.len()),
        Value::Object(map) => Value::from(map.len()),
        _ => Value::Null,
    }
}
