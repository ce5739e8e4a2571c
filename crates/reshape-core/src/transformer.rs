//! Projection engine
//!
//! Applies a [`Config`] to an input value. Every field is evaluated in
//! declaration order, failures are collected instead of short-circuiting,
//! and nested configurations are applied recursively with arity preserved.

use crate::config::{Config, FieldDescriptor};
use crate::either::Either;
use crate::selector::PathResolver;
use crate::{ErrorList, FieldError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, trace};

/// Output key holding the untouched input when `keep_original` is set.
pub const ORIGINAL_KEY: &str = "$orig";

/// Applies a projection configuration to input documents.
///
/// A transformer is immutable during [`Transformer::transform`] and can be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct Transformer {
    config: Arc<Config>,

    /// One resolver per field, in field order.
    resolvers: Vec<PathResolver>,
}

impl Transformer {
    /// Create a transformer for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedConfig`] if any field, at any depth,
    /// has no name.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::prepared(Arc::new(config)))
    }

    /// Build from an already validated configuration.
    fn prepared(config: Arc<Config>) -> Self {
        let resolvers = config
            .fields
            .iter()
            .map(|field| PathResolver::for_field(&field.name, field.selector.as_ref()))
            .collect();
        Self { config, resolvers }
    }

    /// Replace the configuration and recompute resolvers.
    ///
    /// On error the previous configuration stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedConfig`] if `config` is invalid.
    pub fn set_config(&mut self, config: Config) -> Result<()> {
        config.validate()?;
        *self = Self::prepared(Arc::new(config));
        Ok(())
    }

    /// The current configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Project `input` through the configuration.
    ///
    /// Returns `Right` with the projected value, or `Left` with every
    /// validation failure found at any depth. `input` is never modified.
    pub fn transform(&self, input: &Value) -> Either<ErrorList, Value> {
        let mut errors = ErrorList::new();
        let output = self.project(input, &mut errors);

        debug!(
            fields = self.config.fields.len(),
            errors = errors.len(),
            constructor = self.config.constructor_name(),
            "transform finished"
        );

        if errors.is_empty() {
            Either::Right(output)
        } else {
            Either::Left(errors)
        }
    }

    /// Project `input` and deserialize the result into `T`.
    ///
    /// A result that does not fit `T` is reported as [`FieldError::Shape`].
    pub fn transform_into<T: DeserializeOwned>(&self, input: &Value) -> Either<ErrorList, T> {
        match self.transform(input) {
            Either::Left(errors) => Either::Left(errors),
            Either::Right(value) => match serde_json::from_value(value) {
                Ok(typed) => Either::Right(typed),
                Err(e) => Either::Left(vec![FieldError::Shape {
                    message: e.to_string(),
                }]),
            },
        }
    }

    fn project(&self, input: &Value, errors: &mut ErrorList) -> Value {
        let mut out = Map::new();

        for (field, resolver) in self.config.fields.iter().zip(&self.resolvers) {
            let raw = resolver.resolve(input);

            let value = match &field.config {
                // An absent child falls back to the whole parent record.
                Some(nested) => Some(nested_transform(nested, raw.unwrap_or(input), errors)),
                None => raw.cloned(),
            };

            match value.or_else(|| field.default.clone()) {
                Some(value) => {
                    if let Some(value) = Self::finish(field, value, errors) {
                        out.insert(field.name.clone(), value);
                    }
                }
                None if field.mandatory => {
                    trace!(field = %field.name, selector = %resolver, "mandatory field missing");
                    errors.push(FieldError::MissingMandatory {
                        field: field.name.clone(),
                        selector: field.effective_selector(),
                        constructor: self.config.constructor_name().map(str::to_string),
                    });
                }
                None => trace!(field = %field.name, "optional field absent"),
            }
        }

        if self.config.keep_original {
            out.insert(ORIGINAL_KEY.to_string(), input.clone());
        }

        let assembled = Value::Object(out);
        match &self.config.constructor {
            Some(constructor) => match constructor.construct(assembled) {
                Ok(value) => value,
                Err(message) => {
                    errors.push(FieldError::Construction {
                        field: None,
                        constructor: constructor.name().to_string(),
                        message,
                    });
                    Value::Null
                }
            },
            None => assembled,
        }
    }

    /// Map then wrap a found value. `None` means the wrapper rejected it.
    fn finish(field: &FieldDescriptor, value: Value, errors: &mut ErrorList) -> Option<Value> {
        let mapped = match &field.mapper {
            Some(mapper) => mapper(value),
            None => value,
        };

        let Some(wrapper) = &field.wrapper else {
            return Some(mapped);
        };
        match wrapper.construct(mapped) {
            Ok(wrapped) => Some(wrapped),
            Err(message) => {
                trace!(field = %field.name, constructor = wrapper.name(), "wrapper rejected value");
                errors.push(FieldError::Construction {
                    field: Some(field.name.clone()),
                    constructor: wrapper.name().to_string(),
                    message,
                });
                None
            }
        }
    }

    /// Project one element, turning failure into a `null` placeholder.
    fn element(&self, item: &Value, errors: &mut ErrorList) -> Value {
        match self.transform(item) {
            Either::Right(value) => value,
            Either::Left(mut failures) => {
                errors.append(&mut failures);
                Value::Null
            }
        }
    }
}

/// Apply `config` to `base`, keeping its arity: a sequence yields a sequence
/// of the same length, anything else yields a single value.
fn nested_transform(config: &Arc<Config>, base: &Value, errors: &mut ErrorList) -> Value {
    let child = Transformer::prepared(Arc::clone(config));
    match base {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| child.element(item, errors))
                .collect(),
        ),
        single => child.element(single, errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::{FnConstructor, TimestampConstructor};
    use crate::selector::Selector;
    use serde_json::json;

    fn flat_config() -> Config {
        Config::new()
            .with_field(FieldDescriptor::new("name").selector("foo"))
            .with_field(FieldDescriptor::new("count").selector("cnt"))
    }

    #[test]
    fn test_flat_object() {
        let transformer = Transformer::new(flat_config()).unwrap();
        let out = transformer.transform(&json!({"foo": "asd", "cnt": 2}));

        let value = out.unwrap_right();
        assert_eq!(value, json!({"name": "asd", "count": 2}));
        assert!(value.get(ORIGINAL_KEY).is_none());
    }

    #[test]
    fn test_keep_original() {
        let transformer = Transformer::new(flat_config().keep_original(true)).unwrap();
        let input = json!({"foo": "asd", "cnt": 2});
        let value = transformer.transform(&input).unwrap_right();

        assert_eq!(value[ORIGINAL_KEY], input);
    }

    #[test]
    fn test_output_keys_follow_declaration_order() {
        let config = Config::new()
            .with_field(FieldDescriptor::new("z"))
            .with_field(FieldDescriptor::new("a"));
        let transformer = Transformer::new(config).unwrap();
        let value = transformer.transform(&json!({"a": 1, "z": 2})).unwrap_right();

        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["z", "a"]);
    }

    #[test]
    fn test_missing_mandatory_field() {
        let config = Config::new()
            .with_field(FieldDescriptor::new("name").selector("foo").mandatory())
            .with_field(FieldDescriptor::new("count").selector("cnt"));
        let transformer = Transformer::new(config).unwrap();

        let errors = transformer.transform(&json!({"cnt": 2})).unwrap_left();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("'foo'"));
        assert_eq!(errors[0].field(), Some("name"));
    }

    #[test]
    fn test_error_names_output_constructor() {
        let config = Config::new()
            .with_field(FieldDescriptor::new("id").mandatory())
            .with_constructor(FnConstructor::infallible("Issue", |v| v));
        let transformer = Transformer::new(config).unwrap();

        let errors = transformer.transform(&json!({})).unwrap_left();
        assert_eq!(
            errors[0].to_string(),
            "Missing mandatory data expected at selector 'id' for constructor 'Issue'"
        );
    }

    #[test]
    fn test_falsy_values_are_present() {
        let config = Config::new()
            .with_field(FieldDescriptor::new("zero").mandatory().default_value(5))
            .with_field(FieldDescriptor::new("empty").mandatory())
            .with_field(FieldDescriptor::new("flag").mandatory())
            .with_field(FieldDescriptor::new("nothing").mandatory());
        let transformer = Transformer::new(config).unwrap();

        let value = transformer
            .transform(&json!({"zero": 0, "empty": "", "flag": false, "nothing": null}))
            .unwrap_right();
        assert_eq!(
            value,
            json!({"zero": 0, "empty": "", "flag": false, "nothing": null})
        );
    }

    #[test]
    fn test_default_applies_only_when_missing() {
        let config = Config::new()
            .with_field(FieldDescriptor::new("count").default_value(0))
            .with_field(FieldDescriptor::new("other"));
        let transformer = Transformer::new(config).unwrap();

        let value = transformer.transform(&json!({})).unwrap_right();
        assert_eq!(value, json!({"count": 0}));
    }

    #[test]
    fn test_default_satisfies_mandatory() {
        let config = Config::new().with_field(FieldDescriptor::new("n").mandatory().default_value(1));
        let transformer = Transformer::new(config).unwrap();
        assert_eq!(transformer.transform(&json!({})).unwrap_right(), json!({"n": 1}));
    }

    #[test]
    fn test_mapper_runs_after_default() {
        let config = Config::new().with_field(
            FieldDescriptor::new("name")
                .default_value("anon")
                .mapper(|v| Value::String(v.as_str().unwrap_or_default().to_uppercase())),
        );
        let transformer = Transformer::new(config).unwrap();

        assert_eq!(
            transformer.transform(&json!({})).unwrap_right(),
            json!({"name": "ANON"})
        );
        assert_eq!(
            transformer.transform(&json!({"name": "asd"})).unwrap_right(),
            json!({"name": "ASD"})
        );
    }

    #[test]
    fn test_mapper_with_whole_input_selector() {
        let config = Config::new().with_field(
            FieldDescriptor::new("updateFrequency")
                .selector(Selector::whole())
                .mapper(|_| json!(0)),
        );
        let transformer = Transformer::new(config).unwrap();
        assert_eq!(
            transformer.transform(&json!({"a": 1})).unwrap_right(),
            json!({"updateFrequency": 0})
        );
    }

    #[test]
    fn test_wrapper_runs_last() {
        let config = Config::new().with_field(
            FieldDescriptor::new("when")
                .mapper(|v| json!(format!("{}Z", v.as_str().unwrap_or_default())))
                .wrapper(TimestampConstructor),
        );
        let transformer = Transformer::new(config).unwrap();
        let value = transformer
            .transform(&json!({"when": "1970-01-01T00:00:01.000"}))
            .unwrap_right();
        assert_eq!(value, json!({"when": 1000}));
    }

    #[test]
    fn test_wrapper_rejection_is_collected() {
        let config = Config::new()
            .with_field(FieldDescriptor::new("when").wrapper(TimestampConstructor))
            .with_field(FieldDescriptor::new("id").mandatory());
        let transformer = Transformer::new(config).unwrap();

        let errors = transformer
            .transform(&json!({"when": "yesterday"}))
            .unwrap_left();
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            &errors[0],
            FieldError::Construction { field: Some(f), constructor, .. }
                if f == "when" && constructor == "timestamp"
        ));
        assert!(matches!(errors[1], FieldError::MissingMandatory { .. }));
    }

    #[test]
    fn test_nested_scalar_stays_scalar() {
        let leaf = Config::new()
            .with_field(FieldDescriptor::new("name").selector("foo"))
            .with_field(FieldDescriptor::new("count").selector("cnt"));
        let top = flat_config().with_field(FieldDescriptor::new("nested").selector(["c1"]).nested(leaf));
        let transformer = Transformer::new(top).unwrap();

        let value = transformer
            .transform(&json!({"foo": "asd", "cnt": 2, "c1": {"foo": "bar", "cnt": 3}}))
            .unwrap_right();
        assert_eq!(value["nested"], json!({"name": "bar", "count": 3}));
    }

    #[test]
    fn test_nested_sequence_keeps_arity() {
        let item = Config::new().with_field(FieldDescriptor::new("a"));
        let config = Config::new().with_field(FieldDescriptor::new("items").nested(item));
        let transformer = Transformer::new(config).unwrap();

        let value = transformer
            .transform(&json!({"items": [{"a": 1}, {"a": 2}]}))
            .unwrap_right();
        assert_eq!(value, json!({"items": [{"a": 1}, {"a": 2}]}));

        let single = transformer
            .transform(&json!({"items": [{"a": 1, "b": 9}]}))
            .unwrap_right();
        assert_eq!(single, json!({"items": [{"a": 1}]}));

        let empty = transformer.transform(&json!({"items": []})).unwrap_right();
        assert_eq!(empty, json!({"items": []}));
    }

    #[test]
    fn test_nested_missing_source_uses_parent() {
        let inner = Config::new().with_field(FieldDescriptor::new("title").selector("summary"));
        let config = Config::new().with_field(
            FieldDescriptor::new("meta")
                .selector(Selector::whole())
                .nested(inner.clone()),
        );
        let transformer = Transformer::new(config).unwrap();
        let value = transformer
            .transform(&json!({"summary": "hello"}))
            .unwrap_right();
        assert_eq!(value, json!({"meta": {"title": "hello"}}));

        let absent = Config::new().with_field(FieldDescriptor::new("child").nested(inner));
        let transformer = Transformer::new(absent).unwrap();
        let value = transformer
            .transform(&json!({"summary": "parent"}))
            .unwrap_right();
        assert_eq!(value, json!({"child": {"title": "parent"}}));
    }

    #[test]
    fn test_failed_elements_become_null_and_errors_accumulate() {
        let item = Config::new().with_field(FieldDescriptor::new("a").mandatory());
        let config = Config::new()
            .with_field(FieldDescriptor::new("id").mandatory())
            .with_field(FieldDescriptor::new("items").nested(item));
        let transformer = Transformer::new(config).unwrap();

        let errors = transformer
            .transform(&json!({"items": [{"a": 1}, {}, {"b": 2}]}))
            .unwrap_left();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].field(), Some("id"));
        assert_eq!(errors[1].field(), Some("a"));
        assert_eq!(errors[2].field(), Some("a"));

        let item = Config::new().with_field(FieldDescriptor::new("a").mandatory());
        let mut errors = ErrorList::new();
        let value = nested_transform(
            &Arc::new(item),
            &json!([{"a": 1}, {}, {"a": 3}]),
            &mut errors,
        );
        assert_eq!(value, json!([{"a": 1}, null, {"a": 3}]));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_output_constructor_wraps_assembled_object() {
        let config = flat_config()
            .keep_original(true)
            .with_constructor(FnConstructor::infallible("C1", |v| json!({"C1": v})));
        let transformer = Transformer::new(config).unwrap();
        let input = json!({"foo": "asd", "cnt": 2});
        let value = transformer.transform(&input).unwrap_right();

        assert_eq!(
            value,
            json!({"C1": {"name": "asd", "count": 2, "$orig": {"foo": "asd", "cnt": 2}}})
        );
    }

    #[test]
    fn test_output_constructor_rejection() {
        let config = flat_config().with_constructor(FnConstructor::new("Strict", |_| {
            Err("no thanks".to_string())
        }));
        let transformer = Transformer::new(config).unwrap();
        let errors = transformer.transform(&json!({})).unwrap_left();
        assert_eq!(
            errors[0].to_string(),
            "Constructor 'Strict' rejected assembled output: no thanks"
        );
    }

    #[test]
    fn test_scalar_and_null_inputs() {
        let transformer = Transformer::new(flat_config()).unwrap();
        assert_eq!(transformer.transform(&json!(5)).unwrap_right(), json!({}));
        assert_eq!(transformer.transform(&Value::Null).unwrap_right(), json!({}));
    }

    #[test]
    fn test_set_config_replaces_resolvers() {
        let mut transformer = Transformer::new(flat_config()).unwrap();
        transformer
            .set_config(Config::new().with_field(FieldDescriptor::new("x").selector("cnt")))
            .unwrap();
        assert_eq!(
            transformer.transform(&json!({"cnt": 2})).unwrap_right(),
            json!({"x": 2})
        );

        let bad = Config::new().with_field(FieldDescriptor::new(""));
        assert!(transformer.set_config(bad).is_err());
        assert_eq!(transformer.config().fields[0].name, "x");
    }

    #[test]
    fn test_transform_into_typed_value() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Counted {
            name: String,
            count: u32,
        }

        let transformer = Transformer::new(flat_config()).unwrap();
        let typed: Counted = transformer
            .transform_into(&json!({"foo": "asd", "cnt": 2}))
            .unwrap_right();
        assert_eq!(
            typed,
            Counted {
                name: "asd".into(),
                count: 2
            }
        );

        let errors = transformer
            .transform_into::<Counted>(&json!({"foo": "asd"}))
            .unwrap_left();
        assert!(matches!(errors[0], FieldError::Shape { .. }));
    }

    #[test]
    fn test_transformer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Transformer>();
    }
}
