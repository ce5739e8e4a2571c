//! Projection configuration
//!
//! A [`Config`] is an ordered list of [`FieldDescriptor`]s plus an optional
//! output constructor. Absent options are `None`, never a sentinel value, so
//! a configured default of `0` or `""` is always honoured.

use crate::construct::Construct;
use crate::selector::Selector;
use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Type alias for value mapping functions
pub type Mapper = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Binds one output key to one source location.
#[derive(Clone, Default)]
pub struct FieldDescriptor {
    /// Output key.
    pub name: String,

    /// Source location; `None` means `[name]`.
    pub selector: Option<Selector>,

    /// Whether a missing value is a validation error.
    pub mandatory: bool,

    /// Configuration applied recursively to the selected value.
    pub config: Option<Arc<Config>>,

    /// Substituted when no value was found.
    pub default: Option<Value>,

    /// Applied after default substitution.
    pub mapper: Option<Mapper>,

    /// Applied last.
    pub wrapper: Option<Arc<dyn Construct>>,
}

impl FieldDescriptor {
    /// Create an optional field reading from the key `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Read from `selector` instead of `[name]`.
    #[must_use]
    pub fn selector(mut self, selector: impl Into<Selector>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Mark the field as mandatory.
    #[must_use]
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Project the selected value through `config`.
    #[must_use]
    pub fn nested(self, config: Config) -> Self {
        self.nested_shared(Arc::new(config))
    }

    /// Project the selected value through a shared `config`.
    #[must_use]
    pub fn nested_shared(mut self, config: Arc<Config>) -> Self {
        self.config = Some(config);
        self
    }

    /// Substitute `value` when nothing was found.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Map the value before it is stored.
    #[must_use]
    pub fn mapper(self, mapper: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.mapper_shared(Arc::new(mapper))
    }

    /// Map the value with a shared mapper.
    #[must_use]
    pub fn mapper_shared(mut self, mapper: Mapper) -> Self {
        self.mapper = Some(mapper);
        self
    }

    /// Wrap the mapped value.
    #[must_use]
    pub fn wrapper(self, wrapper: impl Construct + 'static) -> Self {
        self.wrapper_shared(Arc::new(wrapper))
    }

    /// Wrap the mapped value with a shared constructor.
    #[must_use]
    pub fn wrapper_shared(mut self, wrapper: Arc<dyn Construct>) -> Self {
        self.wrapper = Some(wrapper);
        self
    }

    /// The selector actually walked for this field.
    #[must_use]
    pub fn effective_selector(&self) -> Selector {
        self.selector
            .clone()
            .unwrap_or_else(|| Selector::Key(self.name.clone()))
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .field("mandatory", &self.mandatory)
            .field("config", &self.config)
            .field("default", &self.default)
            .field("has_mapper", &self.mapper.is_some())
            .field("wrapper", &self.wrapper.as_ref().map(|w| w.name().to_string()))
            .finish()
    }
}

/// Target shape of a projection.
#[derive(Clone, Default)]
pub struct Config {
    /// Fields in output order.
    pub fields: Vec<FieldDescriptor>,

    /// Builds the final value from the assembled object.
    pub constructor: Option<Arc<dyn Construct>>,

    /// Attach the input under [`crate::ORIGINAL_KEY`].
    pub keep_original: bool,
}

impl Config {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    #[must_use]
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Append several fields.
    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Build the output with `constructor`.
    #[must_use]
    pub fn with_constructor(self, constructor: impl Construct + 'static) -> Self {
        self.with_constructor_shared(Arc::new(constructor))
    }

    /// Build the output with a shared constructor.
    #[must_use]
    pub fn with_constructor_shared(mut self, constructor: Arc<dyn Construct>) -> Self {
        self.constructor = Some(constructor);
        self
    }

    /// Attach the original input to the output.
    #[must_use]
    pub fn keep_original(mut self, keep: bool) -> Self {
        self.keep_original = keep;
        self
    }

    /// Name of the output constructor, if any.
    #[must_use]
    pub fn constructor_name(&self) -> Option<&str> {
        self.constructor.as_ref().map(|c| c.name())
    }

    /// Check that every descriptor, at every depth, can be resolved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedConfig`] for an anonymous field.
    pub fn validate(&self) -> Result<()> {
        self.validate_at("")
    }

    fn validate_at(&self, prefix: &str) -> Result<()> {
        for (idx, field) in self.fields.iter().enumerate() {
            let location = format!("{prefix}fields[{idx}]");
            if field.name.trim().is_empty() {
                return Err(Error::malformed(location, "field has no name"));
            }
            if let Some(nested) = &field.config {
                nested.validate_at(&format!("{location}.config."))?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("fields", &self.fields)
            .field("constructor", &self.constructor_name())
            .field("keep_original", &self.keep_original)
            .finish()
    }
}
