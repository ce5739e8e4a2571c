//! Constructors
//!
//! Wrappers and output constructors are opaque capabilities: the engine hands
//! them a value and stores whatever they build.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Builds a caller-defined value out of a projected one.
pub trait Construct: Send + Sync {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// Build the wrapped value.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when `value` cannot be wrapped. The
    /// engine records it in the call's error list.
    fn construct(&self, value: Value) -> Result<Value, String>;
}

impl fmt::Debug for dyn Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Construct({})", self.name())
    }
}

/// Type alias for constructor closures
pub type ConstructFn = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// A named closure acting as a constructor.
#[derive(Clone)]
pub struct FnConstructor {
    name: String,
    func: ConstructFn,
}

impl FnConstructor {
    /// Wrap `func` under `name`.
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// A constructor that cannot fail.
    pub fn infallible(
        name: impl Into<String>,
        func: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, move |value| Ok(func(value)))
    }
}

impl Construct for FnConstructor {
    fn name(&self) -> &str {
        &self.name
    }

    fn construct(&self, value: Value) -> Result<Value, String> {
        (self.func)(value)
    }
}

impl fmt::Debug for FnConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConstructor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Parse an instant from date text or epoch milliseconds.
///
/// Text may be RFC 3339, a datetime without offset or a plain `YYYY-MM-DD`
/// date. Both of the latter are read as UTC.
fn parse_instant(value: &Value) -> Result<DateTime<Utc>, String> {
    match value {
        Value::String(s) => parse_date_text(s).ok_or_else(|| format!("invalid date '{s}'")),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(truncate_millis))
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| format!("invalid timestamp {n}")),
        other => Err(format!("cannot build a date from {other}")),
    }
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// Fractions of a millisecond are dropped towards zero.
#[allow(clippy::cast_possible_truncation)]
fn truncate_millis(millis: f64) -> i64 {
    millis.trunc() as i64
}

/// Normalises dates to RFC 3339 UTC text with millisecond precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateConstructor;

impl Construct for DateConstructor {
    fn name(&self) -> &str {
        "date"
    }

    fn construct(&self, value: Value) -> Result<Value, String> {
        let instant = parse_instant(&value)?;
        Ok(Value::String(
            instant.to_rfc3339_opts(SecondsFormat::Millis, true),
        ))
    }
}

/// Converts dates to epoch milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampConstructor;

impl Construct for TimestampConstructor {
    fn name(&self) -> &str {
        "timestamp"
    }

    fn construct(&self, value: Value) -> Result<Value, String> {
        let instant = parse_instant(&value)?;
        Ok(Value::from(instant.timestamp_millis()))
    }
}
