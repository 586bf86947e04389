//! Typed option values and the coercion applied on every write.
//!
//! # Design
//! - An option's type is fixed by the type of its registered default.
//! - Incoming values (form input, command-line text, server payloads) are
//!   converted with [`coerce`] before they are compared or stored, so a form
//!   that reports `"50"` for a numeric option compares equal to `50`.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::CoercionError;

/// Largest magnitude for which every integer is exactly representable in `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Declared type of an option, taken from its default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionType {
    /// Free-form text.
    Text,
    /// Numeric value (integers and ratios share one representation).
    Number,
    /// On/off flag.
    Bool,
}

impl OptionType {
    /// Lowercase label used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Bool => "bool",
        }
    }
}

impl Display for OptionType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Scalar option value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean flag.
    Bool(bool),
    /// Number; whole numbers serialise as JSON integers.
    Number(f64),
    /// Text value.
    Text(String),
}

impl OptionValue {
    /// Type of this value.
    #[must_use]
    pub const fn kind(&self) -> OptionType {
        match self {
            Self::Bool(_) => OptionType::Bool,
            Self::Number(_) => OptionType::Number,
            Self::Text(_) => OptionType::Text,
        }
    }

    /// Convert a JSON scalar. Returns `None` for `null`, arrays and objects.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(Self::Bool(*flag)),
            Value::Number(number) => number.as_f64().map(Self::Number),
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Render as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Numeric payload, if this is a number.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// Boolean payload, if this is a flag.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Text payload, if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Serialize for OptionValue {
    #[allow(clippy::cast_possible_truncation)]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(flag) => serializer.serialize_bool(*flag),
            Self::Number(number)
                if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER =>
            {
                serializer.serialize_i64(*number as i64)
            }
            Self::Number(number) => serializer.serialize_f64(*number),
            Self::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl Display for OptionValue {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(flag) => write!(formatter, "{flag}"),
            Self::Number(number) => write!(formatter, "{number}"),
            Self::Text(text) => formatter.write_str(text),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Convert `value` to `target`.
///
/// - to text: numbers use their shortest decimal form, flags become
///   `"true"`/`"false"`;
/// - to number: text is trimmed and parsed (empty text is `0`), flags become
///   `1`/`0`;
/// - to bool: text is true iff it is `true`, `1` or `on` (any case), numbers
///   are true iff non-zero.
///
/// # Errors
///
/// Returns [`CoercionError::NotANumber`] when a value targeting a numeric
/// option is NaN, infinite, or text that does not parse as a finite number.
pub fn coerce(target: OptionType, value: &OptionValue) -> Result<OptionValue, CoercionError> {
    match (target, value) {
        (OptionType::Number, OptionValue::Number(number)) if !number.is_finite() => {
            Err(CoercionError::NotANumber {
                value: number.to_string(),
            })
        }
        (OptionType::Text, OptionValue::Text(_))
        | (OptionType::Number, OptionValue::Number(_))
        | (OptionType::Bool, OptionValue::Bool(_)) => Ok(value.clone()),
        (OptionType::Text, other) => Ok(OptionValue::Text(other.to_string())),
        (OptionType::Number, OptionValue::Text(text)) => parse_number(text).map(OptionValue::Number),
        (OptionType::Number, OptionValue::Bool(flag)) => {
            Ok(OptionValue::Number(if *flag { 1.0 } else { 0.0 }))
        }
        (OptionType::Bool, OptionValue::Text(text)) => Ok(OptionValue::Bool(matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "on"
        ))),
        (OptionType::Bool, OptionValue::Number(number)) => {
            Ok(OptionValue::Bool(*number != 0.0 && !number.is_nan()))
        }
    }
}

fn parse_number(text: &str) -> Result<f64, CoercionError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| CoercionError::NotANumber {
            value: text.to_string(),
        })
}
