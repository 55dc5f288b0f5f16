//! Typed scalar values stored in the state tree.

use serde_json::Value;
use std::fmt;

/// Shape of a stored node, used for type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Object,
    Array,
}

impl ValueKind {
    /// Classifies a JSON node.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "array",
        };
        f.write_str(name)
    }
}

/// A scalar that can be stored at a state path.
pub trait StateValue: Sized {
    /// Kind of node this type is stored as.
    const KIND: ValueKind;

    /// JSON form of the value; `None` when it has none (non-finite floats).
    fn into_json(self) -> Option<Value>;

    /// Converts back from a stored node. `None` means the stored node cannot
    /// represent `Self` (e.g. a fractional number read as an integer).
    fn from_json(value: &Value) -> Option<Self>;
}

impl StateValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn into_json(self) -> Option<Value> {
        Some(Value::Bool(self))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl StateValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn into_json(self) -> Option<Value> {
        Some(Value::String(self))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl StateValue for f64 {
    const KIND: ValueKind = ValueKind::Number;

    fn into_json(self) -> Option<Value> {
        serde_json::Number::from_f64(self).map(Value::Number)
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl StateValue for i64 {
    const KIND: ValueKind = ValueKind::Number;

    fn into_json(self) -> Option<Value> {
        Some(Value::from(self))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl StateValue for i32 {
    const KIND: ValueKind = ValueKind::Number;

    fn into_json(self) -> Option<Value> {
        Some(Value::from(self))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|v| i32::try_from(v).ok())
    }
}

impl StateValue for usize {
    const KIND: ValueKind = ValueKind::Number;

    fn into_json(self) -> Option<Value> {
        Some(Value::from(self))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|v| usize::try_from(v).ok())
    }
}
