use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Value type of a schema field.
///
/// Deserializes from `"String"`, `"Number"`, ... or `{"Array": <type>}`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Type {
    String,
    Number,
    Boolean,
    /// RFC 3339 timestamp stored as a string
    Date,
    Array(Box<Type>),
    /// Nested map with free-form keys
    Object,
    /// Any value, never type checked
    Json,
}

impl Type {
    pub fn array_of(value: Type) -> Self {
        Type::Array(Box::new(value))
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::String => write!(f, "String"),
            Type::Number => write!(f, "Number"),
            Type::Boolean => write!(f, "Boolean"),
            Type::Date => write!(f, "Date"),
            Type::Array(value) => write!(f, "[{value}]"),
            Type::Object => write!(f, "Object"),
            Type::Json => write!(f, "JSON"),
        }
    }
}
