use crate::error::{Error, Result, UserError};
use crate::types::Type;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{hash_map, HashMap};

/// Field name of the record identifier, assigned on insert
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRoot(pub HashMap<String, RecordValue>);

impl RecordRoot {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn id(&self) -> Option<&str> {
        match self.get(ID_FIELD) {
            Some(RecordValue::String(id)) => Some(id),
            _ => None,
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<RecordValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&RecordValue> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<RecordValue> {
        self.0.remove(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RecordValue)> {
        self.0.iter()
    }

    /// Drops fields set to `Null`, which means unset
    pub fn remove_nulls(&mut self) {
        self.0.retain(|_, v| *v != RecordValue::Null);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keeps only the fields for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|k, _| keep(k));
    }

    /// Applies a patch: `Null` values unset the field, everything else is set
    pub fn apply_patch(&mut self, patch: &RecordRoot) {
        for (field, value) in patch.iter() {
            match value {
                RecordValue::Null => {
                    self.0.remove(field);
                }
                value => {
                    self.0.insert(field.clone(), value.clone());
                }
            }
        }
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(UserError::RecordRootShouldBeAnObject { got: value }.into());
        };

        Ok(Self(
            map.into_iter()
                .map(|(k, v)| (k, RecordValue::from(v)))
                .collect(),
        ))
    }
}

impl Default for RecordRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoIterator for RecordRoot {
    type Item = (String, RecordValue);
    type IntoIter = hash_map::IntoIter<String, RecordValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<String>, V: Into<RecordValue>> FromIterator<(K, V)> for RecordRoot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<RecordValue>, const N: usize> From<[(K, V); N]> for RecordRoot {
    fn from(fields: [(K, V); N]) -> Self {
        fields.into_iter().collect()
    }
}

pub fn record_to_json(value: RecordRoot) -> Result<serde_json::Value> {
    Ok(serde_json::Value::Object(
        value
            .into_iter()
            .map(|(k, v)| Ok((k, v.try_into()?)))
            .collect::<Result<_>>()?,
    ))
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum RecordValue {
    Null,
    Boolean(bool),
    #[serde(serialize_with = "serialize_finite")]
    Number(f64),
    String(String),
    Array(Vec<RecordValue>),
    Map(HashMap<String, RecordValue>),
}

impl RecordValue {
    /// Recursively check if the value is of the given type
    pub fn is_type(&self, type_: &Type) -> bool {
        match (type_, self) {
            (Type::Json, _) => true,
            (Type::String, RecordValue::String(_)) => true,
            (Type::Number, RecordValue::Number(_)) => true,
            (Type::Boolean, RecordValue::Boolean(_)) => true,
            (Type::Date, RecordValue::String(s)) => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
            (Type::Object, RecordValue::Map(_)) => true,
            (Type::Array(value), RecordValue::Array(values)) => {
                values.iter().all(|v| v.is_type(value))
            }
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RecordValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for RecordValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RecordValue::Null,
            serde_json::Value::Bool(b) => RecordValue::Boolean(b),
            // Non-finite numbers are not representable in JSON, so as_f64 only
            // fails for arbitrary precision numbers which we don't enable
            serde_json::Value::Number(n) => RecordValue::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => RecordValue::String(s),
            serde_json::Value::Array(a) => {
                RecordValue::Array(a.into_iter().map(RecordValue::from).collect())
            }
            serde_json::Value::Object(o) => RecordValue::Map(
                o.into_iter()
                    .map(|(k, v)| (k, RecordValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<RecordValue> for serde_json::Value {
    type Error = Error;

    fn try_from(value: RecordValue) -> Result<Self> {
        Ok(match value {
            RecordValue::Null => serde_json::Value::Null,
            RecordValue::Boolean(b) => serde_json::Value::Bool(b),
            RecordValue::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .ok_or(Error::FailedToConvertF64ToSerdeNumber { f: n })?,
            RecordValue::String(s) => serde_json::Value::String(s),
            RecordValue::Array(a) => serde_json::Value::Array(
                a.into_iter()
                    .map(serde_json::Value::try_from)
                    .collect::<Result<_>>()?,
            ),
            RecordValue::Map(m) => serde_json::Value::Object(
                m.into_iter()
                    .map(|(k, v)| Ok((k, serde_json::Value::try_from(v)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

/// JSON has no NaN or infinity, refuse them instead of writing `null`
fn serialize_finite<S: Serializer>(n: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if !n.is_finite() {
        return Err(serde::ser::Error::custom(format!(
            "failed to convert f64 ({n:?}) to serde number"
        )));
    }
    serializer.serialize_f64(*n)
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        RecordValue::String(value.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        RecordValue::String(value)
    }
}

impl From<f64> for RecordValue {
    fn from(value: f64) -> Self {
        RecordValue::Number(value)
    }
}

impl From<i64> for RecordValue {
    fn from(value: i64) -> Self {
        RecordValue::Number(value as f64)
    }
}

impl From<bool> for RecordValue {
    fn from(value: bool) -> Self {
        RecordValue::Boolean(value)
    }
}
