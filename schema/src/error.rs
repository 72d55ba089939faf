use derive_more::Display;
use serde::{Serialize, Serializer};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    User(#[from] UserError),

    #[error("serde_json error")]
    SerdeJSON(#[from] serde_json::Error),

    #[error("failed to convert f64 ({f:?}) to serde number")]
    FailedToConvertF64ToSerdeNumber { f: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("collection name cannot be empty")]
    CollectionNameEmpty,

    #[error("collection {collection:?} type name cannot be empty")]
    TypeNameEmpty { collection: String },

    #[error("collection '_id' field must be a string")]
    IdFieldMustBeString,

    #[error("record root should be an object, got: {got}")]
    RecordRootShouldBeAnObject { got: serde_json::Value },
}

/// Stable identifiers for validation failures, shared with clients so they can
/// localise the message.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    #[display(fmt = "errors.disallowed_property_detected")]
    DisallowedProperty,

    #[display(fmt = "errors.unknown_property")]
    UnknownProperty,

    #[display(fmt = "errors.required")]
    Required,

    #[display(fmt = "errors.expected_type")]
    ExpectedType,

    #[display(fmt = "errors.id_not_writable")]
    IdNotWritable,

    #[display(fmt = "errors.not_allowed")]
    NotAllowed,

    #[display(fmt = "errors.custom")]
    Custom,
}

impl Serialize for Reason {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub id: Reason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationError {
    pub fn new(id: Reason, field: impl Into<String>) -> Self {
        Self {
            id,
            field: Some(field.into()),
            message: None,
        }
    }

    /// Error not tied to a single field, usually raised by a validate callback
    pub fn custom(message: impl Into<String>) -> Self {
        Self {
            id: Reason::Custom,
            field: None,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(field) = &self.field {
            write!(f, " ({field})")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}
