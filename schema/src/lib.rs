#![warn(clippy::unwrap_used, clippy::expect_used)]

pub mod collection;
mod error;
pub mod permission;
pub mod property;
pub mod record;
mod schema;
pub mod types;

pub use collection::Collection;
pub use error::{Error, Reason, Result, UserError, ValidationError};
pub use permission::{Group, GroupSet, User};
pub use property::{FieldHook, HookInput, Property};
pub use record::{record_to_json, RecordRoot, RecordValue, ID_FIELD};
pub use schema::{BuiltinDerivation, Derivation, PropertyDefinition, Schema, CREATED_AT_FIELD};
pub use types::Type;
