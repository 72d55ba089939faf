use crate::{
    error::{Reason, Result, UserError, ValidationError},
    permission::{actor_groups, Group, GroupSet, User},
    property::{FieldHook, Property},
    record::{RecordRoot, RecordValue, ID_FIELD},
    types::Type,
};
use chrono::SecondsFormat;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Field set to the creation time, when declared by the schema
pub const CREATED_AT_FIELD: &str = "createdAt";

#[derive(Debug, Default, Clone)]
pub struct Schema {
    /// Properties in declaration order
    properties: Vec<Property>,
}

impl Schema {
    pub fn new(properties: Vec<Property>) -> Result<Self> {
        if let Some(id) = properties.iter().find(|p| p.name == ID_FIELD) {
            if id.type_ != Type::String {
                return Err(UserError::IdFieldMustBeString.into());
            }
        }

        Ok(Self { properties })
    }

    pub fn from_definitions(definitions: BTreeMap<String, PropertyDefinition>) -> Result<Self> {
        Self::new(
            definitions
                .into_iter()
                .map(|(name, def)| def.into_property(name))
                .collect(),
        )
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    /// `_id` is readable by anyone who can see the document at all
    pub fn can_read_field(&self, field: &str, groups: &GroupSet) -> bool {
        if field == ID_FIELD {
            return true;
        }

        self.property(field)
            .map_or(false, |p| p.can_read.allows(groups))
    }

    /// Projection of `document` containing only the fields `user` may read
    pub fn restrict_view(&self, document: &RecordRoot, user: Option<&User>) -> RecordRoot {
        let groups = actor_groups(user, Some(document));
        let mut view = document.clone();
        view.retain(|field| self.can_read_field(field, &groups));
        view
    }

    /// Owners and admins may delete a document
    pub fn can_delete(&self, document: &RecordRoot, user: Option<&User>) -> bool {
        let groups = actor_groups(user, Some(document));
        groups.contains(&Group::Owners) || groups.contains(&Group::Admins)
    }

    /// Checks a new document against field permissions and types. Errors are
    /// ordered by field name.
    pub fn validate_create(
        &self,
        document: &RecordRoot,
        user: Option<&User>,
    ) -> Vec<ValidationError> {
        let groups = actor_groups(user, None);
        let mut errors = vec![];

        for (field, value) in document.iter() {
            if field == ID_FIELD {
                errors.push(ValidationError::new(Reason::IdNotWritable, field));
                continue;
            }

            let Some(prop) = self.property(field) else {
                errors.push(ValidationError::new(Reason::UnknownProperty, field));
                continue;
            };

            if !prop.can_create.allows(&groups) {
                errors.push(ValidationError::new(Reason::DisallowedProperty, field));
                continue;
            }

            if let Some(err) = check_type(prop, value) {
                errors.push(err);
            }
        }

        for prop in self.properties.iter() {
            if prop.optional || prop.is_derived_on_create() || prop.name == ID_FIELD {
                continue;
            }

            match document.get(&prop.name) {
                None | Some(RecordValue::Null) => {
                    errors.push(ValidationError::new(Reason::Required, prop.name.clone()))
                }
                Some(_) => {}
            }
        }

        sort_errors(&mut errors);
        errors
    }

    /// Checks a patch against the stored document. `Null` values unset fields.
    pub fn validate_update(
        &self,
        existing: &RecordRoot,
        data: &RecordRoot,
        user: Option<&User>,
    ) -> Vec<ValidationError> {
        let groups = actor_groups(user, Some(existing));
        let mut errors = vec![];

        for (field, value) in data.iter() {
            if field == ID_FIELD {
                errors.push(ValidationError::new(Reason::IdNotWritable, field));
                continue;
            }

            let Some(prop) = self.property(field) else {
                errors.push(ValidationError::new(Reason::UnknownProperty, field));
                continue;
            };

            if !prop.can_update.allows(&groups) {
                errors.push(ValidationError::new(Reason::DisallowedProperty, field));
                continue;
            }

            if *value == RecordValue::Null {
                if !prop.optional {
                    errors.push(
                        ValidationError::new(Reason::Required, field)
                            .with_message("required field cannot be unset"),
                    );
                }
                continue;
            }

            if let Some(err) = check_type(prop, value) {
                errors.push(err);
            }
        }

        sort_errors(&mut errors);
        errors
    }
}

fn check_type(prop: &Property, value: &RecordValue) -> Option<ValidationError> {
    if *value == RecordValue::Null || value.is_type(&prop.type_) {
        return None;
    }

    Some(
        ValidationError::new(Reason::ExpectedType, prop.name.clone())
            .with_message(format!("expected {}", prop.type_)),
    )
}

fn sort_errors(errors: &mut [ValidationError]) {
    errors.sort_by(|a, b| a.field.cmp(&b.field));
}

/// Field descriptor as written in a JSON collection definition
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyDefinition {
    #[serde(rename = "type")]
    pub type_: Type,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub can_create: GroupSet,
    #[serde(default)]
    pub can_read: GroupSet,
    #[serde(default)]
    pub can_update: GroupSet,
    pub on_create: Option<Derivation>,
    pub on_update: Option<Derivation>,
}

impl PropertyDefinition {
    fn into_property(self, name: String) -> Property {
        let PropertyDefinition {
            type_,
            optional,
            can_create,
            can_read,
            can_update,
            on_create,
            on_update,
        } = self;

        let mut prop = Property::new(name, type_).with_hooks(
            on_create.map(Derivation::into_hook),
            on_update.map(Derivation::into_hook),
        );
        prop.optional = optional;
        prop.can_create = can_create;
        prop.can_read = can_read;
        prop.can_update = can_update;
        prop
    }
}

/// Derivations expressible in a definition file, e.g. `{"value": "CREATED"}`,
/// `"userId"` or `"now"`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Derivation {
    Constant { value: serde_json::Value },
    Builtin(BuiltinDerivation),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuiltinDerivation {
    UserId,
    Now,
}

impl Derivation {
    pub fn into_hook(self) -> FieldHook {
        match self {
            Derivation::Constant { value } => {
                let value = RecordValue::from(value);
                FieldHook::new(move |_| Some(value.clone()))
            }
            Derivation::Builtin(BuiltinDerivation::UserId) => {
                FieldHook::new(|input| input.current_user.map(|u| u.id.clone().into()))
            }
            Derivation::Builtin(BuiltinDerivation::Now) => FieldHook::new(|_| {
                Some(
                    chrono::Utc::now()
                        .to_rfc3339_opts(SecondsFormat::Millis, true)
                        .into(),
                )
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::property::HookInput;
    use pretty_assertions::assert_eq;

    fn create_schema() -> Schema {
        Schema::new(vec![
            Property::new("title", Type::String)
                .can_create(["members"])
                .can_read(["guests"])
                .can_update(["owners", "admins"]),
            Property::new("body", Type::String)
                .optional()
                .can_create(["members"])
                .can_read(["members"])
                .can_update(["owners"]),
            Property::new("userId", Type::String)
                .optional()
                .can_read(["guests"]),
            Property::new("secret", Type::String)
                .optional()
                .can_read(["admins"])
                .on_create(|_| Some("s3cret".into())),
        ])
        .unwrap()
    }

    fn fields(errors: &[ValidationError]) -> Vec<(Reason, &str)> {
        errors
            .iter()
            .map(|e| (e.id, e.field.as_deref().unwrap_or_default()))
            .collect()
    }

    #[test]
    fn test_id_must_be_string() {
        let err = Schema::new(vec![Property::new("_id", Type::Number)]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::User(UserError::IdFieldMustBeString)
        ));
    }

    #[test]
    fn test_restrict_view() {
        let schema = create_schema();
        let doc = RecordRoot::from([
            ("_id", "abc"),
            ("title", "hello"),
            ("body", "world"),
            ("userId", "u1"),
            ("secret", "s3cret"),
        ]);

        let guest = schema.restrict_view(&doc, None);
        assert_eq!(
            guest,
            RecordRoot::from([("_id", "abc"), ("title", "hello"), ("userId", "u1")])
        );

        let member = schema.restrict_view(&doc, Some(&User::new("u2")));
        assert!(member.contains("body"));
        assert!(!member.contains("secret"));

        let admin = schema.restrict_view(&doc, Some(&User::admin("root")));
        assert_eq!(admin, doc);
    }

    #[test]
    fn test_validate_create() {
        let schema = create_schema();
        let user = User::new("u1");

        let doc = RecordRoot::from([("title", "hello")]);
        assert!(schema.validate_create(&doc, Some(&user)).is_empty());

        // Guests can't create titles, and title is required
        let errors = schema.validate_create(&doc, None);
        assert_eq!(fields(&errors), vec![(Reason::DisallowedProperty, "title")]);

        let mut doc = RecordRoot::from([("body", "text"), ("nope", "x"), ("_id", "forged")]);
        doc.insert("secret", "mine");
        let errors = schema.validate_create(&doc, Some(&user));
        assert_eq!(
            fields(&errors),
            vec![
                (Reason::IdNotWritable, "_id"),
                (Reason::UnknownProperty, "nope"),
                (Reason::DisallowedProperty, "secret"),
                (Reason::Required, "title"),
            ]
        );
    }

    #[test]
    fn test_validate_create_type() {
        let schema = create_schema();
        let mut doc = RecordRoot::new();
        doc.insert("title", 42.0);
        let errors = schema.validate_create(&doc, Some(&User::new("u1")));
        assert_eq!(fields(&errors), vec![(Reason::ExpectedType, "title")]);
        assert_eq!(errors[0].message.as_deref(), Some("expected String"));
    }

    #[test]
    fn test_validate_update_owner() {
        let schema = create_schema();
        let existing = RecordRoot::from([("_id", "a"), ("title", "t"), ("userId", "u1")]);
        let data = RecordRoot::from([("body", "new body")]);

        assert!(schema
            .validate_update(&existing, &data, Some(&User::new("u1")))
            .is_empty());

        let errors = schema.validate_update(&existing, &data, Some(&User::new("u2")));
        assert_eq!(fields(&errors), vec![(Reason::DisallowedProperty, "body")]);
    }

    #[test]
    fn test_validate_update_unset_required() {
        let schema = create_schema();
        let existing = RecordRoot::from([("_id", "a"), ("title", "t"), ("userId", "u1")]);
        let mut data = RecordRoot::new();
        data.insert("title", RecordValue::Null);
        data.insert("body", RecordValue::Null);

        let errors = schema.validate_update(&existing, &data, Some(&User::new("u1")));
        assert_eq!(fields(&errors), vec![(Reason::Required, "title")]);
    }

    #[test]
    fn test_can_delete() {
        let schema = create_schema();
        let doc = RecordRoot::from([("_id", "a"), ("userId", "u1")]);
        assert!(schema.can_delete(&doc, Some(&User::new("u1"))));
        assert!(schema.can_delete(&doc, Some(&User::admin("root"))));
        assert!(!schema.can_delete(&doc, Some(&User::new("u2"))));
        assert!(!schema.can_delete(&doc, None));
    }

    #[test]
    fn test_from_definitions() {
        let definitions: BTreeMap<String, PropertyDefinition> = serde_json::from_value(
            serde_json::json!({
                "status": {
                    "type": "String",
                    "optional": true,
                    "canRead": ["guests"],
                    "onCreate": { "value": "draft" },
                },
                "author": {
                    "type": "String",
                    "optional": true,
                    "canRead": ["members"],
                    "onCreate": "userId",
                },
            }),
        )
        .unwrap();
        let schema = Schema::from_definitions(definitions).unwrap();

        let doc = RecordRoot::new();
        let user = User::new("u9");
        let input = HookInput {
            document: &doc,
            data: None,
            current_user: Some(&user),
        };

        let status = schema.property("status").unwrap();
        assert!(status.can_read.contains(&Group::Guests));
        assert_eq!(
            status.on_create.as_ref().unwrap().call(&input),
            Some(RecordValue::from("draft"))
        );

        let author = schema.property("author").unwrap();
        assert_eq!(
            author.on_create.as_ref().unwrap().call(&input),
            Some(RecordValue::from("u9"))
        );
    }
}
