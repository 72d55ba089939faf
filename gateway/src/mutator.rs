use crate::{
    callbacks::{AsyncCallbackProps, CallbackError, CallbackProps, Channel, Operation, Stage},
    id::generate_id,
    Context, GatewayError, Result,
};
use chrono::SecondsFormat;
use schema::{
    permission::OWNER_FIELD, Collection, HookInput, Reason, RecordRoot, RecordValue, User,
    ValidationError, CREATED_AT_FIELD, ID_FIELD,
};
use tracing::debug;

pub struct CreateMutator<'a> {
    pub collection: &'a Collection,
    pub document: &'a RecordRoot,
    pub current_user: Option<&'a User>,
    /// Skip permission and type checks when false, e.g. for seeding
    pub validate: bool,
    pub context: &'a Context,
}

pub struct UpdateMutator<'a> {
    pub collection: &'a Collection,
    pub document_id: &'a str,
    /// Patch, `Null` values unset the field
    pub data: &'a RecordRoot,
    pub current_user: Option<&'a User>,
    pub validate: bool,
    pub context: &'a Context,
}

pub struct DeleteMutator<'a> {
    pub collection: &'a Collection,
    pub document_id: &'a str,
    pub current_user: Option<&'a User>,
    pub validate: bool,
    pub context: &'a Context,
}

/// Validates, persists and returns a new document, filtered to the fields the
/// current user can read.
#[tracing::instrument(skip_all, fields(collection = args.collection.name()))]
pub async fn create_mutator(args: CreateMutator<'_>) -> Result<RecordRoot> {
    let CreateMutator {
        collection,
        document,
        current_user,
        validate,
        context,
    } = args;
    let schema = collection.schema();
    let channel = |stage| Channel::new(collection.type_name(), Operation::Create, stage);
    let props = CallbackProps {
        collection,
        current_user,
        data: None,
        old_document: None,
    };

    let mut document = document.clone();
    document.remove_nulls();

    if validate {
        let mut errors = schema.validate_create(&document, current_user);
        errors.extend(
            context
                .callbacks
                .run_validate(&channel(Stage::Validate), &document, &props),
        );
        check_errors(errors)?;
    }

    document = context
        .callbacks
        .run(&channel(Stage::Before), document, &props)
        .map_err(callback_error)?;

    if let Some(user) = current_user {
        if schema.has_field(OWNER_FIELD) && !document.contains(OWNER_FIELD) {
            document.insert(OWNER_FIELD, user.id.clone());
        }
    }

    if schema.has_field(CREATED_AT_FIELD) {
        document.insert(CREATED_AT_FIELD, now());
    }

    let mut derived = RecordRoot::new();
    for prop in schema.properties() {
        let Some(hook) = &prop.on_create else {
            continue;
        };

        let input = HookInput {
            document: &document,
            data: None,
            current_user,
        };
        if let Some(value) = hook.call(&input) {
            derived.insert(prop.name.clone(), value);
        }
    }
    document.apply_patch(&derived);

    let id = generate_id();
    document.insert(ID_FIELD, id.clone());

    context
        .store
        .insert(collection.name(), &id, &document)
        .await?;
    debug!(%id, "document created");

    let document = context
        .callbacks
        .run(&channel(Stage::After), document, &props)
        .map_err(callback_error)?;

    context
        .callbacks
        .run_async(&channel(Stage::Async), || {
            AsyncCallbackProps::new(document.clone(), &props)
        });

    Ok(schema.restrict_view(&document, current_user))
}

/// Applies a patch to a stored document and returns the result, filtered to
/// the fields the current user can read.
#[tracing::instrument(skip_all, fields(collection = args.collection.name(), id = args.document_id))]
pub async fn update_mutator(args: UpdateMutator<'_>) -> Result<RecordRoot> {
    let UpdateMutator {
        collection,
        document_id,
        data,
        current_user,
        validate,
        context,
    } = args;
    let schema = collection.schema();
    let channel = |stage| Channel::new(collection.type_name(), Operation::Update, stage);

    let old_document = context
        .store
        .get(collection.name(), document_id)
        .await?
        .ok_or_else(|| not_found(collection, document_id))?;

    let props = CallbackProps {
        collection,
        current_user,
        data: Some(data),
        old_document: Some(&old_document),
    };

    let mut patch = data.clone();

    if validate {
        let mut errors = schema.validate_update(&old_document, &patch, current_user);
        errors.extend(
            context
                .callbacks
                .run_validate(&channel(Stage::Validate), &patch, &props),
        );
        check_errors(errors)?;
    }

    patch = context
        .callbacks
        .run(&channel(Stage::Before), patch, &props)
        .map_err(callback_error)?;
    patch.remove(ID_FIELD);

    let mut document = old_document.clone();
    document.apply_patch(&patch);

    let mut derived = RecordRoot::new();
    for prop in schema.properties() {
        let Some(hook) = &prop.on_update else {
            continue;
        };

        let input = HookInput {
            document: &document,
            data: Some(&patch),
            current_user,
        };
        if let Some(value) = hook.call(&input) {
            derived.insert(prop.name.clone(), value);
        }
    }
    document.apply_patch(&derived);

    // Fails if the document was deleted since it was read
    context
        .store
        .update(collection.name(), document_id, &document)
        .await
        .map_err(|err| match err {
            store::Error::RecordNotFound { .. } => not_found(collection, document_id),
            err => err.into(),
        })?;
    debug!("document updated");

    let document = context
        .callbacks
        .run(&channel(Stage::After), document, &props)
        .map_err(callback_error)?;

    context
        .callbacks
        .run_async(&channel(Stage::Async), || {
            let mut async_props = AsyncCallbackProps::new(document.clone(), &props);
            async_props.data = Some(patch.clone());
            async_props
        });

    Ok(schema.restrict_view(&document, current_user))
}

/// Removes a document, owners and admins only when validating. Returns the
/// removed document, as transformed by the `before` and `after` callbacks,
/// filtered to the fields the current user can read.
#[tracing::instrument(skip_all, fields(collection = args.collection.name(), id = args.document_id))]
pub async fn delete_mutator(args: DeleteMutator<'_>) -> Result<RecordRoot> {
    let DeleteMutator {
        collection,
        document_id,
        current_user,
        validate,
        context,
    } = args;
    let schema = collection.schema();
    let channel = |stage| Channel::new(collection.type_name(), Operation::Delete, stage);

    let existing = context
        .store
        .get(collection.name(), document_id)
        .await?
        .ok_or_else(|| not_found(collection, document_id))?;

    let props = CallbackProps {
        collection,
        current_user,
        data: None,
        old_document: Some(&existing),
    };

    if validate {
        let mut errors = vec![];
        if !schema.can_delete(&existing, current_user) {
            errors.push(ValidationError {
                id: Reason::NotAllowed,
                field: None,
                message: Some("only owners and admins can delete documents".to_string()),
            });
        }
        errors.extend(
            context
                .callbacks
                .run_validate(&channel(Stage::Validate), &existing, &props),
        );
        check_errors(errors)?;
    }

    let document = context
        .callbacks
        .run(&channel(Stage::Before), existing.clone(), &props)
        .map_err(callback_error)?;

    context
        .store
        .delete(collection.name(), document_id)
        .await?
        .ok_or_else(|| not_found(collection, document_id))?;
    debug!("document deleted");

    let removed = context
        .callbacks
        .run(&channel(Stage::After), document, &props)
        .map_err(callback_error)?;

    context
        .callbacks
        .run_async(&channel(Stage::Async), || {
            AsyncCallbackProps::new(removed.clone(), &props)
        });

    Ok(schema.restrict_view(&removed, current_user))
}

fn check_errors(errors: Vec<ValidationError>) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }

    debug!(count = errors.len(), "validation failed");
    Err(GatewayError::Validation(errors))
}

fn callback_error((channel, source): (Channel, CallbackError)) -> GatewayError {
    GatewayError::Callback { channel, source }
}

fn not_found(collection: &Collection, id: &str) -> GatewayError {
    GatewayError::DocumentNotFound {
        collection: collection.name().to_string(),
        id: id.to_string(),
    }
}

fn now() -> RecordValue {
    chrono::Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{Property, Schema, Type};
    use store::{MemoryStore, StoreAdaptor};

    fn posts() -> Collection {
        let schema = Schema::new(vec![
            Property::new("title", Type::String)
                .can_create(["members"])
                .can_read(["guests"])
                .can_update(["owners"]),
            Property::new("userId", Type::String)
                .optional()
                .can_read(["guests"]),
            Property::new("createdAt", Type::Date)
                .optional()
                .can_read(["guests"]),
            Property::new("editedBy", Type::String)
                .optional()
                .can_read(["admins"])
                .on_update(|input| input.current_user.map(|u| u.id.clone().into())),
        ])
        .unwrap();
        Collection::new("Posts", "Post", schema).unwrap()
    }

    async fn create(context: &Context, user: &User) -> RecordRoot {
        create_mutator(CreateMutator {
            collection: &posts(),
            document: &RecordRoot::from([("title", "hello")]),
            current_user: Some(user),
            validate: true,
            context,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_fills_auto_fields() {
        let context = Context::new(MemoryStore::new());
        let user = User::new("u1");
        let doc = create(&context, &user).await;

        let id = doc.id().unwrap();
        assert_eq!(id.len(), 17);
        assert_eq!(doc.get("userId"), Some(&RecordValue::from("u1")));
        assert!(doc
            .get("createdAt")
            .map_or(false, |v| v.is_type(&Type::Date)));

        let stored = context.store.get("Posts", id).await.unwrap().unwrap();
        assert_eq!(stored, doc);
    }

    #[tokio::test]
    async fn test_create_ignores_id_without_validation() {
        let context = Context::new(MemoryStore::new());
        let doc = create_mutator(CreateMutator {
            collection: &posts(),
            document: &RecordRoot::from([("_id", "forged"), ("title", "hello")]),
            current_user: None,
            validate: false,
            context: &context,
        })
        .await
        .unwrap();

        assert_ne!(doc.id(), Some("forged"));
    }

    #[tokio::test]
    async fn test_update_runs_on_update() {
        let context = Context::new(MemoryStore::new());
        let owner = User::new("u1");
        let doc = create(&context, &owner).await;
        let id = doc.id().unwrap();

        let updated = update_mutator(UpdateMutator {
            collection: &posts(),
            document_id: id,
            data: &RecordRoot::from([("title", "bye")]),
            current_user: Some(&owner),
            validate: true,
            context: &context,
        })
        .await
        .unwrap();

        assert_eq!(updated.get("title"), Some(&RecordValue::from("bye")));
        assert!(!updated.contains("editedBy"));

        let stored = context.store.get("Posts", id).await.unwrap().unwrap();
        assert_eq!(stored.get("editedBy"), Some(&RecordValue::from("u1")));
    }

    #[tokio::test]
    async fn test_update_not_owner() {
        let context = Context::new(MemoryStore::new());
        let doc = create(&context, &User::new("u1")).await;

        let err = update_mutator(UpdateMutator {
            collection: &posts(),
            document_id: doc.id().unwrap(),
            data: &RecordRoot::from([("title", "bye")]),
            current_user: Some(&User::new("u2")),
            validate: true,
            context: &context,
        })
        .await
        .unwrap_err();

        assert_eq!(
            err.validation_errors(),
            &[ValidationError::new(Reason::DisallowedProperty, "title")]
        );
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let context = Context::new(MemoryStore::new());
        let err = update_mutator(UpdateMutator {
            collection: &posts(),
            document_id: "nope",
            data: &RecordRoot::from([("title", "bye")]),
            current_user: None,
            validate: false,
            context: &context,
        })
        .await
        .unwrap_err();

        assert!(matches!(err, GatewayError::DocumentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let context = Context::new(MemoryStore::new());
        let doc = create(&context, &User::new("u1")).await;
        let id = doc.id().unwrap();

        let err = delete_mutator(DeleteMutator {
            collection: &posts(),
            document_id: id,
            current_user: Some(&User::new("u2")),
            validate: true,
            context: &context,
        })
        .await
        .unwrap_err();
        assert_eq!(err.validation_errors()[0].id, Reason::NotAllowed);

        let removed = delete_mutator(DeleteMutator {
            collection: &posts(),
            document_id: id,
            current_user: Some(&User::new("u1")),
            validate: true,
            context: &context,
        })
        .await
        .unwrap();
        assert_eq!(removed, doc);
        assert_eq!(context.store.get("Posts", id).await.unwrap(), None);
    }
}
