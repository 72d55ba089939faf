use crate::{
    error::{FormError, Result},
    fragment::Fragment,
    generate::{form_fields, generate_fragment, query_name, FragmentKind, FragmentSpec},
    registry::FragmentRegistry,
    source::{resolve_fragment, ExplicitFragment, FragmentSource},
};
use schema::{Collection, RecordRoot, Schema, ID_FIELD};
use serde::Serialize;
use std::{fmt::Display, sync::Arc};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormMode {
    New,
    Edit,
}

impl Display for FormMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormMode::New => write!(f, "New"),
            FormMode::Edit => write!(f, "Edit"),
        }
    }
}

/// Per-instantiation settings of a form
#[derive(Debug, Clone)]
pub struct FormConfig {
    pub collection: Arc<Collection>,
    /// Editing this document when set, creating a new one otherwise
    pub document_id: Option<String>,
    /// Overrides the collection schema for field selection
    pub schema: Option<Schema>,
    pub fields: Option<Vec<String>>,
    pub added_fields: Vec<String>,
    pub query_fragment: Option<ExplicitFragment>,
    pub query_fragment_name: Option<String>,
    pub mutation_fragment: Option<ExplicitFragment>,
    pub mutation_fragment_name: Option<String>,
}

impl FormConfig {
    pub fn new(collection: Arc<Collection>) -> Self {
        Self {
            collection,
            document_id: None,
            schema: None,
            fields: None,
            added_fields: vec![],
            query_fragment: None,
            query_fragment_name: None,
            mutation_fragment: None,
            mutation_fragment_name: None,
        }
    }

    pub fn document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn added_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.added_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn query_fragment(mut self, fragment: impl Into<ExplicitFragment>) -> Self {
        self.query_fragment = Some(fragment.into());
        self
    }

    pub fn query_fragment_name(mut self, name: impl Into<String>) -> Self {
        self.query_fragment_name = Some(name.into());
        self
    }

    pub fn mutation_fragment(mut self, fragment: impl Into<ExplicitFragment>) -> Self {
        self.mutation_fragment = Some(fragment.into());
        self
    }

    pub fn mutation_fragment_name(mut self, name: impl Into<String>) -> Self {
        self.mutation_fragment_name = Some(name.into());
        self
    }

    pub fn mode(&self) -> FormMode {
        match self.document_id {
            Some(_) => FormMode::Edit,
            None => FormMode::New,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    CacheFirst,
    NetworkOnly,
}

/// Fetches the document being edited
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleQuery {
    pub query_name: String,
    pub collection_name: String,
    pub document_id: String,
    pub fragment_name: String,
    pub fetch_policy: FetchPolicy,
    /// Milliseconds, `None` disables polling
    pub poll_interval: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationBinding {
    pub collection_name: String,
    pub fragment_name: String,
}

/// One wrapper around the form, listed outermost first
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Layer {
    Single(SingleQuery),
    Create(MutationBinding),
    Update(MutationBinding),
    Delete(MutationBinding),
    LoadingGate,
    Form { fields: Vec<String> },
}

/// Request a form emits on submit, served by the collection mutators
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum MutationRequest {
    #[serde(rename_all = "camelCase")]
    Create {
        collection_name: String,
        fragment_name: String,
        document: RecordRoot,
    },
    #[serde(rename_all = "camelCase")]
    Update {
        collection_name: String,
        fragment_name: String,
        document_id: String,
        data: RecordRoot,
    },
    #[serde(rename_all = "camelCase")]
    Delete {
        collection_name: String,
        fragment_name: String,
        document_id: String,
    },
}

/// A form with its data bindings resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormWrapper {
    mode: FormMode,
    collection_name: String,
    type_name: String,
    document_id: Option<String>,
    query_fragment: Fragment,
    mutation_fragment: Fragment,
    layers: Vec<Layer>,
}

impl FormWrapper {
    pub fn build(config: &FormConfig, registry: &FragmentRegistry) -> Result<Self> {
        let mode = config.mode();
        let collection = &config.collection;
        let schema = config.schema.as_ref().unwrap_or(collection.schema());
        let fields = config.fields.as_deref();

        let resolve = |kind, explicit: Option<&ExplicitFragment>, name: Option<&String>| {
            let source = FragmentSource::select(explicit, name.map(String::as_str));
            resolve_fragment(source, registry, || {
                generate_fragment(FragmentSpec {
                    collection_name: collection.name(),
                    type_name: collection.type_name(),
                    schema,
                    mode,
                    kind,
                    fields,
                    added_fields: &config.added_fields,
                })
            })
        };

        let query_fragment = resolve(
            FragmentKind::Query,
            config.query_fragment.as_ref(),
            config.query_fragment_name.as_ref(),
        )?;
        let mutation_fragment = resolve(
            FragmentKind::Mutation,
            config.mutation_fragment.as_ref(),
            config.mutation_fragment_name.as_ref(),
        )?;

        let binding = || MutationBinding {
            collection_name: collection.name().to_string(),
            fragment_name: mutation_fragment.name.clone(),
        };
        let form = Layer::Form {
            fields: form_fields(schema, mode, fields)
                .into_iter()
                .map(String::from)
                .collect(),
        };

        let layers = match &config.document_id {
            None => vec![Layer::Create(binding()), form],
            Some(document_id) => vec![
                Layer::Single(SingleQuery {
                    query_name: query_name(collection.name(), mode),
                    collection_name: collection.name().to_string(),
                    document_id: document_id.clone(),
                    fragment_name: query_fragment.name.clone(),
                    fetch_policy: FetchPolicy::NetworkOnly,
                    poll_interval: None,
                }),
                Layer::Update(binding()),
                Layer::Delete(binding()),
                Layer::LoadingGate,
                form,
            ],
        };

        debug!(
            collection = collection.name(),
            %mode,
            query_fragment = %query_fragment.name,
            mutation_fragment = %mutation_fragment.name,
            "form wrapper built"
        );

        Ok(Self {
            mode,
            collection_name: collection.name().to_string(),
            type_name: collection.type_name().to_string(),
            document_id: config.document_id.clone(),
            query_fragment,
            mutation_fragment,
            layers,
        })
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn query_fragment(&self) -> &Fragment {
        &self.query_fragment
    }

    pub fn mutation_fragment(&self) -> &Fragment {
        &self.mutation_fragment
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The document fetch of an edit form
    pub fn single_query(&self) -> Option<&SingleQuery> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Single(query) => Some(query),
            _ => None,
        })
    }

    pub fn has_loading_gate(&self) -> bool {
        self.layers.contains(&Layer::LoadingGate)
    }

    /// Turns submitted form values into a create or update request. `_id` is
    /// never sent as a value.
    pub fn submit(&self, mut values: RecordRoot) -> MutationRequest {
        values.remove(ID_FIELD);

        let collection_name = self.collection_name.clone();
        let fragment_name = self.mutation_fragment.name.clone();
        match &self.document_id {
            None => MutationRequest::Create {
                collection_name,
                fragment_name,
                document: values,
            },
            Some(document_id) => MutationRequest::Update {
                collection_name,
                fragment_name,
                document_id: document_id.clone(),
                data: values,
            },
        }
    }

    pub fn delete(&self) -> Result<MutationRequest> {
        let Some(document_id) = &self.document_id else {
            return Err(FormError::RequiresEditMode { action: "delete" });
        };

        Ok(MutationRequest::Delete {
            collection_name: self.collection_name.clone(),
            fragment_name: self.mutation_fragment.name.clone(),
            document_id: document_id.clone(),
        })
    }
}
