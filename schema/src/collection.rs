use crate::{
    error::{Result, UserError},
    schema::{PropertyDefinition, Schema},
};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A named, schema-governed set of documents, e.g. collection `Movies` holding
/// documents of type `Movie`
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    type_name: String,
    schema: Schema,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionDefinition {
    collection_name: String,
    type_name: String,
    schema: BTreeMap<String, PropertyDefinition>,
}

impl Collection {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, schema: Schema) -> Result<Self> {
        let name = name.into();
        let type_name = type_name.into();

        if name.is_empty() {
            return Err(UserError::CollectionNameEmpty.into());
        }

        if type_name.is_empty() {
            return Err(UserError::TypeNameEmpty { collection: name }.into());
        }

        Ok(Self {
            name,
            type_name,
            schema,
        })
    }

    /// Loads a collection from its JSON definition:
    /// `{"collectionName": .., "typeName": .., "schema": {field: descriptor}}`
    pub fn from_json_str(definition: &str) -> Result<Self> {
        let CollectionDefinition {
            collection_name,
            type_name,
            schema,
        } = serde_json::from_str(definition)?;

        Self::new(collection_name, type_name, Schema::from_definitions(schema)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}
