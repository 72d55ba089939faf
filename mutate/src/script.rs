//! JSON-lines mutation scripts.
//!
//! Each non-blank line is one entry:
//!
//! ```text
//! {"op": "create", "collection": "Movies", "document": {"name": "Alien"}, "user": {"_id": "u1"}}
//! {"op": "update", "collection": "Movies", "documentId": "$1", "data": {"year": 1979}}
//! {"op": "delete", "collection": "Movies", "documentId": "$1", "validate": false}
//! ```
//!
//! `$<line>` refers to the document produced by an earlier line. One JSON
//! result is written per entry. Failed entries are reported and the script
//! carries on.

use crate::{
    errors::{AppError, Result},
    loader::Collections,
};
use gateway::{
    callbacks::{CallbackError, Callbacks},
    create_mutator, delete_mutator, update_mutator, Context, CreateMutator, DeleteMutator,
    GatewayError, UpdateMutator,
};
use schema::{RecordRoot, User, ValidationError};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    io::{BufRead, Write},
};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum ScriptEntry {
    #[serde(rename_all = "camelCase")]
    Create {
        collection: String,
        document: RecordRoot,
        #[serde(default)]
        user: Option<User>,
        #[serde(default = "validate_by_default")]
        validate: bool,
    },
    #[serde(rename_all = "camelCase")]
    Update {
        collection: String,
        document_id: String,
        data: RecordRoot,
        #[serde(default)]
        user: Option<User>,
        #[serde(default = "validate_by_default")]
        validate: bool,
    },
    #[serde(rename_all = "camelCase")]
    Delete {
        collection: String,
        document_id: String,
        #[serde(default)]
        user: Option<User>,
        #[serde(default = "validate_by_default")]
        validate: bool,
    },
}

fn validate_by_default() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct EntryResult {
    line: usize,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<RecordRoot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<ValidationError>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScriptSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Why a single entry failed
#[derive(Debug, thiserror::Error)]
enum EntryError {
    #[error("collection {0:?} not found")]
    CollectionNotFound(String),

    #[error("reference {0:?} does not point at an earlier document")]
    BadReference(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub struct ScriptRunner<'a> {
    collections: &'a Collections,
    context: Context,
    /// Ids of documents produced by earlier lines
    ids: HashMap<usize, String>,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(collections: &'a Collections, context: Context) -> Self {
        Self {
            collections,
            context,
            ids: HashMap::new(),
        }
    }

    pub async fn run(&mut self, input: impl BufRead, output: &mut impl Write) -> Result<ScriptSummary> {
        let mut summary = ScriptSummary::default();

        for (index, line) in input.lines().enumerate() {
            let line_no = index + 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let entry = serde_json::from_str::<ScriptEntry>(&line).map_err(|source| {
                AppError::ScriptEntry {
                    line: line_no,
                    source,
                }
            })?;

            let result = match self.apply(entry).await {
                Ok(document) => {
                    if let Some(id) = document.id() {
                        self.ids.insert(line_no, id.to_string());
                    }
                    summary.succeeded += 1;
                    EntryResult {
                        line: line_no,
                        ok: true,
                        document: Some(document),
                        error: None,
                        errors: vec![],
                    }
                }
                Err(err) => {
                    warn!(line = line_no, error = %err, "script entry failed");
                    summary.failed += 1;
                    let errors = match &err {
                        EntryError::Gateway(err) => err.validation_errors().to_vec(),
                        _ => vec![],
                    };
                    EntryResult {
                        line: line_no,
                        ok: false,
                        document: None,
                        error: Some(error_chain(&err)),
                        errors,
                    }
                }
            };

            serde_json::to_writer(&mut *output, &result)?;
            writeln!(output)?;
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "script finished"
        );
        Ok(summary)
    }

    async fn apply(&self, entry: ScriptEntry) -> std::result::Result<RecordRoot, EntryError> {
        let context = &self.context;
        match entry {
            ScriptEntry::Create {
                collection,
                document,
                user,
                validate,
            } => Ok(create_mutator(CreateMutator {
                collection: self.collection(&collection)?,
                document: &document,
                current_user: user.as_ref(),
                validate,
                context,
            })
            .await?),
            ScriptEntry::Update {
                collection,
                document_id,
                data,
                user,
                validate,
            } => Ok(update_mutator(UpdateMutator {
                collection: self.collection(&collection)?,
                document_id: self.resolve_id(&document_id)?,
                data: &data,
                current_user: user.as_ref(),
                validate,
                context,
            })
            .await?),
            ScriptEntry::Delete {
                collection,
                document_id,
                user,
                validate,
            } => Ok(delete_mutator(DeleteMutator {
                collection: self.collection(&collection)?,
                document_id: self.resolve_id(&document_id)?,
                current_user: user.as_ref(),
                validate,
                context,
            })
            .await?),
        }
    }

    fn collection(&self, name: &str) -> std::result::Result<&schema::Collection, EntryError> {
        self.collections
            .get(name)
            .map(|c| c.as_ref())
            .ok_or_else(|| EntryError::CollectionNotFound(name.to_string()))
    }

    /// `$<line>` is replaced by the id produced on that line
    fn resolve_id<'b>(&'b self, id: &'b str) -> std::result::Result<&'b str, EntryError> {
        let Some(reference) = id.strip_prefix('$') else {
            return Ok(id);
        };

        reference
            .parse::<usize>()
            .ok()
            .and_then(|line| self.ids.get(&line))
            .map(String::as_str)
            .ok_or_else(|| EntryError::BadReference(id.to_string()))
    }
}

/// Logs every persisted change of every collection
pub fn register_audit_callbacks(callbacks: &Callbacks, collections: &Collections) -> Result<()> {
    for collection in collections.values() {
        for op in ["create", "update", "delete"] {
            let name = collection.name().to_string();
            callbacks.add_async(
                &format!("{}.{op}.async", collection.type_name()),
                move |props| {
                    let name = name.clone();
                    async move {
                        info!(
                            collection = %name,
                            id = props.document.id().unwrap_or_default(),
                            "document {op}d"
                        );
                        Ok::<_, CallbackError>(())
                    }
                },
            )?;
        }
    }
    Ok(())
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schema::Collection;
    use std::sync::Arc;
    use store::MemoryStore;

    fn collections() -> Collections {
        let movies = Collection::from_json_str(
            r#"{
                "collectionName": "Movies",
                "typeName": "Movie",
                "schema": {
                    "name": { "type": "String", "canCreate": ["members"], "canRead": ["guests"], "canUpdate": ["owners"] },
                    "year": { "type": "Number", "optional": true, "canCreate": ["members"], "canRead": ["guests"], "canUpdate": ["owners"] },
                    "userId": { "type": "String", "optional": true, "canRead": ["guests"] },
                    "status": { "type": "String", "optional": true, "canRead": ["admins"], "onCreate": { "value": "draft" } }
                }
            }"#,
        )
        .unwrap();
        Collections::from([("Movies".to_string(), Arc::new(movies))])
    }

    async fn run(script: &str) -> (ScriptSummary, Vec<serde_json::Value>) {
        let collections = collections();
        let callbacks = Callbacks::new();
        register_audit_callbacks(&callbacks, &collections).unwrap();
        let context = Context::new(MemoryStore::new()).with_callbacks(Arc::new(callbacks));

        let mut output = vec![];
        let summary = ScriptRunner::new(&collections, context)
            .run(script.as_bytes(), &mut output)
            .await
            .unwrap();

        let lines = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (summary, lines)
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let (summary, results) = run(r#"
{"op": "create", "collection": "Movies", "document": {"name": "Alien"}, "user": {"_id": "u1"}}
{"op": "update", "collection": "Movies", "documentId": "$2", "data": {"year": 1979}, "user": {"_id": "u1"}}
{"op": "delete", "collection": "Movies", "documentId": "$2", "user": {"_id": "u1"}}
"#)
        .await;

        assert_eq!(summary, ScriptSummary { succeeded: 3, failed: 0 });
        assert_eq!(results.len(), 3);

        let created = &results[0]["document"];
        assert_eq!(created["name"], "Alien");
        assert_eq!(created["userId"], "u1");
        assert!(created.get("status").is_none());

        assert_eq!(results[1]["document"]["year"], 1979.0);
        assert_eq!(results[2]["document"]["_id"], created["_id"]);
    }

    #[tokio::test]
    async fn test_failures_are_reported() {
        let (summary, results) = run(r#"{"op": "create", "collection": "Movies", "document": {"name": "Alien"}}
{"op": "create", "collection": "Shows", "document": {"name": "Lost"}}
{"op": "delete", "collection": "Movies", "documentId": "$9"}"#)
        .await;

        assert_eq!(summary, ScriptSummary { succeeded: 0, failed: 3 });
        assert_eq!(results[0]["ok"], false);
        assert_eq!(results[0]["errors"][0]["id"], "errors.disallowed_property_detected");
        assert_eq!(results[0]["errors"][0]["field"], "name");
        assert_eq!(results[1]["error"], "collection \"Shows\" not found");
        assert_eq!(
            results[2]["error"],
            "reference \"$9\" does not point at an earlier document"
        );
    }

    #[tokio::test]
    async fn test_malformed_entry_aborts() {
        let collections = collections();
        let mut runner = ScriptRunner::new(&collections, Context::new(MemoryStore::new()));
        let err = runner
            .run(r#"{"op": "rename"}"#.as_bytes(), &mut Vec::<u8>::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ScriptEntry { line: 1, .. }));
    }
}
