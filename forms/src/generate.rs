use crate::{
    form::FormMode,
    fragment::{Fragment, Selection},
};
use schema::{Schema, ID_FIELD};
use serde::Serialize;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FragmentKind {
    /// Fields loaded into the form
    Query,
    /// Fields returned by the mutation
    Mutation,
}

impl Display for FragmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FragmentKind::Query => write!(f, "Query"),
            FragmentKind::Mutation => write!(f, "Mutation"),
        }
    }
}

/// e.g. `MoviesEditFormQueryFragment`
pub fn fragment_name(collection_name: &str, mode: FormMode, kind: FragmentKind) -> String {
    format!("{collection_name}{mode}Form{kind}Fragment")
}

/// e.g. `MoviesEditFormQuery`
pub fn query_name(collection_name: &str, mode: FormMode) -> String {
    format!("{collection_name}{mode}FormQuery")
}

/// Fields a form shows: writable in `mode`, readable by someone, and within
/// `fields` when given. Schema order is kept.
pub fn form_fields<'a>(
    schema: &'a Schema,
    mode: FormMode,
    fields: Option<&[String]>,
) -> Vec<&'a str> {
    schema
        .properties()
        .filter(|p| p.name != ID_FIELD && p.is_readable())
        .filter(|p| match mode {
            FormMode::New => p.is_insertable(),
            FormMode::Edit => p.is_editable(),
        })
        .filter(|p| fields.map_or(true, |fields| fields.iter().any(|f| *f == p.name)))
        .map(|p| p.name.as_str())
        .collect()
}

pub struct FragmentSpec<'a> {
    pub collection_name: &'a str,
    pub type_name: &'a str,
    pub schema: &'a Schema,
    pub mode: FormMode,
    pub kind: FragmentKind,
    pub fields: Option<&'a [String]>,
    pub added_fields: &'a [String],
}

/// Builds the default fragment of a form: `_id`, the form fields and any
/// `added_fields`
pub fn generate_fragment(spec: FragmentSpec<'_>) -> Fragment {
    let mut names = vec![ID_FIELD];
    names.extend(form_fields(spec.schema, spec.mode, spec.fields));
    for added in spec.added_fields {
        if !names.contains(&added.as_str()) {
            names.push(added.as_str());
        }
    }

    Fragment::new(
        fragment_name(spec.collection_name, spec.mode, spec.kind),
        spec.type_name,
        names.into_iter().map(Selection::field).collect(),
    )
}
