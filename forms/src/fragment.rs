use serde::Serialize;
use std::fmt::{self, Write};

/// A named selection of fields on a type, e.g.
/// `fragment MovieItem on Movie { _id name }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub name: String,
    pub type_condition: String,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Selection {
    Field {
        name: String,
        selections: Vec<Selection>,
    },
    /// `...OtherFragment`
    Spread { name: String },
}

impl Selection {
    pub fn field(name: impl Into<String>) -> Self {
        Selection::Field {
            name: name.into(),
            selections: vec![],
        }
    }
}

impl Fragment {
    pub fn new(
        name: impl Into<String>,
        type_condition: impl Into<String>,
        selections: Vec<Selection>,
    ) -> Self {
        Self {
            name: name.into(),
            type_condition: type_condition.into(),
            selections,
        }
    }

    /// Top level field names, spreads excluded
    pub fn field_names(&self) -> Vec<&str> {
        self.selections
            .iter()
            .filter_map(|s| match s {
                Selection::Field { name, .. } => Some(name.as_str()),
                Selection::Spread { .. } => None,
            })
            .collect()
    }

    pub fn to_graphql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_selection_set(&mut out, &self.selections, 1)?;
        write!(f, "fragment {} on {} {out}", self.name, self.type_condition)
    }
}

fn write_selection_set(out: &mut String, selections: &[Selection], depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    out.push_str("{\n");
    for selection in selections {
        match selection {
            Selection::Field { name, selections } if selections.is_empty() => {
                writeln!(out, "{indent}{name}")?
            }
            Selection::Field { name, selections } => {
                write!(out, "{indent}{name} ")?;
                write_selection_set(out, selections, depth + 1)?;
                out.push('\n');
            }
            Selection::Spread { name } => writeln!(out, "{indent}...{name}")?,
        }
    }
    write!(out, "{}}}", "  ".repeat(depth - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_graphql() {
        let fragment = Fragment::new(
            "MovieItem",
            "Movie",
            vec![
                Selection::field("_id"),
                Selection::Field {
                    name: "director".to_string(),
                    selections: vec![Selection::field("name")],
                },
                Selection::Spread {
                    name: "MovieDates".to_string(),
                },
            ],
        );

        assert_eq!(
            fragment.to_graphql(),
            "fragment MovieItem on Movie {\n  _id\n  director {\n    name\n  }\n  ...MovieDates\n}"
        );
        assert_eq!(fragment.field_names(), vec!["_id", "director"]);
    }
}
