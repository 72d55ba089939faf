use crate::{
    error::{FormError, Result},
    fragment::Fragment,
    parser::parse_fragments,
    registry::FragmentRegistry,
};

/// A fragment handed to a form directly, either as GraphQL text or already
/// parsed
#[derive(Debug, Clone, PartialEq)]
pub enum ExplicitFragment {
    Literal(String),
    Parsed(Fragment),
}

impl From<&str> for ExplicitFragment {
    fn from(source: &str) -> Self {
        ExplicitFragment::Literal(source.to_string())
    }
}

impl From<String> for ExplicitFragment {
    fn from(source: String) -> Self {
        ExplicitFragment::Literal(source)
    }
}

impl From<Fragment> for ExplicitFragment {
    fn from(fragment: Fragment) -> Self {
        ExplicitFragment::Parsed(fragment)
    }
}

/// Where a form's fragment comes from, in decreasing order of precedence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FragmentSource<'a> {
    Explicit(&'a ExplicitFragment),
    Named(&'a str),
    Generated,
}

impl<'a> FragmentSource<'a> {
    /// Picks the highest precedence source that was provided
    pub fn select(explicit: Option<&'a ExplicitFragment>, name: Option<&'a str>) -> Self {
        match (explicit, name) {
            (Some(explicit), _) => FragmentSource::Explicit(explicit),
            (None, Some(name)) => FragmentSource::Named(name),
            (None, None) => FragmentSource::Generated,
        }
    }
}

/// Resolves a source to a fragment. Named fragments must exist in the
/// registry. `generate` is only called for [`FragmentSource::Generated`].
pub fn resolve_fragment(
    source: FragmentSource<'_>,
    registry: &FragmentRegistry,
    generate: impl FnOnce() -> Fragment,
) -> Result<Fragment> {
    match source {
        FragmentSource::Explicit(ExplicitFragment::Parsed(fragment)) => Ok(fragment.clone()),
        FragmentSource::Explicit(ExplicitFragment::Literal(source)) => {
            let mut fragments = parse_fragments(source)?;
            if fragments.len() != 1 {
                return Err(FormError::FragmentCount {
                    found: fragments.len(),
                });
            }
            Ok(fragments.remove(0))
        }
        FragmentSource::Named(name) => {
            registry
                .get(name)
                .cloned()
                .ok_or_else(|| FormError::UnknownFragment {
                    name: name.to_string(),
                })
        }
        FragmentSource::Generated => Ok(generate()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Selection;

    fn registry() -> FragmentRegistry {
        let mut registry = FragmentRegistry::new();
        registry
            .register_str("fragment Named on Movie { name }")
            .unwrap();
        registry
    }

    fn generated() -> Fragment {
        Fragment::new("Generated", "Movie", vec![Selection::field("_id")])
    }

    #[test]
    fn test_select_precedence() {
        let explicit = ExplicitFragment::from("fragment Explicit on Movie { _id }");

        assert_eq!(
            FragmentSource::select(Some(&explicit), Some("Named")),
            FragmentSource::Explicit(&explicit)
        );
        assert_eq!(
            FragmentSource::select(None, Some("Named")),
            FragmentSource::Named("Named")
        );
        assert_eq!(FragmentSource::select(None, None), FragmentSource::Generated);
    }

    #[test]
    fn test_resolve() {
        let registry = registry();

        let explicit = ExplicitFragment::from("fragment Explicit on Movie { _id }");
        let fragment =
            resolve_fragment(FragmentSource::Explicit(&explicit), &registry, generated).unwrap();
        assert_eq!(fragment.name, "Explicit");

        let parsed = ExplicitFragment::from(generated());
        let fragment =
            resolve_fragment(FragmentSource::Explicit(&parsed), &registry, || unreachable!())
                .unwrap();
        assert_eq!(fragment, generated());

        let fragment =
            resolve_fragment(FragmentSource::Named("Named"), &registry, generated).unwrap();
        assert_eq!(fragment.field_names(), vec!["name"]);

        let fragment = resolve_fragment(FragmentSource::Generated, &registry, generated).unwrap();
        assert_eq!(fragment.name, "Generated");
    }

    #[test]
    fn test_unknown_name_does_not_fall_back() {
        let err = resolve_fragment(FragmentSource::Named("Missing"), &registry(), || {
            panic!("generated")
        })
        .unwrap_err();
        assert!(matches!(err, FormError::UnknownFragment { name } if name == "Missing"));
    }

    #[test]
    fn test_literal_must_hold_one_fragment() {
        let explicit = ExplicitFragment::from("fragment A on Movie { _id } fragment B on Movie { _id }");
        let err = resolve_fragment(FragmentSource::Explicit(&explicit), &registry(), generated)
            .unwrap_err();
        assert!(matches!(err, FormError::FragmentCount { found: 2 }));

        let explicit = ExplicitFragment::from("fragment A on Movie {");
        let err = resolve_fragment(FragmentSource::Explicit(&explicit), &registry(), generated)
            .unwrap_err();
        assert!(matches!(err, FormError::Parse(_)));
    }
}
