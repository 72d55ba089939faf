use crate::{
    error::{FormError, Result},
    fragment::Fragment,
    parser::parse_fragments,
};
use std::collections::HashMap;
use tracing::debug;

/// Fragments that forms can refer to by name
#[derive(Debug, Default, Clone)]
pub struct FragmentRegistry {
    fragments: HashMap<String, Fragment>,
}

impl FragmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, fragment: Fragment) -> Result<()> {
        if self.fragments.contains_key(&fragment.name) {
            return Err(FormError::DuplicateFragment {
                name: fragment.name,
            });
        }

        debug!(name = %fragment.name, "fragment registered");
        self.fragments.insert(fragment.name.clone(), fragment);
        Ok(())
    }

    /// Registers every fragment defined in a GraphQL document
    pub fn register_str(&mut self, source: &str) -> Result<()> {
        for fragment in parse_fragments(source)? {
            self.register(fragment)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Fragment> {
        self.fragments.get(name)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
