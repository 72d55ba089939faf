use crate::errors::{AppError, Result};
use schema::Collection;
use std::{collections::HashMap, fs, path::Path, sync::Arc};
use tracing::{debug, info};

/// Collections keyed by name
pub type Collections = HashMap<String, Arc<Collection>>;

/// Loads every `*.json` collection definition in `dir`. A missing directory
/// yields no collections.
pub fn load_collections(dir: &Path) -> Result<Collections> {
    let mut collections = Collections::new();
    if !dir.exists() {
        info!(dir = %dir.display(), "collections directory does not exist");
        return Ok(collections);
    }

    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    for path in paths {
        if path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }

        let definition = fs::read_to_string(&path)?;
        let collection = Collection::from_json_str(&definition)
            .map_err(|source| AppError::Definition {
                path: path.clone(),
                source,
            })?;

        let name = collection.name().to_string();
        if collections.contains_key(&name) {
            return Err(AppError::DuplicateCollection { name });
        }

        debug!(collection = %name, path = %path.display(), "collection loaded");
        collections.insert(name, Arc::new(collection));
    }

    info!(count = collections.len(), "collections loaded");
    Ok(collections)
}
