use crate::adaptor::{Error, Result, StoreAdaptor};
use schema::RecordRoot;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::debug;

/// In-process store, cheap to clone (clones share state)
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryStoreState>>,
}

#[derive(Default)]
struct MemoryStoreState {
    data: HashMap<String, HashMap<String, RecordRoot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored in a collection
    pub async fn count(&self, collection: &str) -> usize {
        let state = self.state.lock().await;
        state.data.get(collection).map_or(0, |c| c.len())
    }
}

#[async_trait::async_trait]
impl StoreAdaptor for MemoryStore {
    #[tracing::instrument(skip(self, record))]
    async fn insert(&self, collection: &str, id: &str, record: &RecordRoot) -> Result<()> {
        let mut state = self.state.lock().await;

        if state
            .data
            .get(collection)
            .map_or(false, |c| c.contains_key(id))
        {
            return Err(Error::RecordExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        state
            .data
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), record.clone());
        debug!("record inserted");

        Ok(())
    }

    #[tracing::instrument(skip(self, record))]
    async fn update(&self, collection: &str, id: &str, record: &RecordRoot) -> Result<()> {
        let mut state = self.state.lock().await;

        let Some(existing) = state
            .data
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
        else {
            return Err(Error::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };

        *existing = record.clone();
        debug!("record updated");

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<RecordRoot>> {
        let state = self.state.lock().await;

        Ok(state
            .data
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<Option<RecordRoot>> {
        let mut state = self.state.lock().await;

        let Some(collection) = state.data.get_mut(collection) else {
            return Ok(None);
        };

        Ok(collection.remove(id))
    }
}
