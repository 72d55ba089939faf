use schema::RecordRoot;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("record {id:?} already exists in collection {collection:?}")]
    RecordExists { collection: String, id: String },

    #[error("record {id:?} not found in collection {collection:?}")]
    RecordNotFound { collection: String, id: String },
}

/// Persistence used by the mutators. Records are addressed by collection name
/// and `_id`.
#[async_trait::async_trait]
pub trait StoreAdaptor: Send + Sync {
    /// Stores a new record, failing if the id is taken
    async fn insert(&self, collection: &str, id: &str, record: &RecordRoot) -> Result<()>;

    /// Replaces an existing record, failing if it is missing
    async fn update(&self, collection: &str, id: &str, record: &RecordRoot) -> Result<()>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<RecordRoot>>;

    /// Removes a record, returning the removed value
    async fn delete(&self, collection: &str, id: &str) -> Result<Option<RecordRoot>>;
}
