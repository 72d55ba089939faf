#![warn(clippy::unwrap_used, clippy::expect_used)]

pub mod callbacks;
mod id;
mod mutator;

use callbacks::{CallbackError, Callbacks, Channel, ChannelError};
use schema::ValidationError;
use std::sync::Arc;
use store::StoreAdaptor;

pub use id::generate_id;
pub use mutator::{
    create_mutator, delete_mutator, update_mutator, CreateMutator, DeleteMutator, UpdateMutator,
};

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("validation failed: {}", display_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("document {id:?} not found in collection {collection:?}")]
    DocumentNotFound { collection: String, id: String },

    #[error("callback on {channel} failed")]
    Callback {
        channel: Channel,
        #[source]
        source: CallbackError,
    },

    #[error("channel error")]
    Channel(#[from] ChannelError),

    #[error("store error")]
    Store(#[from] store::Error),
}

impl GatewayError {
    /// Validation errors, empty for any other kind of failure
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            GatewayError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

fn display_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Everything a mutator needs besides its arguments. Cheap to clone, clones
/// share the store and the callback registry.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn StoreAdaptor>,
    pub callbacks: Arc<Callbacks>,
}

impl Context {
    pub fn new(store: impl StoreAdaptor + 'static) -> Self {
        Self {
            store: Arc::new(store),
            callbacks: Arc::new(Callbacks::new()),
        }
    }

    pub fn with_callbacks(mut self, callbacks: Arc<Callbacks>) -> Self {
        self.callbacks = callbacks;
        self
    }
}
