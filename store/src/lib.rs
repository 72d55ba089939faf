#![warn(clippy::unwrap_used, clippy::expect_used)]

mod adaptor;
mod memory;

pub use adaptor::{Error, Result, StoreAdaptor};
pub use memory::MemoryStore;
