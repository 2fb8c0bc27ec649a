//! Document store for contact messages. One short-lived connection per
//! request; callers must `close` it on every path.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Message;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("write rejected: {0}")]
    Write(String),
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn MessageConnection>, StoreError>;
}

#[async_trait]
pub trait MessageConnection: Send {
    /// Inserts into the messages collection and returns the assigned id.
    async fn insert(&mut self, message: &Message) -> Result<String, StoreError>;

    async fn close(&mut self);
}
