use async_trait::async_trait;
use mongodb::{
    bson::doc,
    Client, Collection,
};
use tracing::{debug, info};

use super::{MessageConnection, MessageStore, StoreError};
use crate::{config::DatabaseConfig, models::Message};

pub struct MongoStore {
    uri: String,
    database: String,
    collection: String,
}

impl MongoStore {
    pub fn new(uri: impl Into<String>, config: &DatabaseConfig) -> Self {
        Self {
            uri: uri.into(),
            database: config.name.clone(),
            collection: config.collection.clone(),
        }
    }
}

#[async_trait]
impl MessageStore for MongoStore {
    async fn connect(&self) -> Result<Box<dyn MessageConnection>, StoreError> {
        let client = Client::with_uri_str(&self.uri).await?;
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(&self.database));

        // The driver connects lazily; ping so an unreachable server fails here.
        if let Err(e) = db.run_command(doc! { "ping": 1 }).await {
            client.shutdown().await;
            return Err(e.into());
        }

        debug!(database = db.name(), "connected to document store");
        Ok(Box::new(MongoConnection {
            messages: db.collection(&self.collection),
            client: Some(client),
        }))
    }
}

struct MongoConnection {
    client: Option<Client>,
    messages: Collection<Message>,
}

#[async_trait]
impl MessageConnection for MongoConnection {
    async fn insert(&mut self, message: &Message) -> Result<String, StoreError> {
        let result = self.messages.insert_one(message).await?;
        info!(inserted_id = %result.inserted_id, "stored contact message");
        result
            .inserted_id
            .as_object_id()
            .map(|id| id.to_hex())
            .ok_or_else(|| StoreError::Write(format!("unexpected id {}", result.inserted_id)))
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
        }
    }
}
