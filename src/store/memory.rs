use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::{MessageConnection, MessageStore, StoreError};
use crate::models::Message;

/// In-process message store, used when no MongoDB URI is configured.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    messages: Mutex<Vec<Message>>,
    open: AtomicUsize,
    fail_connect: AtomicBool,
    fail_insert: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryStore {
    pub fn messages(&self) -> Vec<Message> {
        self.inner
            .messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Connections handed out and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.inner.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_insert(&self, fail: bool) {
        self.inner.fail_insert.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn MessageConnection>, StoreError> {
        if self.inner.fail_connect.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        self.inner.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            inner: Arc::clone(&self.inner),
            closed: false,
        }))
    }
}

struct MemoryConnection {
    inner: Arc<Inner>,
    closed: bool,
}

#[async_trait]
impl MessageConnection for MemoryConnection {
    async fn insert(&mut self, message: &Message) -> Result<String, StoreError> {
        if self.closed {
            return Err(StoreError::Write("connection closed".into()));
        }
        if self.inner.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Write("memory store rejected insert".into()));
        }

        let id = ObjectId::new().to_hex();
        let mut stored = message.clone();
        stored.id = Some(id.clone());
        self.inner
            .messages
            .lock()
            .map_err(|_| StoreError::Write("message list poisoned".into()))?
            .push(stored);
        Ok(id)
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inner.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
