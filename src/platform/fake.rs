//! In-memory platform used by handler and service tests.

use super::{DocumentStore, Fields, Platform, PlatformError, PlatformResult, PushGateway, RealtimeStore};
use crate::domain::PushMessage;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

fn injected(message: &str) -> PlatformError {
    PlatformError::Api {
        service: "fake",
        status: 503,
        message: message.to_string(),
    }
}

#[derive(Default)]
pub struct FakeDocumentStore {
    /// collection -> (id, fields), kept in insertion order
    pub collections: Mutex<HashMap<String, Vec<(String, Fields)>>>,
    pub fail_with: Option<String>,
    pub list_calls: AtomicU64,
    pub get_calls: AtomicU64,
    pub set_calls: AtomicU64,
}

impl FakeDocumentStore {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn insert(&self, collection: &str, id: &str, data: Value) {
        let fields = data.as_object().cloned().unwrap_or_default();
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        docs.retain(|(existing, _)| existing != id);
        docs.push((id.to_string(), fields));
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Fields> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|docs| docs.iter().find(|(existing, _)| existing == id))
            .map(|(_, fields)| fields.clone())
    }

    pub fn calls(&self) -> u64 {
        self.list_calls.load(Ordering::SeqCst)
            + self.get_calls.load(Ordering::SeqCst)
            + self.set_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> PlatformResult<()> {
        match &self.fail_with {
            Some(message) => Err(injected(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn list_collection(&self, collection: &str) -> PlatformResult<Vec<Fields>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|docs| docs.iter().map(|(_, fields)| fields.clone()).collect())
            .unwrap_or_default())
    }

    async fn get_document(&self, collection: &str, id: &str) -> PlatformResult<Option<Fields>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.document(collection, id))
    }

    async fn set_document(&self, collection: &str, id: &str, data: &Value) -> PlatformResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        super::value::encode_document(data)?;
        self.insert(collection, id, data.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRealtimeStore {
    pub writes: Mutex<Vec<(String, Value)>>,
    pub fail_with: Option<String>,
}

impl FakeRealtimeStore {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<(String, Value)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RealtimeStore for FakeRealtimeStore {
    async fn set(&self, path: &str, value: &Value) -> PlatformResult<()> {
        if let Some(message) = &self.fail_with {
            return Err(injected(message));
        }
        self.writes.lock().unwrap().push((path.to_string(), value.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePushGateway {
    pub sent: Mutex<Vec<PushMessage>>,
    pub fail_with: Option<String>,
}

impl FakePushGateway {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushGateway for FakePushGateway {
    async fn send(&self, message: &PushMessage) -> PlatformResult<String> {
        if let Some(reason) = &self.fail_with {
            return Err(injected(reason));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("projects/fake/messages/{}", sent.len()))
    }
}

/// Fakes plus the platform handle wired to them.
pub struct FakePlatform {
    pub documents: Arc<FakeDocumentStore>,
    pub realtime: Arc<FakeRealtimeStore>,
    pub push: Arc<FakePushGateway>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::with(
            FakeDocumentStore::default(),
            FakeRealtimeStore::default(),
            FakePushGateway::default(),
        )
    }

    pub fn with(documents: FakeDocumentStore, realtime: FakeRealtimeStore, push: FakePushGateway) -> Self {
        Self {
            documents: Arc::new(documents),
            realtime: Arc::new(realtime),
            push: Arc::new(push),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform {
            documents: self.documents.clone(),
            realtime: self.realtime.clone(),
            push: self.push.clone(),
        }
    }
}
