//! Capability interfaces implemented by cloud backends.
//!
//! A backend may return a `tonic::Status` within its error
//! to choose the gRPC code reported to the caller.

use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKey {
    pub collection: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: DocumentKey,
    pub content: serde_json::Value,
}

#[async_trait]
pub trait DocumentPlugin: Send + Sync {
    async fn get(&self, key: &DocumentKey) -> anyhow::Result<Document>;
    async fn set(&self, key: &DocumentKey, content: serde_json::Value) -> anyhow::Result<()>;
    async fn delete(&self, key: &DocumentKey) -> anyhow::Result<()>;
}

#[async_trait]
pub trait StoragePlugin: Send + Sync {
    async fn read(&self, bucket: &str, key: &str) -> anyhow::Result<Bytes>;
    async fn write(&self, bucket: &str, key: &str, body: Bytes) -> anyhow::Result<()>;
    async fn delete(&self, bucket: &str, key: &str) -> anyhow::Result<()>;
}

/// Task is a unit of work on a queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    /// Lease of a received task, with which it's completed.
    pub lease_id: String,
    pub payload_type: String,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait QueuePlugin: Send + Sync {
    async fn send(&self, queue: &str, task: Task) -> anyhow::Result<()>;
    /// Receive up to `depth` tasks, leasing each to the caller.
    async fn receive(&self, queue: &str, depth: u32) -> anyhow::Result<Vec<Task>>;
    async fn complete(&self, queue: &str, lease_id: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub payload_type: String,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait EventPlugin: Send + Sync {
    /// Publish `event` to `topic`. The event id is always populated.
    async fn publish(&self, topic: &str, event: Event) -> anyhow::Result<()>;
    async fn list_topics(&self) -> anyhow::Result<Vec<String>>;
}

#[async_trait]
pub trait UserPlugin: Send + Sync {
    async fn create(&self, tenant: &str, id: &str, email: &str, password: &str)
        -> anyhow::Result<()>;
    async fn delete(&self, tenant: &str, id: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait KeyValuePlugin: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> anyhow::Result<serde_json::Value>;
    async fn put(&self, collection: &str, key: &str, value: serde_json::Value)
        -> anyhow::Result<()>;
    async fn delete(&self, collection: &str, key: &str) -> anyhow::Result<()>;
}
