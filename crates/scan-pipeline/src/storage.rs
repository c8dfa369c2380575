//! Redis-backed persistence sink for analysis records
//!
//! One Redis list per analyzed image holds the collection's documents in
//! insertion order; an index set names every collection. Records are
//! insert-only: nothing in the pipeline updates or deletes them.

use async_trait::async_trait;
use dockwatch_common::models::{collection_key, COLLECTIONS_INDEX_KEY};
use dockwatch_common::{ContextRecord, Error, FindingRecord, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Serialize;
use tracing::{debug, info};

/// Destination for persisted analysis records.
///
/// The orchestrator only needs append semantics, so the sink is a trait and
/// tests can substitute an in-memory implementation.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Append the per-image context record to a collection.
    async fn insert_context(&mut self, collection: &str, record: &ContextRecord) -> Result<()>;

    /// Append one finding record to a collection.
    async fn insert_finding(&mut self, collection: &str, record: &FindingRecord) -> Result<()>;
}

/// Production sink backed by Redis
pub struct Storage {
    conn: ConnectionManager,
}

impl Storage {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| anyhow::anyhow!("Failed to create Redis client: {e}"))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Redis: {e}"))?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }

    async fn push_document<T: Serialize + Sync>(
        &mut self,
        collection: &str,
        document: &T,
    ) -> Result<()> {
        let json = serde_json::to_string(document)?;

        let key = collection_key(collection);
        let _: () = self
            .conn
            .rpush(&key, json)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        // Register the collection in the index so the report views can
        // enumerate analyzed images.
        let _: () = self
            .conn
            .sadd(COLLECTIONS_INDEX_KEY, collection)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        debug!("Appended document to collection '{}'", collection);
        Ok(())
    }
}

#[async_trait]
impl RecordSink for Storage {
    async fn insert_context(&mut self, collection: &str, record: &ContextRecord) -> Result<()> {
        self.push_document(collection, record).await
    }

    async fn insert_finding(&mut self, collection: &str, record: &FindingRecord) -> Result<()> {
        self.push_document(collection, record).await
    }
}
