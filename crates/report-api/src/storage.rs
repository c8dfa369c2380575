//! Read-only Redis views over persisted analysis records
//!
//! Two document shapes share one collection list: the single context record
//! (keyed by `analise_do_container`) and zero or more finding records
//! (keyed by `cve`). Documents are split by key presence, the same way the
//! pipeline wrote them.

use anyhow::{Context, Result};
use dockwatch_common::models::{collection_key, COLLECTIONS_INDEX_KEY};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::info;

/// Context records carry the image analysis under this field.
const CONTEXT_FIELD: &str = "analise_do_container";

/// Finding records carry the vulnerability detail under this field.
const FINDING_FIELD: &str = "cve";

/// Finding records served per page
pub const PAGE_SIZE: usize = 100;

/// One page of finding records
#[derive(Debug)]
pub struct FindingsPage {
    pub findings: Vec<Value>,
    pub page: usize,
    pub total_pages: usize,
    pub total_findings: usize,
}

/// Read-only storage handle
pub struct ReportStore {
    conn: ConnectionManager,
}

impl ReportStore {
    /// Create a new store instance
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }

    /// List every analyzed collection, sorted by name
    pub async fn list_collections(&mut self) -> Result<Vec<String>> {
        let mut collections: Vec<String> = self
            .conn
            .smembers(COLLECTIONS_INDEX_KEY)
            .await
            .context("Failed to read collection index")?;
        collections.sort();
        Ok(collections)
    }

    /// Whether a collection exists in the index
    pub async fn collection_exists(&mut self, collection: &str) -> Result<bool> {
        let exists: bool = self
            .conn
            .sismember(COLLECTIONS_INDEX_KEY, collection)
            .await
            .context("Failed to check collection index")?;
        Ok(exists)
    }

    /// The single context record of a collection, if present
    pub async fn context_record(&mut self, collection: &str) -> Result<Option<Value>> {
        let documents = self.documents(collection).await?;
        Ok(documents
            .into_iter()
            .find(|doc| doc.get(CONTEXT_FIELD).is_some()))
    }

    /// One page of a collection's finding records
    pub async fn findings_page(&mut self, collection: &str, page: usize) -> Result<FindingsPage> {
        let findings = self
            .documents(collection)
            .await?
            .into_iter()
            .filter(|doc| doc.get(FINDING_FIELD).is_some())
            .collect();

        Ok(paginate(findings, page))
    }

    async fn documents(&mut self, collection: &str) -> Result<Vec<Value>> {
        let raw: Vec<String> = self
            .conn
            .lrange(collection_key(collection), 0, -1)
            .await
            .context("Failed to read collection documents")?;

        // Unparseable documents are dropped rather than failing the view.
        Ok(raw
            .iter()
            .filter_map(|json| serde_json::from_str(json).ok())
            .collect())
    }
}

/// Slice a full finding list into one page. Pages are 1-based; an
/// out-of-range page yields an empty slice, never an error.
pub fn paginate(findings: Vec<Value>, page: usize) -> FindingsPage {
    let page = page.max(1);
    let total_findings = findings.len();
    let total_pages = total_findings.div_ceil(PAGE_SIZE).max(1);

    let start = (page - 1).saturating_mul(PAGE_SIZE);
    let findings = findings.into_iter().skip(start).take(PAGE_SIZE).collect();

    FindingsPage {
        findings,
        page,
        total_pages,
        total_findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn findings(count: usize) -> Vec<Value> {
        (0..count).map(|i| json!({ "cve": { "index": i } })).collect()
    }

    #[test]
    fn test_paginate_single_page() {
        let page = paginate(findings(3), 1);
        assert_eq!(page.findings.len(), 3);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_findings, 3);
    }

    #[test]
    fn test_paginate_splits_on_page_size() {
        let page = paginate(findings(PAGE_SIZE * 2 + 1), 3);
        assert_eq!(page.findings.len(), 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_findings, PAGE_SIZE * 2 + 1);

        let page = paginate(findings(PAGE_SIZE * 2 + 1), 2);
        assert_eq!(page.findings.len(), PAGE_SIZE);
    }

    #[test]
    fn test_paginate_out_of_range_page_is_empty() {
        let page = paginate(findings(5), 7);
        assert!(page.findings.is_empty());
        assert_eq!(page.total_findings, 5);
    }

    #[test]
    fn test_paginate_clamps_page_zero() {
        let page = paginate(findings(5), 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.findings.len(), 5);
    }

    #[test]
    fn test_paginate_empty_collection() {
        let page = paginate(Vec::new(), 1);
        assert!(page.findings.is_empty());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_findings, 0);
    }
}
