//! In-process product store.
//!
//! Keeps items in key order and pages scans the same way the Spanner backend
//! does, so handlers behave identically against either. Used for local runs
//! (`STORE_BACKEND=memory`) and throughout the handler tests, where it also
//! offers fault injection and a scan call counter.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::store::{Item, PRODUCT_ID, ProductStore, ScanPage, product_id_of};

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<BTreeMap<String, Item>>,
    /// Upper bound on items per scan page, regardless of the requested limit
    page_limit: Option<usize>,
    failures_pending: AtomicUsize,
    scan_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that never returns more than `page_limit` items per scan page
    #[cfg(test)]
    pub fn with_page_limit(page_limit: usize) -> Self {
        Self {
            page_limit: Some(page_limit.max(1)),
            ..Self::default()
        }
    }

    /// Make the next `count` operations fail with a store error
    #[cfg(test)]
    pub fn fail_next(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Number of `scan_page` calls served so far
    #[cfg(test)]
    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    fn check_injected_failure(&self, operation: &str) -> Result<()> {
        let consumed = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            bail!("injected failure during {}", operation);
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn get(&self, product_id: &str) -> Result<Option<Item>> {
        self.check_injected_failure("get")?;
        Ok(self.items.read().await.get(product_id).cloned())
    }

    async fn put(&self, item: Item) -> Result<()> {
        self.check_injected_failure("put")?;
        let product_id = product_id_of(&item)
            .ok_or_else(|| anyhow!("item has no {}", PRODUCT_ID))?
            .to_string();
        self.items.write().await.insert(product_id, item);
        Ok(())
    }

    async fn update_field(&self, product_id: &str, key: &str, value: JsonValue) -> Result<Item> {
        self.check_injected_failure("update")?;
        let mut items = self.items.write().await;
        let item = items.entry(product_id.to_string()).or_insert_with(|| {
            let mut fresh = Item::new();
            fresh.insert(PRODUCT_ID.to_string(), JsonValue::String(product_id.to_string()));
            fresh
        });
        item.insert(key.to_string(), value.clone());

        let mut updated = Item::new();
        updated.insert(key.to_string(), value);
        Ok(updated)
    }

    async fn delete(&self, product_id: &str) -> Result<Option<Item>> {
        self.check_injected_failure("delete")?;
        Ok(self.items.write().await.remove(product_id))
    }

    async fn scan_page(&self, start_after: Option<&str>, limit: usize) -> Result<ScanPage> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        self.check_injected_failure("scan")?;

        let limit = match self.page_limit {
            Some(page_limit) => limit.min(page_limit),
            None => limit,
        }
        .max(1);

        let items = self.items.read().await;
        let lower = match start_after {
            Some(token) => Bound::Excluded(token),
            None => Bound::Unbounded,
        };
        let mut remaining = items.range::<str, _>((lower, Bound::Unbounded));

        let page: Vec<(&String, &Item)> = remaining.by_ref().take(limit).collect();
        let continuation = match (remaining.next(), page.last()) {
            (Some(_), Some((last_key, _))) => Some((*last_key).clone()),
            _ => None,
        };

        Ok(ScanPage {
            items: page.into_iter().map(|(_, item)| item.clone()).collect(),
            continuation,
        })
    }

    async fn health_check(&self) -> Result<()> {
        self.check_injected_failure("health check")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: JsonValue) -> Item {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        let product = item(json!({ "productId": "p1", "name": "A", "price": 10 }));

        store.put(product.clone()).await.unwrap();
        assert_eq!(store.get("p1").await.unwrap(), Some(product.clone()));

        let old = store.delete("p1").await.unwrap();
        assert_eq!(old, Some(product));
        assert_eq!(store.get("p1").await.unwrap(), None);

        // Deleting again is not an error
        assert_eq!(store.delete("p1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_requires_product_id() {
        let store = MemoryStore::new();
        assert!(store.put(item(json!({ "name": "A" }))).await.is_err());
    }

    #[tokio::test]
    async fn test_update_field_existing_and_missing() {
        let store = MemoryStore::new();
        store
            .put(item(json!({ "productId": "p1", "name": "A", "price": 10 })))
            .await
            .unwrap();

        let updated = store.update_field("p1", "price", json!(20)).await.unwrap();
        assert_eq!(updated, item(json!({ "price": 20 })));
        assert_eq!(
            store.get("p1").await.unwrap(),
            Some(item(json!({ "productId": "p1", "name": "A", "price": 20 })))
        );

        store.update_field("p2", "name", json!("new")).await.unwrap();
        assert_eq!(
            store.get("p2").await.unwrap(),
            Some(item(json!({ "productId": "p2", "name": "new" })))
        );
    }

    #[tokio::test]
    async fn test_scan_page_tokens() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c"] {
            store.put(item(json!({ "productId": id }))).await.unwrap();
        }

        let first = store.scan_page(None, 2).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.continuation.as_deref(), Some("b"));

        let second = store.scan_page(Some("b"), 2).await.unwrap();
        assert_eq!(second.items, vec![item(json!({ "productId": "c" }))]);
        assert_eq!(second.continuation, None);
        assert_eq!(store.scan_calls(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = MemoryStore::new();
        store.fail_next(2);

        assert!(store.get("p1").await.is_err());
        assert!(store.health_check().await.is_err());
        assert!(store.get("p1").await.unwrap().is_none());
        assert!(store.health_check().await.is_ok());
    }
}
