use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

/// Attribute that identifies a product in the table
pub const PRODUCT_ID: &str = "productId";

/// A product record: arbitrary JSON fields keyed by `productId`
pub type Item = Map<String, JsonValue>;

/// One page of a table scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Token to pass as `start_after` for the next page; `None` once the scan is done
    pub continuation: Option<String>,
}

/// Storage boundary for the product table.
///
/// Every call is a single round trip to the backing store; implementations
/// hold no per-request state and are shared across handlers.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Point lookup. `Ok(None)` when the key does not exist.
    async fn get(&self, product_id: &str) -> Result<Option<Item>>;

    /// Create or replace the item stored under its `productId`.
    async fn put(&self, item: Item) -> Result<()>;

    /// Set a single attribute, creating the item if it is missing.
    ///
    /// Returns the updated attributes as stored.
    async fn update_field(&self, product_id: &str, key: &str, value: JsonValue) -> Result<Item>;

    /// Remove the item, returning its previous values if it existed.
    async fn delete(&self, product_id: &str) -> Result<Option<Item>>;

    /// Fetch up to `limit` items in key order, starting after the given token.
    async fn scan_page(&self, start_after: Option<&str>, limit: usize) -> Result<ScanPage>;

    /// Lightweight round trip used by the readiness check.
    async fn health_check(&self) -> Result<()>;
}

/// Read the whole table by following continuation tokens until the store reports none.
///
/// Fails if more than `max_pages` pages are needed or if the store returns the
/// token it was just given.
pub async fn scan_all(store: &dyn ProductStore, page_size: usize, max_pages: usize) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0;

    loop {
        if pages == max_pages {
            bail!("Table scan did not finish within {} pages", max_pages);
        }

        let page = store.scan_page(token.as_deref(), page_size).await?;
        pages += 1;
        items.extend(page.items);

        match page.continuation {
            None => break,
            Some(next) if token.as_deref() == Some(next.as_str()) => {
                bail!("Table scan made no progress past token '{}'", next);
            }
            Some(next) => token = Some(next),
        }
    }

    tracing::debug!("Scanned {} items in {} pages", items.len(), pages);
    Ok(items)
}

/// The item's `productId`, if it is a non-empty string
pub fn product_id_of(item: &Item) -> Option<&str> {
    item.get(PRODUCT_ID)
        .and_then(JsonValue::as_str)
        .filter(|id| !id.is_empty())
}
