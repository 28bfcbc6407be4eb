use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use gcloud_gax::grpc::{Code, Status};
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig, Error as SpannerError};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete, insert_or_update};
use gcloud_spanner::statement::Statement;
use gcloud_spanner::value::CommitTimestamp;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::config::SpannerConfig;
use crate::store::{Item, PRODUCT_ID, ProductStore, ScanPage, product_id_of};

const TABLE: &str = "product_inventory";

/// Shareable Spanner client for use across async handlers
#[derive(Clone)]
pub struct SpannerClient {
    inner: Arc<Client>,
}

impl SpannerClient {
    /// Connect to the configured product database, provisioning it first.
    ///
    /// `ClientConfig::default()` picks up `SPANNER_EMULATOR_HOST`, so the
    /// same path serves the emulator and production Spanner.
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        auto_provision(config).await?;

        let database_path = config.database_path();

        match &config.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
        })
    }
}

#[async_trait]
impl ProductStore for SpannerClient {
    async fn get(&self, product_id: &str) -> Result<Option<Item>> {
        let mut statement = Statement::new(
            "SELECT item FROM product_inventory WHERE product_id = @product_id"
        );
        statement.add_param("product_id", &product_id.to_string());

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query product from Spanner")?;

        if let Some(row) = result_set.next().await? {
            let item_str: String = row.column_by_name("item")?;
            let item: Item = serde_json::from_str(&item_str)
                .context("Failed to deserialize stored product")?;

            tracing::debug!("Read product: {}", product_id);
            Ok(Some(item))
        } else {
            tracing::debug!("Product not found: {}", product_id);
            Ok(None)
        }
    }

    /// Upsert the item under its `productId`
    ///
    /// Both `created_at` and `updated_at` are set to the commit timestamp,
    /// so a replaced item counts as newly created.
    async fn put(&self, item: Item) -> Result<()> {
        let product_id = product_id_of(&item)
            .context("Product has no productId")?
            .to_string();
        let item_str = serde_json::to_string(&item)
            .context("Failed to serialize product")?;

        let mutation = insert_or_update(
            TABLE,
            &["product_id", "item", "created_at", "updated_at"],
            &[&product_id, &item_str, &CommitTimestamp::new(), &CommitTimestamp::new()],
        );

        self.inner
            .apply(vec![mutation])
            .await
            .context("Failed to upsert product to Spanner")?;

        tracing::debug!("Upserted product: {}", product_id);
        Ok(())
    }

    /// Set one attribute inside a read-write transaction
    ///
    /// The attribute name only ever travels inside the JSON document, so it
    /// cannot collide with SQL keywords.
    async fn update_field(&self, product_id: &str, key: &str, value: JsonValue) -> Result<Item> {
        let (_, updated) = self
            .inner
            .read_write_transaction(|tx| {
                let product_id = product_id.to_string();
                let key = key.to_string();
                let value = value.clone();
                Box::pin(async move {
                    let mut statement = Statement::new(
                        "SELECT item FROM product_inventory WHERE product_id = @product_id"
                    );
                    statement.add_param("product_id", &product_id);

                    let existing: Option<String> = {
                        let mut rows = tx.query(statement).await?;
                        match rows.next().await? {
                            Some(row) => Some(row.column_by_name("item").map_err(corrupt_row)?),
                            None => None,
                        }
                    };

                    let mut item = match &existing {
                        Some(item_str) => serde_json::from_str::<Item>(item_str).map_err(corrupt_row)?,
                        None => {
                            let mut fresh = Item::new();
                            fresh.insert(PRODUCT_ID.to_string(), JsonValue::String(product_id.clone()));
                            fresh
                        }
                    };
                    item.insert(key.clone(), value.clone());
                    let item_str = serde_json::to_string(&item).map_err(corrupt_row)?;

                    // Upsert either way: a concurrent put may create the row before commit
                    let mutation = if existing.is_some() {
                        insert_or_update(
                            TABLE,
                            &["product_id", "item", "updated_at"],
                            &[&product_id, &item_str, &CommitTimestamp::new()],
                        )
                    } else {
                        insert_or_update(
                            TABLE,
                            &["product_id", "item", "created_at", "updated_at"],
                            &[&product_id, &item_str, &CommitTimestamp::new(), &CommitTimestamp::new()],
                        )
                    };
                    tx.buffer_write(vec![mutation]);

                    let mut updated = Item::new();
                    updated.insert(key, value);
                    Ok::<Item, SpannerError>(updated)
                })
            })
            .await
            .context("Failed to update product in Spanner")?;

        tracing::debug!("Updated product: {}", product_id);
        Ok(updated)
    }

    /// Delete the row, returning the item it held
    async fn delete(&self, product_id: &str) -> Result<Option<Item>> {
        let (_, old) = self
            .inner
            .read_write_transaction(|tx| {
                let product_id = product_id.to_string();
                Box::pin(async move {
                    let mut statement = Statement::new(
                        "SELECT item FROM product_inventory WHERE product_id = @product_id"
                    );
                    statement.add_param("product_id", &product_id);

                    let existing: Option<String> = {
                        let mut rows = tx.query(statement).await?;
                        match rows.next().await? {
                            Some(row) => Some(row.column_by_name("item").map_err(corrupt_row)?),
                            None => None,
                        }
                    };

                    if existing.is_some() {
                        tx.buffer_write(vec![delete(TABLE, Key::new(&product_id))]);
                    }
                    Ok::<Option<String>, SpannerError>(existing)
                })
            })
            .await
            .context("Failed to delete product from Spanner")?;

        let old = old
            .map(|item_str| serde_json::from_str::<Item>(&item_str))
            .transpose()
            .context("Failed to deserialize deleted product")?;

        tracing::debug!("Deleted product: {} (existed: {})", product_id, old.is_some());
        Ok(old)
    }

    /// Keyset-paginated scan ordered by `product_id`
    ///
    /// A full page carries its last key as the continuation token, even when
    /// nothing follows it; the next page then comes back empty and untokened.
    async fn scan_page(&self, start_after: Option<&str>, limit: usize) -> Result<ScanPage> {
        let mut query = "SELECT product_id, item FROM product_inventory".to_string();
        if start_after.is_some() {
            query.push_str(" WHERE product_id > @start_after");
        }
        query.push_str(&format!(" ORDER BY product_id LIMIT {}", limit));

        let mut statement = Statement::new(&query);
        if let Some(token) = start_after {
            statement.add_param("start_after", &token.to_string());
        }

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction for scan")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute scan query")?;

        let mut items = Vec::new();
        let mut last_key = None;
        while let Some(row) = result_set.next().await? {
            let key: String = row.column_by_name("product_id")?;
            let item_str: String = row.column_by_name("item")?;
            let item: Item = serde_json::from_str(&item_str)
                .context("Failed to deserialize stored product")?;

            items.push(item);
            last_key = Some(key);
        }

        let continuation = if items.len() == limit { last_key } else { None };

        tracing::debug!(
            "Scanned page of {} products (start_after: {:?}, continuation: {:?})",
            items.len(),
            start_after,
            continuation
        );

        Ok(ScanPage {
            items,
            continuation,
        })
    }

    /// Perform a health check by executing a simple query
    async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

/// Stored data that cannot be decoded aborts the transaction
fn corrupt_row(err: impl std::fmt::Display) -> Status {
    Status::new(Code::DataLoss, format!("Invalid stored product: {}", err))
}

/// Creates whatever part of the product store is missing: the instance, the
/// database inside it, then the `product_inventory` table.
///
/// Existing resources are left untouched, so this is safe to run on every
/// start. Against the emulator the instance uses the emulator's config.
async fn auto_provision(config: &SpannerConfig) -> Result<()> {
    tracing::info!("Checking product store resources in {}", config.database_path());

    let provisioner = Provisioner::connect(config).await?;
    provisioner.instance().await?;
    provisioner.database().await?;
    provisioner.table().await?;

    tracing::info!("Product store resources ready");
    Ok(())
}

struct Provisioner<'a> {
    admin: AdminClient,
    config: &'a SpannerConfig,
    project_path: String,
    instance_path: String,
    database_path: String,
}

impl<'a> Provisioner<'a> {
    async fn connect(config: &'a SpannerConfig) -> Result<Self> {
        let admin = AdminClient::new(AdminClientConfig::default())
            .await
            .context("Could not connect to the Spanner admin API")?;

        let project_path = format!("projects/{}", config.project);
        let instance_path = format!("{}/instances/{}", project_path, config.instance);

        Ok(Self {
            admin,
            config,
            project_path,
            instance_path,
            database_path: config.database_path(),
        })
    }

    async fn instance(&self) -> Result<()> {
        let lookup = GetInstanceRequest {
            name: self.instance_path.clone(),
            field_mask: None,
        };
        match self.admin.instance().get_instance(lookup, None).await {
            Ok(_) => {
                tracing::debug!("Spanner instance {} present", self.instance_path);
                return Ok(());
            }
            Err(status) if status.code() == Code::NotFound => {}
            Err(status) => bail!("Looking up instance {}: {}", self.instance_path, status.message()),
        }

        let instance_config = match self.config.emulator_host {
            Some(_) => "emulator-config",
            None => "regional-us-central1",
        };
        tracing::info!(
            "Creating Spanner instance {} ({})",
            self.instance_path,
            instance_config
        );

        let request = CreateInstanceRequest {
            parent: self.project_path.clone(),
            instance_id: self.config.instance.clone(),
            instance: Some(Instance {
                name: self.instance_path.clone(),
                config: format!("{}/instanceConfigs/{}", self.project_path, instance_config),
                display_name: format!("product inventory ({})", self.config.instance),
                node_count: 1,
                ..Default::default()
            }),
        };
        self.admin
            .instance()
            .create_instance(request, None)
            .await
            .with_context(|| format!("Creating instance {}", self.instance_path))?
            .wait(None)
            .await
            .with_context(|| format!("Waiting for instance {}", self.instance_path))?;
        Ok(())
    }

    async fn database(&self) -> Result<()> {
        let lookup = GetDatabaseRequest {
            name: self.database_path.clone(),
        };
        match self.admin.database().get_database(lookup, None).await {
            Ok(_) => {
                tracing::debug!("Spanner database {} present", self.database_path);
                return Ok(());
            }
            Err(status) if status.code() == Code::NotFound => {}
            Err(status) => bail!("Looking up database {}: {}", self.database_path, status.message()),
        }

        tracing::info!("Creating Spanner database {}", self.database_path);
        let request = CreateDatabaseRequest {
            parent: self.instance_path.clone(),
            create_statement: format!("CREATE DATABASE `{}`", self.config.database),
            extra_statements: vec![],
            encryption_config: None,
            // GoogleSQL
            database_dialect: 1,
            proto_descriptors: vec![],
        };
        self.admin
            .database()
            .create_database(request, None)
            .await
            .with_context(|| format!("Creating database {}", self.database_path))?
            .wait(None)
            .await
            .with_context(|| format!("Waiting for database {}", self.database_path))?;
        Ok(())
    }

    async fn table(&self) -> Result<()> {
        let ddl = self
            .admin
            .database()
            .get_database_ddl(
                GetDatabaseDdlRequest {
                    database: self.database_path.clone(),
                },
                None,
            )
            .await
            .with_context(|| format!("Reading schema of {}", self.database_path))?
            .into_inner();

        let declared = ddl.statements.iter().any(|statement| {
            statement.contains(&format!("CREATE TABLE {} ", TABLE))
                || statement.contains(&format!("CREATE TABLE `{}`", TABLE))
        });
        if declared {
            tracing::debug!("Table {} present", TABLE);
            return Ok(());
        }

        tracing::info!("Creating table {}", TABLE);
        let request = UpdateDatabaseDdlRequest {
            database: self.database_path.clone(),
            statements: vec![PRODUCT_TABLE_DDL.trim().to_string()],
            operation_id: String::new(),
            proto_descriptors: vec![],
            throughput_mode: false,
        };
        self.admin
            .database()
            .update_database_ddl(request, None)
            .await
            .with_context(|| format!("Submitting schema change for {}", TABLE))?
            .wait(None)
            .await
            .with_context(|| format!("Waiting for table {}", TABLE))?;
        Ok(())
    }
}

/// One JSON document per product, keyed by its `productId`
const PRODUCT_TABLE_DDL: &str = r#"
CREATE TABLE product_inventory (
    product_id STRING(MAX) NOT NULL,
    item JSON NOT NULL,
    created_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (product_id)
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::scan_all;
    use serde_json::json;
    use uuid::Uuid;

    /// Emulator-backed config, or `None` when SPANNER_EMULATOR_HOST is not set
    fn emulator_config(instance: &str) -> Option<SpannerConfig> {
        let host = std::env::var("SPANNER_EMULATOR_HOST").ok()?;
        Some(SpannerConfig {
            emulator_host: Some(host),
            project: "test-project".to_string(),
            instance: instance.to_string(),
            database: format!("{}-db", instance),
        })
    }

    async fn emulator_client(instance: &str) -> Option<SpannerClient> {
        let config = emulator_config(instance)?;
        match SpannerClient::from_config(&config).await {
            Ok(client) => Some(client),
            Err(e) => {
                println!("Spanner test skipped (emulator may not be running): {}", e);
                None
            }
        }
    }

    fn item(value: JsonValue) -> Item {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_client_is_clonable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<SpannerClient>();
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SpannerClient>();
    }

    #[test]
    fn test_corrupt_row_status() {
        let status = corrupt_row("expected value at line 1");
        assert_eq!(status.code(), Code::DataLoss);
        assert!(status.message().contains("expected value"));
    }

    #[tokio::test]
    async fn test_auto_provisioning_idempotent() {
        let Some(config) = emulator_config("idempotent-test-instance") else {
            return;
        };

        let result1 = SpannerClient::from_config(&config).await;
        if result1.is_ok() {
            let result2 = SpannerClient::from_config(&config).await;
            assert!(result2.is_ok(), "Second auto-provisioning call should succeed");
        }
    }

    #[tokio::test]
    async fn test_product_lifecycle() {
        let Some(client) = emulator_client("crud-test-instance").await else {
            return;
        };

        let product_id = Uuid::new_v4().to_string();
        let product = item(json!({ "productId": product_id, "name": "A", "price": 10 }));

        client.put(product.clone()).await.unwrap();
        assert_eq!(client.get(&product_id).await.unwrap(), Some(product.clone()));

        let updated = client.update_field(&product_id, "price", json!(20)).await.unwrap();
        assert_eq!(updated, item(json!({ "price": 20 })));
        let stored = client.get(&product_id).await.unwrap().unwrap();
        assert_eq!(stored["price"], json!(20));
        assert_eq!(stored["name"], json!("A"));

        let old = client.delete(&product_id).await.unwrap().unwrap();
        assert_eq!(old["price"], json!(20));
        assert!(client.get(&product_id).await.unwrap().is_none());

        // Deleting a missing product is not an error
        assert!(client.delete(&product_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_field_reserved_word_and_missing_row() {
        let Some(client) = emulator_client("update-test-instance").await else {
            return;
        };

        let product_id = Uuid::new_v4().to_string();
        client.update_field(&product_id, "select", json!("yes")).await.unwrap();

        let stored = client.get(&product_id).await.unwrap().unwrap();
        assert_eq!(stored, item(json!({ "productId": product_id, "select": "yes" })));
    }

    #[tokio::test]
    async fn test_update_field_races_put_on_new_row() {
        let Some(client) = emulator_client("race-test-instance").await else {
            return;
        };

        let product_id = Uuid::new_v4().to_string();
        let product = item(json!({ "productId": product_id, "name": "A" }));

        let (put, update) = tokio::join!(
            client.put(product),
            client.update_field(&product_id, "price", json!(5))
        );
        assert!(put.is_ok(), "put failed: {:?}", put.err());
        assert!(update.is_ok(), "update failed: {:?}", update.err());

        let stored = client.get(&product_id).await.unwrap().unwrap();
        assert_eq!(stored["productId"], json!(product_id));
    }

    #[tokio::test]
    async fn test_scan_pages_cover_table() {
        let Some(client) = emulator_client("scan-test-instance").await else {
            return;
        };

        let prefix = Uuid::new_v4().to_string();
        for i in 0..5 {
            let product = item(json!({ "productId": format!("{}-{}", prefix, i) }));
            client.put(product).await.unwrap();
        }

        let all = scan_all(&client, 2, 10_000).await.unwrap();
        let ours = all
            .iter()
            .filter_map(product_id_of)
            .filter(|id| id.starts_with(&prefix))
            .count();
        assert_eq!(ours, 5);

        let first = client.scan_page(None, 2).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.continuation.is_some());
    }

    #[tokio::test]
    async fn test_health_check() {
        let Some(client) = emulator_client("health-test-instance").await else {
            return;
        };
        assert!(client.health_check().await.is_ok());
    }
}
