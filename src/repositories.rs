use crate::{domain::KeyValueStore, errors::StoreError};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use aws_sdk_dynamodb::{Client as DynamoDbClient, types::AttributeValue};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::fs;
use tracing::{self, info};

pub const KEY_ATTRIBUTE: &str = "store_key";
const VALUE_ATTRIBUTE: &str = "value";
const UPDATED_AT_ATTRIBUTE: &str = "updated_at";

#[derive(Debug, Clone)]
pub struct DynamoDbKeyValueStore {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbKeyValueStore {
    /// Creates a store backed by a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbKeyValueStore");
        Self { client, table_name }
    }
}

#[async_trait]
impl KeyValueStore for DynamoDbKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(KEY_ATTRIBUTE, AttributeValue::S(key.to_string()))
            .consistent_read(true)
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get key '{}'", self.table_name, key))?;

        match resp.item {
            Some(item) => match item.get(VALUE_ATTRIBUTE).and_then(|v| v.as_s().ok()) {
                Some(value) => Ok(Some(value.clone())),
                None => {
                    tracing::error!(%key, table_name = %self.table_name, "DynamoDB: Item has no string value attribute");
                    Err(StoreError::BackendError(anyhow!(
                        "DynamoDB (table: {}): item for key '{}' has no '{}' attribute",
                        self.table_name,
                        key,
                        VALUE_ATTRIBUTE
                    )))
                }
            },
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.client
            .put_item()
            .table_name(&self.table_name)
            .item(KEY_ATTRIBUTE, AttributeValue::S(key.to_string()))
            .item(VALUE_ATTRIBUTE, AttributeValue::S(value))
            .item(UPDATED_AT_ATTRIBUTE, AttributeValue::N(updated_at.to_string()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put key '{}'", self.table_name, key))?;
        tracing::debug!(%key, table_name = %self.table_name, "DynamoDB: Value stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        // DeleteItem succeeds even if the item does not exist
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(KEY_ATTRIBUTE, AttributeValue::S(key.to_string()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to delete key '{}'", self.table_name, key))?;
        tracing::debug!(%key, table_name = %self.table_name, "DynamoDB: Delete request sent");
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`, written atomically via a temp file.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    base_path: PathBuf,
}

impl FileKeyValueStore {
    /// Creates the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)
            .with_context(|| format!("Failed to create store directory {}", base_path.display()))?;
        info!(path = %base_path.display(), "Initializing FileKeyValueStore");
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::BackendError(anyhow!("Invalid store key '{}'", key)));
        }
        Ok(self.base_path.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to read {}", path.display()))
                .into()),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let temp_path = self.base_path.join(format!(".{key}.json.tmp"));
        fs::write(&temp_path, value)
            .await
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &path)
            .await
            .with_context(|| format!("Failed to move value into {}", path.display()))?;
        tracing::debug!(%key, "File store: Value stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to delete {}", path.display()))
                .into()),
        }
    }
}

/// Keeps values in process memory only.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.values
            .lock()
            .map_err(|_| StoreError::BackendError(anyhow!("memory store lock poisoned")))
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
