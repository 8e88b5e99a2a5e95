//! Versioned envelopes for persisted values.
//!
//! Every value is written as `{"schemaVersion": N, "data": ...}`. Older
//! versions are brought forward one step at a time through a migration
//! table keyed by the version they start from. Values written before
//! envelopes existed live under version-suffixed keys and count as
//! version 5.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::domain::KeyValueStore;
use crate::errors::StoreError;

pub const SCHEMA_VERSION: u32 = 6;
pub const LEGACY_VERSION: u32 = 5;

pub const FEED_KEY: &str = "memeai_feed";
pub const SETTINGS_KEY: &str = "memeai_settings";
pub const LEGACY_FEED_KEY: &str = "memeai_feed_v5";
pub const LEGACY_SETTINGS_KEY: &str = "memeai_settings_v5";

/// Upgrades `data` from version `from` to `from + 1`.
pub type Migration = fn(Value) -> Result<Value, String>;

pub const FEED_MIGRATIONS: &[(u32, Migration)] = &[(5, feed_v5_to_v6)];
pub const SETTINGS_MIGRATIONS: &[(u32, Migration)] = &[(5, settings_v5_to_v6)];

#[derive(Serialize, Deserialize, Debug)]
struct Envelope {
    #[serde(rename = "schemaVersion")]
    schema_version: u32,
    data: Value,
}

pub fn migrate(key: &str, mut version: u32, mut data: Value, table: &[(u32, Migration)]) -> Result<Value, StoreError> {
    if version > SCHEMA_VERSION {
        return Err(StoreError::FutureVersion {
            key: key.to_string(),
            found: version,
            supported: SCHEMA_VERSION,
        });
    }
    while version < SCHEMA_VERSION {
        let (_, step) = table
            .iter()
            .find(|(from, _)| *from == version)
            .ok_or(StoreError::MissingMigration(version))?;
        data = step(data).map_err(|reason| StoreError::MigrationFailed {
            key: key.to_string(),
            from: version,
            reason,
        })?;
        tracing::info!(%key, from = version, to = version + 1, "Migrated persisted value");
        version += 1;
    }
    Ok(data)
}

fn feed_v5_to_v6(data: Value) -> Result<Value, String> {
    let Value::Array(items) = data else {
        return Err("expected an array of memes".to_string());
    };
    let items = items
        .into_iter()
        .map(|item| {
            let Value::Object(mut meme) = item else {
                return Err("expected a meme object".to_string());
            };
            meme.remove("type");
            meme.entry("isProMeme").or_insert(Value::Bool(false));
            // Older clients stored likes as a JS number.
            let likes = meme.get("likes").and_then(Value::as_f64).unwrap_or(0.0).max(0.0).round() as u64;
            meme.insert("likes".to_string(), Value::from(likes));
            if let Some(ts) = meme.get("timestamp").and_then(Value::as_f64) {
                meme.insert("timestamp".to_string(), Value::from(ts.round() as i64));
            }
            Ok(Value::Object(meme))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(items))
}

fn settings_v5_to_v6(data: Value) -> Result<Value, String> {
    let Value::Object(mut settings) = data else {
        return Err("expected a settings object".to_string());
    };
    let handle = settings.get("handle").and_then(Value::as_str).map(str::to_string);
    let blocked = match settings.remove("blockedCreators") {
        Some(Value::Array(list)) => list
            .into_iter()
            .filter(|c| c.as_str().is_some() && c.as_str() != handle.as_deref())
            .collect(),
        _ => Vec::new(),
    };
    settings.insert("blockedCreators".to_string(), Value::Array(blocked));
    settings.entry("hasOnboarded").or_insert(Value::Bool(false));
    settings.entry("isPro").or_insert(Value::Bool(false));
    settings.entry("theme").or_insert(Value::String("dark".to_string()));
    Ok(Value::Object(settings))
}

/// A typed value stored under one key, with migration from an older key.
pub struct VersionedDocument<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    legacy_key: &'static str,
    migrations: &'static [(u32, Migration)],
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> VersionedDocument<T> {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        key: &'static str,
        legacy_key: &'static str,
        migrations: &'static [(u32, Migration)],
    ) -> Self {
        Self {
            store,
            key,
            legacy_key,
            migrations,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    fn decode(&self, key: &str, raw: &str) -> Result<Value, StoreError> {
        serde_json::from_str(raw).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })
    }

    fn into_typed(&self, data: Value) -> Result<T, StoreError> {
        serde_json::from_value(data).map_err(|source| StoreError::Serialization {
            key: self.key.to_string(),
            source,
        })
    }

    /// Reads the current key, falling back to the legacy key. A legacy value
    /// is rewritten under the current key and the legacy key removed.
    pub async fn load(&self) -> Result<Option<T>, StoreError> {
        if let Some(raw) = self.store.get(self.key).await? {
            let envelope: Envelope = serde_json::from_value(self.decode(self.key, &raw)?).map_err(|source| {
                StoreError::Serialization {
                    key: self.key.to_string(),
                    source,
                }
            })?;
            let data = migrate(self.key, envelope.schema_version, envelope.data, self.migrations)?;
            let value = self.into_typed(data)?;
            if envelope.schema_version < SCHEMA_VERSION {
                self.write_back(&value, None).await;
            }
            return Ok(Some(value));
        }

        let Some(raw) = self.store.get(self.legacy_key).await? else {
            return Ok(None);
        };
        tracing::info!(legacy_key = %self.legacy_key, key = %self.key, "Found unversioned value, migrating");
        let data = migrate(self.legacy_key, LEGACY_VERSION, self.decode(self.legacy_key, &raw)?, self.migrations)?;
        let value = self.into_typed(data)?;
        self.write_back(&value, Some(self.legacy_key)).await;
        Ok(Some(value))
    }

    /// Persists a migrated value under the current key and then drops
    /// `legacy_key`. Failures are logged; the migrated value stays usable
    /// and the legacy key is kept until a write succeeds.
    async fn write_back(&self, value: &T, legacy_key: Option<&'static str>) {
        if let Err(e) = self.save(value).await {
            tracing::warn!(error = %e, key = %self.key, "Failed to rewrite migrated value; keeping it in memory");
            return;
        }
        if let Some(legacy_key) = legacy_key {
            if let Err(e) = self.store.delete(legacy_key).await {
                tracing::warn!(error = %e, %legacy_key, "Failed to remove legacy value after migration");
            }
        }
    }

    pub async fn save(&self, value: &T) -> Result<(), StoreError> {
        let data = serde_json::to_value(value).map_err(|source| StoreError::Serialization {
            key: self.key.to_string(),
            source,
        })?;
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            data,
        };
        let raw = serde_json::to_string(&envelope).map_err(|source| StoreError::Serialization {
            key: self.key.to_string(),
            source,
        })?;
        self.store.put(self.key, raw).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.delete(self.key).await?;
        self.store.delete(self.legacy_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Meme, UserSettings};
    use crate::repositories::MemoryKeyValueStore;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;

    struct WriteFailingStore(MemoryKeyValueStore);

    #[async_trait]
    impl KeyValueStore for WriteFailingStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.get(key).await
        }
        async fn put(&self, _key: &str, _value: String) -> Result<(), StoreError> {
            Err(StoreError::BackendError(anyhow!("quota exceeded")))
        }
        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::BackendError(anyhow!("quota exceeded")))
        }
    }

    #[tokio::test]
    async fn legacy_feed_is_migrated_and_rewritten() {
        let store = Arc::new(MemoryKeyValueStore::default());
        let legacy = json!([{
            "id": "1700000000000", "imageUrl": "data:image/png;base64,AA",
            "topText": "a", "bottomText": "b", "humorStyle": "Dark", "layout": "split",
            "likes": 3, "creator": "X", "timestamp": 1700000000000u64, "type": "meme"
        }]);
        store.put(LEGACY_FEED_KEY, legacy.to_string()).await.unwrap();

        let doc: VersionedDocument<Vec<Meme>> =
            VersionedDocument::new(store.clone(), FEED_KEY, LEGACY_FEED_KEY, FEED_MIGRATIONS);
        let memes = doc.load().await.unwrap().unwrap();
        assert_eq!(memes.len(), 1);
        assert!(!memes[0].is_pro_meme);
        assert_eq!(memes[0].likes, 3);

        assert!(store.get(LEGACY_FEED_KEY).await.unwrap().is_none());
        let raw = store.get(FEED_KEY).await.unwrap().unwrap();
        let envelope: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope["schemaVersion"], 6);
    }

    #[tokio::test]
    async fn legacy_settings_drop_own_handle_from_blocklist() {
        let store = Arc::new(MemoryKeyValueStore::default());
        let legacy = json!({
            "handle": "me", "isPro": true, "hasOnboarded": true, "theme": "light",
            "blockedCreators": ["me", "troll", "troll"]
        });
        store.put(LEGACY_SETTINGS_KEY, legacy.to_string()).await.unwrap();

        let doc: VersionedDocument<UserSettings> =
            VersionedDocument::new(store, SETTINGS_KEY, LEGACY_SETTINGS_KEY, SETTINGS_MIGRATIONS);
        let settings = doc.load().await.unwrap().unwrap();
        assert_eq!(settings.blocked_creators.len(), 1);
        assert!(settings.blocked_creators.contains("troll"));
        assert!(settings.is_pro);
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let store = Arc::new(MemoryKeyValueStore::default());
        let doc: VersionedDocument<UserSettings> =
            VersionedDocument::new(store, SETTINGS_KEY, LEGACY_SETTINGS_KEY, SETTINGS_MIGRATIONS);
        let mut settings = UserSettings::default();
        settings.handle = "roundtrip".to_string();
        settings.blocked_creators.insert("someone".to_string());
        doc.save(&settings).await.unwrap();
        assert_eq!(doc.load().await.unwrap(), Some(settings));
    }

    #[tokio::test]
    async fn future_versions_are_rejected() {
        let store = Arc::new(MemoryKeyValueStore::default());
        store
            .put(SETTINGS_KEY, json!({"schemaVersion": 99, "data": {}}).to_string())
            .await
            .unwrap();
        let doc: VersionedDocument<UserSettings> =
            VersionedDocument::new(store, SETTINGS_KEY, LEGACY_SETTINGS_KEY, SETTINGS_MIGRATIONS);
        assert!(matches!(doc.load().await, Err(StoreError::FutureVersion { found: 99, .. })));
    }

    #[tokio::test]
    async fn old_envelope_loads_even_if_rewrite_fails() {
        let inner = MemoryKeyValueStore::default();
        let envelope = json!({
            "schemaVersion": 5,
            "data": {"handle": "me", "isPro": false, "hasOnboarded": true, "theme": "dark", "blockedCreators": ["me", "x"]}
        });
        inner.put(SETTINGS_KEY, envelope.to_string()).await.unwrap();

        let doc: VersionedDocument<UserSettings> = VersionedDocument::new(
            Arc::new(WriteFailingStore(inner)),
            SETTINGS_KEY,
            LEGACY_SETTINGS_KEY,
            SETTINGS_MIGRATIONS,
        );
        let settings = doc.load().await.unwrap().unwrap();
        assert_eq!(settings.handle, "me");
        assert_eq!(settings.blocked_creators.len(), 1);
    }

    #[test]
    fn missing_step_is_reported() {
        let result = migrate("k", 3, json!([]), FEED_MIGRATIONS);
        assert!(matches!(result, Err(StoreError::MissingMigration(3))));
    }

    #[test]
    fn negative_likes_are_clamped() {
        let migrated = feed_v5_to_v6(json!([{"likes": -4}])).unwrap();
        assert_eq!(migrated[0]["likes"], 0);
    }
}
