//! Content and settings stores.
//!
//! Both load once at startup and save after every mutation. A failed save is
//! logged and the store keeps working from memory.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::catalog::seed_feed;
use crate::domain::KeyValueStore;
use crate::models::{Meme, Theme, UserSettings};
use crate::schema::{
    FEED_KEY, FEED_MIGRATIONS, LEGACY_FEED_KEY, LEGACY_SETTINGS_KEY, SETTINGS_KEY, SETTINGS_MIGRATIONS,
    VersionedDocument,
};

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

pub struct ContentStore {
    items: Vec<Meme>,
    doc: VersionedDocument<Vec<Meme>>,
}

impl ContentStore {
    /// Loads persisted content, or the seed feed when there is none or it
    /// cannot be read.
    pub async fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let doc: VersionedDocument<Vec<Meme>> = VersionedDocument::new(kv, FEED_KEY, LEGACY_FEED_KEY, FEED_MIGRATIONS);
        let items = match doc.load().await {
            Ok(Some(items)) => {
                tracing::info!(count = items.len(), "Loaded persisted memes");
                items
            }
            Ok(None) => {
                tracing::info!("No persisted memes, starting from the seed feed");
                seed_feed(now_ms())
            }
            Err(e) => {
                tracing::error!(error = %e, key = %doc.key(), "Failed to load memes, starting from the seed feed");
                seed_feed(now_ms())
            }
        };
        Self { items, doc }
    }

    pub fn items(&self) -> &[Meme] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Meme> {
        self.items.iter().find(|m| m.id == id)
    }

    pub async fn prepend(&mut self, meme: Meme) {
        tracing::info!(meme_id = %meme.id, creator = %meme.creator, "Publishing meme");
        self.items.insert(0, meme);
        self.persist().await;
    }

    /// Returns the new like count, or None for an unknown id.
    pub async fn like(&mut self, id: &str) -> Option<u64> {
        let meme = self.items.iter_mut().find(|m| m.id == id)?;
        meme.likes = meme.likes.saturating_add(1);
        let likes = meme.likes;
        self.persist().await;
        Some(likes)
    }

    /// Drops persisted content and restores the seed feed.
    pub async fn reset(&mut self) {
        if let Err(e) = self.doc.clear().await {
            tracing::warn!(error = %e, "Failed to clear persisted memes");
        }
        self.items = seed_feed(now_ms());
    }

    async fn persist(&self) {
        if let Err(e) = self.doc.save(&self.items).await {
            tracing::warn!(error = %e, key = %self.doc.key(), "Failed to persist memes; continuing in memory");
        }
    }
}

pub struct SettingsStore {
    settings: UserSettings,
    doc: VersionedDocument<UserSettings>,
}

impl SettingsStore {
    pub async fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let doc: VersionedDocument<UserSettings> =
            VersionedDocument::new(kv, SETTINGS_KEY, LEGACY_SETTINGS_KEY, SETTINGS_MIGRATIONS);
        let settings = match doc.load().await {
            Ok(Some(settings)) => settings,
            Ok(None) => UserSettings::default(),
            Err(e) => {
                tracing::error!(error = %e, key = %doc.key(), "Failed to load settings, using defaults");
                UserSettings::default()
            }
        };
        Self { settings, doc }
    }

    pub fn get(&self) -> &UserSettings {
        &self.settings
    }

    pub async fn block(&mut self, creator: &str) -> bool {
        let changed = self.settings.block(creator);
        if changed {
            tracing::info!(%creator, "Creator blocked");
            self.persist().await;
        }
        changed
    }

    pub async fn set_handle(&mut self, handle: &str) -> bool {
        let changed = self.settings.set_handle(handle);
        if changed {
            self.persist().await;
        }
        changed
    }

    pub async fn toggle_pro(&mut self) -> bool {
        self.settings.is_pro = !self.settings.is_pro;
        tracing::info!(is_pro = self.settings.is_pro, "Pro tier toggled");
        self.persist().await;
        self.settings.is_pro
    }

    pub async fn complete_onboarding(&mut self) {
        if !self.settings.has_onboarded {
            self.settings.has_onboarded = true;
            self.persist().await;
        }
    }

    pub async fn set_theme(&mut self, theme: Theme) {
        if self.settings.theme != theme {
            self.settings.theme = theme;
            self.persist().await;
        }
    }

    pub async fn reset(&mut self) {
        if let Err(e) = self.doc.clear().await {
            tracing::warn!(error = %e, "Failed to clear persisted settings");
        }
        self.settings = UserSettings::default();
    }

    async fn persist(&self) {
        if let Err(e) = self.doc.save(&self.settings).await {
            tracing::warn!(error = %e, key = %self.doc.key(), "Failed to persist settings; continuing in memory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::models::{HumorStyle, MemeLayout};
    use crate::repositories::{FileKeyValueStore, MemoryKeyValueStore};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Backend whose every call fails.
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::BackendError(anyhow!("disk on fire")))
        }
        async fn put(&self, _key: &str, _value: String) -> Result<(), StoreError> {
            Err(StoreError::BackendError(anyhow!("disk on fire")))
        }
        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::BackendError(anyhow!("disk on fire")))
        }
    }

    /// Serves reads from `inner` and refuses every write.
    struct ReadOnlyStore {
        inner: MemoryKeyValueStore,
    }

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key).await
        }
        async fn put(&self, _key: &str, _value: String) -> Result<(), StoreError> {
            Err(StoreError::BackendError(anyhow!("read-only")))
        }
        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::BackendError(anyhow!("read-only")))
        }
    }

    fn meme(id: &str) -> Meme {
        Meme {
            id: id.to_string(),
            image_url: "data:image/png;base64,AA".to_string(),
            top_text: "t".to_string(),
            bottom_text: "b".to_string(),
            humor_style: HumorStyle::Wholesome,
            layout: MemeLayout::Split,
            likes: 0,
            creator: "me".to_string(),
            timestamp: 1,
            is_pro_meme: false,
        }
    }

    #[tokio::test]
    async fn first_run_starts_from_seed_feed() {
        let store = ContentStore::load(Arc::new(MemoryKeyValueStore::default())).await;
        let ids: Vec<&str> = store.items().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn content_survives_reload() {
        let temp = TempDir::new().unwrap();
        let kv: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(temp.path()).unwrap());

        let mut store = ContentStore::load(kv.clone()).await;
        store.prepend(meme("new")).await;
        assert_eq!(store.like("new").await, Some(1));
        assert_eq!(store.like("missing").await, None);

        let reloaded = ContentStore::load(kv).await;
        assert_eq!(reloaded.items()[0].id, "new");
        assert_eq!(reloaded.items()[0].likes, 1);
        assert_eq!(reloaded.items().len(), 3);
    }

    #[tokio::test]
    async fn settings_survive_reload() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::default());
        let mut store = SettingsStore::load(kv.clone()).await;
        store.set_handle("Zed").await;
        store.block("Troll").await;
        store.toggle_pro().await;
        store.set_theme(Theme::Light).await;
        store.complete_onboarding().await;

        let reloaded = SettingsStore::load(kv).await;
        assert_eq!(reloaded.get(), store.get());
    }

    #[tokio::test]
    async fn broken_backend_degrades_to_memory() {
        let mut content = ContentStore::load(Arc::new(BrokenStore)).await;
        assert_eq!(content.items().len(), 2);
        content.prepend(meme("x")).await;
        assert_eq!(content.items()[0].id, "x");

        let mut settings = SettingsStore::load(Arc::new(BrokenStore)).await;
        assert!(settings.block("Troll").await);
        assert!(settings.get().blocked_creators.contains("Troll"));
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::default());
        let mut content = ContentStore::load(kv.clone()).await;
        content.prepend(meme("x")).await;
        content.reset().await;
        assert_eq!(content.items().len(), 2);
        assert!(kv.get(FEED_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn legacy_data_kept_when_rewrite_fails() {
        let inner = MemoryKeyValueStore::default();
        let legacy_feed = serde_json::json!([{
            "id": "legacy", "imageUrl": "data:image/png;base64,AA", "topText": "a", "bottomText": "b",
            "humorStyle": "Dark", "layout": "split", "likes": 7, "creator": "OldMe", "timestamp": 5
        }]);
        let legacy_settings = serde_json::json!({
            "handle": "OldMe", "isPro": true, "hasOnboarded": true, "theme": "light", "blockedCreators": []
        });
        inner.put(LEGACY_FEED_KEY, legacy_feed.to_string()).await.unwrap();
        inner.put(LEGACY_SETTINGS_KEY, legacy_settings.to_string()).await.unwrap();
        let kv: Arc<dyn KeyValueStore> = Arc::new(ReadOnlyStore { inner });

        let content = ContentStore::load(kv.clone()).await;
        let ids: Vec<&str> = content.items().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["legacy"]);
        assert_eq!(content.items()[0].likes, 7);

        let settings = SettingsStore::load(kv.clone()).await;
        assert_eq!(settings.get().handle, "OldMe");
        assert!(settings.get().is_pro);

        // Nothing was rewritten, so the legacy values are still there to retry.
        assert!(kv.get(LEGACY_FEED_KEY).await.unwrap().is_some());
        assert!(kv.get(FEED_KEY).await.unwrap().is_none());
    }
}
