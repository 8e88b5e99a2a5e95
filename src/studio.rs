//! The application controller.
//!
//! `Studio` owns the stores, the composer state machine and the view state
//! behind a single async mutex. AI calls run with the lock released and
//! their results are applied afterwards, so the editor may have moved on by
//! the time a caption arrives; stale captions are dropped.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::ai::{AiOrchestrator, Busy, TaskKind};
use crate::catalog::{find_template, sponsored_catalog};
use crate::domain::{AcknowledgeOnly, FileStorage, GenerativeBackend, KeyValueStore, MemeRenderer, ModerationSink};
use crate::editor::{ComposerState, EditorPatch, View};
use crate::errors::{ExportError, RenderError};
use crate::feed::{self, LEADERBOARD_SIZE};
use crate::models::{Ad, FeedEntry, HumorStyle, LeaderboardEntry, Meme, ProfileStats, Theme, UserSettings};
use crate::render::{EXPORT_SCALE, SourceImageRenderer, extension_for};
use crate::stores::{ContentStore, SettingsStore, now_ms};

pub const DEFAULT_CELEBRATION: Duration = Duration::from_millis(1500);

fn caption_inputs(composer: &ComposerState) -> (HumorStyle, Option<String>) {
    composer
        .session()
        .map(|s| (s.humor_style, s.caption_context.clone()))
        .unwrap_or_default()
}

struct StudioState {
    content: ContentStore,
    settings: SettingsStore,
    composer: ComposerState,
    view: View,
    active_menu: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BusyFlags {
    pub caption: bool,
    pub image: bool,
    pub remix: bool,
}

/// Everything a presentation layer needs to draw the current screen.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StudioSnapshot {
    pub view: View,
    pub composer: ComposerState,
    pub active_menu: Option<String>,
    pub busy: BusyFlags,
    /// Shown over the screen while an AI task runs, for non-pro users.
    pub interstitial_ad: Option<Ad>,
    pub settings: UserSettings,
}

/// External collaborators the studio is wired to.
pub struct StudioDeps {
    pub store: Arc<dyn KeyValueStore>,
    pub backend: Arc<dyn GenerativeBackend>,
    pub exports: Arc<dyn FileStorage>,
    pub renderer: Arc<dyn MemeRenderer>,
    pub moderation: Arc<dyn ModerationSink>,
    pub catalog: Vec<Ad>,
    pub celebration: Duration,
}

impl StudioDeps {
    /// Default collaborators: shipped ad catalog, source-image renderer and
    /// acknowledge-only moderation.
    pub fn new(store: Arc<dyn KeyValueStore>, backend: Arc<dyn GenerativeBackend>, exports: Arc<dyn FileStorage>) -> Self {
        Self {
            store,
            backend,
            exports,
            renderer: Arc::new(SourceImageRenderer),
            moderation: Arc::new(AcknowledgeOnly),
            catalog: sponsored_catalog(),
            celebration: DEFAULT_CELEBRATION,
        }
    }
}

pub struct Studio {
    state: Mutex<StudioState>,
    ai: AiOrchestrator,
    catalog: Vec<Ad>,
    exports: Arc<dyn FileStorage>,
    renderer: Arc<dyn MemeRenderer>,
    moderation: Arc<dyn ModerationSink>,
    celebration: Duration,
}

impl Studio {
    /// Loads both stores and returns a studio on the feed view.
    pub async fn open(deps: StudioDeps) -> Arc<Self> {
        let content = ContentStore::load(deps.store.clone()).await;
        let settings = SettingsStore::load(deps.store).await;
        Arc::new(Self {
            state: Mutex::new(StudioState {
                content,
                settings,
                composer: ComposerState::Empty,
                view: View::Feed,
                active_menu: None,
            }),
            ai: AiOrchestrator::new(deps.backend),
            catalog: deps.catalog,
            exports: deps.exports,
            renderer: deps.renderer,
            moderation: deps.moderation,
            celebration: deps.celebration,
        })
    }

    // --- Read-only views ---

    pub async fn feed(&self) -> Vec<FeedEntry> {
        let state = self.state.lock().await;
        feed::assemble(state.content.items(), state.settings.get(), &self.catalog)
    }

    pub async fn memes(&self) -> Vec<Meme> {
        self.state.lock().await.content.items().to_vec()
    }

    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        feed::leaderboard(self.state.lock().await.content.items(), LEADERBOARD_SIZE)
    }

    pub async fn profile(&self) -> ProfileStats {
        let state = self.state.lock().await;
        feed::profile_stats(state.content.items(), &state.settings.get().handle)
    }

    pub async fn settings(&self) -> UserSettings {
        self.state.lock().await.settings.get().clone()
    }

    pub async fn snapshot(&self) -> StudioSnapshot {
        let state = self.state.lock().await;
        let settings = state.settings.get().clone();
        let interstitial_ad = if self.ai.any_busy() {
            // The counter has already moved past the running task.
            let counter = self.ai.tasks_started().saturating_sub(1);
            feed::interstitial_ad(&self.catalog, &settings, counter).cloned()
        } else {
            None
        };
        StudioSnapshot {
            view: state.view,
            composer: state.composer.clone(),
            active_menu: state.active_menu.clone(),
            busy: BusyFlags {
                caption: self.ai.is_busy(TaskKind::Caption),
                image: self.ai.is_busy(TaskKind::Image),
                remix: self.ai.is_busy(TaskKind::Remix),
            },
            interstitial_ad,
            settings,
        }
    }

    pub async fn set_view(&self, view: View) {
        self.state.lock().await.view = view;
    }

    // --- Composer ---

    /// Uploaded file or camera capture. Enters Editing on the create view
    /// and asks for captions. A busy caption task leaves the placeholders.
    pub async fn load_image(&self, image: String) -> bool {
        let (style, context) = {
            let mut state = self.state.lock().await;
            if !state.composer.set_image(image.clone()) {
                return false;
            }
            state.view = View::Create;
            caption_inputs(&state.composer)
        };
        if let Err(Busy(kind)) = self.caption_for(&image, style, context.as_deref()).await {
            tracing::debug!(%kind, "Skipping automatic captions, task already running");
        }
        true
    }

    pub async fn select_template(&self, template_id: &str) -> bool {
        let Some(template) = find_template(template_id) else {
            return false;
        };
        let mut state = self.state.lock().await;
        if !state.composer.set_image(template.url) {
            return false;
        }
        state.composer.apply(EditorPatch {
            layout: Some(template.layout),
            ..EditorPatch::default()
        });
        state.view = View::Create;
        true
    }

    /// Starts a new composition from an existing meme's image.
    pub async fn remix(&self, meme_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(image) = state.content.get(meme_id).map(|m| m.image_url.clone()) else {
            return false;
        };
        if !state.composer.set_image(image) {
            return false;
        }
        state.view = View::Create;
        true
    }

    /// Generates a base image from `prompt` and captions it. Blank prompts
    /// and empty results leave the editor untouched.
    pub async fn generate_base_image(&self, prompt: &str) -> Result<bool, Busy> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(false);
        }
        let Some(image) = self.ai.generate_base_image(prompt).await? else {
            return Ok(false);
        };
        let (style, context) = {
            let mut state = self.state.lock().await;
            if !state.composer.set_image(image.clone()) {
                return Ok(false);
            }
            state.view = View::Create;
            if let Some(session) = state.composer.session_mut() {
                session.set_caption_context(prompt);
            }
            caption_inputs(&state.composer)
        };
        if let Err(Busy(kind)) = self.caption_for(&image, style, context.as_deref()).await {
            tracing::debug!(%kind, "Skipping automatic captions, task already running");
        }
        Ok(true)
    }

    /// Re-runs caption generation for the current image. A given `context`
    /// replaces the stored one; otherwise the stored context is reused. A
    /// no-op when nothing is being edited.
    pub async fn regenerate_captions(&self, context: Option<&str>) -> Result<(), Busy> {
        let target = {
            let mut state = self.state.lock().await;
            let Some(session) = state.composer.session_mut() else {
                return Ok(());
            };
            if let Some(context) = context {
                session.set_caption_context(context);
            }
            session
                .source_image
                .clone()
                .map(|img| (img, session.humor_style, session.caption_context.clone()))
        };
        match target {
            Some((image, style, context)) => self.caption_for(&image, style, context.as_deref()).await,
            None => Ok(()),
        }
    }

    /// Asks for a remix of the current captions and applies it.
    pub async fn suggest_remix(&self) -> Result<(), Busy> {
        let target = {
            let state = self.state.lock().await;
            state.composer.session().and_then(|s| {
                s.source_image
                    .clone()
                    .map(|img| (img, format!("{} / {}", s.top_text, s.bottom_text), s.humor_style))
            })
        };
        let Some((image, text, style)) = target else {
            return Ok(());
        };
        let pair = self.ai.suggest_remix(&text, style).await?;
        self.state.lock().await.composer.apply_captions(&image, pair);
        Ok(())
    }

    async fn caption_for(&self, image: &str, style: HumorStyle, context: Option<&str>) -> Result<(), Busy> {
        let pair = self.ai.generate_caption(image, style, context).await?;
        let applied = self.state.lock().await.composer.apply_captions(image, pair);
        if !applied {
            tracing::debug!("Editor image changed while captioning; dropping captions");
        }
        Ok(())
    }

    pub async fn update_editor(&self, patch: EditorPatch) {
        self.state.lock().await.composer.apply(patch);
    }

    pub async fn cancel_editing(&self) {
        self.state.lock().await.composer.cancel();
    }

    /// Publishes the composition. The new meme is prepended and saved right
    /// away; the composer returns to Empty on the feed view once the
    /// celebration delay has passed.
    pub async fn publish(self: &Arc<Self>) -> Option<Meme> {
        let meme = {
            let mut state = self.state.lock().await;
            let session = state.composer.session()?;
            let image_url = session.source_image.clone()?;
            let settings = state.settings.get();
            let meme = Meme {
                id: Uuid::new_v4().to_string(),
                image_url,
                top_text: session.top_text.clone(),
                bottom_text: session.bottom_text.clone(),
                humor_style: session.humor_style,
                layout: session.layout,
                likes: 0,
                creator: settings.handle.clone(),
                timestamp: now_ms(),
                is_pro_meme: settings.is_pro,
            };
            state.content.prepend(meme.clone()).await;
            state.composer = ComposerState::Publishing {
                meme_id: meme.id.clone(),
            };
            meme
        };

        let studio = Arc::clone(self);
        let meme_id = meme.id.clone();
        let delay = self.celebration;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            studio.finish_publish(&meme_id).await;
        });
        Some(meme)
    }

    async fn finish_publish(&self, meme_id: &str) {
        let mut state = self.state.lock().await;
        if matches!(&state.composer, ComposerState::Publishing { meme_id: id } if id == meme_id) {
            state.composer = ComposerState::Empty;
            state.view = View::Feed;
        }
    }

    pub async fn export(&self) -> Result<String, ExportError> {
        let session = self
            .state
            .lock()
            .await
            .composer
            .session()
            .cloned()
            .ok_or(ExportError::Render(RenderError::NoSource))?;
        let image = self
            .renderer
            .render(&session, EXPORT_SCALE)
            .await
            .map_err(ExportError::Render)?;
        let key = format!("MemeAI_{}.{}", now_ms(), extension_for(&image.mime_type));
        let location = self
            .exports
            .upload(&key, image.bytes, Some(image.mime_type))
            .await
            .map_err(ExportError::Storage)?;
        tracing::info!(%location, "Meme exported");
        Ok(location)
    }

    // --- Feed interactions ---

    pub async fn like(&self, meme_id: &str) -> Option<u64> {
        self.state.lock().await.content.like(meme_id).await
    }

    pub async fn toggle_menu(&self, meme_id: &str) -> Option<String> {
        let mut state = self.state.lock().await;
        state.active_menu = match state.active_menu.as_deref() {
            Some(open) if open == meme_id => None,
            _ => Some(meme_id.to_string()),
        };
        state.active_menu.clone()
    }

    pub async fn block_creator(&self, creator: &str) -> bool {
        let mut state = self.state.lock().await;
        state.active_menu = None;
        state.settings.block(creator).await
    }

    pub async fn report_post(&self, meme_id: &str) {
        self.moderation.report(meme_id);
        self.state.lock().await.active_menu = None;
    }

    // --- Settings ---

    pub async fn set_handle(&self, handle: &str) -> bool {
        self.state.lock().await.settings.set_handle(handle).await
    }

    pub async fn toggle_pro(&self) -> bool {
        self.state.lock().await.settings.toggle_pro().await
    }

    pub async fn complete_onboarding(&self) {
        self.state.lock().await.settings.complete_onboarding().await;
    }

    pub async fn set_theme(&self, theme: Theme) {
        self.state.lock().await.settings.set_theme(theme).await;
    }

    /// Clears everything persisted and starts over from first-run state.
    pub async fn wipe(&self) {
        let mut state = self.state.lock().await;
        state.content.reset().await;
        state.settings.reset().await;
        state.composer = ComposerState::Empty;
        state.view = View::Feed;
        state.active_menu = None;
        tracing::warn!("Studio data wiped");
    }
}
