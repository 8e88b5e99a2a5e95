//! Composer state machine and the transient editor session.

use serde::{Deserialize, Serialize};

use crate::models::{CaptionPair, HumorStyle, MemeLayout};

pub const DEFAULT_TOP_TEXT: &str = "Top Text";
pub const DEFAULT_BOTTOM_TEXT: &str = "Bottom Text";

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditorSession {
    pub source_image: Option<String>,
    pub top_text: String,
    pub bottom_text: String,
    pub humor_style: HumorStyle,
    pub layout: MemeLayout,
    /// The user's idea text, sent along with every caption request.
    pub caption_context: Option<String>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self {
            source_image: None,
            top_text: DEFAULT_TOP_TEXT.to_string(),
            bottom_text: DEFAULT_BOTTOM_TEXT.to_string(),
            humor_style: HumorStyle::default(),
            layout: MemeLayout::default(),
            caption_context: None,
        }
    }
}

impl EditorSession {
    pub fn set_caption_context(&mut self, context: &str) {
        let context = context.trim();
        self.caption_context = (!context.is_empty()).then(|| context.to_string());
    }
}

/// Partial update of the editable fields.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EditorPatch {
    pub top_text: Option<String>,
    pub bottom_text: Option<String>,
    pub humor_style: Option<HumorStyle>,
    pub layout: Option<MemeLayout>,
    /// A blank value clears the stored context.
    pub caption_context: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ComposerState {
    Empty,
    Editing { session: EditorSession },
    /// Published and celebrating; `meme_id` is the item just inserted.
    Publishing {
        #[serde(rename = "memeId")]
        meme_id: String,
    },
}

impl ComposerState {
    pub fn session(&self) -> Option<&EditorSession> {
        match self {
            ComposerState::Editing { session } => Some(session),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut EditorSession> {
        match self {
            ComposerState::Editing { session } => Some(session),
            _ => None,
        }
    }

    /// Sets the source image, entering Editing from Empty. Captions, style
    /// and layout survive when already editing. Ignored while publishing.
    pub fn set_image(&mut self, image: String) -> bool {
        match self {
            ComposerState::Empty => {
                *self = ComposerState::Editing {
                    session: EditorSession {
                        source_image: Some(image),
                        ..EditorSession::default()
                    },
                };
                true
            }
            ComposerState::Editing { session } => {
                session.source_image = Some(image);
                true
            }
            ComposerState::Publishing { .. } => false,
        }
    }

    pub fn apply(&mut self, patch: EditorPatch) {
        let Some(session) = self.session_mut() else {
            return;
        };
        if let Some(top) = patch.top_text {
            session.top_text = top;
        }
        if let Some(bottom) = patch.bottom_text {
            session.bottom_text = bottom;
        }
        if let Some(style) = patch.humor_style {
            session.humor_style = style;
        }
        if let Some(layout) = patch.layout {
            session.layout = layout;
        }
        if let Some(context) = patch.caption_context {
            session.set_caption_context(&context);
        }
    }

    /// Applies generated captions, but only if the editor still shows `image`.
    pub fn apply_captions(&mut self, image: &str, captions: CaptionPair) -> bool {
        match self.session_mut() {
            Some(session) if session.source_image.as_deref() == Some(image) => {
                session.top_text = captions.top_text;
                session.bottom_text = captions.bottom_text;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        if matches!(self, ComposerState::Editing { .. }) {
            *self = ComposerState::Empty;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Feed,
    Create,
    Leaders,
    Profile,
    Settings,
}
