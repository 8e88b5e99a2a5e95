use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tone parameter used to steer caption generation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HumorStyle {
    Sarcastic,
    Wholesome,
    Dark,
    #[default]
    Relatable,
    Absurdist,
}

impl HumorStyle {
    pub const ALL: [HumorStyle; 5] = [
        HumorStyle::Sarcastic,
        HumorStyle::Wholesome,
        HumorStyle::Dark,
        HumorStyle::Relatable,
        HumorStyle::Absurdist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HumorStyle::Sarcastic => "Sarcastic",
            HumorStyle::Wholesome => "Wholesome",
            HumorStyle::Dark => "Dark",
            HumorStyle::Relatable => "Relatable",
            HumorStyle::Absurdist => "Absurdist",
        }
    }

    /// Natural-language description embedded in caption prompts.
    pub fn description(self) -> &'static str {
        match self {
            HumorStyle::Sarcastic => "dry, witty, and slightly cynical",
            HumorStyle::Wholesome => "sweet, positive, and heart-warming",
            HumorStyle::Dark => "edgy, cynical, and unconventional",
            HumorStyle::Relatable => "everyday struggles and common experiences",
            HumorStyle::Absurdist => "nonsensical, surreal, and bizarre",
        }
    }
}

/// Visual arrangement of an image plus two caption fields.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MemeLayout {
    #[default]
    TopBottom,
    Modern,
    /// Two-panel reaction.
    Drake,
    Split,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Meme {
    pub id: String,
    pub image_url: String,
    pub top_text: String,
    pub bottom_text: String,
    pub humor_style: HumorStyle,
    pub layout: MemeLayout,
    pub likes: u64,
    pub creator: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub is_pro_meme: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    pub id: String,
    pub image_url: String,
    pub title: String,
    pub description: String,
    pub cta_text: String,
    pub link: String,
}

/// A single slot of the assembled feed. Never persisted.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedEntry {
    Meme(Meme),
    Ad(Ad),
}

impl FeedEntry {
    pub fn is_ad(&self) -> bool {
        matches!(self, FeedEntry::Ad(_))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub handle: String,
    pub is_pro: bool,
    pub has_onboarded: bool,
    pub theme: Theme,
    pub blocked_creators: BTreeSet<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            handle: "MemeCreator_42".to_string(),
            is_pro: false,
            has_onboarded: false,
            theme: Theme::Dark,
            blocked_creators: BTreeSet::new(),
        }
    }
}

impl UserSettings {
    /// Adds `creator` to the block list. Returns false for the user's own
    /// handle or an already blocked creator.
    pub fn block(&mut self, creator: &str) -> bool {
        if creator == self.handle {
            return false;
        }
        self.blocked_creators.insert(creator.to_string())
    }

    /// Changes the handle. Blank handles are ignored; the new handle is
    /// removed from the block list if it was on it.
    pub fn set_handle(&mut self, handle: &str) -> bool {
        let handle = handle.trim();
        if handle.is_empty() || handle == self.handle {
            return false;
        }
        self.blocked_creators.remove(handle);
        self.handle = handle.to_string();
        true
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MemeTemplate {
    pub id: String,
    pub name: String,
    pub url: String,
    pub layout: MemeLayout,
    pub tags: Vec<String>,
}

/// Caption pair produced by the generative service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionPair {
    pub top_text: String,
    pub bottom_text: String,
}

impl CaptionPair {
    pub fn new(top: impl Into<String>, bottom: impl Into<String>) -> Self {
        Self {
            top_text: top.into(),
            bottom_text: bottom.into(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub meme_id: String,
    pub creator: String,
    pub likes: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub handle: String,
    pub posts: usize,
    pub total_impact: u64,
    pub memes: Vec<Meme>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_uses_kebab_case_on_the_wire() {
        let json = serde_json::to_string(&MemeLayout::TopBottom).unwrap();
        assert_eq!(json, "\"top-bottom\"");
        let parsed: MemeLayout = serde_json::from_str("\"drake\"").unwrap();
        assert_eq!(parsed, MemeLayout::Drake);
    }

    #[test]
    fn feed_entries_are_tagged_by_type() {
        let ad = Ad {
            id: "ad-1".into(),
            image_url: "x".into(),
            title: "t".into(),
            description: "d".into(),
            cta_text: "c".into(),
            link: "#".into(),
        };
        let value = serde_json::to_value(FeedEntry::Ad(ad)).unwrap();
        assert_eq!(value["type"], "ad");
        assert_eq!(value["ctaText"], "c");
    }

    #[test]
    fn own_handle_is_never_blocked() {
        let mut settings = UserSettings::default();
        assert!(!settings.block("MemeCreator_42"));
        assert!(settings.block("Troll"));
        assert!(!settings.block("Troll"));
        assert_eq!(settings.blocked_creators.len(), 1);

        // Taking a blocked name as your handle unblocks it.
        assert!(settings.set_handle("Troll"));
        assert!(!settings.blocked_creators.contains("Troll"));
        assert!(!settings.set_handle("   "));
    }

    #[test]
    fn meme_without_pro_flag_deserializes() {
        let json = r#"{"id":"1","imageUrl":"u","topText":"a","bottomText":"b",
            "humorStyle":"Dark","layout":"modern","likes":3,"creator":"X","timestamp":10}"#;
        let meme: Meme = serde_json::from_str(json).unwrap();
        assert!(!meme.is_pro_meme);
        assert_eq!(meme.humor_style, HumorStyle::Dark);
    }
}
