//! Static content shipped with the studio: the sponsored catalog, the seed
//! feed shown on first run, trending templates and prompt suggestions.

use crate::models::{Ad, HumorStyle, Meme, MemeLayout, MemeTemplate};

pub const PROMPT_SUGGESTIONS: [&str; 5] = [
    "A cyberpunk cat hacking a neon mainframe",
    "A tiny hamster holding a giant pizza slice",
    "Medieval knight struggling with a self-checkout",
    "Gold retriever as a professional chef",
    "Robots having a picnic on Mars",
];

fn ad(id: &str, image_url: &str, title: &str, description: &str, cta_text: &str) -> Ad {
    Ad {
        id: id.to_string(),
        image_url: image_url.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        cta_text: cta_text.to_string(),
        link: "#".to_string(),
    }
}

pub fn sponsored_catalog() -> Vec<Ad> {
    vec![
        ad(
            "ad-1",
            "https://images.unsplash.com/photo-1614850523296-d8c1af93d400?auto=format&fit=crop&q=80&w=800",
            "MemeAI Studio Pro",
            "Unlock 4K exports, priority AI queue, and zero ads forever.",
            "GO PRO NOW",
        ),
        ad(
            "ad-2",
            "https://images.unsplash.com/photo-1550745165-9bc0b252726f?auto=format&fit=crop&q=80&w=800",
            "Retro Gamer Box",
            "The ultimate subscription for classic gaming enthusiasts.",
            "CLAIM OFFER",
        ),
        ad(
            "ad-3",
            "https://images.unsplash.com/photo-1557683311-eac922347aa1?auto=format&fit=crop&q=80&w=800",
            "Cloud Storage Max",
            "Never run out of space for your memes. 2TB for $1.",
            "UPGRADE",
        ),
    ]
}

/// Feed used when nothing has been persisted yet. Timestamps are relative
/// to `now_ms`.
pub fn seed_feed(now_ms: i64) -> Vec<Meme> {
    vec![
        Meme {
            id: "1".to_string(),
            image_url: "https://picsum.photos/seed/meme1/500/500".to_string(),
            top_text: "Me waiting for the code to compile".to_string(),
            bottom_text: "It has been 84 years".to_string(),
            humor_style: HumorStyle::Relatable,
            layout: MemeLayout::TopBottom,
            likes: 1240,
            creator: "DevGod".to_string(),
            timestamp: now_ms - 3_600_000,
            is_pro_meme: false,
        },
        Meme {
            id: "2".to_string(),
            image_url: "https://picsum.photos/seed/meme2/500/500".to_string(),
            top_text: "AI replacing my job".to_string(),
            bottom_text: "Me: using AI to generate memes".to_string(),
            humor_style: HumorStyle::Sarcastic,
            layout: MemeLayout::Modern,
            likes: 856,
            creator: "MemeLord".to_string(),
            timestamp: now_ms - 7_200_000,
            is_pro_meme: false,
        },
    ]
}

fn template(id: &str, name: &str, url: &str, layout: MemeLayout, tags: &[&str]) -> MemeTemplate {
    MemeTemplate {
        id: id.to_string(),
        name: name.to_string(),
        url: url.to_string(),
        layout,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn trending_templates() -> Vec<MemeTemplate> {
    vec![
        template(
            "drake",
            "Drake Hotline Bling",
            "https://picsum.photos/seed/drake/600/600",
            MemeLayout::Drake,
            &["classic", "choice"],
        ),
        template(
            "distracted",
            "Distracted Boyfriend",
            "https://picsum.photos/seed/boyfriend/600/400",
            MemeLayout::TopBottom,
            &["trending", "love"],
        ),
        template(
            "brain",
            "Expanding Brain",
            "https://picsum.photos/seed/brain/600/800",
            MemeLayout::Split,
            &["intellectual", "growth"],
        ),
        template(
            "modern-classic",
            "Modern Caption",
            "https://picsum.photos/seed/modern/600/600",
            MemeLayout::Modern,
            &["aesthetic", "minimal"],
        ),
    ]
}

pub fn find_template(id: &str) -> Option<MemeTemplate> {
    trending_templates().into_iter().find(|t| t.id == id)
}
