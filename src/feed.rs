//! Feed assembly and the read-only views derived from the content list.
//!
//! Everything here is a pure function of its inputs so it can be recomputed
//! on every read.

use crate::models::{Ad, FeedEntry, LeaderboardEntry, Meme, ProfileStats, UserSettings};

pub const LEADERBOARD_SIZE: usize = 5;

/// Builds the display sequence for `items`.
///
/// Memes from blocked creators are dropped. Pro users get the filtered list
/// as-is; everyone else gets one sponsored entry after every second visible
/// meme, picked cyclically from `catalog` by position.
pub fn assemble(items: &[Meme], settings: &UserSettings, catalog: &[Ad]) -> Vec<FeedEntry> {
    let visible = items
        .iter()
        .filter(|meme| !settings.blocked_creators.contains(&meme.creator));

    if settings.is_pro || catalog.is_empty() {
        return visible.cloned().map(FeedEntry::Meme).collect();
    }

    let mut entries = Vec::with_capacity(items.len() + items.len() / 2);
    for (index, meme) in visible.enumerate() {
        entries.push(FeedEntry::Meme(meme.clone()));
        if (index + 1) % 2 == 0 {
            let ad = &catalog[(index / 2) % catalog.len()];
            entries.push(FeedEntry::Ad(ad.clone()));
        }
    }
    entries
}

/// Top memes by likes, highest first. Ties keep content-list order.
pub fn leaderboard(items: &[Meme], limit: usize) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&Meme> = items.iter().collect();
    ranked.sort_by(|a, b| b.likes.cmp(&a.likes));
    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, meme)| LeaderboardEntry {
            rank: i + 1,
            meme_id: meme.id.clone(),
            creator: meme.creator.clone(),
            likes: meme.likes,
        })
        .collect()
}

pub fn profile_stats(items: &[Meme], handle: &str) -> ProfileStats {
    let memes: Vec<Meme> = items.iter().filter(|m| m.creator == handle).cloned().collect();
    ProfileStats {
        handle: handle.to_string(),
        posts: memes.len(),
        total_impact: memes.iter().map(|m| m.likes).sum(),
        memes,
    }
}

/// Sponsored entry shown while an AI task is running. `counter` is the
/// number of AI tasks started so far.
pub fn interstitial_ad<'a>(catalog: &'a [Ad], settings: &UserSettings, counter: u64) -> Option<&'a Ad> {
    if settings.is_pro || catalog.is_empty() {
        return None;
    }
    catalog.get((counter % catalog.len() as u64) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sponsored_catalog;
    use crate::models::{HumorStyle, MemeLayout};

    fn meme(id: &str, creator: &str, likes: u64) -> Meme {
        Meme {
            id: id.to_string(),
            image_url: format!("https://img/{id}"),
            top_text: "top".to_string(),
            bottom_text: "bottom".to_string(),
            humor_style: HumorStyle::Relatable,
            layout: MemeLayout::TopBottom,
            likes,
            creator: creator.to_string(),
            timestamp: 0,
            is_pro_meme: false,
        }
    }

    fn ids(entries: &[FeedEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| match e {
                FeedEntry::Meme(m) => m.id.clone(),
                FeedEntry::Ad(a) => a.id.clone(),
            })
            .collect()
    }

    #[test]
    fn interleaves_one_ad_after_each_pair() {
        let items = vec![meme("A", "A", 5), meme("B", "B", 2), meme("C", "C", 9)];
        let catalog = vec![sponsored_catalog().remove(0)];
        let feed = assemble(&items, &UserSettings::default(), &catalog);
        assert_eq!(ids(&feed), vec!["A", "B", "ad-1", "C"]);
    }

    #[test]
    fn blocking_reflows_ad_positions() {
        let items = vec![meme("A", "A", 5), meme("B", "B", 2), meme("C", "C", 9)];
        let catalog = vec![sponsored_catalog().remove(0)];
        let mut settings = UserSettings::default();
        settings.blocked_creators.insert("B".to_string());
        let feed = assemble(&items, &settings, &catalog);
        assert_eq!(ids(&feed), vec!["A", "C", "ad-1"]);
    }

    #[test]
    fn non_pro_length_and_ad_positions() {
        let catalog = sponsored_catalog();
        for n in 0..12 {
            let items: Vec<Meme> = (0..n).map(|i| meme(&i.to_string(), "x", 0)).collect();
            let feed = assemble(&items, &UserSettings::default(), &catalog);
            assert_eq!(feed.len(), n + n / 2);
            for (pos, entry) in feed.iter().enumerate() {
                assert_eq!(entry.is_ad(), pos % 3 == 2, "n={n} pos={pos}");
            }
        }
    }

    #[test]
    fn ads_cycle_through_catalog() {
        let catalog = sponsored_catalog();
        let items: Vec<Meme> = (0..8).map(|i| meme(&i.to_string(), "x", 0)).collect();
        let feed = assemble(&items, &UserSettings::default(), &catalog);
        let ads: Vec<String> = feed
            .iter()
            .filter_map(|e| match e {
                FeedEntry::Ad(a) => Some(a.id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ads, vec!["ad-1", "ad-2", "ad-3", "ad-1"]);
    }

    #[test]
    fn pro_users_see_filtered_content_only() {
        let items = vec![meme("A", "A", 1), meme("B", "B", 1), meme("C", "C", 1), meme("D", "D", 1)];
        let mut settings = UserSettings {
            is_pro: true,
            ..UserSettings::default()
        };
        settings.blocked_creators.insert("C".to_string());
        let feed = assemble(&items, &settings, &sponsored_catalog());
        assert_eq!(ids(&feed), vec!["A", "B", "D"]);
    }

    #[test]
    fn empty_catalog_degrades_to_content_only() {
        let items = vec![meme("A", "A", 1), meme("B", "B", 1), meme("C", "C", 1)];
        let feed = assemble(&items, &UserSettings::default(), &[]);
        assert_eq!(ids(&feed), vec!["A", "B", "C"]);
        assert!(assemble(&[], &UserSettings::default(), &sponsored_catalog()).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let items = vec![meme("A", "A", 1), meme("B", "B", 1), meme("C", "C", 1)];
        let mut settings = UserSettings {
            is_pro: true,
            ..UserSettings::default()
        };
        settings.blocked_creators.insert("B".to_string());
        let once: Vec<Meme> = assemble(&items, &settings, &[])
            .into_iter()
            .filter_map(|e| match e {
                FeedEntry::Meme(m) => Some(m),
                _ => None,
            })
            .collect();
        let twice = assemble(&once, &settings, &[]);
        assert_eq!(ids(&twice), vec!["A", "C"]);
    }

    #[test]
    fn leaderboard_orders_by_likes() {
        let items = vec![
            meme("a", "A", 5),
            meme("b", "B", 2),
            meme("c", "C", 9),
            meme("d", "D", 5),
            meme("e", "E", 1),
            meme("f", "F", 7),
        ];
        let board = leaderboard(&items, LEADERBOARD_SIZE);
        let order: Vec<&str> = board.iter().map(|e| e.meme_id.as_str()).collect();
        assert_eq!(order, vec!["c", "f", "a", "d", "b"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[4].rank, 5);
    }

    #[test]
    fn profile_stats_sum_own_likes() {
        let items = vec![meme("a", "me", 3), meme("b", "other", 10), meme("c", "me", 4)];
        let stats = profile_stats(&items, "me");
        assert_eq!(stats.posts, 2);
        assert_eq!(stats.total_impact, 7);
    }

    #[test]
    fn interstitial_is_deterministic_and_hidden_for_pro() {
        let catalog = sponsored_catalog();
        let settings = UserSettings::default();
        assert_eq!(interstitial_ad(&catalog, &settings, 4).map(|a| a.id.as_str()), Some("ad-2"));
        let pro = UserSettings {
            is_pro: true,
            ..UserSettings::default()
        };
        assert!(interstitial_ad(&catalog, &pro, 4).is_none());
    }
}
