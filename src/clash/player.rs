// Upstream player payload and the values derived from it for display.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub tag: String,
    pub name: String,
    pub trophies: i64,
    pub arena: Arena,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub current_deck: Vec<Card>,
    #[serde(default)]
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub name: String,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub progress: Option<u32>,
}

const YEARS_PLAYED_BADGE: &str = "YearsPlayed";

/// Canonical form of a player tag for API calls: no leading `#`, upper-case.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim_start_matches('#').to_uppercase()
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Win percentage rounded to two decimals; 0 when no games have been played.
pub fn winrate(wins: u32, losses: u32) -> f64 {
    let total = wins as u64 + losses as u64;
    if total == 0 {
        return 0.0;
    }
    round2(wins as f64 / total as f64 * 100.0)
}

/// "N years, D days" from the YearsPlayed badge, or "Unknown".
pub fn account_age(badges: &[Badge]) -> String {
    badges
        .iter()
        .find(|b| b.name == YEARS_PLAYED_BADGE)
        .map(|b| {
            format!(
                "{} years, {} days",
                b.level.unwrap_or(0),
                b.progress.unwrap_or(0)
            )
        })
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Comma-joined card names in deck order, or "Unknown" for an empty deck.
pub fn deck_list(deck: &[Card]) -> String {
    if deck.is_empty() {
        return "Unknown".to_string();
    }
    deck.iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Player {
    pub fn winrate(&self) -> f64 {
        winrate(self.wins, self.losses)
    }

    /// Chat message shown by `/stats`.
    pub fn stats_message(&self) -> String {
        format!(
            "**{name}** ({tag})\n\
             🏆 **Trophies:** {trophies}\n\
             🎖 **Arena:** {arena}\n\
             ⚔️ **Winrate:** {winrate:.2}%\n\
             📆 **Account Age:** {age}\n\
             \n\
             🃏 **Deck:** {deck}",
            name = self.name,
            tag = self.tag,
            trophies = self.trophies,
            arena = self.arena.name,
            winrate = self.winrate(),
            age = account_age(&self.badges),
            deck = deck_list(&self.current_deck),
        )
    }
}
