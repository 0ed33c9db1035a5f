// Slash command dispatch: decodes an invocation into a `Command`, applies it to
// the store, and produces the reply text.

use std::sync::Arc;

use crate::clash::{player::round2, StatsSource};
use crate::interaction::Invocation;
use crate::metrics;
use crate::store::{History, Store, StoreError};

pub const REPLY_NEED_TAG: &str = "⚠️ Please provide a player tag.";
pub const REPLY_UNLINKED: &str = "🗑️ Unlinked your account.";
pub const REPLY_NOT_LINKED: &str = "⚠️ You don't have an account linked.";
pub const REPLY_NO_TAG: &str = "⚠️ No linked account or invalid player tag.";
pub const REPLY_FETCH_FAILED: &str = "❌ Could not fetch player data.";
pub const REPLY_REGISTER_FIRST: &str = "⚠️ You need to `/register` first.";
pub const REPLY_SAVE_FAILED: &str = "❌ Could not save your data.";
pub const REPLY_UNKNOWN: &str = "Unknown command.";

/// Who `/stats` should look up.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// The invoking user's own linked tag.
    Caller,
    /// Another user's linked tag, from a `<@ID>` mention.
    Mention(String),
    /// A player tag given directly.
    Tag(String),
}

impl Target {
    pub fn parse(argument: Option<&str>) -> Self {
        match argument {
            None | Some("") => Target::Caller,
            Some(text) => match parse_mention(text) {
                Some(user_id) => Target::Mention(user_id.to_string()),
                None => Target::Tag(text.to_string()),
            },
        }
    }
}

/// User id inside a `<@ID>` mention token. Only the plain form is recognised.
pub fn parse_mention(text: &str) -> Option<&str> {
    text.strip_prefix("<@")?.strip_suffix('>')
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Register { tag: Option<String> },
    Unlink,
    Stats { target: Target },
    Gains,
    Unknown(String),
}

impl Command {
    pub fn decode(name: &str, argument: Option<&str>) -> Self {
        match name {
            "register" => Command::Register {
                tag: argument.filter(|t| !t.is_empty()).map(str::to_string),
            },
            "unlink" => Command::Unlink,
            "stats" => Command::Stats {
                target: Target::parse(argument),
            },
            "gains" => Command::Gains,
            other => Command::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Register { .. } => "register",
            Command::Unlink => "unlink",
            Command::Stats { .. } => "stats",
            Command::Gains => "gains",
            Command::Unknown(_) => "unknown",
        }
    }
}

/// Reply for `/gains` given the fresh snapshot and the previously stored one.
/// A missing previous value compares against the current one.
pub fn gains_message(trophies: i64, winrate: f64, previous: &History) -> String {
    let diff = trophies - previous.trophies.unwrap_or(trophies);
    let mut wdiff = round2(winrate - previous.winrate.unwrap_or(winrate));
    if wdiff == 0.0 {
        // -0.0 would otherwise render as "-0.00"
        wdiff = 0.0;
    }
    format!("🏆 Trophies: {trophies} ({diff:+})\n⚔️ Winrate change: {wdiff:+.2}%")
}

pub struct Dispatcher {
    store: Arc<Store>,
    source: Arc<dyn StatsSource>,
}

impl Dispatcher {
    pub fn new(store: Arc<Store>, source: Arc<dyn StatsSource>) -> Self {
        Self { store, source }
    }

    /// Run one slash command and return the reply text. Never fails: every
    /// error is turned into a user-facing message.
    pub async fn dispatch(&self, invocation: &Invocation) -> String {
        let command = Command::decode(&invocation.command, invocation.argument.as_deref());
        metrics::COMMANDS_TOTAL
            .with_label_values(&[command.name()])
            .inc();
        tracing::debug!("User {} invoked {:?}", invocation.user_id, command);

        let user_id = invocation.user_id.as_str();
        let result = match command {
            Command::Register { tag } => self.register(user_id, tag).await,
            Command::Unlink => self.unlink(user_id).await,
            Command::Stats { target } => Ok(self.stats(user_id, target).await),
            Command::Gains => self.gains(user_id).await,
            Command::Unknown(name) => {
                tracing::debug!("Unknown command {name}");
                Ok(REPLY_UNKNOWN.to_string())
            }
        };

        result.unwrap_or_else(|e| {
            tracing::error!("Store error while handling command for {user_id}: {e}");
            REPLY_SAVE_FAILED.to_string()
        })
    }

    async fn register(&self, user_id: &str, tag: Option<String>) -> Result<String, StoreError> {
        let Some(tag) = tag else {
            return Ok(REPLY_NEED_TAG.to_string());
        };
        self.store.register(user_id, &tag).await?;
        Ok(format!("✅ Registered `{tag}` to your account."))
    }

    async fn unlink(&self, user_id: &str) -> Result<String, StoreError> {
        if self.store.unlink(user_id).await? {
            Ok(REPLY_UNLINKED.to_string())
        } else {
            Ok(REPLY_NOT_LINKED.to_string())
        }
    }

    async fn stats(&self, user_id: &str, target: Target) -> String {
        let tag = match target {
            Target::Caller => self.store.tag_for(user_id).await,
            Target::Mention(other) => self.store.tag_for(&other).await,
            Target::Tag(tag) => Some(tag),
        };
        let Some(tag) = tag else {
            return REPLY_NO_TAG.to_string();
        };

        match self.source.player(&tag).await {
            Ok(player) => player.stats_message(),
            Err(_) => REPLY_FETCH_FAILED.to_string(),
        }
    }

    async fn gains(&self, user_id: &str) -> Result<String, StoreError> {
        let Some(tag) = self.store.tag_for(user_id).await else {
            return Ok(REPLY_REGISTER_FIRST.to_string());
        };

        let player = match self.source.player(&tag).await {
            Ok(player) => player,
            Err(_) => return Ok(REPLY_FETCH_FAILED.to_string()),
        };

        let trophies = player.trophies;
        let winrate = player.winrate();
        let snapshot = History::snapshot(trophies, winrate);

        // The user may have unlinked while the lookup was in flight.
        let Some(previous) = self.store.swap_history(user_id, snapshot).await? else {
            return Ok(REPLY_REGISTER_FIRST.to_string());
        };

        Ok(gains_message(trophies, winrate, &previous))
    }
}
