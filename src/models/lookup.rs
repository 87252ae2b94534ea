use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[allow(clippy::upper_case_acronyms)] // BTTV and FFZ are established acronyms (BetterTTV, FrankerFaceZ)
pub enum EmoteProvider {
    BTTV,
    #[serde(rename = "7tv")]
    SevenTV,
    FFZ,
}

impl std::fmt::Display for EmoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmoteProvider::BTTV => write!(f, "bttv"),
            EmoteProvider::SevenTV => write!(f, "7tv"),
            EmoteProvider::FFZ => write!(f, "ffz"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmoteEntry {
    pub url: String,
    pub provider: EmoteProvider,
}

/// Read side of a third-party emote catalog.
pub trait EmoteLookup {
    fn get_emote(&self, code: &str) -> Option<&EmoteEntry>;
    fn is_empty(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeScope {
    Channel,
    Global,
}

/// Read side of the badge catalogs.
pub trait BadgeLookup {
    fn badge_url(&self, set_id: &str, version_id: &str, scope: BadgeScope) -> Option<&str>;
}

/// Case-sensitive code -> emote map with a lowercase secondary key per code.
#[derive(Debug, Clone, Default)]
pub struct EmoteTable {
    emotes: HashMap<String, EmoteEntry>,
}

impl EmoteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `code`. The exact key always wins; the lowercase alias never
    /// overwrites a code that was registered under that exact spelling.
    pub fn insert(&mut self, code: &str, url: impl Into<String>, provider: EmoteProvider) {
        if code.is_empty() {
            return;
        }
        let url = url.into();
        if url.is_empty() {
            return;
        }
        let entry = EmoteEntry { url, provider };
        let lower = code.to_lowercase();
        if lower != code {
            self.emotes.entry(lower).or_insert_with(|| entry.clone());
        }
        self.emotes.insert(code.to_string(), entry);
    }

    /// Number of keys, lowercase aliases included.
    pub fn len(&self) -> usize {
        self.emotes.len()
    }

    pub fn merge(&mut self, other: EmoteTable) {
        for (code, entry) in other.emotes {
            self.emotes.insert(code, entry);
        }
    }
}

impl EmoteLookup for EmoteTable {
    fn get_emote(&self, code: &str) -> Option<&EmoteEntry> {
        self.emotes.get(code)
    }

    fn is_empty(&self) -> bool {
        self.emotes.is_empty()
    }
}

/// `set_id -> version_id -> image url`
#[derive(Debug, Clone, Default)]
pub struct BadgeTable {
    sets: HashMap<String, HashMap<String, String>>,
}

impl BadgeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, set_id: &str, version_id: &str, url: impl Into<String>) {
        self.sets
            .entry(set_id.to_string())
            .or_default()
            .insert(version_id.to_string(), url.into());
    }

    pub fn get(&self, set_id: &str, version_id: &str) -> Option<&str> {
        self.sets
            .get(set_id)
            .and_then(|versions| versions.get(version_id))
            .map(|s| s.as_str())
    }

    /// Number of badge sets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BadgeTables {
    pub channel: BadgeTable,
    pub global: BadgeTable,
}

impl BadgeLookup for BadgeTables {
    fn badge_url(&self, set_id: &str, version_id: &str, scope: BadgeScope) -> Option<&str> {
        match scope {
            BadgeScope::Channel => self.channel.get(set_id, version_id),
            BadgeScope::Global => self.global.get(set_id, version_id),
        }
    }
}

/// Outcome of the last catalog load, surfaced on the status banner.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogStatus {
    pub channel_id: Option<String>,
    pub id_error: Option<String>,
    pub badge_error: Option<String>,
    pub emote_errors: Vec<String>,
}

/// Immutable catalogs used for one render pass.
#[derive(Debug, Clone, Default)]
pub struct LookupSnapshot {
    pub emotes: EmoteTable,
    pub badges: BadgeTables,
    pub status: CatalogStatus,
}

impl LookupSnapshot {
    /// Badge URLs are only served once the global catalog loaded.
    pub fn badges_ready(&self) -> bool {
        !self.badges.global.is_empty()
    }
}
