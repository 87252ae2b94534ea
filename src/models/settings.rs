use crate::models::bubble::LifecycleSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const APP_NAME: &str = "fyrechat";
const DEFAULT_CHANNEL: &str = "alveussanctuary";
const DEFAULT_PROXY: &str = "https://twitch-badge-proxy.thebackfyre.workers.dev";

const DEFAULT_MAX: i64 = 8;
const DEFAULT_TTL: i64 = 22;
const DEFAULT_FADE: f64 = 2.0;

/// Style keys the overlay page understands, settable from overrides.
pub const STYLE_KEYS: &[&str] = &[
    "badgeSize",
    "badgeGap",
    "badgePadRight",
    "emoteSize",
    "emoteBaseline",
    "emotePadX",
    "nameSize",
    "nameWeight",
    "textSize",
    "lineHeight",
];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderToggle {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for ProviderToggle {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ProviderSettings {
    pub bttv: ProviderToggle,
    #[serde(rename = "7tv")]
    pub seven_tv: ProviderToggle,
    pub ffz: ProviderToggle,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            bttv: ProviderToggle::default(),
            seven_tv: ProviderToggle {
                enabled: true,
                base_url: Some("https://7tv.io/v3".to_string()),
            },
            ffz: ProviderToggle::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmoteSettings {
    pub enabled: bool,
    pub providers: ProviderSettings,
    /// Catalog refresh interval, 0 disables refreshing
    pub cache_minutes: u64,
}

impl Default for EmoteSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            providers: ProviderSettings::default(),
            cache_minutes: 360,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlaySettings {
    pub channel: String,
    pub max: i64,
    pub ttl: i64,
    pub fade: f64,
    pub debug: bool,
    pub demo: bool,
    pub demo_badges: bool,
    pub theme: String,
    /// Empty disables badges entirely
    pub badge_proxy: String,
    pub id_proxy: String,
    pub emotes: EmoteSettings,
    pub style: BTreeMap<String, String>,
    /// Local port of the overlay websocket
    pub port: u16,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            max: DEFAULT_MAX,
            ttl: DEFAULT_TTL,
            fade: DEFAULT_FADE,
            debug: false,
            demo: false,
            demo_badges: false,
            theme: "glass".to_string(),
            badge_proxy: DEFAULT_PROXY.to_string(),
            id_proxy: DEFAULT_PROXY.to_string(),
            emotes: EmoteSettings::default(),
            style: BTreeMap::new(),
            port: 7777,
        }
    }
}

impl OverlaySettings {
    /// Load from a JSON file when `path` is given (a missing file yields defaults),
    /// otherwise from the per-user config location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    log::warn!(
                        "[Settings] {} not found, using defaults",
                        path.display()
                    );
                    return Ok(Self::default());
                }
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let settings: OverlaySettings = serde_json::from_str(&json)
                    .with_context(|| format!("failed to parse {}", path.display()))?;
                Ok(settings)
            }
            None => {
                let settings: OverlaySettings = confy::load(APP_NAME, "settings")?;
                Ok(settings)
            }
        }
    }

    /// Apply URI-style overrides such as `ch=foo&max=5&emotes=0&style.textSize=20px`.
    pub fn apply_overrides(&mut self, query: &str) {
        let query = query.trim_start_matches('?');
        let params: BTreeMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        let flag = |key: &str| params.get(key).map(|v| v == "1");

        if let Some(v) = params.get("ch") {
            self.channel = v.clone();
        }
        if let Some(v) = params.get("channel") {
            self.channel = v.clone();
        }
        if let Some(v) = params.get("max") {
            self.max = parse_number(v).map(|n| n.floor() as i64).unwrap_or(DEFAULT_MAX);
        }
        if let Some(v) = params.get("ttl") {
            self.ttl = parse_number(v).map(|n| n.floor() as i64).unwrap_or(DEFAULT_TTL);
        }
        if let Some(v) = params.get("fade") {
            self.fade = parse_number(v).unwrap_or(DEFAULT_FADE);
        }
        if let Some(on) = flag("debug") {
            self.debug = on;
        }
        if let Some(on) = flag("demo") {
            self.demo = on;
        }
        if let Some(on) = flag("demoBadges") {
            self.demo_badges = on;
        }
        if let Some(v) = params.get("badgeProxy") {
            self.badge_proxy = v.clone();
        }
        if let Some(v) = params.get("theme") {
            self.theme = v.clone();
        }
        if let Some(v) = params.get("idProxy") {
            self.id_proxy = v.clone();
        }

        if params.get("badges").is_some_and(|v| v == "0") {
            self.badge_proxy.clear();
        }
        if let Some(on) = flag("emotes") {
            self.emotes.enabled = on;
        }
        if let Some(on) = flag("bttv") {
            self.emotes.providers.bttv.enabled = on;
        }
        if let Some(on) = flag("7tv") {
            self.emotes.providers.seven_tv.enabled = on;
        }
        if let Some(on) = flag("ffz") {
            self.emotes.providers.ffz.enabled = on;
        }

        for key in STYLE_KEYS {
            let value = params
                .get(*key)
                .or_else(|| params.get(&format!("style.{}", key)));
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                self.style.insert(key.to_string(), v.clone());
            }
        }
    }

    /// Clamp numeric fields into their supported ranges.
    pub fn normalize(&mut self) {
        self.channel = self.channel.trim().to_lowercase();
        if self.channel.is_empty() {
            self.channel = DEFAULT_CHANNEL.to_string();
        }
        self.max = self.max.clamp(1, 200);
        self.ttl = self.ttl.clamp(0, 3600);
        self.fade = if self.fade.is_finite() {
            self.fade.clamp(0.0, 30.0)
        } else {
            DEFAULT_FADE
        };
    }

    pub fn lifecycle(&self) -> LifecycleSettings {
        LifecycleSettings {
            max: self.max.max(1) as usize,
            ttl: self.ttl.max(0) as u64,
            fade: self.fade.max(0.0),
        }
    }

    pub fn badges_enabled(&self) -> bool {
        !self.badge_proxy.is_empty()
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
