//! Offline harness: replays a fixed message matrix through the live pipeline.

use crate::models::chat_message::ParsedMessage;
use crate::models::settings::OverlaySettings;
use crate::services::bubble_service::{BubbleService, RenderSink};
use crate::services::catalog_service::CatalogHandle;
use crate::services::composer::compose;
use crate::services::irc_parser::NO_BADGES;
use std::sync::Arc;
use std::time::Duration;

pub const DEMO_INTERVAL: Duration = Duration::from_millis(1100);

/// Native emotes synthesised into the tag, by code.
const NATIVE_EMOTE_IDS: &[(&str, &str)] = &[("Kappa", "25")];

const DEMO_BADGES: &[&str] = &[
    "broadcaster/1",
    "moderator/1,subscriber/6",
    "subscriber/1",
    "subscriber/3",
    "subscriber/6",
    "subscriber/12",
];

struct DemoSample {
    name: &'static str,
    color: &'static str,
    text: &'static str,
    native_tag: bool,
}

const SAMPLES: &[DemoSample] = &[
    DemoSample {
        name: "Fyre",
        color: "#9bf",
        text: "[TWITCH] Kappa should render -> Kappa",
        native_tag: true,
    },
    DemoSample {
        name: "Viewer",
        color: "#fc6",
        text: "[3P BASIC] PepeLaugh monkaS widepeepoHappy catJAM",
        native_tag: false,
    },
    DemoSample {
        name: "ModUser",
        color: "#6f6",
        text: "[3P EDGE] widepeepoHappy! (widepeepoHappy) <widepeepoHappy> widepeepoHappy...",
        native_tag: false,
    },
    DemoSample {
        name: "Viewer",
        color: "#fc6",
        text: "[MIXED] Kappa PepeLaugh monkaS catJAM widepeepoHappy",
        native_tag: true,
    },
    DemoSample {
        name: "Viewer",
        color: "#fc6",
        text: "[COLLISION] widepeepoHappy widepeepoHappy! <widepeepoHappy> (widepeepoHappy)",
        native_tag: false,
    },
];

fn is_word_unit(unit: u16) -> bool {
    matches!(unit, 0x30..=0x39 | 0x41..=0x5A | 0x61..=0x7A | 0x5F)
}

/// Build an `emotes` tag value (`id:s-e,s-e/id:...`) for the known native codes
/// standing alone in `text`. Offsets are UTF-16, end inclusive.
pub fn build_native_emote_tag(text: &str) -> String {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut groups = Vec::new();

    for (code, id) in NATIVE_EMOTE_IDS {
        let needle: Vec<u16> = code.encode_utf16().collect();
        let len = needle.len();
        let mut ranges = Vec::new();
        let mut idx = 0;

        while idx + len <= units.len() {
            if units[idx..idx + len] != needle[..] {
                idx += 1;
                continue;
            }
            let before_ok = idx == 0 || !is_word_unit(units[idx - 1]);
            let after_ok = idx + len >= units.len() || !is_word_unit(units[idx + len]);
            if before_ok && after_ok {
                ranges.push(format!("{}-{}", idx, idx + len - 1));
            }
            idx += len;
        }

        if !ranges.is_empty() {
            groups.push(format!("{}:{}", id, ranges.join(",")));
        }
    }

    groups.join("/")
}

/// The `index`th demo message, wrapping around the matrix.
pub fn demo_message(index: usize, demo_badges: bool) -> ParsedMessage {
    let sample = &SAMPLES[index % SAMPLES.len()];
    let badge_spec = if demo_badges {
        DEMO_BADGES[index % DEMO_BADGES.len()]
    } else {
        NO_BADGES
    };

    ParsedMessage {
        sender_name: sample.name.to_string(),
        color: sample.color.to_string(),
        text: sample.text.to_string(),
        native_emote_spec: if sample.native_tag {
            build_native_emote_tag(sample.text)
        } else {
            String::new()
        },
        badge_spec: badge_spec.to_string(),
    }
}

pub struct DemoService<S: RenderSink> {
    settings: Arc<OverlaySettings>,
    bubbles: Arc<BubbleService<S>>,
    catalogs: CatalogHandle,
    next: usize,
}

impl<S: RenderSink> DemoService<S> {
    pub fn new(settings: Arc<OverlaySettings>, bubbles: Arc<BubbleService<S>>, catalogs: CatalogHandle) -> Self {
        Self {
            settings,
            bubbles,
            catalogs,
            next: 0,
        }
    }

    /// Compose and insert the next sample.
    pub async fn step(&mut self) {
        let mut message = demo_message(self.next, self.settings.demo_badges);
        self.next = self.next.wrapping_add(1);

        let snapshot = self.catalogs.current().await;
        if !self.settings.badges_enabled() || !snapshot.badges_ready() {
            message.badge_spec = NO_BADGES.to_string();
        }

        let bubble = compose(message, &snapshot, self.settings.emotes.enabled);
        log::debug!("[Demo] Sample {} from {}", self.next, bubble.name);
        self.bubbles.insert(bubble).await;
    }

    pub async fn run(mut self) {
        log::info!("[Demo] Running sample matrix every {:?}", DEMO_INTERVAL);
        let mut ticker = tokio::time::interval(DEMO_INTERVAL);
        loop {
            ticker.tick().await;
            self.step().await;
        }
    }
}
