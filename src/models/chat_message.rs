use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tag block of one IRC line, `key -> value`.
pub type TagSet = HashMap<String, String>;

/// One PRIVMSG reduced to the fields the overlay renders.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ParsedMessage {
    pub sender_name: String,
    /// Hex color, `#ffffff` when the sender never picked one
    pub color: String,
    pub text: String,
    /// Raw `emotes` tag, e.g. `25:0-4,12-16/1902:6-10`; empty when absent
    pub native_emote_spec: String,
    /// Raw `badges` tag, `(none)` when absent
    pub badge_spec: String,
}

/// Inclusive range of UTF-16 code units covered by a native emote.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EmoteRange {
    pub start: usize,
    pub end: usize,
    pub provider_id: String,
}

/// Ordered piece of a message after native emote ranges are applied.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageSegment {
    Text {
        raw: String,
    },
    Emote {
        provider_id: String,
        /// Text the range covered, kept for alt text and reconstruction
        code: String,
    },
}

impl MessageSegment {
    pub fn text(raw: impl Into<String>) -> Self {
        MessageSegment::Text { raw: raw.into() }
    }

    pub fn emote(provider_id: impl Into<String>, code: impl Into<String>) -> Self {
        MessageSegment::Emote {
            provider_id: provider_id.into(),
            code: code.into(),
        }
    }
}
