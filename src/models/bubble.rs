use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BubbleId(Uuid);

impl BubbleId {
    pub fn new() -> Self {
        BubbleId(Uuid::new_v4())
    }
}

impl Default for BubbleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BubbleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One rendered chat entry, ready for the overlay.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Bubble {
    pub id: BubbleId,
    /// Sender display name as plain text
    pub name: String,
    pub color: String,
    /// Html-safe fragments, joined in order by the overlay
    pub body_html: Vec<String>,
    pub badge_urls: Vec<String>,
    pub inserted_at: DateTime<Utc>,
}

impl Bubble {
    pub fn new(name: String, color: String, body_html: Vec<String>, badge_urls: Vec<String>) -> Self {
        Self {
            id: BubbleId::new(),
            name,
            color,
            body_html,
            badge_urls,
            inserted_at: Utc::now(),
        }
    }
}

/// Immutable limits for one bubble lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleSettings {
    /// Hard cap on live bubbles
    pub max: usize,
    /// Seconds until removal, 0 disables timed removal
    pub ttl: u64,
    /// Seconds of fade before removal, only used when `0 < fade < ttl`
    pub fade: f64,
}

/// Event pushed to the overlay surface.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OverlayEvent {
    Present { bubble: Bubble },
    Fade { id: BubbleId },
    Remove { id: BubbleId },
    Status { text: String },
}
