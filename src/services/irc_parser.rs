use crate::models::chat_message::{ParsedMessage, TagSet};

/// Separates the IRC prefix/command from the trailing message text.
pub const BODY_MARKER: &str = " :";

pub const DEFAULT_NAME: &str = "Unknown";
pub const DEFAULT_COLOR: &str = "#ffffff";
pub const NO_BADGES: &str = "(none)";

/// Parse `a=1;b=;c` into a tag map. A piece without `=` maps to an empty value.
pub fn parse_tags(raw: &str) -> TagSet {
    let mut tags = TagSet::new();
    for piece in raw.split(';') {
        match piece.split_once('=') {
            Some((key, value)) => tags.insert(key.to_string(), value.to_string()),
            None => tags.insert(piece.to_string(), String::new()),
        };
    }
    tags
}

/// Parse one raw line. `None` means "not a displayable chat message".
pub fn parse_privmsg(line: &str) -> Option<ParsedMessage> {
    let mut tags = TagSet::new();
    let mut rest = line;

    if let Some(stripped) = line.strip_prefix('@') {
        // A tag block with nothing after it carries no message body
        let (raw_tags, remainder) = stripped.split_once(' ')?;
        tags = parse_tags(raw_tags);
        rest = remainder;
    }

    let body_start = rest.find(BODY_MARKER)?;
    let text = &rest[body_start + BODY_MARKER.len()..];

    Some(ParsedMessage {
        sender_name: tag_or(&tags, "display-name", DEFAULT_NAME),
        color: tag_or(&tags, "color", DEFAULT_COLOR),
        text: text.to_string(),
        native_emote_spec: tag_or(&tags, "emotes", ""),
        badge_spec: tag_or(&tags, "badges", NO_BADGES),
    })
}

/// Value of `key`, or `fallback` when the tag is missing or explicitly empty.
fn tag_or(tags: &TagSet, key: &str, fallback: &str) -> String {
    tags.get(key)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| fallback.to_string())
}
