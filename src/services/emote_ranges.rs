//! Native emote ranges from the `emotes` tag.
//!
//! Offsets are UTF-16 code units, so the text is sliced through its UTF-16 encoding.
//! Slicing is lossy: a boundary that falls inside a surrogate pair turns each orphaned
//! half into U+FFFD instead of failing.
//! Overlapping ranges are not repaired: they are sequenced by start and a range that
//! starts behind the cursor simply yields no text before it.

use crate::models::chat_message::{EmoteRange, MessageSegment};

/// Parse `id:s-e,s-e/id:s-e`. Malformed groups and locations are skipped one by one.
pub fn parse_emote_spec(spec: &str) -> Vec<EmoteRange> {
    let mut ranges = Vec::new();

    for group in spec.split('/').filter(|g| !g.is_empty()) {
        let mut parts = group.split(':');
        let (Some(id), Some(locations)) = (parts.next(), parts.next()) else {
            continue;
        };
        if id.is_empty() || locations.is_empty() {
            continue;
        }

        for location in locations.split(',') {
            let Some((start, end)) = location.split_once('-') else {
                continue;
            };
            if let (Ok(start), Ok(end)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>()) {
                ranges.push(EmoteRange {
                    start,
                    end,
                    provider_id: id.to_string(),
                });
            }
        }
    }

    ranges
}

/// Split `text` into text and native emote segments.
pub fn segment(text: &str, native_emote_spec: &str) -> Vec<MessageSegment> {
    let mut ranges = parse_emote_spec(native_emote_spec);
    if ranges.is_empty() {
        return vec![MessageSegment::text(text)];
    }
    // sort_by_key is stable, ties keep tag order
    ranges.sort_by_key(|r| r.start);

    let units: Vec<u16> = text.encode_utf16().collect();
    let mut segments = Vec::with_capacity(ranges.len() * 2 + 1);
    let mut cursor = 0usize;

    for range in &ranges {
        if range.start > cursor {
            segments.push(MessageSegment::text(utf16_slice(&units, cursor, range.start)));
        }
        segments.push(MessageSegment::emote(
            range.provider_id.clone(),
            utf16_slice(&units, range.start, range.end.saturating_add(1)),
        ));
        cursor = range.end.saturating_add(1);
    }

    if cursor < units.len() {
        segments.push(MessageSegment::text(utf16_slice(&units, cursor, units.len())));
    }

    segments
}

/// Clamped `[start, end)` slice; an inverted range is empty, split surrogates decode to U+FFFD.
fn utf16_slice(units: &[u16], start: usize, end: usize) -> String {
    let end = end.min(units.len());
    if start >= end {
        return String::new();
    }
    String::from_utf16_lossy(&units[start..end])
}
