use crate::models::bubble::Bubble;
use crate::models::chat_message::{MessageSegment, ParsedMessage};
use crate::models::lookup::LookupSnapshot;
use crate::services::badge_resolver::resolve_badges;
use crate::services::emote_ranges::segment;
use crate::services::token_matcher::render_segment;
use crate::utils::html::{emote_img, escape_html};

pub fn native_emote_url(id: &str) -> String {
    format!(
        "https://static-cdn.jtvnw.net/emoticons/v2/{}/default/dark/1.0",
        id
    )
}

/// Html fragments for a message body: native emotes from the tag, third-party
/// emotes matched inside the remaining text.
pub fn build_body_html(
    text: &str,
    native_emote_spec: &str,
    lookup: &LookupSnapshot,
    emotes_enabled: bool,
) -> Vec<String> {
    segment(text, native_emote_spec)
        .into_iter()
        .map(|seg| match seg {
            MessageSegment::Text { raw } if emotes_enabled => render_segment(&raw, &lookup.emotes),
            MessageSegment::Text { raw } => escape_html(&raw),
            MessageSegment::Emote { provider_id, .. } => emote_img(&native_emote_url(&provider_id)),
        })
        .collect()
}

/// Consume a parsed message into a bubble ready for insertion.
pub fn compose(message: ParsedMessage, lookup: &LookupSnapshot, emotes_enabled: bool) -> Bubble {
    let body_html = build_body_html(
        &message.text,
        &message.native_emote_spec,
        lookup,
        emotes_enabled,
    );
    let badge_urls = resolve_badges(&message.badge_spec, &lookup.badges);
    Bubble::new(message.sender_name, message.color, body_html, badge_urls)
}
