//! Third-party emote matching inside plain text.
//!
//! Tokens keep their surrounding punctuation: `(catJAM)`, `catJAM!!` and `<catJAM>`
//! all render the emote with the wrappers escaped around it.

use crate::models::lookup::EmoteLookup;
use crate::utils::html::{emote_img, escape_html};
use lazy_static::lazy_static;
use regex::Regex;

const LEFT_WRAPPERS: [char; 6] = ['(', '[', '{', '<', '"', '\''];
const RIGHT_WRAPPERS: [char; 6] = [')', ']', '}', '>', '"', '\''];

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref ANGLE_WRAPPED: Regex = Regex::new(r"^<([^<>]+)>$").unwrap();
    static ref TRAILING_PUNCT: Regex = Regex::new(r"[!?.,:;~]+$").unwrap();
}

#[derive(Debug, PartialEq, Eq)]
struct Peeled<'a> {
    left: String,
    core: &'a str,
    right: String,
}

/// Render `text` with third-party emotes substituted. Never fails: anything that
/// does not resolve is emitted as escaped text.
pub fn render_segment<L: EmoteLookup + ?Sized>(text: &str, lookup: &L) -> String {
    if lookup.is_empty() {
        return escape_html(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for ws in WHITESPACE.find_iter(text) {
        if ws.start() > last {
            out.push_str(&render_token(&text[last..ws.start()], lookup));
        }
        out.push_str(&escape_html(ws.as_str()));
        last = ws.end();
    }
    if last < text.len() {
        out.push_str(&render_token(&text[last..], lookup));
    }
    out
}

fn render_token<L: EmoteLookup + ?Sized>(token: &str, lookup: &L) -> String {
    let peeled = peel(token);
    if peeled.core.is_empty() {
        return escape_html(token);
    }

    let entry = lookup
        .get_emote(peeled.core)
        .or_else(|| lookup.get_emote(&peeled.core.to_lowercase()));

    match entry {
        Some(emote) => format!(
            "{}{}{}",
            escape_html(&peeled.left),
            emote_img(&emote.url),
            escape_html(&peeled.right)
        ),
        None => escape_html(token),
    }
}

fn peel(token: &str) -> Peeled<'_> {
    // Exact `<name>` wins over the generic peel
    if let Some(caps) = ANGLE_WRAPPED.captures(token) {
        if let Some(inner) = caps.get(1) {
            return Peeled {
                left: "<".to_string(),
                core: inner.as_str(),
                right: ">".to_string(),
            };
        }
    }

    let mut core = token;
    let mut punct = "";
    if let Some(m) = TRAILING_PUNCT.find(core) {
        punct = &token[m.start()..];
        core = &token[..m.start()];
    }

    let mut left = String::new();
    let mut right = String::new();
    let mut changed = true;
    while changed && !core.is_empty() {
        changed = false;

        if let Some(c) = core.chars().next().filter(|c| LEFT_WRAPPERS.contains(c)) {
            left.push(c);
            core = &core[c.len_utf8()..];
            changed = true;
        }

        if let Some(c) = core.chars().next_back().filter(|c| RIGHT_WRAPPERS.contains(c)) {
            right.insert(0, c);
            core = &core[..core.len() - c.len_utf8()];
            changed = true;
        }
    }

    right.push_str(punct);
    Peeled { left, core, right }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lookup::{EmoteProvider, EmoteTable};

    const URL: &str = "https://cdn.7tv.app/emote/abc/1x.webp";

    fn table() -> EmoteTable {
        let mut table = EmoteTable::new();
        table.insert("widepeepoHappy", URL, EmoteProvider::SevenTV);
        table.insert("catJAM", "https://cdn.betterttv.net/emote/c/3x?a=1&b='x'", EmoteProvider::BTTV);
        table
    }

    fn img() -> String {
        format!(r#"<img class="emote" alt="" src="{}">"#, URL)
    }

    #[test]
    fn test_empty_lookup_escapes() {
        let empty = EmoteTable::new();
        assert_eq!(render_segment("a <b> & c", &empty), "a &lt;b&gt; &amp; c");
    }

    #[test]
    fn test_plain_match_keeps_whitespace() {
        assert_eq!(
            render_segment("hi  widepeepoHappy\tthere", &table()),
            format!("hi  {}\tthere", img())
        );
    }

    #[test]
    fn test_parenthesised() {
        assert_eq!(
            render_segment("(widepeepoHappy)", &table()),
            format!("({})", img())
        );
    }

    #[test]
    fn test_angle_wrapped() {
        assert_eq!(
            render_segment("<widepeepoHappy>", &table()),
            format!("&lt;{}&gt;", img())
        );
    }

    #[test]
    fn test_trailing_punctuation() {
        assert_eq!(
            render_segment("widepeepoHappy...", &table()),
            format!("{}...", img())
        );
        assert_eq!(
            render_segment("(widepeepoHappy)!?", &table()),
            format!("({})!?", img())
        );
    }

    #[test]
    fn test_nested_and_quoted_wrappers() {
        assert_eq!(
            render_segment("[\"widepeepoHappy\"]", &table()),
            format!("[&quot;{}&quot;]", img())
        );
        assert_eq!(
            render_segment("'widepeepoHappy", &table()),
            format!("&#039;{}", img())
        );
    }

    #[test]
    fn test_case_insensitive_fallback() {
        assert_eq!(render_segment("WIDEPEEPOHAPPY", &table()), img());
        assert_eq!(render_segment("NotAnEmote", &table()), "NotAnEmote");
        assert_eq!(
            render_segment("CatJam", &table()),
            r#"<img class="emote" alt="" src="https://cdn.betterttv.net/emote/c/3x?a=1&amp;b='x'">"#
        );
    }

    #[test]
    fn test_non_match_is_escaped_original_token() {
        for token in ["(nope)", "<nope>", "nope!!", "\"<'x'>\"", "(", "<>", "<<a>>", "&amp;"] {
            assert_eq!(render_segment(token, &table()), escape_html(token), "token {token}");
        }
    }

    #[test]
    fn test_peel_shapes() {
        assert_eq!(
            peel("{(catJAM)},"),
            Peeled {
                left: "{(".into(),
                core: "catJAM",
                right: ")},".into()
            }
        );
        assert_eq!(
            peel("<a>"),
            Peeled {
                left: "<".into(),
                core: "a",
                right: ">".into()
            }
        );
    }
}
