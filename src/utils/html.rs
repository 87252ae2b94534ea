//! HTML escaping helpers used when building bubble fragments.
//!
//! Text content and attribute values use different rules: attribute values (emote and
//! badge URLs) leave `'` untouched because they are always emitted inside double quotes.

/// Escape text for use as HTML element content.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a value for use inside a double-quoted HTML attribute.
pub fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// `<img>` fragment for an emote; the URL is attribute-escaped.
pub fn emote_img(url: &str) -> String {
    format!(r#"<img class="emote" alt="" src="{}">"#, escape_attr(url))
}
