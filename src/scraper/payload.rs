//! Locating the encoded chapter content inside a Pratilipi reader page.
//!
//! The reader page embeds its Apollo cache in one long `window.__NUXT__` script. The chapter
//! content sits under a key ending in `content({\"isFullContent\":true})` (or `false`), as a
//! JS string literal holding the encoded payload.

use scraper::{Html, Selector};

const NUXT_MARKER: &str = "window.__NUXT";
const CONTENT_KEY: &str = r#"content({\"isFullContent\":"#;
const CONTENT_VALUE_OPEN: &str = "})\":\"";

/// Text of the first `<script>` element that carries the NUXT state.
pub fn find_nuxt_script(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("script").ok()?;
    doc.select(&selector)
        .map(|el| el.text().collect::<String>())
        .find(|text| text.contains(NUXT_MARKER))
}

/// Raw (still JS-escaped) payload following the content key, if present.
pub fn find_encoded_content(script: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(pos) = script[from..].find(CONTENT_KEY) {
        let after_key = from + pos + CONTENT_KEY.len();
        let rest = &script[after_key..];
        let value = rest
            .strip_prefix("true")
            .or_else(|| rest.strip_prefix("false"))
            .and_then(|r| r.strip_prefix(CONTENT_VALUE_OPEN));
        if let Some(value) = value {
            let end = closing_quote(value)?;
            return Some(&value[..end]);
        }
        from = after_key;
    }
    None
}

/// Byte offset of the first `"` not preceded by an escaping backslash.
fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, b) in s.bytes().enumerate() {
        match b {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Undo JS string-literal escaping (`\uXXXX`, `\xHH`, `\/`, `\n`, ...).
///
/// Unknown escapes keep the escaped character; malformed numeric escapes are dropped.
pub fn unescape_js(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let unit = u16::from_str_radix(&hex, 16).ok();
                match unit {
                    Some(high @ 0xD800..=0xDBFF) => {
                        let low = take_low_surrogate(&mut chars);
                        if let Some(ch) = low.and_then(|low| {
                            char::decode_utf16([high, low]).next().and_then(Result::ok)
                        }) {
                            out.push(ch);
                        }
                    }
                    Some(unit) => {
                        if let Some(ch) = char::from_u32(u32::from(unit)) {
                            out.push(ch);
                        }
                    }
                    None => {}
                }
            }
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn take_low_surrogate(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<u16> {
    if chars.peek() != Some(&'\\') {
        return None;
    }
    chars.next();
    if chars.next() != Some('u') {
        return None;
    }
    let hex: String = chars.by_ref().take(4).collect();
    u16::from_str_radix(&hex, 16)
        .ok()
        .filter(|unit| (0xDC00..=0xDFFF).contains(unit))
}

/// Find, unescape and return the encoded content of a reader page. `None` if the page carries no
/// NUXT state or no content key.
pub fn extract_payload(html: &str) -> Option<String> {
    let script = find_nuxt_script(html)?;
    find_encoded_content(&script).map(unescape_js)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_page(flag: &str, payload: &str) -> String {
        format!(
            r#"<!DOCTYPE html><html><head><title>Part 1</title></head><body>
<div id="__nuxt"></div>
<script>console.log("analytics")</script>
<script>window.__NUXT__=(function(a,b){{return {{apollo:{{defaultClient:{{"Pratilipi:123":{{"id":"123","content({{\"isFullContent\":{flag}}})":"{payload}","title":"Part 1"}}}}}}}}}}(null,false));</script>
</body></html>"#
        )
    }

    #[test]
    fn extracts_payload_for_full_content() {
        let html = reader_page("true", "PHA+aGk8L3A+");
        assert_eq!(extract_payload(&html).as_deref(), Some("PHA+aGk8L3A+"));
    }

    #[test]
    fn extracts_payload_for_partial_content() {
        let html = reader_page("false", "QQ==");
        assert_eq!(extract_payload(&html).as_deref(), Some("QQ=="));
    }

    #[test]
    fn extracted_payload_is_unescaped() {
        let html = reader_page("true", r"PHA\u002BaGk8L3A\u002B");
        assert_eq!(extract_payload(&html).as_deref(), Some("PHA+aGk8L3A+"));
    }

    #[test]
    fn missing_nuxt_script_yields_none() {
        let html = "<html><body><script>var x = 1;</script></body></html>";
        assert_eq!(extract_payload(html), None);
    }

    #[test]
    fn missing_content_key_yields_none() {
        let html = r#"<html><body><script>window.__NUXT__={apollo:{}}</script></body></html>"#;
        assert_eq!(extract_payload(html), None);
    }

    #[test]
    fn find_encoded_content_skips_keys_with_unexpected_flag() {
        let script = r#"a="content({\"isFullContent\":null})":"X",b="content({\"isFullContent\":true})":"QUJD""#;
        assert_eq!(find_encoded_content(script), Some("QUJD"));
    }

    #[test]
    fn find_encoded_content_stops_at_unescaped_quote() {
        let script = r#"content({\"isFullContent\":true})":"QU\"JD",next"#;
        assert_eq!(find_encoded_content(script), Some(r#"QU\"JD"#));
    }

    #[test]
    fn find_encoded_content_unterminated_is_none() {
        let script = r#"content({\"isFullContent\":true})":"QUJD"#;
        assert_eq!(find_encoded_content(script), None);
    }

    #[test]
    fn unescape_js_handles_common_escapes() {
        assert_eq!(unescape_js(r"a\/b"), "a/b");
        assert_eq!(unescape_js(r#"\"q\""#), "\"q\"");
        assert_eq!(unescape_js(r"x\\y"), r"x\y");
        assert_eq!(unescape_js(r"l1\nl2\tz"), "l1\nl2\tz");
        assert_eq!(unescape_js(r"\u0B85\x41"), "\u{0B85}A");
        assert_eq!(unescape_js(r"\uD83D\uDE00"), "\u{1F600}");
    }

    #[test]
    fn unescape_js_drops_malformed_numeric_escapes() {
        assert_eq!(unescape_js(r"a\uZZZZb"), "ab");
        assert_eq!(unescape_js(r"a\uD83Db"), "ab");
        assert_eq!(unescape_js("tail\\"), "tail");
    }
}
