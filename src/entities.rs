//! Repair HTML that Confluence escaped one time too many.
//!
//! Exports sometimes contain `&lt;p&gt;` where a real `<p>` was meant. The
//! decoder maps a fixed set of named references and any numeric reference in
//! the printable ASCII range back to literal characters. Higher code points are
//! left alone: a document that already holds correct UTF-8 may contain a
//! literal `&#` sequence that must survive untouched.

use std::{borrow::Cow, sync::LazyLock};

use regex::{Captures, Regex};

use crate::mappings::{ENTITIES, lookup};

/// Numeric references decode only when their value is below this bound.
const ASCII_LIMIT: u32 = 127;

fn table_alternation() -> String {
    ENTITIES
        .iter()
        .map(|(entity, _)| regex::escape(entity))
        .collect::<Vec<_>>()
        .join("|")
}

static TABLE_RE: LazyLock<Regex> = lazy_regex!(&table_alternation(), "entity table regex");

static ENTITY_RE: LazyLock<Regex> = lazy_regex!(
    &format!(r"{}|&#[xX]([0-9a-fA-F]+);|&#([0-9]+);", table_alternation()),
    "entity decoder regex",
);

fn decode_numeric(digits: &str, radix: u32) -> Option<char> {
    u32::from_str_radix(digits, radix)
        .ok()
        .filter(|value| (1..ASCII_LIMIT).contains(value))
        .and_then(char::from_u32)
}

fn replace_reference(caps: &Captures<'_>) -> String {
    let whole = &caps[0];
    let decoded = if let Some(hex) = caps.get(1) {
        decode_numeric(hex.as_str(), 16)
    } else if let Some(dec) = caps.get(2) {
        decode_numeric(dec.as_str(), 10)
    } else {
        return lookup(ENTITIES, whole).map_or_else(|| whole.to_string(), str::to_string);
    };
    decoded.map_or_else(|| whole.to_string(), String::from)
}

/// Decode double-encoded markup.
///
/// Input without `&lt;` or `&#` is returned borrowed and byte-for-byte
/// unchanged. Otherwise the text is scanned once from left to right, so a
/// decoded `&` never joins the following text into a new reference.
///
/// # Examples
///
/// ```
/// use confluence2md::entities::decode_entities;
///
/// assert_eq!(decode_entities("&lt;p&gt;Hi&lt;/p&gt;"), "<p>Hi</p>");
/// assert_eq!(decode_entities("&#126; &#200;"), "~ &#200;");
/// ```
#[must_use]
pub fn decode_entities(html: &str) -> Cow<'_, str> {
    if !html.contains("&lt;") && !html.contains("&#") {
        return Cow::Borrowed(html);
    }
    ENTITY_RE.replace_all(html, replace_reference)
}

/// Decode only the fixed entity table, with no fast path and no generic
/// numeric references.
#[must_use]
pub fn decode_entity_table(text: &str) -> Cow<'_, str> {
    TABLE_RE.replace_all(text, |caps: &Captures<'_>| {
        lookup(ENTITIES, &caps[0]).unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("plain text without entities", "plain text without entities")]
    #[case("&lt;div&gt;content&lt;/div&gt;", "<div>content</div>")]
    #[case("&lt;Tom &amp; Jerry&gt;", "<Tom & Jerry>")]
    #[case("&#60;&quot;quoted&quot;&#62;", "<\"quoted\">")]
    #[case("&lt;&apos;apostrophe&apos;&gt;", "<'apostrophe'>")]
    #[case("&#x3C;tag&#x3E;", "<tag>")]
    #[case("&#x3c;lower&#x3e;", "<lower>")]
    #[case("&#X3C;upper&#X3E;", "<upper>")]
    #[case("&lt;p&gt;Hello &amp; &#x27;world&#x27;&lt;/p&gt;", "<p>Hello & 'world'</p>")]
    #[case("&lt;word&nbsp;word&gt;", "<word word>")]
    #[case("&#200;", "&#200;")]
    #[case("&#xC8;", "&#xC8;")]
    #[case("&unknown; &lt;test&gt;", "&unknown; <test>")]
    #[case("&#126; &#127; &#128;", "~ &#127; &#128;")]
    #[case("&#65; &#66; &#67;", "A B C")]
    #[case("&#0; &#x0;", "&#0; &#x0;")]
    #[case("&#99999999999999999999;", "&#99999999999999999999;")]
    #[case("&#;&#x;&#12", "&#;&#x;&#12")]
    fn decodes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(decode_entities(input), expected);
    }

    #[test]
    fn fast_path_borrows() {
        let input = "Tom &amp; Jerry";
        assert!(matches!(decode_entities(input), Cow::Borrowed(s) if s == input));
    }

    #[test]
    fn decoded_ampersand_does_not_cascade() {
        assert_eq!(decode_entities("&lt;&amp;lt;"), "<&lt;");
    }

    #[test]
    fn table_decode_skips_generic_numeric() {
        assert_eq!(decode_entity_table("&amp; &#65; &#60;"), "& &#65; <");
    }

    #[test]
    fn table_decode_has_no_fast_path() {
        assert_eq!(decode_entity_table("Tom &amp; Jerry"), "Tom & Jerry");
    }
}
