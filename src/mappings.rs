//! Fixed lookup tables used by the rewrite rules.
//!
//! Tables are plain slices of pairs: they are tiny, scanned linearly and never
//! mutated.

/// Character references that Confluence double-encodes, with their literal
/// replacement.
pub const ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&#x27;", "'"),
    ("&#34;", "\""),
    ("&#60;", "<"),
    ("&#62;", ">"),
    ("&#38;", "&"),
    ("&nbsp;", " "),
];

/// Emoticon image alt text mapped to the glyph that replaces the image.
pub const ALT_EMOJI: &[(&str, &str)] = &[
    ("(tick)", "✅ "),
    ("(error)", "❌ "),
    ("(blue star)", "🚧"),
    ("(warning)", "⚠️ "),
    ("(info)", "ℹ️ "),
    ("(question)", "❓ "),
    ("(plus)", "➕ "),
    ("(minus)", "➖ "),
    ("(on)", "💡 "),
    ("(off)", "⭕ "),
    ("(star)", "⭐ "),
    ("(thumbs up)", "👍 "),
    ("(thumbs down)", "👎 "),
];

/// Short textual emoji codes substituted literally in the final document.
pub const TEXT_EMOJI: &[(&str, &str)] = &[
    (":celebration:", "🎉"),
    (":thumbsup:", "👍"),
    (":thumbsdown:", "👎"),
    (":check:", "✅"),
    (":cross:", "❌"),
    (":warning:", "⚠️"),
    (":info:", "ℹ️"),
    (":question:", "❓"),
    (":star:", "⭐"),
    (":fire:", "🔥"),
    (":rocket:", "🚀"),
    (":sparkles:", "✨"),
];

/// Information macro class suffix mapped to its blockquote label.
pub const INFO_MACROS: &[(&str, &str)] = &[
    ("tip", "Tip"),
    ("note", "Note"),
    ("warning", "Warning"),
    ("information", "Info"),
];

/// Look up `key` in one of the tables above.
///
/// # Examples
///
/// ```
/// use confluence2md::mappings::{ALT_EMOJI, lookup};
///
/// assert_eq!(lookup(ALT_EMOJI, "(tick)"), Some("✅ "));
/// assert_eq!(lookup(ALT_EMOJI, "(nope)"), None);
/// ```
#[must_use]
pub fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}
