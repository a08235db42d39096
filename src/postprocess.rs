//! Repair pandoc's Markdown output.
//!
//! Pandoc passes Confluence macros through as raw HTML `<div>`s and escapes
//! markup it could not place. The rules here map the macros it leaves behind
//! to Markdown constructs (blockquotes, `<details>` blocks, links and images),
//! remove what has no Markdown meaning and normalise whitespace. The final
//! rules repair `<details>` balance and guarantee a single trailing newline.

use std::{borrow::Cow, sync::LazyLock};

use regex::Captures;

use crate::{
    balance::balance_details,
    entities::decode_entity_table,
    mappings::{ALT_EMOJI, INFO_MACROS, TEXT_EMOJI, lookup},
    preprocess::{image_alt, image_source},
    rules::{Pipeline, RewriteRule},
};

fn replace_emoji_image(caps: &Captures<'_>) -> String {
    let tag = &caps[0];
    if let Some(glyph) = image_alt(tag).and_then(|alt| lookup(ALT_EMOJI, alt)) {
        return glyph.to_string();
    }
    if tag.contains("expand-control-image") {
        String::new()
    } else {
        tag.to_string()
    }
}

fn information_macro(caps: &Captures<'_>) -> String {
    lookup(INFO_MACROS, &caps[1])
        .map_or_else(|| caps[0].to_string(), |label| format!("\n> **{label}:** "))
}

fn escaped_image(caps: &Captures<'_>) -> String {
    match image_source(&caps[0]) {
        Some((src, alt)) => {
            let alt = alt.filter(|a| !a.is_empty()).unwrap_or("image");
            format!("![{alt}]({src})")
        }
        None => String::new(),
    }
}

fn decode_table(text: &str) -> Cow<'_, str> {
    decode_entity_table(text)
}

/// Trim the document and end it with exactly one newline.
fn trim_document(text: &str) -> Cow<'_, str> {
    let body = text.trim();
    if text.strip_suffix('\n') == Some(body) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{body}\n"))
    }
}

fn balance(text: &str) -> Cow<'_, str> {
    balance_details(text)
}

fn replace_text_emoji(text: &str) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(text);
    for (code, glyph) in TEXT_EMOJI {
        if out.contains(*code) {
            out = Cow::Owned(out.replace(*code, glyph));
        }
    }
    out
}

/// Post-processing rules in execution order.
pub static POST_PROCESS: LazyLock<Pipeline> = LazyLock::new(|| {
    Pipeline::new(vec![
        RewriteRule::with("emoji-images", r"<img\b[^>]*>", replace_emoji_image),
        RewriteRule::delete(
            "strip-section-wrappers",
            r#"<div class="Section1">\s*|<div class="toc-macro[^"]*"[^>]*>\s*"#,
        ),
        RewriteRule::with(
            "information-macros",
            r#"<div class="confluence-information-macro confluence-information-macro-(tip|note|warning|information)"[^>]*>\s*"#,
            information_macro,
        ),
        RewriteRule::delete(
            "drop-macro-icons",
            r#"<span class="aui-icon[^"]*"[^>]*></span>\s*"#,
        ),
        RewriteRule::delete(
            "drop-macro-bodies",
            r#"<div class="confluence-information-macro-body">\s*"#,
        ),
        RewriteRule::template("panels", r#"<div class="panel"[^>]*>\s*"#, "\n> "),
        RewriteRule::delete("drop-panel-content", r#"<div class="panelContent"[^>]*>\s*"#),
        // Expanders: outer block, control (icon + label), content.
        RewriteRule::template(
            "expander-open",
            r#"<div id="expander-\d+"[^>]*>\s*"#,
            "\n<details>\n",
        ),
        RewriteRule::template(
            "expander-control",
            r#"<div id="expander-control-\d+"[^>]*>\s*"#,
            "<summary>",
        ),
        RewriteRule::template(
            "expander-label",
            r#"<span class="expand-control-icon">[^<]*</span><span class="expand-control-text">([^<]*)</span>\s*"#,
            "$1",
        ),
        RewriteRule::template(
            "expander-text",
            r#"<span class="expand-control-text">([^<]*)</span>\s*"#,
            "$1",
        ),
        RewriteRule::delete(
            "drop-expander-icons",
            r#"<span class="expand-control-icon">[^<]*</span>\s*"#,
        ),
        RewriteRule::template(
            "expander-content",
            r#"<div id="expander-content-\d+"[^>]*>\s*"#,
            "</summary>\n",
        ),
        RewriteRule::template(
            "collapse-summary-details",
            r"</summary>\s*\n\s*<details>\s*\n",
            "</summary>\n\n",
        ),
        RewriteRule::template("unwrap-fenced-details", r"<details>\s*\n```", "\n```"),
        RewriteRule::delete(
            "drop-code-panels",
            r#"<div class="(?:code panel|codeContent|codeHeader)[^"]*"[^>]*>\s*"#,
        ),
        RewriteRule::literal("drop-highlighter-hint", "``` syntaxhighlighter-pre", "```"),
        RewriteRule::template("drop-fence-attributes", r"```\s*\{[^}]*\}", "```"),
        RewriteRule::template(
            "links",
            r#"<a\s+href="([^"]*)"[^>]*>([^<]*)</a>"#,
            "[$2]($1)",
        ),
        RewriteRule::template(
            "underlined-links",
            r#"<a\s+href="([^"]*)"[^>]*><u>([^<]*)</u></a>"#,
            "[$2]($1)",
        ),
        RewriteRule::delete("drop-underline", r"</?u>"),
        // Three closers in a row end an expander; two end a block.
        RewriteRule::template(
            "close-expanders",
            r"</div>\s*</div>\s*</div>\s*",
            "\n</details>\n\n",
        ),
        RewriteRule::template("close-blocks", r"</div>\s*</div>\s*", "\n\n"),
        RewriteRule::delete("drop-div-closers", r"</div>"),
        RewriteRule::delete("drop-spans", r"</?span\b[^>]*>"),
        RewriteRule::pass("decode-entity-table", decode_table),
        // Markup pandoc escaped instead of converting.
        RewriteRule::template("escaped-breaks", r"\\<br\s*/?\\?>", "\n"),
        RewriteRule::template("escaped-paragraphs", r"\\</?p\\?>", "\n"),
        RewriteRule::delete("drop-escaped-wrappers", r"\\</?(?:div|span)\b[^>\n]*>"),
        RewriteRule::with("escaped-images", r"\\<img\b[^>\n]*>", escaped_image),
        // Only tag-shaped text: an escaped `<` in prose stays.
        RewriteRule::delete("drop-escaped-tags", r"\\</?[A-Za-z][^>\n]*>"),
        RewriteRule::template("nested-list-markers", r"(?m)^([ \t]*)- - ", "$1  - "),
        RewriteRule::template("line-breaks", r"<br\s*/?>", "\n"),
        RewriteRule::delete("drop-empty-divs", r"<div\b[^>]*>\s*</div>"),
        RewriteRule::delete("drop-stray-div-closers", r"</div>"),
        RewriteRule::template("collapse-blank-lines", r"\n{3,}", "\n\n"),
        RewriteRule::delete("trim-line-ends", r"(?m)[ \t]+$"),
        RewriteRule::pass("trim-document", trim_document),
        RewriteRule::pass("balance-details", balance),
        RewriteRule::pass("text-emoji", replace_text_emoji),
        // Balancing can leave a blank last line behind.
        RewriteRule::pass("terminate", trim_document),
    ])
});

/// Clean up pandoc output produced from Confluence HTML.
///
/// The result always ends with exactly one newline.
///
/// # Examples
///
/// ```
/// use confluence2md::postprocess::postprocess_markdown;
///
/// let md = postprocess_markdown(r#"<a href="https://example.com"><u>Example</u></a>"#);
/// assert_eq!(md, "[Example](https://example.com)\n");
/// ```
#[must_use]
pub fn postprocess_markdown(markdown: &str) -> String {
    POST_PROCESS.run(markdown)
}
