//! HTML clean-up applied before pandoc sees the document.
//!
//! Confluence wraps page content in several layers of layout `<div>`s and
//! decorates almost every element with styling, data attributes and spans.
//! Pandoc cannot map most of that to Markdown and falls back to raw HTML, so
//! the rules below strip it first. Rules run in the order listed: attribute
//! stripping has to happen before images are simplified, wrapper openings are
//! deleted before the `<div>` balance is repaired, and so on.

use std::{borrow::Cow, sync::LazyLock};

use regex::{Captures, Regex};

use crate::{
    balance::PairedMarker,
    entities::decode_entities,
    rules::{Pipeline, RewriteRule},
};

/// Opening `<div` prefixes against `</div>` closers.
const DIV: PairedMarker = PairedMarker::new("<div", "</div>");

static SRC_RE: LazyLock<Regex> = lazy_regex!(r#"\ssrc="([^"]*)""#, "src attribute regex");
static ALT_RE: LazyLock<Regex> = lazy_regex!(r#"\salt="([^"]*)""#, "alt attribute regex");
static CELL_BREAK_RE: LazyLock<Regex> = lazy_regex!(r"<br\s*/?>", "cell break regex");
static CELL_P_OPEN_RE: LazyLock<Regex> = lazy_regex!(r"<p\b[^>]*>", "cell paragraph regex");
static CELL_P_CLOSE_RE: LazyLock<Regex> = lazy_regex!(r"\s*</p>\s*", "cell paragraph end regex");

/// Extract `src` and `alt` from an image tag.
///
/// Returns `None` when the tag has no `src` or an empty one.
pub(crate) fn image_source(tag: &str) -> Option<(&str, Option<&str>)> {
    let src = SRC_RE
        .captures(tag)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())?;
    Some((src, image_alt(tag)))
}

/// The `alt` attribute of an image tag, possibly empty.
pub(crate) fn image_alt(tag: &str) -> Option<&str> {
    ALT_RE
        .captures(tag)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn simplify_image(caps: &Captures<'_>) -> String {
    match image_source(&caps[0]) {
        Some((src, Some(alt))) => format!(r#"<img src="{src}" alt="{alt}">"#),
        Some((src, None)) => format!(r#"<img src="{src}">"#),
        None => String::new(),
    }
}

fn replace_cell_breaks(caps: &Captures<'_>) -> String {
    let tag = &caps[1];
    let inner = CELL_BREAK_RE.replace_all(&caps[2], " ");
    format!("<{tag}>{inner}</{tag}>")
}

fn merge_cell_paragraphs(caps: &Captures<'_>) -> String {
    let tag = &caps[1];
    let inner = CELL_P_OPEN_RE.replace_all(&caps[2], "");
    let inner = CELL_P_CLOSE_RE.replace_all(&inner, " ");
    format!("<{tag}>{}</{tag}>", inner.trim())
}

fn decode(html: &str) -> Cow<'_, str> {
    decode_entities(html)
}

fn balance_divs(html: &str) -> Cow<'_, str> {
    DIV.balance(html)
}

/// Pre-processing rules in execution order.
pub static PRE_PROCESS: LazyLock<Pipeline> = LazyLock::new(|| {
    Pipeline::new(vec![
        RewriteRule::pass("decode-entities", decode),
        // Layout containers: drop the opening tag, keep the children.
        RewriteRule::delete(
            "strip-layout-wrappers",
            concat!(
                r#"<div class="(?:contentLayout2|innerCell|sectionColumnWrapper|sectionMacro|sectionMacroRow|plugin-tabmeta-details)"[^>]*>"#,
                r#"|<div class="(?:columnLayout|cell|plugin_pagetree|plugin_pagetree_children)[^"]*"[^>]*>"#,
            ),
        ),
        // Non-document metadata goes with its content.
        RewriteRule::delete(
            "drop-hidden-fieldsets",
            r#"<fieldset class="hidden"[^>]*>[\s\S]*?</fieldset>"#,
        ),
        RewriteRule::delete("drop-hidden-inputs", r#"<input type="hidden"[^>]*>"#),
        RewriteRule::delete(
            "drop-page-tree-lists",
            r#"<ul\b[^>]*class="[^"]*plugin_pagetree[^"]*"[^>]*>[\s\S]*?</ul>"#,
        ),
        RewriteRule::delete(
            "drop-empty-paragraphs",
            r"<p\b[^>]*>\s*(?:\\?<br\s*/?>\\?\s*)?</p>",
        ),
        RewriteRule::delete("strip-style", r#"\s+style="[^"]*""#),
        RewriteRule::delete("strip-data-attributes", r#"\s+data-[\w-]+="[^"]*""#),
        RewriteRule::delete("strip-tabindex", r#"\s+tabindex="[^"]*""#),
        RewriteRule::delete("strip-draggable", r#"\s+draggable="[^"]*""#),
        RewriteRule::with("simplify-images", r"<img\b[^>]*>", simplify_image),
        RewriteRule::delete(
            "drop-colgroups",
            r"(?i)<colgroup\b[^>]*>[\s\S]*?</colgroup>",
        ),
        RewriteRule::delete("drop-cols", r"(?i)</?col\b[^>]*>"),
        RewriteRule::template(
            "strip-table-classes",
            r#"(<(?:table|thead|tbody|tr|th|td)\b[^>]*)\s+class="[^"]*""#,
            "$1",
        ),
        RewriteRule::template(
            "strip-cell-scope",
            r#"(<(?:th|td)\b[^>]*)\s+scope="[^"]*""#,
            "$1",
        ),
        RewriteRule::delete("drop-table-wraps", r#"<div class="table-wrap"[^>]*>"#),
        RewriteRule::template(
            "bare-table-tags",
            r"<(table|thead|tbody|tr|th|td)\b[^>]*>",
            "<$1>",
        ),
        RewriteRule::with(
            "cell-breaks",
            r"<(t[dh])>([\s\S]*?)</t[dh]>",
            replace_cell_breaks,
        ),
        RewriteRule::with(
            "merge-cell-paragraphs",
            r"<(t[dh])>([\s\S]*?)</t[dh]>",
            merge_cell_paragraphs,
        ),
        RewriteRule::template(
            "unwrap-nolink-spans",
            r#"<span\b[^>]*class="[^"]*nolink[^"]*"[^>]*>([\s\S]*?)</span>"#,
            "$1",
        ),
        RewriteRule::template(
            "unwrap-status-spans",
            r#"<span\b[^>]*class="[^"]*(?:status-macro|aui-message|aui-lozenge)[^"]*"[^>]*>([\s\S]*?)</span>"#,
            "$1",
        ),
        RewriteRule::delete(
            "drop-empty-icon-spans",
            r#"<span\b[^>]*class="[^"]*icon[^"]*"[^>]*>\s*</span>"#,
        ),
        RewriteRule::delete("unwrap-spans", r"</?span\b[^>]*>"),
        RewriteRule::template(
            "unwrap-content-wrappers",
            r#"<div\b[^>]*class="[^"]*content-wrapper[^"]*"[^>]*>([\s\S]*?)</div>"#,
            "$1",
        ),
        // Earlier rules removed openings whose closers are still in place.
        RewriteRule::pass("balance-divs", balance_divs),
    ])
});

/// Simplify Confluence HTML so pandoc can convert it cleanly.
///
/// # Examples
///
/// ```
/// use confluence2md::preprocess::preprocess_html;
///
/// let html = r#"<p style="margin-left: 40.0px;">Indented</p><p></p>"#;
/// assert_eq!(preprocess_html(html), "<p>Indented</p>");
/// ```
#[must_use]
pub fn preprocess_html(html: &str) -> String {
    PRE_PROCESS.run(html)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn rule(name: &str) -> &'static RewriteRule {
        PRE_PROCESS
            .rule(name)
            .unwrap_or_else(|| panic!("missing rule {name}"))
    }

    #[test]
    fn attribute_stripping_precedes_image_simplification() {
        let data = PRE_PROCESS.position("strip-data-attributes");
        let images = PRE_PROCESS.position("simplify-images");
        assert!(data < images);
        assert_eq!(PRE_PROCESS.rules().last().map(RewriteRule::name), Some("balance-divs"));
    }

    #[test]
    fn layout_openings_are_removed_and_content_kept() {
        let input = r#"<div class="contentLayout2">
<div class="columnLayout two-left-sidebar">
<div class="cell aside">
<div class="innerCell">
<h2>Problem</h2>
</div>
</div>
</div>
</div>"#;
        let out = rule("strip-layout-wrappers").apply(input);
        assert!(!out.contains("contentLayout2"));
        assert!(!out.contains("columnLayout"));
        assert!(!out.contains("innerCell"));
        assert!(out.contains("<h2>Problem</h2>"));
        assert_eq!(out.matches("</div>").count(), 4);
    }

    #[test]
    fn hidden_blocks_are_removed_with_content() {
        let input = concat!(
            r#"<fieldset class="hidden"><input name="a" value="1"></fieldset>"#,
            r#"<input type="hidden" name="pageId" value="42">"#,
            r#"<ul class="plugin_pagetree_children_list plugin_pagetree"><li>Tree</li></ul>Body"#,
        );
        assert_eq!(preprocess_html(input), "Body");
    }

    #[rstest]
    #[case("<p></p>")]
    #[case("<p>   </p>")]
    #[case("<p><br></p>")]
    #[case("<p> <br /> </p>")]
    #[case(r#"<p class="auto-cursor-target"><br/></p>"#)]
    #[case(r"<p>\<br>\</p>")]
    fn empty_paragraphs_are_dropped(#[case] input: &str) {
        assert_eq!(rule("drop-empty-paragraphs").apply(input), "");
    }

    #[test]
    fn empty_paragraph_rule_leaves_pre_alone() {
        let input = "<pre></p>";
        assert_eq!(rule("drop-empty-paragraphs").apply(input), input);
    }

    #[test]
    fn presentation_attributes_are_stripped() {
        let input = r#"<div data-layout="single" data-type="normal" style="x" tabindex="-1" draggable="false">Content</div>"#;
        assert_eq!(preprocess_html(input), "<div>Content</div>");
    }

    #[rstest]
    #[case(
        r#"<img class="confluence-embedded-image" width="468" src="abc123.png" alt="Screenshot">"#,
        r#"<img src="abc123.png" alt="Screenshot">"#
    )]
    #[case(r#"<img src="a.png" class="x">"#, r#"<img src="a.png">"#)]
    #[case(r#"<img alt="no source">"#, "")]
    #[case(r#"<img src="" alt="empty">"#, "")]
    fn images_keep_only_src_and_alt(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(rule("simplify-images").apply(input), expected);
    }

    #[test]
    fn image_source_ignores_data_src() {
        let tag = r#"<img data-image-src="/download/x.png" src="y.png">"#;
        assert_eq!(image_source(tag), Some(("y.png", None)));
    }

    #[test]
    fn tables_are_reduced_to_bare_tags() {
        let input = r#"<table class="confluenceTable" data-layout="default">
<colgroup><col style="width: 50%"><col style="width: 50%"></colgroup>
<thead><tr><th class="confluenceTh" scope="col">Header 1</th><th class="confluenceTh">Header 2</th></tr></thead>
<tbody><tr role="row"><td class="confluenceTd">Cell 1</td><td class="confluenceTd">Cell 2</td></tr></tbody>
</table>"#;
        let out = preprocess_html(input);
        assert_eq!(
            out,
            "<table>\n\n<thead><tr><th>Header 1</th><th>Header 2</th></tr></thead>\n\
             <tbody><tr><td>Cell 1</td><td>Cell 2</td></tr></tbody>\n</table>"
        );
    }

    #[test]
    fn table_wrap_is_removed_and_closer_balanced() {
        let input = r#"<div class="table-wrap"><table><tr><td>x</td></tr></table></div>"#;
        assert_eq!(preprocess_html(input), "<table><tr><td>x</td></tr></table>");
    }

    #[rstest]
    #[case("<td>Line 1<br/>Line 2</td>", "<td>Line 1 Line 2</td>")]
    #[case("<th><br></th>", "<th></th>")]
    #[case("<td><p>Data 1<br/>Line 2</p></td>", "<td>Data 1 Line 2</td>")]
    #[case("<td>\n<p>First</p>\n<p>Second</p>\n</td>", "<td>First Second</td>")]
    #[case("<td><pre>code</pre></td>", "<td><pre>code</pre></td>")]
    fn cells_lose_breaks_and_paragraphs(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(preprocess_html(input), expected);
    }

    #[test]
    fn thead_is_not_mistaken_for_th() {
        let out = rule("bare-table-tags").apply(r#"<thead class="x"><th scope="col">"#);
        assert_eq!(out, "<thead><th>");
    }

    #[rstest]
    #[case(r#"<span class="nolink">text</span>"#, "text")]
    #[case(r#"<span class="status-macro aui-lozenge">STATUS</span>"#, "STATUS")]
    #[case(r#"<span class="icon aui-icon">  </span>"#, "")]
    #[case(r#"<span class="a"><span class="b">deep</span></span>"#, "deep")]
    fn spans_never_survive(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(preprocess_html(input), expected);
    }

    #[test]
    fn user_links_keep_the_name() {
        let input = r#"<span class="confluence-userlink" data-username="john.doe">
<span class="user-icon"><span class="aui-avatar aui-avatar-small"><span class="aui-avatar-inner"><img src="avatar.png" alt=""></span></span></span>
<span class="user-name">John Doe</span>
</span>"#;
        let out = preprocess_html(input);
        assert!(out.contains("John Doe"));
        assert!(!out.contains("<span"));
    }

    #[test]
    fn content_wrappers_are_unwrapped() {
        let input = r#"<div class="content-wrapper"><p>Inside</p></div>"#;
        assert_eq!(preprocess_html(input), "<p>Inside</p>");
    }

    #[rstest]
    #[case("a</div>b</div>", "ab")]
    #[case("<div>x</div></div></div>", "<div>x</div>")]
    #[case("<div>x</div>", "<div>x</div>")]
    fn surplus_div_closers_are_removed_from_the_right(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(rule("balance-divs").apply(input), expected);
    }

    #[test]
    fn many_surplus_div_closers_are_removed_quickly() {
        let input = format!("{}{}", "</div>".repeat(20_000), "x".repeat(100_000));
        let started = std::time::Instant::now();
        assert_eq!(preprocess_html(&input), "x".repeat(100_000));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn double_encoded_html_is_decoded() {
        let out = preprocess_html("&lt;p&gt;This was double encoded&lt;/p&gt;");
        assert_eq!(out, "<p>This was double encoded</p>");
    }

    #[test]
    fn emoticon_alt_text_survives() {
        let input = r#"<img class="emoticon emoticon-tick" src="tick.png" alt="(tick)" data-emoticon-name="tick">"#;
        assert_eq!(preprocess_html(input), r#"<img src="tick.png" alt="(tick)">"#);
    }

    #[test]
    fn malformed_markup_is_treated_as_text() {
        let input = "<div class=\"cell <span <img src=\"x <td><p>unterminated";
        let _ = preprocess_html(input);
    }
}
