//! Utility helpers shared across integration tests.
#![allow(dead_code, unused_macros, reason = "each test binary uses a subset of the helpers")]

use std::{
    fs,
    path::{Path, PathBuf},
};

use confluence2md::{ConversionError, HtmlConverter, Pandoc};

/// Boundary used by every generated export.
pub const BOUNDARY: &str = "----=_Part_123_456789.123456789";

/// Assert that `haystack` contains `needle`, printing the haystack on failure.
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr $(,)?) => {{
        let haystack: &str = &$haystack;
        let needle: &str = &$needle;
        assert!(
            haystack.contains(needle),
            "expected {needle:?} in:\n{haystack}"
        );
    }};
}

/// One body part of a generated export.
pub struct Part<'a> {
    pub content_type: &'a str,
    pub encoding: Option<&'a str>,
    pub body: &'a str,
}

impl<'a> Part<'a> {
    /// An unencoded `text/html` part.
    pub fn html(body: &'a str) -> Self {
        Self {
            content_type: "text/html; charset=UTF-8",
            encoding: None,
            body,
        }
    }

    /// A `text/html` part whose body is already quoted-printable encoded.
    pub fn quoted_printable(body: &'a str) -> Self {
        Self {
            content_type: "text/html; charset=UTF-8",
            encoding: Some("quoted-printable"),
            body,
        }
    }

    /// A part of any other type.
    pub fn other(content_type: &'a str, body: &'a str) -> Self {
        Self {
            content_type,
            encoding: None,
            body,
        }
    }
}

/// Build a Confluence-style export holding `parts`.
pub fn export(parts: &[Part<'_>]) -> String {
    let mut out = format!(
        "Date: Wed, 7 Jan 2026 01:29:00 +0000 (UTC)\n\
         Message-ID: <1234567890.123.1234567890123@test>\n\
         Subject: Exported From Confluence\n\
         MIME-Version: 1.0\n\
         Content-Type: multipart/related;\n\
         \tboundary=\"{BOUNDARY}\"\n\n"
    );
    for part in parts {
        out.push_str(&format!("--{BOUNDARY}\nContent-Type: {}\n", part.content_type));
        if let Some(encoding) = part.encoding {
            out.push_str(&format!("Content-Transfer-Encoding: {encoding}\n"));
        }
        out.push('\n');
        out.push_str(part.body);
        out.push('\n');
    }
    out.push_str(&format!("--{BOUNDARY}--\n"));
    out
}

/// Write `contents` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write test file");
    path
}

/// A converter that returns its input unchanged.
pub fn echo(html: &str) -> Result<String, ConversionError> {
    Ok(html.to_string())
}

/// A converter that always returns `markdown`.
pub fn canned(markdown: &str) -> impl HtmlConverter + '_ {
    move |_: &str| -> Result<String, ConversionError> { Ok(markdown.to_string()) }
}

/// The installed pandoc, or `None` when it is missing.
pub fn installed_pandoc() -> Option<Pandoc> {
    let pandoc = Pandoc::default();
    match pandoc.check() {
        Ok(_) => Some(pandoc),
        Err(e) => {
            eprintln!("pandoc not installed, skipping: {e}");
            None
        }
    }
}
