//! MIME container handling.
//!
//! Confluence "Word" exports are MIME multipart messages with the page as a
//! `text/html` part. [`extract_html`] pulls that part out; [`sniff_reader`]
//! recognises an export from its first few header lines without parsing the
//! message.

use std::io::{self, BufRead, Read};

use mailparse::{MailHeaderMap, ParsedMail, body::Body};

use crate::error::ContainerError;

/// Number of lines [`sniff_reader`] examines.
pub const SNIFF_LINE_LIMIT: usize = 10;

/// Longest line, in bytes, the sniffer accepts. A longer line ends the sniff.
const SNIFF_LINE_BYTES: u64 = 64 * 1024;

/// Return the decoded text of the first `text/html` part of a MIME message.
///
/// The top-level `Content-Type` must be `multipart/*` with a `boundary`
/// parameter. Parts are inspected in order and only the first HTML part is
/// decoded: quoted-printable bodies are decoded, anything else is returned as
/// transmitted. Bytes that are not valid UTF-8 are replaced with U+FFFD.
///
/// # Errors
/// Returns a [`ContainerError`] describing why the container is unusable, or
/// [`ContainerError::MissingHtmlPart`] when no part is HTML.
///
/// # Examples
///
/// ```
/// use confluence2md::mime::extract_html;
///
/// let raw = b"Content-Type: multipart/related; boundary=\"b\"\r\n\r\n\
/// --b\r\nContent-Type: text/html\r\n\r\n<p>Hi</p>\r\n--b--\r\n";
/// assert!(extract_html(raw).unwrap().contains("<p>Hi</p>"));
/// ```
pub fn extract_html(raw: &[u8]) -> Result<String, ContainerError> {
    let mail = mailparse::parse_mail(raw).map_err(ContainerError::Parse)?;
    if mail.get_headers().get_first_value("Content-Type").is_none() {
        return Err(ContainerError::MissingContentType);
    }
    let mimetype = &mail.ctype.mimetype;
    if !mimetype.to_ascii_lowercase().starts_with("multipart/") {
        return Err(ContainerError::NotMultipart(mimetype.clone()));
    }
    let has_boundary = mail
        .ctype
        .params
        .iter()
        .any(|(key, value)| key.eq_ignore_ascii_case("boundary") && !value.is_empty());
    if !has_boundary {
        return Err(ContainerError::MissingBoundary);
    }
    let part = mail
        .subparts
        .iter()
        .find(|part| is_html(part))
        .ok_or(ContainerError::MissingHtmlPart)?;
    let body = part_body(part)?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

fn is_html(part: &ParsedMail<'_>) -> bool {
    part.ctype.mimetype.eq_ignore_ascii_case("text/html")
}

fn part_body(part: &ParsedMail<'_>) -> Result<Vec<u8>, ContainerError> {
    let quoted_printable = part
        .get_headers()
        .get_first_value("Content-Transfer-Encoding")
        .is_some_and(|encoding| encoding.trim().eq_ignore_ascii_case("quoted-printable"));
    if quoted_printable {
        return part.get_body_raw().map_err(ContainerError::Body);
    }
    let raw = match part.get_body_encoded() {
        Body::Base64(body) | Body::QuotedPrintable(body) => body.get_raw().to_vec(),
        Body::SevenBit(body) | Body::EightBit(body) => body.get_raw().to_vec(),
        Body::Binary(body) => body.get_raw().to_vec(),
    };
    Ok(raw)
}

#[derive(Debug, Default)]
struct ExportMarkers {
    date: bool,
    mime_version: bool,
    confluence: bool,
}

impl ExportMarkers {
    fn observe(&mut self, line: &str) {
        self.date |= line.starts_with("Date:");
        self.mime_version |= line.starts_with("MIME-Version:");
        self.confluence |= line.contains("Exported From Confluence");
    }

    fn complete(&self) -> bool {
        self.date && self.mime_version && self.confluence
    }
}

/// Decide whether a stream looks like a Confluence export.
///
/// Only the first [`SNIFF_LINE_LIMIT`] lines are read. They must include a
/// `Date:` line, a `MIME-Version:` line and a line mentioning
/// `Exported From Confluence`. Binary input simply fails to match, and so does
/// a header line longer than 64 KiB.
///
/// # Errors
/// Read failures are returned as errors and never reported as `false`.
///
/// # Examples
///
/// ```
/// use confluence2md::mime::sniff_reader;
///
/// let head = "Date: Wed, 7 Jan 2026 01:29:00 +0000\n\
///             Subject: Exported From Confluence\n\
///             MIME-Version: 1.0\n";
/// assert!(sniff_reader(head.as_bytes()).unwrap());
/// assert!(!sniff_reader(&b"plain text\n"[..]).unwrap());
/// ```
pub fn sniff_reader<R: BufRead>(mut reader: R) -> io::Result<bool> {
    let mut markers = ExportMarkers::default();
    let mut line = Vec::new();
    for _ in 0..SNIFF_LINE_LIMIT {
        line.clear();
        let read = (&mut reader)
            .take(SNIFF_LINE_BYTES)
            .read_until(b'\n', &mut line)?;
        if read == 0 {
            break;
        }
        if !line.ends_with(b"\n") && read as u64 == SNIFF_LINE_BYTES {
            return Ok(false);
        }
        markers.observe(String::from_utf8_lossy(&line).trim_end_matches(['\r', '\n']));
        if markers.complete() {
            return Ok(true);
        }
    }
    Ok(markers.complete())
}
