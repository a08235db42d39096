//! Remove closing markers that have no opening partner.
//!
//! Post-processing inserts `</details>` for every run of three closing
//! `</div>`s pandoc leaves behind, which is more often than the document opened
//! a disclosure block. The enforcer deletes surplus closers from the right until
//! the count of closers no longer exceeds the count of openers.

use std::borrow::Cow;

/// A named open/close marker pair that may nest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairedMarker {
    open: &'static str,
    close: &'static str,
}

/// The disclosure block pair produced from Confluence expanders.
pub const DISCLOSURE: PairedMarker = PairedMarker::new("<details>", "</details>");

impl PairedMarker {
    /// Create a marker pair.
    ///
    /// The markers must not overlap: neither may occur inside the other, and
    /// no two occurrences of the same marker may share characters.
    #[must_use]
    pub const fn new(open: &'static str, close: &'static str) -> Self {
        Self { open, close }
    }

    /// Opening marker text.
    #[must_use]
    pub const fn open(&self) -> &'static str {
        self.open
    }

    /// Closing marker text.
    #[must_use]
    pub const fn close(&self) -> &'static str {
        self.close
    }

    /// Count non-overlapping opening and closing markers in `text`.
    #[must_use]
    pub fn counts(&self, text: &str) -> (usize, usize) {
        if self.open.is_empty() || self.close.is_empty() {
            return (0, 0);
        }
        (
            text.matches(self.open).count(),
            text.matches(self.close).count(),
        )
    }

    /// Delete the rightmost closing markers until closers no longer outnumber
    /// openers.
    ///
    /// The result is the same as recounting the whole text after every single
    /// deletion: joining the characters on either side of a deleted closer can
    /// spell out a new closer or opener, and that new marker is counted. Only
    /// the bytes around each deletion are recounted, so the work stays linear
    /// in the length of `text`. Opening markers and all other text are never
    /// touched, and the result is never longer than the input.
    ///
    /// # Examples
    ///
    /// ```
    /// use confluence2md::balance::DISCLOSURE;
    ///
    /// assert_eq!(DISCLOSURE.balance("content</details>"), "content");
    /// assert_eq!(DISCLOSURE.balance("<</details>/details>"), "");
    /// ```
    #[must_use]
    pub fn balance<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let (mut opens, mut closes) = self.counts(text);
        if closes <= opens {
            return Cow::Borrowed(text);
        }
        let close = self.close.as_bytes();
        let reach = self.open.len().max(self.close.len()) - 1;
        let mut splice = Splice::new(text);
        while closes > opens {
            // A closer spanning the join lies right of anything in the head.
            let (left, right) = splice.around(close.len() - 1, close.len() - 1);
            let (in_head, in_tail) = if let Some(at) = find(&left, &right, close) {
                (left.len() - at, close.len() - (left.len() - at))
            } else if let Some(idx) = splice.head().rfind(self.close) {
                splice.advance_to(idx + close.len());
                (close.len(), 0)
            } else {
                break;
            };
            let (left, right) = splice.around(in_head + reach, in_tail + reach);
            let mut joined = left[..left.len() - in_head].to_vec();
            joined.extend_from_slice(&right[in_tail..]);
            let mut before = left;
            before.extend_from_slice(&right);
            let open = self.open.as_bytes();
            opens = (opens + count(&joined, open)).saturating_sub(count(&before, open));
            closes = (closes + count(&joined, close)).saturating_sub(count(&before, close));
            splice.remove(in_head, in_tail);
        }
        Cow::Owned(splice.finish())
    }
}

/// Text being edited at a single join point.
///
/// The head is an untouched prefix of the input. The tail holds the edited
/// text after the join, stored reversed so that its front can be dropped
/// cheaply.
struct Splice<'a> {
    text: &'a str,
    join: usize,
    tail: Vec<u8>,
}

impl<'a> Splice<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            join: text.len(),
            tail: Vec::new(),
        }
    }

    fn head(&self) -> &'a str {
        &self.text[..self.join]
    }

    /// Up to `left` bytes before the join and `right` bytes after it.
    fn around(&self, left: usize, right: usize) -> (Vec<u8>, Vec<u8>) {
        let head = self.head().as_bytes();
        let before = head[head.len().saturating_sub(left)..].to_vec();
        let after = self.tail.iter().rev().take(right).copied().collect();
        (before, after)
    }

    /// Move the join left to `at`, carrying the head's end into the tail.
    fn advance_to(&mut self, at: usize) {
        self.tail
            .extend(self.text.as_bytes()[at..self.join].iter().rev());
        self.join = at;
    }

    /// Drop `in_head` bytes before the join and `in_tail` bytes after it.
    fn remove(&mut self, in_head: usize, in_tail: usize) {
        self.join -= in_head;
        self.tail.truncate(self.tail.len() - in_tail);
    }

    fn finish(self) -> String {
        let mut out = self.head().as_bytes().to_vec();
        out.extend(self.tail.iter().rev());
        // Whole UTF-8 sequences are removed, so the bytes stay valid.
        String::from_utf8_lossy(&out).into_owned()
    }
}

/// Position of `needle` in `left ++ right`, if it spans the boundary.
fn find(left: &[u8], right: &[u8], needle: &[u8]) -> Option<usize> {
    let mut window = left.to_vec();
    window.extend_from_slice(right);
    window.windows(needle.len()).position(|w| w == needle)
}

/// Non-overlapping occurrences of `needle` in `hay`.
fn count(hay: &[u8], needle: &[u8]) -> usize {
    let mut found = 0;
    let mut i = 0;
    while i + needle.len() <= hay.len() {
        if hay[i..].starts_with(needle) {
            found += 1;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    found
}

/// Balance `<details>` markers.
#[must_use]
pub fn balance_details(text: &str) -> Cow<'_, str> {
    DISCLOSURE.balance(text)
}
