//! Error types for extraction and conversion.
//!
//! Each enum covers one failure domain. The top-level [`Error`] records which
//! stage failed and keeps the underlying cause reachable through
//! [`std::error::Error::source`].

use std::{io, path::PathBuf, process::ExitStatus, string::FromUtf8Error, time::Duration};

/// Malformed or unusable MIME container.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ContainerError {
    /// The message headers could not be parsed.
    #[error("failed to parse MIME message")]
    Parse(#[source] mailparse::MailParseError),

    /// The message has no `Content-Type` header.
    #[error("no Content-Type header found")]
    MissingContentType,

    /// The top-level media type is not `multipart/*`.
    #[error("expected multipart message, got: {0}")]
    NotMultipart(String),

    /// The multipart `Content-Type` carries no `boundary` parameter.
    #[error("no boundary found in Content-Type")]
    MissingBoundary,

    /// A part body could not be decoded.
    #[error("failed to read HTML content")]
    Body(#[source] mailparse::MailParseError),

    /// Every part was inspected and none was `text/html`.
    #[error("no text/html part found in MIME message")]
    MissingHtmlPart,
}

/// Failure to locate a usable pandoc executable.
///
/// The locator caches this value, so it is `Clone` and keeps only rendered
/// diagnostics rather than the original OS errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LocateError {
    /// Nothing called `pandoc` was found on `PATH`.
    #[error("pandoc not found in PATH; install it from https://pandoc.org/installing.html")]
    NotFound,

    /// The candidate could not be run or did not identify itself as pandoc.
    #[error("{} is not a usable pandoc executable: {reason}", path.display())]
    Unusable {
        /// Candidate executable.
        path: PathBuf,
        /// What went wrong while probing it.
        reason: String,
    },
}

/// The external converter failed.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConversionError {
    /// No converter executable is available.
    #[error("pandoc is unavailable")]
    Locate(#[from] LocateError),

    /// The converter process could not be started.
    #[error("failed to start pandoc")]
    Spawn(#[source] io::Error),

    /// Talking to the running process failed.
    #[error("I/O error while running pandoc")]
    Io(#[source] io::Error),

    /// The converter did not finish before the deadline and was killed.
    #[error("pandoc did not finish within {0:?}")]
    Timeout(Duration),

    /// The converter exited unsuccessfully.
    #[error("pandoc failed ({status}): {stderr}")]
    Failed {
        /// Exit status of the process.
        status: ExitStatus,
        /// Diagnostic output captured from stderr.
        stderr: String,
    },

    /// The converter produced output that is not UTF-8.
    #[error("pandoc produced invalid UTF-8")]
    Utf8(#[from] FromUtf8Error),

    /// A converter supplied by the caller reported its own failure.
    #[error("conversion failed: {0}")]
    Other(String),
}

/// Error returned by the path-level entry points.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The input file could not be opened or read.
    #[error("failed to read {}", path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The file is not a usable MIME container.
    #[error("failed to extract HTML from {}", path.display())]
    Extract {
        /// File being extracted.
        path: PathBuf,
        /// What was wrong with the container.
        #[source]
        source: ContainerError,
    },

    /// The extracted HTML could not be converted.
    #[error("failed to convert to Markdown")]
    Convert(#[from] ConversionError),
}

impl Error {
    /// Returns `true` when the container was well formed but had no HTML part.
    #[must_use]
    pub fn is_missing_html(&self) -> bool {
        matches!(
            self,
            Error::Extract {
                source: ContainerError::MissingHtmlPart,
                ..
            }
        )
    }
}
