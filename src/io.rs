//! Path-level entry points.
//!
//! These wrap the in-memory functions with file access and attach the path
//! and failing stage to every error.

use std::{
    fs::{self, File},
    io::BufReader,
    path::Path,
};

use crate::{
    error::Error,
    mime,
    pandoc::HtmlConverter,
    process::convert_html,
};

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Check whether the file at `path` looks like a Confluence export.
///
/// # Errors
/// Returns [`Error::Io`] when the file cannot be opened or read; an unreadable
/// file is never reported as `false`.
pub fn sniff(path: impl AsRef<Path>) -> Result<bool, Error> {
    let path = path.as_ref();
    let file = File::open(path).map_err(io_error(path))?;
    mime::sniff_reader(BufReader::new(file)).map_err(io_error(path))
}

/// Read the file at `path` and return the HTML part of the export.
///
/// # Errors
/// Returns [`Error::Io`] when the file cannot be read and [`Error::Extract`]
/// when it is not a usable MIME container.
pub fn extract_html(path: impl AsRef<Path>) -> Result<String, Error> {
    let path = path.as_ref();
    let raw = fs::read(path).map_err(io_error(path))?;
    mime::extract_html(&raw).map_err(|source| Error::Extract {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert the export at `path` to Markdown.
///
/// # Errors
/// Returns [`Error::Io`], [`Error::Extract`] or [`Error::Convert`] depending on
/// which stage failed.
pub fn extract_and_convert<C>(path: impl AsRef<Path>, converter: &C) -> Result<String, Error>
where
    C: HtmlConverter + ?Sized,
{
    let html = extract_html(path)?;
    Ok(convert_html(&html, converter)?)
}
