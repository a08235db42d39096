//! Convert Confluence exports to Markdown.
//!
//! Confluence's "Export to Word" produces a MIME multipart message with the
//! page as HTML. This crate extracts that HTML, simplifies it with an ordered
//! list of rewrite rules, converts it with pandoc and repairs the Markdown
//! pandoc produces. Every rewrite works on plain strings: malformed markup is
//! treated as text and never causes a panic.
//!
//! ```no_run
//! use confluence2md::{Pandoc, extract_and_convert, sniff};
//!
//! # fn main() -> Result<(), confluence2md::Error> {
//! if sniff("Page+Title.doc")? {
//!     let markdown = extract_and_convert("Page+Title.doc", &Pandoc::default())?;
//!     print!("{markdown}");
//! }
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod macros;

pub mod balance;
pub mod entities;
pub mod error;
pub mod io;
pub mod mappings;
pub mod mime;
pub mod pandoc;
pub mod postprocess;
pub mod preprocess;
pub mod process;
pub mod rules;

pub use balance::{DISCLOSURE, PairedMarker, balance_details};
pub use entities::decode_entities;
pub use error::{ContainerError, ConversionError, Error, LocateError};
pub use io::{extract_and_convert, extract_html, sniff};
pub use pandoc::{HtmlConverter, Pandoc, PandocLocator, PandocOptions};
pub use postprocess::{POST_PROCESS, postprocess_markdown};
pub use preprocess::{PRE_PROCESS, preprocess_html};
pub use process::convert_html;
pub use rules::{Pipeline, RewriteRule};
