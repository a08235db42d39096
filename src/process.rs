//! End-to-end conversion of Confluence HTML.

use crate::{
    error::ConversionError, pandoc::HtmlConverter, postprocess::postprocess_markdown,
    preprocess::preprocess_html,
};

/// Pre-process `html`, convert it with `converter` and post-process the
/// result.
///
/// The converter's failure aborts the conversion; no partial output is
/// returned.
///
/// # Errors
/// Returns the converter's [`ConversionError`].
///
/// # Examples
///
/// ```
/// use confluence2md::{ConversionError, convert_html};
///
/// let passthrough = |html: &str| -> Result<String, ConversionError> { Ok(html.to_string()) };
/// let md = convert_html(r#"<span class="nolink">Hi</span>"#, &passthrough).unwrap();
/// assert_eq!(md, "Hi\n");
/// ```
pub fn convert_html<C>(html: &str, converter: &C) -> Result<String, ConversionError>
where
    C: HtmlConverter + ?Sized,
{
    let cleaned = preprocess_html(html);
    let converted = converter.convert(&cleaned)?;
    Ok(postprocess_markdown(&converted))
}
