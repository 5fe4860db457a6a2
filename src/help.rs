//! Parsing of help locators of the form `<link>#<context id>`.

use alloc::string::{String, ToString};

/// Splits a help locator into its link and numeric context.
///
/// The context is the text after the last `#`, up to the first whitespace
/// character or the end of the string. If it parses as a `u32`, the link is
/// everything before the `#`; trailing text after the number is discarded.
/// Otherwise, and when there is no `#`, the input is returned unchanged with
/// no context. This function never fails.
///
/// # Examples
///
/// ```
/// use raisetrace::parse_help_locator;
///
/// assert_eq!(parse_help_locator("file.html#42"), ("file.html".to_string(), Some(42)));
/// assert_eq!(parse_help_locator("file.html#abc"), ("file.html#abc".to_string(), None));
/// ```
#[must_use]
pub fn parse_help_locator(raw: &str) -> (String, Option<u32>) {
    let Some(pound) = raw.rfind('#') else {
        return (raw.to_string(), None);
    };

    let tail = &raw[pound + 1..];
    let end = tail.find(char::is_whitespace).unwrap_or(tail.len());

    match tail[..end].parse::<u32>() {
        Ok(context) => (raw[..pound].to_string(), Some(context)),
        Err(_) => (raw.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn check(raw: &str, link: &str, context: Option<u32>) {
        let (parsed_link, parsed_context) = parse_help_locator(raw);
        assert_eq!((parsed_link.as_str(), parsed_context), (link, context), "{raw:?}");
    }

    #[test]
    fn test_literal_cases() {
        check("file.html#42", "file.html", Some(42));
        check("file.html#abc", "file.html#abc", None);
        check("file.html", "file.html", None);
        check("file.html#42 more", "file.html", Some(42));
    }

    #[test]
    fn test_edge_cases() {
        check("", "", None);
        check("file.html#", "file.html#", None);
        check("file.html# 42", "file.html# 42", None);
        check("a#1#2", "a#1", Some(2));
        check("a#2#x", "a#2#x", None);
        check("#7", "", Some(7));
        check("file.html#4294967295", "file.html", Some(u32::MAX));
        check("file.html#4294967296", "file.html#4294967296", None);
        check("file.html#-1", "file.html#-1", None);
        check("file.html#12\tnext", "file.html", Some(12));
    }
}
