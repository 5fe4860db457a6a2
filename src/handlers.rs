//! Handlers that control how captured traces are rendered.
//!
//! A [`TraceHandle`] stores a captured trace of some concrete type together
//! with a handler implementing [`TraceHandler`] for it. The handler decides
//! how the trace is rendered to text, which frame is reported as the target
//! site, and whether the trace counts as empty.
//!
//! # Built-in Handlers
//!
//! ## [`Text`]
//!
//! For traces that were already rendered to text, such as traces imported from
//! another process or produced by a platform debugger. One frame per line; the
//! first non-empty line (without a leading `at `) is the target site.
//!
//! # Custom Handlers
//!
//! Unwinder implementations usually capture a structured frame list and ship
//! their own handler for it. See the `raisetrace-backtrace` crate for an
//! example.
//!
//! [`TraceHandle`]: crate::TraceHandle

use alloc::{borrow::Cow, string::String};

pub use raisetrace_internals::handlers::TraceHandler;

/// Handler for pre-rendered trace text.
///
/// Used by [`TraceHandle::from_text`](crate::TraceHandle::from_text).
///
/// # Examples
///
/// ```
/// use raisetrace::TraceHandle;
///
/// let trace = TraceHandle::from_text("   at billing::charge\n   at billing::run\n");
/// assert_eq!(trace.target_site(), Some("billing::charge"));
/// ```
#[derive(Copy, Clone, Debug)]
pub struct Text;

impl Text {
    fn first_frame(text: &str) -> Option<&str> {
        let line = text.lines().map(str::trim).find(|line| !line.is_empty())?;
        Some(line.strip_prefix("at ").unwrap_or(line))
    }
}

impl TraceHandler<String> for Text {
    fn render(value: &String, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        formatter.write_str(value)
    }

    fn target_site(value: &String) -> Option<&str> {
        Self::first_frame(value)
    }

    fn is_empty(value: &String) -> bool {
        value.trim().is_empty()
    }
}

impl TraceHandler<Cow<'static, str>> for Text {
    fn render(
        value: &Cow<'static, str>,
        formatter: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        formatter.write_str(value)
    }

    fn target_site<'a>(value: &'a Cow<'static, str>) -> Option<&'a str> {
        Self::first_frame(value)
    }

    fn is_empty(value: &Cow<'static, str>) -> bool {
        value.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame() {
        assert_eq!(Text::first_frame("\n\n   at a::b\n   at c::d"), Some("a::b"));
        assert_eq!(Text::first_frame("plain::frame"), Some("plain::frame"));
        assert_eq!(Text::first_frame("  \n \t\n"), None);
        assert_eq!(Text::first_frame(""), None);
    }

    #[test]
    fn test_text_handler_site_borrows_value() {
        let owned: Cow<'static, str> = Cow::Owned(String::from("   at io::read\n"));
        let site = <Text as TraceHandler<Cow<'static, str>>>::target_site(&owned);
        assert_eq!(site, Some("io::read"));
        assert!(!<Text as TraceHandler<Cow<'static, str>>>::is_empty(&owned));
        assert!(<Text as TraceHandler<String>>::is_empty(&String::from("\t\n")));
    }
}
