use alloc::{
    borrow::Cow,
    string::{String, ToString},
};

use crate::{TraceHandle, crash::CrashCorrelation, data::DataMap, unwinder::Unwinder};

/// Marker line closing a trace that was captured at a previous raise site.
pub const END_OF_PREVIOUS_LOCATION: &str = "--- End of stack trace from previous location ---";

/// The mutable diagnostic state of an owned [`ErrorInstance`].
///
/// [`ErrorInstance`]: crate::ErrorInstance
pub struct DiagnosticState {
    pub(crate) message: String,
    /// Process-local; never leaves the process.
    pub(crate) local_trace: Option<TraceHandle>,
    /// Cached rendering of `local_trace`, or text imported with it.
    pub(crate) trace_text: Option<String>,
    /// Oldest first, append only.
    pub(crate) remote_trace_text: Option<String>,
    pub(crate) crash: CrashCorrelation,
    pub(crate) help_locator: Option<String>,
    pub(crate) source: spin::Once<String>,
    pub(crate) target_site: spin::Once<String>,
    pub(crate) data: DataMap,
    pub(crate) foreign_dispatch_restored: bool,
}

impl DiagnosticState {
    pub(crate) fn new(message: String) -> Self {
        Self {
            message,
            local_trace: None,
            trace_text: None,
            remote_trace_text: None,
            crash: CrashCorrelation::new(),
            help_locator: None,
            source: spin::Once::new(),
            target_site: spin::Once::new(),
            data: DataMap::default(),
            foreign_dispatch_restored: false,
        }
    }

    /// Returns the human readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the process-local trace, if one is attached.
    #[must_use]
    pub fn local_trace(&self) -> Option<&TraceHandle> {
        self.local_trace.as_ref()
    }

    /// Returns the cached rendering of the local trace.
    #[must_use]
    pub fn trace_text(&self) -> Option<&str> {
        self.trace_text.as_deref()
    }

    /// Returns the traces accumulated from earlier raise sites, oldest first.
    #[must_use]
    pub fn remote_trace_text(&self) -> Option<&str> {
        self.remote_trace_text.as_deref()
    }

    /// Returns the crash-correlation cell.
    #[must_use]
    pub fn crash(&self) -> &CrashCorrelation {
        &self.crash
    }

    /// Returns the help locator.
    #[must_use]
    pub fn help_locator(&self) -> Option<&str> {
        self.help_locator.as_deref()
    }

    /// Returns the attached key/value diagnostics.
    #[must_use]
    pub fn data(&self) -> &DataMap {
        &self.data
    }

    pub(crate) fn has_any_trace(&self) -> bool {
        self.local_trace.is_some() || self.trace_text.is_some() || self.remote_trace_text.is_some()
    }

    /// Derived values are only cached once they exist, so a site read before
    /// the first raise is derived again afterwards.
    pub(crate) fn target_site(&self) -> Option<&str> {
        if let Some(site) = self.target_site.get() {
            return Some(site);
        }
        let derived = self.local_trace.as_ref()?.target_site()?;
        Some(self.target_site.call_once(|| derived.to_string()))
    }

    pub(crate) fn source(&self) -> Option<&str> {
        if let Some(source) = self.source.get() {
            return Some(source);
        }
        let site = self.target_site()?;
        let derived = site.split("::").next().unwrap_or(site);
        Some(self.source.call_once(|| derived.to_string()))
    }

    pub(crate) fn set_source(&mut self, source: Option<String>) {
        self.source = match source {
            Some(source) => spin::Once::initialized(source),
            None => spin::Once::new(),
        };
    }

    pub(crate) fn rendered_local_trace(&self, unwinder: &dyn Unwinder) -> Option<Cow<'_, str>> {
        if let Some(text) = &self.trace_text {
            return Some(Cow::Borrowed(text));
        }
        let trace = self.local_trace.as_ref()?;
        Some(Cow::Owned(unwinder.render_trace_text(trace)))
    }

    pub(crate) fn append_remote_trace_text(&mut self, text: &str) {
        self.remote_trace_text
            .get_or_insert_with(String::new)
            .push_str(text);
    }
}

impl core::fmt::Debug for DiagnosticState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DiagnosticState")
            .field("message", &self.message)
            .field("local_trace", &self.local_trace)
            .field("trace_text", &self.trace_text)
            .field("remote_trace_text", &self.remote_trace_text)
            .field("crash", &self.crash)
            .field("help_locator", &self.help_locator)
            .field("source", &self.source.get())
            .field("target_site", &self.target_site.get())
            .field("data", &self.data)
            .field("foreign_dispatch_restored", &self.foreign_dispatch_restored)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_fields_wait_for_trace() {
        let mut state = DiagnosticState::new("boom".into());
        assert_eq!(state.target_site(), None);
        assert_eq!(state.source(), None);

        state.local_trace = Some(TraceHandle::from_text("   at ledger::post::commit\n"));
        assert_eq!(state.target_site(), Some("ledger::post::commit"));
        assert_eq!(state.source(), Some("ledger"));

        state.local_trace = Some(TraceHandle::from_text("   at other::frame\n"));
        assert_eq!(state.target_site(), Some("ledger::post::commit"));

        state.set_source(Some("custom".into()));
        assert_eq!(state.source(), Some("custom"));
        state.set_source(None);
        assert_eq!(state.source(), Some("ledger"));
    }

    #[test]
    fn test_append_remote_trace_text() {
        let mut state = DiagnosticState::new("boom".into());
        state.append_remote_trace_text("A\n");
        state.append_remote_trace_text("B\n");
        assert_eq!(state.remote_trace_text(), Some("A\nB\n"));
        assert!(state.has_any_trace());
    }
}
