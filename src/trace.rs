//! Opaque, process-local trace handles.
//!
//! A [`TraceHandle`] is the capability an error object holds for "the call
//! stack this error was raised from". The core of this crate never looks
//! inside it: it only clones it (freezing), renders it to text, or asks it for
//! its originating frame. What is actually captured, and how, is up to the
//! installed [`Unwinder`](crate::unwinder::Unwinder).
//!
//! Handles are immutable and reference counted. Cloning one is cheap and the
//! clone stays valid and renders identically no matter what happens to the
//! error object it came from.
//!
//! Handles are *process-local*. They must never be persisted or sent to
//! another process; see [`ErrorInstance::on_deserialize`].
//!
//! [`ErrorInstance::on_deserialize`]: crate::ErrorInstance::on_deserialize

use alloc::{
    borrow::Cow,
    string::{String, ToString},
};
use core::{any::TypeId, fmt};

use raisetrace_internals::RawTrace;

use crate::handlers::{self, TraceHandler};

/// An opaque, immutable, reference-counted handle to a captured trace.
///
/// # Examples
///
/// ```
/// use raisetrace::TraceHandle;
///
/// let trace = TraceHandle::from_text("   at orders::submit\n");
/// let frozen = trace.clone();
///
/// assert!(frozen.ptr_eq(&trace));
/// assert_eq!(frozen.render(), "   at orders::submit\n");
/// ```
#[repr(transparent)]
pub struct TraceHandle {
    /// # Safety
    ///
    /// Every trace stored here was created through [`TraceHandle::new_custom`],
    /// which requires the trace type to be `Send + Sync`.
    raw: RawTrace,
}

// SAFETY: every trace behind a `TraceHandle` is `Send + Sync` (enforced by
// `new_custom`), is never mutated after construction, and is reference
// counted atomically by `triomphe::Arc`.
unsafe impl Send for TraceHandle {}

// SAFETY: see the `Send` implementation above.
unsafe impl Sync for TraceHandle {}

impl TraceHandle {
    /// Wraps a captured trace, rendering it through the handler `H`.
    ///
    /// # Examples
    ///
    /// ```
    /// use raisetrace::{TraceHandle, handlers::TraceHandler};
    ///
    /// struct Addresses(Vec<usize>);
    /// struct HexHandler;
    ///
    /// impl TraceHandler<Addresses> for HexHandler {
    ///     fn render(value: &Addresses, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    ///         for address in &value.0 {
    ///             writeln!(f, "   at {address:#x}")?;
    ///         }
    ///         Ok(())
    ///     }
    /// }
    ///
    /// let trace = TraceHandle::new_custom::<HexHandler, _>(Addresses(vec![0x1000, 0x2000]));
    /// assert_eq!(trace.render(), "   at 0x1000\n   at 0x2000\n");
    /// ```
    #[must_use]
    pub fn new_custom<H, T>(trace: T) -> Self
    where
        T: Send + Sync + 'static,
        H: TraceHandler<T>,
    {
        Self {
            raw: RawTrace::new::<T, H>(trace),
        }
    }

    /// Wraps trace text that has already been rendered.
    #[must_use]
    pub fn from_text(text: impl Into<Cow<'static, str>>) -> Self {
        Self::new_custom::<handlers::Text, Cow<'static, str>>(text.into())
    }

    /// Renders the trace to a `String`.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Returns the frame in which the failure originated, if the trace knows
    /// it.
    #[must_use]
    pub fn target_site(&self) -> Option<&str> {
        self.raw.as_ref().target_site()
    }

    /// Returns `true` if the trace has nothing worth rendering.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.as_ref().is_empty()
    }

    /// Returns the [`TypeId`] of the captured trace value.
    #[must_use]
    pub fn trace_type_id(&self) -> TypeId {
        self.raw.as_ref().trace_type_id()
    }

    /// Returns the captured trace value if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if self.trace_type_id() == TypeId::of::<T>() {
            // SAFETY: the stored type was just checked to be `T`.
            Some(unsafe { self.raw.as_ref().trace_downcast_unchecked::<T>() })
        } else {
            None
        }
    }

    /// Returns `true` if both handles share the same captured trace.
    #[must_use]
    pub fn ptr_eq(&self, other: &TraceHandle) -> bool {
        self.raw.as_ref().ptr_eq(other.raw.as_ref())
    }

    /// Returns the number of handles sharing this trace.
    #[must_use]
    pub fn share_count(&self) -> usize {
        self.raw.as_ref().strong_count()
    }
}

impl Clone for TraceHandle {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
        }
    }
}

impl fmt::Display for TraceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw.as_ref().render(f)
    }
}

impl fmt::Debug for TraceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceHandle")
            .field("type", &self.raw.as_ref().trace_type_name())
            .field("target_site", &self.target_site())
            .finish_non_exhaustive()
    }
}
