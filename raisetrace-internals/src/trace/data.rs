//! This module encapsulates the fields of the [`TraceData`]. Since this is the
//! only place they are visible, the type of the [`TraceVtable`] is guaranteed
//! to always be in sync with the type of the stored trace: they are paired at
//! creation time and nothing can change either afterwards.

use crate::{
    handlers::TraceHandler,
    trace::{raw::RawTraceRef, vtable::TraceVtable},
};

/// Type-erased trace data structure with vtable-based dispatch.
///
/// `#[repr(C)]` guarantees that the vtable is the first field, so it can be
/// read even when the concrete trace type `T` is unknown.
#[repr(C)]
pub(super) struct TraceData<T: 'static> {
    /// The vtable of this trace
    vtable: &'static TraceVtable,
    /// The captured trace itself
    trace: T,
}

impl<T: 'static> TraceData<T> {
    /// Creates a new [`TraceData`] pairing the trace with the vtable for
    /// handler `H`.
    #[inline]
    pub(super) fn new<H: TraceHandler<T>>(trace: T) -> Self {
        Self {
            vtable: TraceVtable::new::<T, H>(),
            trace,
        }
    }
}

impl<'a> RawTraceRef<'a> {
    /// Returns the [`TraceVtable`] of the [`TraceData`] instance.
    #[inline]
    pub(super) fn vtable(self) -> &'static TraceVtable {
        let ptr = self.as_ptr();
        // SAFETY: The pointer refers to a `TraceData<T>` for some unknown `T`.
        // `TraceData<T>` is `#[repr(C)]` and `vtable` is its first field, so a
        // pointer to that field can be formed without knowing `T`. No reference
        // to the whole `TraceData` is created.
        let vtable_ptr: *const &'static TraceVtable = unsafe { &raw const (*ptr).vtable };

        // SAFETY: The field is initialized for the lifetime of the handle, and
        // reading a `&'static TraceVtable` out of it is a plain copy.
        unsafe { *vtable_ptr }
    }

    /// Accesses the stored trace as a reference to the specified type.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type `T` matches the actual trace type
    /// stored in the [`TraceData`].
    #[inline]
    pub unsafe fn trace_downcast_unchecked<T: 'static>(self) -> &'a T {
        // SAFETY: `T` matches the stored type, as guaranteed by our caller.
        let this = unsafe { self.cast_inner::<T>() };
        &this.trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_field_offsets() {
        use core::mem::{offset_of, size_of};

        #[repr(align(64))]
        struct Aligned {
            _frames: [u8; 3],
        }

        assert_eq!(offset_of!(TraceData<u8>, vtable), 0);
        assert_eq!(offset_of!(TraceData<[u64; 8]>, vtable), 0);
        assert_eq!(offset_of!(TraceData<Aligned>, vtable), 0);

        assert!(offset_of!(TraceData<u8>, trace) >= size_of::<&'static TraceVtable>());
        assert!(offset_of!(TraceData<Aligned>, trace) >= size_of::<&'static TraceVtable>());
    }
}
