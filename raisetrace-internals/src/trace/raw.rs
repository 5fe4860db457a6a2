//! Type-erased trace pointer types.
//!
//! This module encapsulates the `ptr` field of [`RawTrace`] and
//! [`RawTraceRef`], so it is only visible here. That restriction guarantees
//! the safety invariant: **the pointer always comes from
//! `triomphe::Arc<TraceData<T>>`**.
//!
//! # Reference Counting
//!
//! A [`RawTrace`] behaves like a type-erased `triomphe::Arc`. Cloning goes
//! through the vtable to increment the count on the correctly typed `Arc`,
//! and dropping goes through the vtable to decrement it. Since the pointee is
//! never mutated, all clones observe the same trace forever.

use core::{any::TypeId, ptr::NonNull};

use crate::{handlers::TraceHandler, trace::data::TraceData, util::Erased};

/// A pointer to a [`TraceData`] that is guaranteed to point to an initialized
/// instance of a [`TraceData<T>`] for some specific `T`, though we do not
/// know which `T`.
///
/// The pointer is allowed to transition into a non-initialized state inside
/// the [`RawTrace::drop`] method.
#[repr(transparent)]
pub struct RawTrace {
    /// Pointer to the inner trace data
    ///
    /// # Safety
    ///
    /// The following invariants hold for as long as this struct exists:
    ///
    /// 1. The pointer was created from a `triomphe::Arc<TraceData<T>>` for
    ///    some `T` using `triomphe::Arc::into_raw`.
    /// 2. This struct owns one strong reference of that `Arc`.
    /// 3. The pointer refers to the same `TraceData<T>` for the entire
    ///    lifetime of this object.
    ptr: NonNull<TraceData<Erased>>,
}

impl RawTrace {
    /// Creates a new [`RawTrace`] from a [`triomphe::Arc<TraceData<T>>`],
    /// taking over its strong reference.
    #[inline]
    pub(super) fn from_arc<T: 'static>(data: triomphe::Arc<TraceData<T>>) -> Self {
        let ptr: *const TraceData<T> = triomphe::Arc::into_raw(data);
        let ptr: *mut TraceData<Erased> = ptr.cast::<TraceData<Erased>>().cast_mut();

        // SAFETY: `triomphe::Arc::into_raw` never returns a null pointer.
        let ptr: NonNull<TraceData<Erased>> = unsafe { NonNull::new_unchecked(ptr) };

        Self { ptr }
    }

    /// Creates a new [`RawTrace`] storing `trace` and rendered through the
    /// handler `H`.
    ///
    /// The returned handle has a strong count of 1.
    #[inline]
    pub fn new<T, H>(trace: T) -> Self
    where
        T: 'static,
        H: TraceHandler<T>,
    {
        Self::from_arc(triomphe::Arc::new(TraceData::new::<H>(trace)))
    }

    /// Returns a borrowed view of the trace.
    #[inline]
    pub fn as_ref(&self) -> RawTraceRef<'_> {
        RawTraceRef {
            ptr: self.ptr,
            _marker: core::marker::PhantomData,
        }
    }
}

impl Clone for RawTrace {
    #[inline]
    fn clone(&self) -> Self {
        let vtable = self.as_ref().vtable();

        // SAFETY:
        // 1. The pointer comes from `triomphe::Arc::into_raw` (invariant 1).
        // 2. The vtable was read from the same `TraceData`, so it matches.
        unsafe { vtable.clone_arc(self.ptr) }
    }
}

impl core::ops::Drop for RawTrace {
    #[inline]
    fn drop(&mut self) {
        let vtable = self.as_ref().vtable();

        // SAFETY:
        // 1. The pointer comes from `triomphe::Arc::into_raw` (invariant 1).
        // 2. The vtable was read from the same `TraceData`, so it matches.
        // 3. We own exactly one strong reference (invariant 2) and the pointer
        //    is not used again after this call, as we are in `drop`.
        unsafe { vtable.drop(self.ptr) }
    }
}

/// A lifetime-bound pointer to a [`TraceData`] that is guaranteed to point to
/// an initialized instance of a [`TraceData<T>`] for some specific `T`.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct RawTraceRef<'a> {
    /// Pointer to the inner trace data
    ///
    /// # Safety
    ///
    /// 1. The pointer was created from a `triomphe::Arc<TraceData<T>>` for
    ///    some `T` using `triomphe::Arc::into_raw`.
    /// 2. The pointee stays alive and initialized for `'a`.
    ptr: NonNull<TraceData<Erased>>,

    /// Marker to tell the compiler that we should behave the same as a
    /// `&'a TraceData<Erased>`
    _marker: core::marker::PhantomData<&'a TraceData<Erased>>,
}

impl<'a> RawTraceRef<'a> {
    /// Casts the [`RawTraceRef`] to a [`TraceData<T>`] reference.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `T` matches the actual trace type stored
    /// in the [`TraceData`].
    #[inline]
    pub(super) unsafe fn cast_inner<T>(self) -> &'a TraceData<T> {
        debug_assert_eq!(self.vtable().type_id(), TypeId::of::<T>());

        let this = self.ptr.cast::<TraceData<T>>();
        // SAFETY: The pointer is non-null, aligned and points to an initialized
        // `TraceData<T>` (type guaranteed by the caller) that lives for `'a`.
        // Only shared access is ever handed out.
        unsafe { this.as_ref() }
    }

    /// Returns the raw pointer to the [`TraceData`] instance.
    #[inline]
    pub(super) fn as_ptr(self) -> *const TraceData<Erased> {
        self.ptr.as_ptr()
    }

    /// Returns the [`TypeId`] of the stored trace.
    #[inline]
    pub fn trace_type_id(self) -> TypeId {
        self.vtable().type_id()
    }

    /// Returns the [`core::any::type_name`] of the stored trace.
    #[inline]
    pub fn trace_type_name(self) -> &'static str {
        self.vtable().type_name()
    }

    /// Returns the [`TypeId`] of the handler the trace was created with.
    #[inline]
    pub fn handler_type_id(self) -> TypeId {
        self.vtable().handler_type_id()
    }

    /// Returns `true` if both references point to the same allocation.
    #[inline]
    pub fn ptr_eq(self, other: RawTraceRef<'_>) -> bool {
        self.ptr == other.ptr
    }

    /// Renders the trace with [`TraceHandler::render`].
    #[inline]
    pub fn render(self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let vtable = self.vtable();
        // SAFETY: The vtable was read from the same `TraceData`, so it matches.
        unsafe { vtable.render(self, formatter) }
    }

    /// Returns the originating frame as reported by
    /// [`TraceHandler::target_site`].
    #[inline]
    pub fn target_site(self) -> Option<&'a str> {
        let vtable = self.vtable();
        // SAFETY: The vtable was read from the same `TraceData`, so it matches.
        unsafe { vtable.target_site(self) }
    }

    /// Returns [`TraceHandler::is_empty`] for the stored trace.
    #[inline]
    pub fn is_empty(self) -> bool {
        let vtable = self.vtable();
        // SAFETY: The vtable was read from the same `TraceData`, so it matches.
        unsafe { vtable.is_empty(self) }
    }

    /// Returns the number of [`RawTrace`] handles sharing this trace.
    #[inline]
    pub fn strong_count(self) -> usize {
        let vtable = self.vtable();
        // SAFETY:
        // 1. The pointer comes from `triomphe::Arc::into_raw`.
        // 2. The vtable was read from the same `TraceData`, so it matches.
        unsafe { vtable.strong_count(self.ptr) }
    }
}
