//! Vtable for type-erased trace operations.
//!
//! The [`TraceVtable`] lets handle code call handler methods after the
//! concrete trace type `T` and handler type `H` have been erased. Its fields
//! are private to this module, which guarantees the safety invariant: **the
//! vtable's type parameters match the trace type and handler stored in the
//! [`TraceData`]**. Vtables are only created as `&'static` references by
//! [`TraceVtable::new`], which pairs the function pointers with `T` and `H` at
//! compile time.

use core::{any::TypeId, ptr::NonNull};

use crate::{
    handlers::TraceHandler,
    trace::{
        data::TraceData,
        raw::{RawTrace, RawTraceRef},
    },
    util::Erased,
};

/// Vtable for type-erased trace operations.
///
/// # Safety Invariant
///
/// Every function pointer below points to the function of the same name in
/// this module, instantiated with the `T` and `H` that created this vtable.
pub(crate) struct TraceVtable {
    /// Gets the [`TypeId`] of the trace type.
    type_id: fn() -> TypeId,
    /// Gets the [`core::any::type_name`] of the trace type.
    type_name: fn() -> &'static str,
    /// Gets the [`TypeId`] of the handler type.
    handler_type_id: fn() -> TypeId,
    /// Releases one strong reference of the `triomphe::Arc<TraceData<T>>`.
    drop: unsafe fn(NonNull<TraceData<Erased>>),
    /// Acquires one more strong reference of the `triomphe::Arc<TraceData<T>>`.
    clone_arc: unsafe fn(NonNull<TraceData<Erased>>) -> RawTrace,
    /// Reads the strong count of the `triomphe::Arc<TraceData<T>>`.
    strong_count: unsafe fn(NonNull<TraceData<Erased>>) -> usize,
    /// Renders the trace using the handler.
    render: unsafe fn(RawTraceRef<'_>, &mut core::fmt::Formatter<'_>) -> core::fmt::Result,
    /// Returns the originating frame using the handler.
    target_site: unsafe fn(RawTraceRef<'_>) -> Option<&str>,
    /// Returns whether the trace is empty using the handler.
    is_empty: unsafe fn(RawTraceRef<'_>) -> bool,
}

impl TraceVtable {
    /// Creates the [`TraceVtable`] for trace type `T` and handler `H`.
    pub(super) const fn new<T: 'static, H: TraceHandler<T>>() -> &'static Self {
        const {
            &Self {
                type_id: TypeId::of::<T>,
                type_name: core::any::type_name::<T>,
                handler_type_id: TypeId::of::<H>,
                drop: drop::<T>,
                clone_arc: clone_arc::<T>,
                strong_count: strong_count::<T>,
                render: render::<T, H>,
                target_site: target_site::<T, H>,
                is_empty: is_empty::<T, H>,
            }
        }
    }

    /// Gets the [`TypeId`] of the trace type.
    #[inline]
    pub(super) fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Gets the [`core::any::type_name`] of the trace type.
    #[inline]
    pub(super) fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Gets the [`TypeId`] of the handler type.
    #[inline]
    pub(super) fn handler_type_id(&self) -> TypeId {
        (self.handler_type_id)()
    }

    /// Releases one strong reference of the trace.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The pointer comes from `triomphe::Arc<TraceData<T>>` via
    ///    `triomphe::Arc::into_raw`.
    /// 2. This vtable belongs to the trace stored behind the pointer.
    /// 3. The caller owns the strong reference being released and does not
    ///    use the pointer afterwards.
    #[inline]
    pub(super) unsafe fn drop(&self, ptr: NonNull<TraceData<Erased>>) {
        // SAFETY: `self.drop` points to `drop::<T>`; requirements 1-3 are
        // forwarded from our caller.
        unsafe { (self.drop)(ptr) }
    }

    /// Acquires one more strong reference of the trace.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The pointer comes from `triomphe::Arc<TraceData<T>>` via
    ///    `triomphe::Arc::into_raw`.
    /// 2. This vtable belongs to the trace stored behind the pointer.
    #[inline]
    pub(super) unsafe fn clone_arc(&self, ptr: NonNull<TraceData<Erased>>) -> RawTrace {
        // SAFETY: `self.clone_arc` points to `clone_arc::<T>`; requirements are
        // forwarded from our caller.
        unsafe { (self.clone_arc)(ptr) }
    }

    /// Reads the strong count of the trace.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The pointer comes from `triomphe::Arc<TraceData<T>>` via
    ///    `triomphe::Arc::into_raw`.
    /// 2. This vtable belongs to the trace stored behind the pointer.
    #[inline]
    pub(super) unsafe fn strong_count(&self, ptr: NonNull<TraceData<Erased>>) -> usize {
        // SAFETY: `self.strong_count` points to `strong_count::<T>`;
        // requirements are forwarded from our caller.
        unsafe { (self.strong_count)(ptr) }
    }

    /// Renders the trace with [`H::render`](TraceHandler::render).
    ///
    /// # Safety
    ///
    /// This vtable must belong to the trace stored behind `ptr`.
    #[inline]
    pub(super) unsafe fn render(
        &self,
        ptr: RawTraceRef<'_>,
        formatter: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        // SAFETY: `self.render` points to `render::<T, H>`; the type match is
        // guaranteed by our caller.
        unsafe { (self.render)(ptr, formatter) }
    }

    /// Returns [`H::target_site`](TraceHandler::target_site).
    ///
    /// # Safety
    ///
    /// This vtable must belong to the trace stored behind `ptr`.
    #[inline]
    pub(super) unsafe fn target_site<'a>(&self, ptr: RawTraceRef<'a>) -> Option<&'a str> {
        // SAFETY: `self.target_site` points to `target_site::<T, H>`; the type
        // match is guaranteed by our caller.
        unsafe { (self.target_site)(ptr) }
    }

    /// Returns [`H::is_empty`](TraceHandler::is_empty).
    ///
    /// # Safety
    ///
    /// This vtable must belong to the trace stored behind `ptr`.
    #[inline]
    pub(super) unsafe fn is_empty(&self, ptr: RawTraceRef<'_>) -> bool {
        // SAFETY: `self.is_empty` points to `is_empty::<T, H>`; the type match
        // is guaranteed by our caller.
        unsafe { (self.is_empty)(ptr) }
    }
}

/// Releases one strong reference of the [`triomphe::Arc<TraceData<T>>`].
///
/// # Safety
///
/// 1. The pointer comes from `triomphe::Arc<TraceData<T>>` via
///    `triomphe::Arc::into_raw`.
/// 2. `T` is the type actually stored.
/// 3. The caller owns the released reference and does not use the pointer
///    afterwards.
unsafe fn drop<T: 'static>(ptr: NonNull<TraceData<Erased>>) {
    let ptr: *const TraceData<T> = ptr.cast::<TraceData<T>>().as_ptr();
    // SAFETY: Type and provenance are guaranteed by the caller, and the pointer
    // is consumed here.
    let arc = unsafe { triomphe::Arc::from_raw(ptr) };
    core::mem::drop(arc);
}

/// Acquires one more strong reference of the [`triomphe::Arc<TraceData<T>>`].
///
/// # Safety
///
/// 1. The pointer comes from `triomphe::Arc<TraceData<T>>` via
///    `triomphe::Arc::into_raw`.
/// 2. `T` is the type actually stored.
unsafe fn clone_arc<T: 'static>(ptr: NonNull<TraceData<Erased>>) -> RawTrace {
    let ptr: *const TraceData<T> = ptr.cast::<TraceData<T>>().as_ptr();
    // SAFETY: The pointer came from `Arc::into_raw` with the correct type,
    // which is what `ArcBorrow::from_ptr` requires.
    let arc_borrow = unsafe { triomphe::ArcBorrow::from_ptr(ptr) };
    RawTrace::from_arc(arc_borrow.clone_arc())
}

/// Reads the strong count of the [`triomphe::Arc<TraceData<T>>`].
///
/// # Safety
///
/// 1. The pointer comes from `triomphe::Arc<TraceData<T>>` via
///    `triomphe::Arc::into_raw`.
/// 2. `T` is the type actually stored.
unsafe fn strong_count<T: 'static>(ptr: NonNull<TraceData<Erased>>) -> usize {
    let ptr: *const TraceData<T> = ptr.cast::<TraceData<T>>().as_ptr();
    // SAFETY: The pointer came from `Arc::into_raw` with the correct type,
    // which is what `ArcBorrow::from_ptr` requires.
    let arc_borrow = unsafe { triomphe::ArcBorrow::from_ptr(ptr) };
    triomphe::ArcBorrow::strong_count(&arc_borrow)
}

/// Renders a trace using its handler.
///
/// # Safety
///
/// `T` must be the type actually stored behind `ptr`.
unsafe fn render<T: 'static, H: TraceHandler<T>>(
    ptr: RawTraceRef<'_>,
    formatter: &mut core::fmt::Formatter<'_>,
) -> core::fmt::Result {
    // SAFETY: Guaranteed by the caller.
    let trace: &T = unsafe { ptr.trace_downcast_unchecked::<T>() };
    H::render(trace, formatter)
}

/// Returns the originating frame of a trace using its handler.
///
/// # Safety
///
/// `T` must be the type actually stored behind `ptr`.
unsafe fn target_site<'a, T: 'static, H: TraceHandler<T>>(
    ptr: RawTraceRef<'a>,
) -> Option<&'a str> {
    // SAFETY: Guaranteed by the caller.
    let trace: &'a T = unsafe { ptr.trace_downcast_unchecked::<T>() };
    H::target_site(trace)
}

/// Returns whether a trace is empty using its handler.
///
/// # Safety
///
/// `T` must be the type actually stored behind `ptr`.
unsafe fn is_empty<T: 'static, H: TraceHandler<T>>(ptr: RawTraceRef<'_>) -> bool {
    // SAFETY: Guaranteed by the caller.
    let trace: &T = unsafe { ptr.trace_downcast_unchecked::<T>() };
    H::is_empty(trace)
}
