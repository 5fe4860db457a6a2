#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`raisetrace`].
//!
//! # Overview
//!
//! This crate contains the type-erased storage behind the opaque trace handles
//! of the [`raisetrace`] library. A trace handle may wrap any captured
//! call-stack representation (a symbolized backtrace, a list of pre-rendered
//! lines, a platform-specific frame buffer, ...) while the error object that
//! carries it only ever sees a single pointer-sized value.
//!
//! **This crate is an implementation detail.** No semantic versioning
//! guarantees are provided. Users should depend on the [`raisetrace`] crate.
//!
//! # Architecture
//!
//! - **[`trace`]**: Type-erased trace storage
//!   - [`RawTrace`]: Owned handle backed by a [`triomphe::Arc`]
//!   - [`RawTraceRef`]: Borrowed view of a handle
//!   - [`TraceData`]: `#[repr(C)]` wrapper enabling field access on erased
//!     types
//!   - [`TraceVtable`]: Function pointers for type-erased dispatch
//!
//! - **[`handlers`]**: The [`TraceHandler`] trait that decides how a concrete
//!   trace type is rendered and inspected.
//!
//! # Immutability
//!
//! Trace data is never mutated after construction. Cloning a [`RawTrace`]
//! only bumps a reference count, so any clone is a frozen snapshot of the
//! trace that stays valid and renderable regardless of what happens to the
//! error object it was taken from.
//!
//! # Safety Strategy
//!
//! When a `TraceData<MyTrace>` is erased to `TraceData<Erased>`, the vtable
//! function pointers must still match the concrete type stored in memory.
//! This is guaranteed by:
//!
//! - **Module-based encapsulation**: the pointer and vtable fields are private
//!   to the module that creates them
//! - **`#[repr(C)]` layout**: the vtable can be read through an erased pointer
//!   without constructing an invalid reference
//! - **Documented vtable contracts**: every vtable method states exactly when
//!   it may be called
//!
//! [`raisetrace`]: https://docs.rs/raisetrace/latest/raisetrace/
//! [`TraceData`]: trace::data::TraceData
//! [`TraceVtable`]: trace::vtable::TraceVtable
//! [`TraceHandler`]: handlers::TraceHandler
//! [`triomphe::Arc`]: triomphe::Arc

extern crate alloc;

pub mod handlers;
mod trace;
mod util;

pub use trace::{RawTrace, RawTraceRef};
