//! Module containing the type-erased trace handle

mod data;
mod raw;
mod vtable;

pub use self::raw::{RawTrace, RawTraceRef};
