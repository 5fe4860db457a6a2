//! Internal utility types.

/// Marker type used when type-erasing traces.
///
/// `TraceData<Erased>` represents a trace whose concrete type is unknown in
/// the current scope. A distinct marker (rather than `()`) keeps the intent
/// visible in signatures and compiler errors.
pub(crate) struct Erased;
