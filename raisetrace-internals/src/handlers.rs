//! Handlers that define how captured traces are rendered and inspected.
//!
//! A trace handle stores a value of some concrete type `T` together with a
//! handler `H: TraceHandler<T>`. The handler is chosen when the handle is
//! created and cannot change afterwards, so the same trace value can be
//! rendered differently depending on which handler wraps it (for example with
//! full or shortened source paths).

/// Trait for implementing how a captured trace is rendered and inspected.
///
/// # Required Methods
///
/// - [`render`](TraceHandler::render): Writes the human-readable form of the
///   trace, one frame per line.
///
/// # Optional Methods
///
/// - [`target_site`](TraceHandler::target_site): The frame where the failure
///   originated (the most recent frame). Defaults to `None`.
/// - [`is_empty`](TraceHandler::is_empty): Whether the trace has no frames
///   worth rendering. Defaults to `false`.
///
/// # Examples
///
/// ```
/// use raisetrace_internals::handlers::TraceHandler;
///
/// struct Frames(Vec<&'static str>);
///
/// struct FramesHandler;
///
/// impl TraceHandler<Frames> for FramesHandler {
///     fn render(value: &Frames, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
///         for frame in &value.0 {
///             writeln!(f, "   at {frame}")?;
///         }
///         Ok(())
///     }
///
///     fn target_site(value: &Frames) -> Option<&str> {
///         value.0.first().copied()
///     }
///
///     fn is_empty(value: &Frames) -> bool {
///         value.0.is_empty()
///     }
/// }
/// ```
pub trait TraceHandler<T>: 'static {
    /// Writes the rendered trace text.
    fn render(value: &T, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result;

    /// Returns the name of the frame in which the failure originated, if
    /// known.
    fn target_site(value: &T) -> Option<&str> {
        let _ = value;
        None
    }

    /// Returns `true` if the trace contains nothing worth rendering.
    fn is_empty(value: &T) -> bool {
        let _ = value;
        false
    }
}
