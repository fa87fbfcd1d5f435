//! Stack safety for the recursive passes.
//!
//! Parsing, resolution and evaluation all recurse on the shape of the
//! program.  Wrapping the recursive entry points in
//! [`ensure_sufficient_stack`] lets the host stack grow on demand, so deeply
//! nested source is handled and runaway Lox recursion reaches the
//! interpreter's call-depth limit instead of overflowing the native stack.

/// Ensure sufficient stack space is available before executing `f`.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (100KB red zone).
    const RED_ZONE: usize = 100 * 1024;

    /// Stack space to allocate when growing (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
