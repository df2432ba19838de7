//! Stack growth for deep recursion.
//!
//! Inhabitation search recurses once per receiver and argument, and the
//! grammar compiler recurses once per nested argument set. Both wrap their
//! recursive step in [`with_stack`] so that large symbol tables with high
//! depth limits do not overflow the thread stack.
//!
//! On `wasm32` the closure is called directly.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const SEGMENT: usize = 1024 * 1024;

/// Run `f`, first moving to a fresh stack segment if the current one is
/// nearly exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
