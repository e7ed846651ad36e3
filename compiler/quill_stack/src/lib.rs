//! Stack growth for recursive template processing.
//!
//! Parsing nested expressions, annotating nested directives and rendering
//! nested macro calls all recurse on the native stack. Each recursive entry
//! point is wrapped in [`ensure_sufficient_stack`], so deep templates grow the
//! stack instead of aborting the process. Logical limits (maximum macro call
//! depth) are enforced separately by the evaluator.
//!
//! On native targets the stack is grown with `stacker`; on WASM the closure
//! is called directly.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each new stack segment.
const GROWTH: usize = 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, GROWTH, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests;
