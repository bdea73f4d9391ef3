//! Stack growth for the recursive passes.
//!
//! Parsing, normalization and encoding all recurse once per nesting level.
//! Nesting is capped by [`Options::max_nesting_depth`](crate::Options), but
//! that cap is only checked after parsing, so the parser must survive
//! arbitrarily deep input first.

/// Keep at least this much stack free before recursing further.
const RED_ZONE: usize = 64 * 1024;

/// Size of each freshly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f`, growing the stack first if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
