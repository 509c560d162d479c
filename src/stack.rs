//! Host stack growth for the recursive parser and evaluator.
//!
//! Deeply nested source (long chains of parentheses, deep guest recursion)
//! would otherwise exhaust the native stack before the evaluator's call-depth
//! limit gets a chance to report an error.

/// Grow the stack when less than this much remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
