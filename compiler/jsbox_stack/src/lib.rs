//! Stack growth guard for the sandbox's recursive passes.
//!
//! The tree builder re-enters itself once per nested sub-expression and the
//! synchronous driver recurses once per evaluated node, so hostile input such
//! as `((((((...))))))` or a thousand chained ternaries can exhaust a thread's
//! native stack long before the execution quota notices. Every recursive
//! entry point goes through [`ensure_sufficient_stack`].
//!
//! On native targets the `stacker` crate switches to a freshly allocated
//! segment when the remaining stack drops below [`RED_ZONE`]. On `wasm32`
//! the guard is a passthrough.

/// Remaining stack below which a new segment is allocated (128KB).
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment (2MB).
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// Passthrough on `wasm32`, where the engine manages the stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests;
