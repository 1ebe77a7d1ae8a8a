//! Job plumbing shared by the coloring and optimization phases.
//!
//! A job that panics must not take the phase down with it: its contribution is
//! dropped, the failure is logged, and the driving thread still receives exactly
//! one outcome per job so the phase terminates.

use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};

/// Run `job`, turning a panic into `Err(message)`.
pub fn guarded<T>(job: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(job)).map_err(|payload| panic_message(&*payload))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Split `[0, len)` into `parts` contiguous blocks of equal size, the last one
/// absorbing the remainder. Empty blocks are kept so callers always get `parts`.
pub fn partition(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let size = len / parts;
    (0..parts)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 == parts { len } else { start + size };
            start..end
        })
        .collect()
}
