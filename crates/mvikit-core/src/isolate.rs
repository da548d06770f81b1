// ── Callback isolation ──
//
// User callbacks (popup dismissal, controller cleanup) run behind a panic
// boundary so one failing callback never corrupts broker bookkeeping or
// skips the remaining cleanups.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;

/// Run `callback`, logging and swallowing a panic. Returns `false` if it panicked.
pub(crate) fn run_isolated(label: &str, callback: impl FnOnce()) -> bool {
    catch_isolated(label, callback).is_some()
}

/// Like [`run_isolated`] but keeps the callback's result.
pub(crate) fn catch_isolated<R>(label: &str, callback: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(value) => Some(value),
        Err(payload) => {
            warn!(
                callback = label,
                panic = panic_message(payload.as_ref()),
                "callback panicked (isolated)"
            );
            None
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panics_are_contained() {
        assert!(!run_isolated("boom", || panic!("boom")));
        assert!(run_isolated("fine", || {}));
        assert_eq!(catch_isolated("value", || 3), Some(3));
    }

    #[test]
    fn formatted_payloads_are_readable() {
        let payload = catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "code 7");
    }
}
