//! Per-thread nesting guard for the dispatch pipeline
//!
//! A client handler may log through the same (or another) logger. Each such
//! call nests one pipeline run inside the current one; the guard caps how deep
//! that can go on a single thread.

use std::cell::Cell;

thread_local! {
    static DEPTH: Cell<usize> = Cell::new(0);
}

/// Held for the duration of one pipeline run
pub(crate) struct DispatchGuard {
    _private: (),
}

impl DispatchGuard {
    /// Enter a pipeline run, or `None` if `max_depth` runs are already active
    pub(crate) fn enter(max_depth: usize) -> Option<Self> {
        DEPTH.with(|depth| {
            let current = depth.get();
            if current >= max_depth.max(1) {
                None
            } else {
                depth.set(current + 1);
                Some(Self { _private: () })
            }
        })
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Number of pipeline runs active on this thread
pub(crate) fn current_depth() -> usize {
    DEPTH.with(|depth| depth.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_limits_nesting() {
        let a = DispatchGuard::enter(2).unwrap();
        let b = DispatchGuard::enter(2).unwrap();
        assert_eq!(current_depth(), 2);
        assert!(DispatchGuard::enter(2).is_none());

        drop(b);
        assert_eq!(current_depth(), 1);
        drop(a);
        assert_eq!(current_depth(), 0);
    }

    #[test]
    fn test_zero_limit_allows_top_level_call() {
        let guard = DispatchGuard::enter(0);
        assert!(guard.is_some());
        assert!(DispatchGuard::enter(0).is_none());
    }

    #[test]
    fn test_depth_is_per_thread() {
        let _outer = DispatchGuard::enter(1).unwrap();
        let inner = std::thread::spawn(|| DispatchGuard::enter(1).is_some())
            .join()
            .unwrap();
        assert!(inner);
    }
}
