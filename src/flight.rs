use std::sync::atomic::{AtomicBool, Ordering};

/// Compare-and-set flag admitting at most one echo exchange at a time.
pub(crate) struct FlightFlag {
    sending: AtomicBool,
}

impl FlightFlag {
    pub(crate) fn new() -> Self {
        FlightFlag {
            sending: AtomicBool::new(false),
        }
    }

    /// Marks an exchange as in flight. `None` when one already is.
    pub(crate) fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.sending
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| FlightGuard { flag: self })
    }

    pub(crate) fn is_set(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }
}

/// Releases the flag when dropped, so every exit path of the guarded
/// region, error returns included, transitions back to idle.
pub(crate) struct FlightGuard<'a> {
    flag: &'a FlightFlag,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.sending.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_guard_is_held() {
        let flag = FlightFlag::new();
        let guard = flag.try_acquire();
        assert!(guard.is_some());
        assert!(flag.try_acquire().is_none());
        drop(guard);
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn is_set_tracks_the_guard() {
        let flag = FlightFlag::new();
        assert!(!flag.is_set());
        {
            let _guard = flag.try_acquire().unwrap();
            assert!(flag.is_set());
        }
        assert!(!flag.is_set());
    }
}
