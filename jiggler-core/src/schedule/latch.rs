//! Single-slot wake mailbox shared between the alarm interrupt and the loop.

use portable_atomic::{AtomicBool, Ordering};

/// Latched "wake requested" flag.
///
/// The alarm interrupt only ever calls [`signal`](Self::signal); the loop only
/// ever calls [`take`](Self::take). Repeated signals before a take collapse
/// into one.
#[derive(Debug)]
pub struct WakeLatch {
    pending: AtomicBool,
}

impl WakeLatch {
    /// Creates an empty latch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Marks a wake as requested. Safe to call from interrupt context.
    pub fn signal(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Consumes a pending wake, returning `true` if one was present.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Reports whether a wake is pending without consuming it.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl Default for WakeLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_exactly_once() {
        let latch = WakeLatch::new();
        assert!(!latch.take());

        latch.signal();
        latch.signal();
        assert!(latch.is_pending());
        assert!(latch.take());
        assert!(!latch.take());
        assert!(!latch.is_pending());
    }
}
