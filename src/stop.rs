//! The single cancellation flag shared by countdowns and execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle to one stop flag.
///
/// Checked between files and on every timer tick, never inside a single
/// move system call.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clears the flag and reports whether it was set.
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_flag() {
        let stop = StopHandle::new();
        let other = stop.clone();
        assert!(!stop.is_requested());

        other.request();
        assert!(stop.is_requested());
        assert!(stop.take());
        assert!(!other.is_requested());
        assert!(!stop.take());
    }
}
