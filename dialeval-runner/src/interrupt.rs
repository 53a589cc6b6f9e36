//! Cooperative interruption of a running evaluation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A shared interrupt flag.
///
/// A signal handler calls [`Interrupt::raise`]; the engine calls
/// [`Interrupt::take`] after computing a unit and discards the result if an
/// interrupt arrived meanwhile. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    pending: Arc<AtomicUsize>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an interrupt. Returns how many are pending, including this one.
    pub fn raise(&self) -> usize {
        self.pending.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of interrupts not yet taken.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Clear pending interrupts, returning whether there were any.
    pub fn take(&self) -> bool {
        self.pending.swap(0, Ordering::SeqCst) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_and_take() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.take());

        let handle = interrupt.clone();
        assert_eq!(handle.raise(), 1);
        assert_eq!(handle.raise(), 2);
        assert_eq!(interrupt.pending(), 2);

        assert!(interrupt.take());
        assert_eq!(interrupt.pending(), 0);
        assert!(!interrupt.take());
    }
}
