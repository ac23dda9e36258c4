// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cooperative cancellation shared between an interrupt source and the
// capture loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Debug, Default)]
struct Inner {
    interrupts: AtomicU32,
    forwarded: AtomicBool,
}

/// Counts interrupts and hands the first one to the device exactly once.
///
/// Only atomics are touched when recording an interrupt, so `interrupt` may
/// be called from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one interrupt and return how many have arrived so far.
    pub fn interrupt(&self) -> u32 {
        self.inner.interrupts.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.interrupts.load(Ordering::SeqCst) > 0
    }

    /// True once after the first interrupt; the caller then asks the device
    /// to cancel.
    pub fn take_pending(&self) -> bool {
        self.is_cancelled() && !self.inner.forwarded.swap(true, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_interrupt_is_forwarded_once() {
        let token = CancellationToken::new();
        assert!(!token.take_pending());
        assert_eq!(token.interrupt(), 1);
        assert!(token.take_pending());
        assert!(!token.take_pending());
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let handler_side = token.clone();
        handler_side.interrupt();
        assert_eq!(handler_side.interrupt(), 2);
        assert!(token.is_cancelled());
    }
}
