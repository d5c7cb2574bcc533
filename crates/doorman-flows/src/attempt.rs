//! One-outstanding-attempt gate shared by the submit-style flows.

use std::sync::atomic::{AtomicBool, Ordering};

/// RAII claim on a flow's single attempt slot.
///
/// Acquiring fails while another attempt holds the slot; dropping the
/// guard releases it, including on early returns.
pub(crate) struct AttemptGuard<'a> {
    slot: &'a AtomicBool,
}

impl<'a> AttemptGuard<'a> {
    pub(crate) fn acquire(slot: &'a AtomicBool) -> Option<Self> {
        slot.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { slot })
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::SeqCst);
    }
}
