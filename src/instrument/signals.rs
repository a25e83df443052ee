// SPDX-License-Identifier: AGPL-3.0-or-later
//! Notifies observers (GUI, orchestrator cache) of instrument geometry
//! changes: a plain observer list plus a batch guard so a sequence of axis
//! moves only fires one notification instead of one per move.

/// A closure invoked whenever the instrument geometry changes.
pub type UpdateSlot = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct UpdateSignal {
    slots: Vec<UpdateSlot>,
    deferred: bool,
    pending: bool,
}

impl UpdateSignal {
    pub fn connect(&mut self, slot: UpdateSlot) {
        self.slots.push(slot);
    }

    /// Fires every connected slot, unless a [`DeferGuard`] is currently
    /// active, in which case the call is remembered and fired once the
    /// guard drops.
    pub fn emit(&mut self) {
        if self.deferred {
            self.pending = true;
            return;
        }
        for slot in &self.slots {
            slot();
        }
    }

    /// Batches every `emit()` call made through the guard's lifetime into a
    /// single notification when it is dropped. Used by callers that move
    /// several axes in a row (e.g. loading an instrument description).
    pub fn defer(&mut self) -> DeferGuard<'_> {
        self.deferred = true;
        DeferGuard { signal: self }
    }
}

pub struct DeferGuard<'a> {
    signal: &'a mut UpdateSignal,
}

impl Drop for DeferGuard<'_> {
    fn drop(&mut self) {
        self.signal.deferred = false;
        if std::mem::take(&mut self.signal.pending) {
            self.signal.emit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn emit_without_guard_fires_immediately() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut sig = UpdateSignal::default();
        let c = count.clone();
        sig.connect(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        sig.emit();
        sig.emit();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn defer_guard_coalesces_into_one_emission() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut sig = UpdateSignal::default();
        let c = count.clone();
        sig.connect(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        {
            let _guard = sig.defer();
            sig.emit();
            sig.emit();
            sig.emit();
            assert_eq!(count.load(Ordering::SeqCst), 0);
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
