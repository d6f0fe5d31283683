use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{any::Value, finalizer::BoxedFinalizer};

struct Tracked {
    value: Value,
    finalizer: BoxedFinalizer,
}

/// Collects instances needing finalization and finalizes them in reverse order of tracking.
///
/// Each tracked instance is finalized exactly once, on the first [`DisposalScope::dispose`] call.
#[derive(Default)]
pub struct DisposalScope {
    tracked: Mutex<Vec<Tracked>>,
    disposed: AtomicBool,
}

impl DisposalScope {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks an instance. If the scope is already disposed, the instance is finalized right away.
    pub(crate) fn track(&self, value: Value, finalizer: BoxedFinalizer) {
        if self.is_disposed() {
            warn!("Disposal scope already disposed, finalizing instance immediately");
            finalizer(&value);
            return;
        }
        self.tracked.lock().push(Tracked { value, finalizer });
        debug!("Tracked for disposal");
    }

    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            debug!("Disposal scope already disposed");
            return;
        }

        let tracked = core::mem::take(&mut *self.tracked.lock());
        for Tracked { value, finalizer } in tracked.into_iter().rev() {
            finalizer(&value);
            debug!("Finalized");
        }
    }

    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.lock().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
