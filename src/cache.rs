use alloc::{collections::BTreeMap, sync::Arc};
use parking_lot::{ReentrantMutex, RwLock};
use tracing::debug;

use crate::any::Value;

/// Lazily initialized shared instance.
///
/// Creation is serialized, so the instance is created at most once.
#[derive(Default)]
pub(crate) struct InstanceCell {
    value: RwLock<Option<Value>>,
    lock: ReentrantMutex<()>,
}

impl InstanceCell {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self) -> Option<Value> {
        self.value.read().clone()
    }

    pub(crate) fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<Value, E>) -> Result<Value, E> {
        if let Some(value) = self.get() {
            debug!("Found in cache");
            return Ok(value);
        }

        let _guard = self.lock.lock();
        if let Some(value) = self.get() {
            debug!("Found in cache after waiting");
            return Ok(value);
        }
        debug!("Not found in cache");

        let value = init()?;
        *self.value.write() = Some(value.clone());
        debug!("Cached");
        Ok(value)
    }
}

pub(crate) type SlotId = u64;

/// Instances cached by a scope, keyed by the lifestyle slot that created them.
///
/// Each slot owns its own [`InstanceCell`], so creating one slot never waits on another.
#[derive(Default)]
pub(crate) struct ScopedCache {
    cells: RwLock<BTreeMap<SlotId, Arc<InstanceCell>>>,
}

impl ScopedCache {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, slot: SlotId) -> Option<Value> {
        self.cells.read().get(&slot).and_then(|cell| cell.get())
    }

    fn cell(&self, slot: SlotId) -> Arc<InstanceCell> {
        if let Some(cell) = self.cells.read().get(&slot) {
            return cell.clone();
        }
        self.cells.write().entry(slot).or_default().clone()
    }

    pub(crate) fn get_or_try_init<E>(&self, slot: SlotId, init: impl FnOnce() -> Result<Value, E>) -> Result<Value, E> {
        if let Some(value) = self.get(slot) {
            debug!(slot, "Found in scope cache");
            return Ok(value);
        }

        // The map lock is released here, before the slot is initialized
        let cell = self.cell(slot);
        cell.get_or_try_init(init)
    }

    #[inline]
    pub(crate) fn clear(&self) {
        self.cells.write().clear();
    }

    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.cells.read().values().filter(|cell| cell.get().is_some()).count()
    }
}
