use rustc_hash::FxHashMap;

/// Stable handle for a registered waiter. The consumer holds only this id;
/// the registry owns the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterId(u64);

pub(crate) type WaiterCallback = Box<dyn FnOnce() + Send>;

/// Owned set of consumers awaiting session resolution.
///
/// Membership is a set: ids are never reused, so a waiter cannot be
/// registered twice under the same id, and removal is permanent.
#[derive(Default)]
pub(crate) struct WaiterRegistry {
    next_id: u64,
    waiters: FxHashMap<u64, WaiterCallback>,
}

impl WaiterRegistry {
    pub(crate) fn insert(&mut self, callback: WaiterCallback) -> WaiterId {
        let id = self.next_id;
        self.next_id += 1;
        self.waiters.insert(id, callback);
        WaiterId(id)
    }

    /// Idempotent; once removed, a waiter can never be notified.
    pub(crate) fn remove(&mut self, id: WaiterId) {
        self.waiters.remove(&id.0);
    }

    pub(crate) fn take(&mut self, id: WaiterId) -> Option<WaiterCallback> {
        self.waiters.remove(&id.0)
    }

    /// Snapshot of the ids present right now; this is the drain pass
    /// boundary — entries added afterwards belong to the next pass.
    pub(crate) fn pass_ids(&self) -> Vec<WaiterId> {
        self.waiters.keys().copied().map(WaiterId).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }
}
