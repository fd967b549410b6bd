//! Process-wide correlation table mapping request ids to pending futures.

use std::sync::Arc;

use dashmap::DashMap;

use crate::future::ResponseFuture;

/// Concurrent map from `packet_id` to the future awaiting that response.
///
/// `insert`, `remove`, and `lookup` are linearizable with respect to each
/// other. At most one future per id is visible to dispatch; removal is
/// performed by whichever path resolves the future first — the receive path
/// on response arrival, or the issuing path on deadline expiry. A late or
/// duplicate response finds no entry and is dropped.
#[derive(Default)]
pub struct ResponseTable {
    entries: DashMap<i32, Arc<ResponseFuture>>,
}

impl ResponseTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending future under its correlation id.
    pub fn insert(&self, future: Arc<ResponseFuture>) {
        self.entries.insert(future.packet_id(), future);
    }

    /// Atomically take the future for `packet_id`, if still pending.
    ///
    /// The caller that gets `Some` owns resolution of the future.
    pub fn remove(&self, packet_id: i32) -> Option<Arc<ResponseFuture>> {
        self.entries.remove(&packet_id).map(|(_, future)| future)
    }

    /// Look up the future for `packet_id` without taking ownership.
    pub fn lookup(&self, packet_id: i32) -> Option<Arc<ResponseFuture>> {
        self.entries.get(&packet_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no requests are outstanding.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
