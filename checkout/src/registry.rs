use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use payflow_common::payment::ReferenceId;

/// Process-wide record of payments with a submission in flight.
///
/// Two checkouts opened for the same reference id (two dialogs, two tabs of
/// the same app) share one registry, so only one of them can submit at a time.
#[derive(Clone, Debug, Default)]
pub struct InFlightRegistry {
    claims: Arc<DashMap<ReferenceId, u64>>,
    next: Arc<AtomicU64>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `reference_id`. Returns `None` if it is already claimed.
    pub fn claim(&self, reference_id: &ReferenceId) -> Option<InFlightGuard> {
        let token = self.next.fetch_add(1, Ordering::Relaxed);
        match self.claims.entry(reference_id.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(token);
                Some(InFlightGuard {
                    claims: Arc::clone(&self.claims),
                    reference_id: reference_id.clone(),
                    token,
                })
            }
        }
    }

    pub fn is_in_flight(&self, reference_id: &ReferenceId) -> bool {
        self.claims.contains_key(reference_id)
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// Releases its claim on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    claims: Arc<DashMap<ReferenceId, u64>>,
    reference_id: ReferenceId,
    token: u64,
}

impl InFlightGuard {
    pub fn reference_id(&self) -> &ReferenceId {
        &self.reference_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.claims
            .remove_if(&self.reference_id, |_, token| *token == self.token);
    }
}
