use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::record::PostingId;

/// Append-only set of posting ids that were already captured.
///
/// Besides the recorded ids the ledger tracks ids whose detail fetch is in
/// flight, so that `claim` is an atomic check-and-set: two concurrent fetches
/// can never run for the same id.
#[derive(Debug, Default)]
pub struct DedupLedger {
    state: Mutex<LedgerState>,
}

#[derive(Debug, Default)]
struct LedgerState {
    recorded: HashSet<PostingId>,
    in_flight: HashSet<PostingId>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = PostingId>,
    {
        let ledger = Self::new();
        ledger.lock().recorded.extend(ids);
        ledger
    }

    pub fn contains(&self, id: &PostingId) -> bool {
        self.lock().recorded.contains(id)
    }

    /// Idempotent, returns `true` when the id was not recorded yet.
    pub fn record(&self, id: PostingId) -> bool {
        self.lock().recorded.insert(id)
    }

    pub fn len(&self) -> usize {
        self.lock().recorded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserves `id` for fetching unless it is recorded or already claimed.
    ///
    /// The reservation is released when the returned [`Claim`] is dropped
    /// without being committed.
    pub fn claim(&self, id: &PostingId) -> Option<Claim<'_>> {
        let mut state = self.lock();
        if state.recorded.contains(id) || !state.in_flight.insert(id.clone()) {
            return None;
        }
        Some(Claim {
            ledger: self,
            id: id.clone(),
            committed: false,
        })
    }

    pub fn snapshot(&self) -> HashSet<PostingId> {
        self.lock().recorded.clone()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct Claim<'a> {
    ledger: &'a DedupLedger,
    id: PostingId,
    committed: bool,
}

impl Claim<'_> {
    pub fn id(&self) -> &PostingId {
        &self.id
    }

    /// Moves the id from in flight to recorded.
    pub fn commit(mut self) {
        let mut state = self.ledger.lock();
        state.in_flight.remove(&self.id);
        state.recorded.insert(self.id.clone());
        self.committed = true;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.ledger.lock().in_flight.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_idempotent() {
        let ledger = DedupLedger::new();
        assert!(ledger.record("a1".into()));
        assert!(!ledger.record("a1".into()));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains(&"a1".into()));
    }

    #[test]
    fn claim_is_exclusive_until_released() {
        let ledger = DedupLedger::new();
        let id = PostingId::from("x9");

        let claim = ledger.claim(&id).unwrap();
        assert!(ledger.claim(&id).is_none());
        assert!(!ledger.contains(&id));

        drop(claim);
        let claim = ledger.claim(&id).unwrap();
        claim.commit();

        assert!(ledger.contains(&id));
        assert!(ledger.claim(&id).is_none());
    }

    #[test]
    fn seeded_ids_cannot_be_claimed() {
        let ledger = DedupLedger::seeded(["abc123".into(), "def456".into()]);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.claim(&"abc123".into()).is_none());
        assert!(ledger.claim(&"zzz000".into()).is_some());
    }
}
