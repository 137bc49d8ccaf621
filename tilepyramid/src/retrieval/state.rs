//! Per-address request state.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{broadcast, Notify};

use super::error::RetrievalError;
use crate::cache::CacheEntry;
use crate::tile::TileAddress;

/// Lifecycle state of a tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    NotRequested,
    Queued,
    InFlight,
    Succeeded,
    Failed,
}

pub(crate) type Outcome = Result<Arc<CacheEntry>, RetrievalError>;

struct Slot {
    state: RequestState,
    sender: broadcast::Sender<Outcome>,
}

/// Result of claiming an address.
pub(crate) enum Claim {
    /// The caller owns the fetch and must `complete` or `release` it.
    Owner,
    /// A fetch is already pending; its outcome arrives on the receiver.
    Pending(broadcast::Receiver<Outcome>),
}

/// Addresses that are queued or in flight.
///
/// Each address maps to at most one slot; slot transitions happen under the
/// map's shard lock so they are never observed out of order.
#[derive(Default)]
pub(crate) struct InFlightTable {
    slots: DashMap<TileAddress, Slot>,
    idle: Notify,
}

impl InFlightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `address` in `state` unless it is already pending.
    pub fn claim(&self, address: &TileAddress, state: RequestState) -> Claim {
        match self.slots.entry(address.clone()) {
            Entry::Occupied(slot) => Claim::Pending(slot.get().sender.subscribe()),
            Entry::Vacant(vacant) => {
                let (sender, _) = broadcast::channel(1);
                vacant.insert(Slot { state, sender });
                Claim::Owner
            }
        }
    }

    /// `Queued -> InFlight`.
    pub fn mark_in_flight(&self, address: &TileAddress) {
        if let Some(mut slot) = self.slots.get_mut(address) {
            slot.state = RequestState::InFlight;
        }
    }

    /// Removes the slot and delivers `outcome` to every waiter.
    pub fn complete(&self, address: &TileAddress, outcome: Outcome) {
        if let Some((_, slot)) = self.slots.remove(address) {
            // No receivers is the common case for async requests.
            let _ = slot.sender.send(outcome);
        }
        self.notify_if_idle();
    }

    /// Removes the slot without an outcome; waiters see the channel close.
    pub fn release(&self, address: &TileAddress) {
        self.slots.remove(address);
        self.notify_if_idle();
    }

    /// Drops every slot.
    pub fn clear(&self) {
        self.slots.clear();
        self.idle.notify_waiters();
    }

    pub fn state(&self, address: &TileAddress) -> Option<RequestState> {
        self.slots.get(address).map(|slot| slot.state)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Waits until no address is queued or in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.slots.is_empty() {
                return;
            }
            notified.await;
        }
    }

    fn notify_if_idle(&self) {
        if self.slots.is_empty() {
            self.idle.notify_waiters();
        }
    }
}

/// Releases a claimed slot if its owner is dropped before completing it.
pub(crate) struct ClaimGuard<'a> {
    table: &'a InFlightTable,
    address: &'a TileAddress,
    armed: bool,
}

impl<'a> ClaimGuard<'a> {
    pub fn new(table: &'a InFlightTable, address: &'a TileAddress) -> Self {
        Self {
            table,
            address,
            armed: true,
        }
    }

    pub fn complete(mut self, outcome: Outcome) {
        self.armed = false;
        self.table.complete(self.address, outcome);
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.table.release(self.address);
        }
    }
}
