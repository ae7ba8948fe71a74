//! Observer registry and snapshot fan-out.
//!
//! Each snapshot is serialized once and handed to every observer registered
//! at fan-out time. A failed delivery marks that observer broken; it gets no
//! further messages and is dropped when its transport unregisters it.

use crate::event::Snapshot;
use centerout_traits::Observer;
use crossbeam_channel as xch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

struct Slot {
    id: ObserverId,
    observer: Box<dyn Observer>,
    broken: bool,
}

#[derive(Default)]
pub struct BroadcastHub {
    slots: Vec<Slot>,
    next_id: u64,
}

impl core::fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("count", &self.count())
            .field("broken", &self.broken_count())
            .finish()
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Box<dyn Observer>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.insert(id, observer);
        id
    }

    /// Register under an id allocated by the caller.
    pub fn insert(&mut self, id: ObserverId, observer: Box<dyn Observer>) {
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        self.slots.push(Slot {
            id,
            observer,
            broken: false,
        });
        tracing::info!(observer = id.0, count = self.count(), "observer registered");
    }

    /// Returns false when `id` was not registered.
    pub fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|s| s.id != id);
        let removed = self.slots.len() != before;
        if removed {
            tracing::info!(observer = id.0, count = self.count(), "observer unregistered");
        }
        removed
    }

    /// Registered observers, broken ones included.
    pub fn count(&self) -> usize {
        self.slots.len()
    }

    pub fn broken_count(&self) -> usize {
        self.slots.iter().filter(|s| s.broken).count()
    }

    pub fn is_broken(&self, id: ObserverId) -> bool {
        self.slots.iter().any(|s| s.id == id && s.broken)
    }

    /// Deliver `snapshot` to every healthy observer. Returns how many
    /// deliveries succeeded.
    pub fn broadcast(&mut self, snapshot: &Snapshot) -> usize {
        let Some(message) = encode(snapshot) else {
            return 0;
        };
        let mut delivered = 0;
        for slot in self.slots.iter_mut().filter(|s| !s.broken) {
            if deliver(slot, &message) {
                delivered += 1;
            }
        }
        tracing::trace!(delivered, "broadcast");
        delivered
    }

    /// Deliver `snapshot` to one observer only.
    pub fn send_to(&mut self, id: ObserverId, snapshot: &Snapshot) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.id == id && !s.broken) else {
            return false;
        };
        let Some(message) = encode(snapshot) else {
            return false;
        };
        deliver(slot, &message)
    }
}

fn encode(snapshot: &Snapshot) -> Option<String> {
    match snapshot.to_json() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize snapshot");
            None
        }
    }
}

fn deliver(slot: &mut Slot, message: &str) -> bool {
    match slot.observer.deliver(message) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(observer = slot.id.0, error = %e, "observer delivery failed; marking broken");
            slot.broken = true;
            false
        }
    }
}

/// Observer backed by a channel sender; the transport drains the receiver.
/// Delivery never blocks and fails once the receiver is dropped.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: xch::Sender<String>,
}

impl ChannelObserver {
    pub fn new(tx: xch::Sender<String>) -> Self {
        Self { tx }
    }

    /// An observer plus the receiving end of its unbounded queue.
    pub fn pair() -> (Self, xch::Receiver<String>) {
        let (tx, rx) = xch::unbounded();
        (Self::new(tx), rx)
    }
}

impl Observer for ChannelObserver {
    fn deliver(&self, message: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.tx.try_send(message.to_owned()).map_err(Into::into)
    }
}
