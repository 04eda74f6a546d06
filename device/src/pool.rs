use crate::error::{EventPoolExhaustedSnafu, Result};
use crate::event::EventKind;

/// Default number of in-flight event slots per queue.
pub const DEFAULT_EVENT_WINDOW: usize = 1024;

/// Bounded, reusable registry of device event slots.
///
/// Slots are handed out on registration and must be explicitly released once
/// the event's result has been consumed; released slots are reused for later
/// operations. Handles are monotonic and never reused, so a stale handle
/// cannot alias a newer event that recycled its slot.
#[derive(Debug, Clone)]
pub struct EventPool {
    kinds: Vec<Option<EventKind>>,
    handles: Vec<u64>,
    free: Vec<usize>,
    capacity: usize,
    next_handle: u64,
}

impl EventPool {
    pub fn new(capacity: usize) -> Self {
        Self { kinds: Vec::new(), handles: Vec::new(), free: Vec::new(), capacity, next_handle: 1 }
    }

    /// Claim a slot for a new event and mint its handle.
    pub fn register(&mut self, kind: EventKind) -> Result<(usize, u64)> {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None if self.kinds.len() < self.capacity => {
                self.kinds.push(None);
                self.handles.push(0);
                self.kinds.len() - 1
            }
            None => return EventPoolExhaustedSnafu { capacity: self.capacity }.fail(),
        };

        let handle = self.next_handle;
        self.next_handle += 1;
        self.kinds[slot] = Some(kind);
        self.handles[slot] = handle;
        Ok((slot, handle))
    }

    /// Return a slot to the pool. Releasing an empty or out-of-range slot is
    /// a no-op.
    pub fn release(&mut self, slot: usize) {
        if let Some(kind) = self.kinds.get_mut(slot) {
            if kind.take().is_some() {
                self.free.push(slot);
            }
        }
    }

    /// Kind registered in a slot, if the slot is live.
    pub fn kind(&self, slot: usize) -> Option<EventKind> {
        self.kinds.get(slot).copied().flatten()
    }

    /// Driver handle minted for a slot, if the slot is live.
    pub fn handle(&self, slot: usize) -> Option<u64> {
        if self.kind(slot).is_some() { self.handles.get(slot).copied() } else { None }
    }

    pub fn in_use(&self) -> usize {
        self.kinds.iter().filter(|kind| kind.is_some()).count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
