//! Typed routing events with per-kind ring buffers.
//!
//! Interface nodes emit events while they tick; [`EventBus::deliver`] hands
//! them to passive listeners at the end of a network step and clears the
//! buffers. Suppressed kinds are never buffered.

use crate::id::{ItemTypeId, Position, Ticks};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Why a transfer attempt ended without committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// No target accepted any of the extracted stacks.
    Rejected,
    /// The source yielded a different amount than was distributed.
    Inconsistent { expected: u32, extracted: u32 },
}

/// A routing event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingEvent {
    TransferCommitted {
        node: Position,
        source: Position,
        item_type: ItemTypeId,
        quantity: u32,
        /// Number of targets that received part of the stack.
        targets: u32,
        boosted: bool,
        tick: Ticks,
    },
    TransferAborted {
        node: Position,
        source: Position,
        reason: AbortReason,
        tick: Ticks,
    },
    TargetsRebuilt {
        node: Position,
        fingerprint: u64,
        count: usize,
        tick: Ticks,
    },
    BoostConsumed {
        node: Position,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TransferCommitted,
    TransferAborted,
    TargetsRebuilt,
    BoostConsumed,
}

const EVENT_KIND_COUNT: usize = 4;

impl RoutingEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RoutingEvent::TransferCommitted { .. } => EventKind::TransferCommitted,
            RoutingEvent::TransferAborted { .. } => EventKind::TransferAborted,
            RoutingEvent::TargetsRebuilt { .. } => EventKind::TargetsRebuilt,
            RoutingEvent::BoostConsumed { .. } => EventKind::BoostConsumed,
        }
    }

    pub fn node(&self) -> Position {
        match self {
            RoutingEvent::TransferCommitted { node, .. }
            | RoutingEvent::TransferAborted { node, .. }
            | RoutingEvent::TargetsRebuilt { node, .. }
            | RoutingEvent::BoostConsumed { node, .. } => *node,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer -- pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer; when full, the oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<RoutingEvent>>,
    head: usize,
    len: usize,
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: RoutingEvent) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of events lost because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &RoutingEvent> + '_ {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        (0..self.len).filter_map(move |i| self.events[(start + i) % self.capacity()].as_ref())
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&RoutingEvent)>;

/// One ring buffer and listener list per event kind.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<PassiveListener>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            default_capacity,
        }
    }

    /// Suppressed kinds are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    pub fn emit(&mut self, event: RoutingEvent) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.listeners[kind.index()].push(listener);
    }

    /// Buffered, not yet delivered events of one kind.
    pub fn pending(&self, kind: EventKind) -> impl Iterator<Item = &RoutingEvent> + '_ {
        self.buffers[kind.index()].iter().flat_map(|b| b.iter())
    }

    pub fn pending_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()].as_ref().map_or(0, |b| b.len())
    }

    /// Call listeners in registration order for each buffered event,
    /// oldest first, then clear the buffers.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            for event in buffer.iter() {
                for listener in &mut self.listeners[idx] {
                    listener(event);
                }
            }
            buffer.clear();
        }
    }
}
