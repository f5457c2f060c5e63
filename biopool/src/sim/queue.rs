use std::{cmp::Ordering, collections::BinaryHeap};

use crate::error::RejectReason;
use crate::events::EventId;
use crate::population::{EntityId, Motion};

/// Variant-specific data carried by a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Payload {
    /// Nothing beyond actor and extra
    #[default]
    None,
    /// Second half of a pause: the motion to restore
    Resume(Motion),
    /// Recovery from infection
    Recover,
}

/// Parameters handed to an event handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventParams {
    /// Simulation time the instance fires at
    pub current_time: f64,
    /// Individual performing the event
    pub actor: EntityId,
    /// Second individual, for pairwise events
    pub extra: Option<EntityId>,
    /// Variant-specific data
    pub payload: Payload,
}

impl EventParams {
    /// Parameters for `actor` at `current_time`.
    pub fn new(current_time: f64, actor: EntityId) -> Self {
        Self {
            current_time,
            actor,
            extra: None,
            payload: Payload::None,
        }
    }

    /// Same parameters with a partner.
    pub fn with_extra(mut self, extra: Option<EntityId>) -> Self {
        self.extra = extra;
        self
    }

    /// Same parameters with a payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Same parameters acting on someone else.
    pub fn for_actor(mut self, actor: EntityId) -> Self {
        self.actor = actor;
        self
    }
}

/// An event instance produced by a handler, not yet in the queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventInstance {
    /// Absolute simulation time
    pub time: f64,
    /// Event variant to run
    pub event: EventId,
    /// Handler parameters
    pub params: EventParams,
}

impl EventInstance {
    /// Instance of `event` for `actor` at `time`.
    pub fn new(time: f64, event: EventId, actor: EntityId) -> Self {
        Self {
            time,
            event,
            params: EventParams::new(time, actor),
        }
    }

    /// Whether `other` describes the same occurrence: same time, same event,
    /// same parameters.
    pub fn is_repeat_of(&self, other: &EventInstance) -> bool {
        self.time == other.time && self.event == other.event && self.params == other.params
    }

    /// Check the instance can be pushed at clock `now`.
    pub fn validate(&self, now: f64, event_count: usize) -> Result<(), RejectReason> {
        if !self.time.is_finite() {
            return Err(RejectReason::NonFiniteTime(self.time));
        }
        if self.time <= now {
            return Err(RejectReason::NotInFuture {
                time: self.time,
                now,
            });
        }
        if self.event.0 >= event_count {
            return Err(RejectReason::UnknownEvent(self.event.0));
        }
        Ok(())
    }
}

/// An instance placed in the queue.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    instance: EventInstance,
    sequence: u64, // For deterministic ordering
}

impl ScheduledEvent {
    /// Creates a new scheduled event.
    pub fn new(instance: EventInstance, sequence: u64) -> Self {
        Self { instance, sequence }
    }

    /// Returns the scheduled execution time.
    pub fn time(&self) -> f64 {
        self.instance.time
    }

    /// Returns a reference to the instance.
    pub fn instance(&self) -> &EventInstance {
        &self.instance
    }

    /// Insertion sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Consumes the scheduled event and returns the instance.
    pub fn into_instance(self) -> EventInstance {
        self.instance
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap, but we want earliest time first
        // So we reverse the time comparison
        match other.time().total_cmp(&self.time()) {
            Ordering::Equal => {
                // Earlier sequence numbers should be processed first (also reversed for max heap)
                other.sequence.cmp(&self.sequence)
            }
            other => other,
        }
    }
}

/// A priority queue for scheduling events in chronological order.
///
/// Events are processed in time order, with deterministic ordering for events
/// scheduled at the same time using sequence numbers.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
}

impl EventQueue {
    /// Creates a new empty event queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    /// Schedules an event for execution.
    pub fn schedule(&mut self, event: ScheduledEvent) {
        self.heap.push(event);
    }

    /// Removes and returns the earliest scheduled event.
    pub fn pop_earliest(&mut self) -> Option<ScheduledEvent> {
        self.heap.pop()
    }

    /// Returns a reference to the earliest scheduled event without removing it.
    pub fn peek_earliest(&self) -> Option<&ScheduledEvent> {
        self.heap.peek()
    }

    /// Returns `true` if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the number of events in the queue.
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
