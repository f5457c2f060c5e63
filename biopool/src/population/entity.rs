//! A single individual and its per-event pending slots.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::events::EventId;
use crate::traits::TraitValue;

/// Unique identifier of an individual inside its population.
///
/// Ids are handed out by a monotonic counter and never reused, so a stale id
/// held by a queued event can only ever miss, never alias a newborn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether an individual currently takes part in motion-driven events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    /// Moving and interacting normally
    #[default]
    Active,
    /// Paused; velocity is zero until resumed
    Inactive,
}

/// Velocity state of a moving individual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    /// Speed
    pub velocity: f64,
    /// x component of the velocity
    pub vel_x: f64,
    /// y component of the velocity
    pub vel_y: f64,
    /// Heading in radians
    pub angle: f64,
}

impl Motion {
    /// Motion at `velocity` along `angle`.
    pub fn from_heading(velocity: f64, angle: f64) -> Self {
        Self {
            velocity,
            vel_x: angle.cos() * velocity,
            vel_y: angle.sin() * velocity,
            angle,
        }
    }

    /// Turn to `angle`, keeping the speed.
    pub fn set_heading(&mut self, angle: f64) {
        *self = Self::from_heading(self.velocity, angle);
    }

    /// Stop in place, keeping the heading. Returns the motion before stopping.
    pub fn halt(&mut self) -> Motion {
        let before = *self;
        self.velocity = 0.0;
        self.vel_x = 0.0;
        self.vel_y = 0.0;
        before
    }
}

/// A scheduled instance of a primary event for one individual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pending {
    /// Absolute simulation time of the instance
    pub time: f64,
    /// Second individual involved, for pairwise events
    pub extra: Option<EntityId>,
}

impl Pending {
    /// Pending instance without a partner.
    pub fn at(time: f64) -> Self {
        Self { time, extra: None }
    }
}

/// One row of a population.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Identifier, unique within the population
    pub id: EntityId,
    /// x position
    pub x: f64,
    /// y position
    pub y: f64,
    /// Activity status
    pub status: Status,
    /// Velocity, for populations that move
    pub motion: Option<Motion>,
    attributes: BTreeMap<String, TraitValue>,
    pending: BTreeMap<EventId, Pending>,
}

impl Entity {
    /// A new active individual at `(x, y)`.
    pub fn new(id: EntityId, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            status: Status::Active,
            motion: None,
            attributes: BTreeMap::new(),
            pending: BTreeMap::new(),
        }
    }

    /// Whether the individual is active.
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Raw attribute value.
    pub fn attribute(&self, name: &str) -> Option<&TraitValue> {
        self.attributes.get(name)
    }

    /// Numeric attribute value, `None` if absent or categorical.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(TraitValue::as_f64)
    }

    /// Set an attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: TraitValue) {
        self.attributes.insert(name.into(), value);
    }

    /// All attributes, ordered by name.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &TraitValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Velocity components, zero for individuals without motion.
    pub fn velocity(&self) -> (f64, f64) {
        self.motion.map_or((0.0, 0.0), |m| (m.vel_x, m.vel_y))
    }

    /// Pending slot for `event`.
    pub fn pending(&self, event: EventId) -> Option<Pending> {
        self.pending.get(&event).copied()
    }

    /// Write (or clear, with `None`) the pending slot for `event`.
    ///
    /// Non-finite times clear the slot.
    pub fn set_pending(&mut self, event: EventId, pending: Option<Pending>) {
        match pending {
            Some(p) if p.time.is_finite() => {
                self.pending.insert(event, p);
            }
            _ => {
                self.pending.remove(&event);
            }
        }
    }

    /// Number of pending slots.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The earliest pending slot.
    ///
    /// Equal times resolve to the event registered first.
    pub fn next_pending(&self) -> Option<(EventId, Pending)> {
        let mut best: Option<(EventId, Pending)> = None;
        for (&event, &pending) in &self.pending {
            match best {
                Some((_, b)) if b.time <= pending.time => {}
                _ => best = Some((event, pending)),
            }
        }
        best
    }
}
