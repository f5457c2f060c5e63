//! Event variants and their dispatch.
//!
//! Every event has two operations: compute the next time an individual
//! performs it, and handle an occurrence. Primary events keep one pending
//! slot per individual; secondary events only exist as queue entries, either
//! created by other handlers or run directly through triggers.

mod birth;
mod death;
mod infection;
mod interact;
mod pause;
mod rotate;
mod trigger;
mod wall;

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::population::{EntityId, Pending, PopulationId};
use crate::sim::{EventInstance, EventParams, SimContext};

pub use birth::{BirthEvent, Placement};
pub use death::DeathEvent;
pub use infection::{InfectionEvent, INFECTED, RECOVERED, SUSCEPTIBLE};
pub use interact::InteractEvent;
pub use pause::PauseEvent;
pub use rotate::RotateEvent;
pub use trigger::{Target, Trigger, TriggerFn};
pub use wall::{Bounce, WallEvent};

/// Index of an event in its registry, in registration order.
///
/// Registration order is also the tie-break between equal pending times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub usize);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of event behaviours.
#[derive(Debug, Clone)]
pub enum EventKind {
    /// Asexual reproduction
    Birth(BirthEvent),
    /// Removal
    Death(DeathEvent),
    /// Pairwise contact between discs
    Interact(InteractEvent),
    /// Bounce off the domain boundary
    Wall(WallEvent),
    /// Stop for a while, then resume
    Pause(PauseEvent),
    /// Turn toward the nearest attractor
    Rotate(RotateEvent),
    /// SIR status change on contact
    Infection(InfectionEvent),
}

impl EventKind {
    /// Short lowercase label.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Birth(_) => "birth",
            EventKind::Death(_) => "death",
            EventKind::Interact(_) => "interact",
            EventKind::Wall(_) => "wall",
            EventKind::Pause(_) => "pause",
            EventKind::Rotate(_) => "rotate",
            EventKind::Infection(_) => "infection",
        }
    }

    /// Whether the next time depends on current velocities.
    pub fn depends_on_motion(&self) -> bool {
        matches!(self, EventKind::Interact(_) | EventKind::Wall(_))
    }
}

/// A registered event.
#[derive(Debug, Clone)]
pub struct EventSpec {
    /// Registry index
    pub id: EventId,
    /// Unique name, also the prefix of derived attribute names
    pub name: String,
    /// Population performing the event
    pub population: PopulationId,
    /// Whether individuals keep a pending slot for it
    pub is_primary: bool,
    /// Follow-ups run when the event fires
    pub triggers: Vec<Trigger>,
    /// Behaviour
    pub kind: EventKind,
}

/// `explicit` if set, otherwise `<event name><suffix>`.
pub(crate) fn attr_name<'a>(explicit: &'a Option<String>, event: &str, suffix: &str) -> Cow<'a, str> {
    match explicit {
        Some(name) => Cow::Borrowed(name.as_str()),
        None => Cow::Owned(format!("{event}{suffix}")),
    }
}

/// Exponential waiting time from an individual's rate attribute.
pub(crate) fn rate_next(
    ctx: &mut SimContext,
    population: PopulationId,
    actor: EntityId,
    attribute: &str,
    now: f64,
) -> Option<Pending> {
    let rate = ctx.population(population)?.get(actor)?.number(attribute)?;
    let wait = ctx.rng.exponential(rate)?;
    Some(Pending::at(now + wait))
}

/// All events of a world.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    events: Vec<EventSpec>,
}

impl EventRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event; its id is its position.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        population: PopulationId,
        is_primary: bool,
        kind: EventKind,
    ) -> EventId {
        let id = EventId(self.events.len());
        self.events.push(EventSpec {
            id,
            name: name.into(),
            population,
            is_primary,
            triggers: Vec::new(),
            kind,
        });
        id
    }

    /// Attach a trigger to `event`. Returns `false` for an unknown event.
    pub fn add_trigger(&mut self, event: EventId, trigger: Trigger) -> bool {
        match self.events.get_mut(event.0) {
            Some(spec) => {
                spec.triggers.push(trigger);
                true
            }
            None => false,
        }
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no event is registered.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Look up an event.
    pub fn get(&self, id: EventId) -> Option<&EventSpec> {
        self.events.get(id.0)
    }

    /// Events in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, EventSpec> {
        self.events.iter()
    }

    /// Find an event by name.
    pub fn find(&self, name: &str) -> Option<EventId> {
        self.events.iter().find(|e| e.name == name).map(|e| e.id)
    }

    /// When `actor` next performs `event`, `None` for never.
    ///
    /// `exclude` names a partner that must not be picked again (pairwise
    /// events only).
    pub fn next_time(
        &self,
        ctx: &mut SimContext,
        event: EventId,
        actor: EntityId,
        now: f64,
        exclude: Option<EntityId>,
    ) -> Option<Pending> {
        let spec = self.get(event)?;
        match &spec.kind {
            EventKind::Birth(e) => e.next_time(spec, ctx, actor, now),
            EventKind::Death(e) => e.next_time(spec, ctx, actor, now),
            EventKind::Interact(e) => e.next_time(spec, ctx, actor, now, exclude),
            EventKind::Wall(e) => e.next_time(spec, ctx, actor, now),
            EventKind::Rotate(e) => e.next_time(spec, ctx, actor, now),
            EventKind::Pause(_) | EventKind::Infection(_) => None,
        }
    }

    /// Recompute and store the pending slot of a primary event.
    ///
    /// Times not strictly after `now` clear the slot, so a slot can never
    /// point into the past.
    pub fn set_next(
        &self,
        ctx: &mut SimContext,
        event: EventId,
        actor: EntityId,
        now: f64,
        exclude: Option<EntityId>,
    ) {
        let Some(spec) = self.get(event) else {
            return;
        };
        if !spec.is_primary {
            return;
        }
        let pending = self
            .next_time(ctx, event, actor, now, exclude)
            .filter(|p| p.time > now);
        if let Some(entity) = ctx
            .population_mut(spec.population)
            .and_then(|pop| pop.get_mut(actor))
        {
            entity.set_pending(event, pending);
        }
    }

    /// Compute every primary event of a freshly created individual.
    pub fn init_individual(
        &self,
        ctx: &mut SimContext,
        population: PopulationId,
        actor: EntityId,
        now: f64,
    ) {
        let primaries = match ctx.population(population) {
            Some(pop) => pop.primary_events().to_vec(),
            None => return,
        };
        for event in primaries {
            self.set_next(ctx, event, actor, now, None);
        }
    }

    /// Recompute the motion-dependent primary events of an individual after
    /// its velocity changed.
    pub fn refresh_motion_events(
        &self,
        ctx: &mut SimContext,
        population: PopulationId,
        actor: EntityId,
        now: f64,
    ) {
        let primaries = match ctx.population(population) {
            Some(pop) => pop.primary_events().to_vec(),
            None => return,
        };
        for event in primaries {
            if self.get(event).is_some_and(|e| e.kind.depends_on_motion()) {
                self.set_next(ctx, event, actor, now, None);
            }
        }
    }

    /// Set the first pending slot of every primary event for every
    /// individual.
    pub fn initialize(&self, ctx: &mut SimContext, now: f64) {
        for spec in self.events.iter().filter(|e| e.is_primary) {
            let ids = match ctx.population(spec.population) {
                Some(pop) => pop.store().ids(),
                None => continue,
            };
            for id in ids {
                self.set_next(ctx, spec.id, id, now, None);
            }
        }
    }

    /// Run one occurrence of `event` and return the entries it produces.
    ///
    /// A missing actor is a silent no-op.
    pub fn handle(
        &self,
        ctx: &mut SimContext,
        event: EventId,
        params: EventParams,
    ) -> Vec<EventInstance> {
        let Some(spec) = self.get(event) else {
            return Vec::new();
        };
        let alive = ctx
            .population(spec.population)
            .is_some_and(|p| p.contains(params.actor));
        if !alive {
            trace!(event = %spec.name, actor = %params.actor, "actor gone");
            return Vec::new();
        }
        match &spec.kind {
            EventKind::Birth(e) => e.handle(self, spec, ctx, &params),
            EventKind::Death(e) => e.handle(self, spec, ctx, &params),
            EventKind::Interact(e) => e.handle(self, spec, ctx, &params),
            EventKind::Wall(e) => e.handle(self, spec, ctx, &params),
            EventKind::Pause(e) => e.handle(self, spec, ctx, &params),
            EventKind::Rotate(e) => e.handle(self, spec, ctx, &params),
            EventKind::Infection(e) => e.handle(self, spec, ctx, &params),
        }
    }

    /// Run every trigger of `spec` with `params`, in attachment order.
    pub(crate) fn fire_triggers(
        &self,
        spec: &EventSpec,
        ctx: &mut SimContext,
        params: &EventParams,
    ) -> Vec<EventInstance> {
        let mut out = Vec::new();
        for trigger in &spec.triggers {
            out.extend(trigger.fire(self, ctx, params));
        }
        out
    }
}
