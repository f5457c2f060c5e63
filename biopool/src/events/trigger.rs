use std::fmt;
use std::sync::Arc;

use crate::sim::{EventInstance, EventParams, Payload, SimContext};

use super::{EventId, EventKind, EventRegistry};

/// Closure run as a trigger.
pub type TriggerFn = Arc<dyn Fn(&mut SimContext, &EventParams) -> Vec<EventInstance> + Send + Sync>;

/// Which individual of the firing event a trigger acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The actor of the firing event
    Actor,
    /// The partner (`extra`) of the firing event; the actor becomes the
    /// partner of the triggered one
    Extra,
}

impl Target {
    fn resolve(self, params: &EventParams) -> Option<EventParams> {
        match self {
            Target::Actor => Some(params.with_payload(Payload::None)),
            Target::Extra => params.extra.map(|extra| EventParams {
                current_time: params.current_time,
                actor: extra,
                extra: Some(params.actor),
                payload: Payload::None,
            }),
        }
    }
}

/// Follow-up work attached to an event, run when it fires.
#[derive(Clone)]
pub enum Trigger {
    /// Handle another event right away
    Handle {
        /// Event to handle
        event: EventId,
        /// Who performs it
        target: Target,
    },
    /// Recompute a primary event's pending slot and queue the target's next
    /// event
    Reschedule {
        /// Primary event to recompute
        event: EventId,
        /// Whose slot
        target: Target,
    },
    /// The actor just appeared in the partner population of an interaction:
    /// give every individual of that interaction a chance to meet it sooner
    InteractWithNewcomer {
        /// Interaction event to update
        event: EventId,
    },
    /// Arbitrary callback
    Custom(TriggerFn),
}

impl Trigger {
    /// Handle `event` as `target`.
    pub fn handle(event: EventId, target: Target) -> Self {
        Trigger::Handle { event, target }
    }

    /// Reschedule `event` for `target`.
    pub fn reschedule(event: EventId, target: Target) -> Self {
        Trigger::Reschedule { event, target }
    }

    /// Wrap a closure.
    pub fn custom(
        f: impl Fn(&mut SimContext, &EventParams) -> Vec<EventInstance> + Send + Sync + 'static,
    ) -> Self {
        Trigger::Custom(Arc::new(f))
    }

    /// Events this trigger refers to.
    pub(crate) fn event(&self) -> Option<EventId> {
        match self {
            Trigger::Handle { event, .. }
            | Trigger::Reschedule { event, .. }
            | Trigger::InteractWithNewcomer { event } => Some(*event),
            Trigger::Custom(_) => None,
        }
    }

    pub(crate) fn fire(
        &self,
        registry: &EventRegistry,
        ctx: &mut SimContext,
        params: &EventParams,
    ) -> Vec<EventInstance> {
        match self {
            Trigger::Handle { event, target } => {
                let Some(p) = target.resolve(params) else {
                    return Vec::new();
                };
                let mut out = registry.handle(ctx, *event, p);
                // a primary event handled out of band moved its slot
                if let Some(spec) = registry.get(*event).filter(|s| s.is_primary) {
                    out.extend(
                        ctx.population(spec.population)
                            .and_then(|pop| pop.next_event_for(p.actor)),
                    );
                }
                out
            }
            Trigger::Reschedule { event, target } => {
                let Some(p) = target.resolve(params) else {
                    return Vec::new();
                };
                let Some(spec) = registry.get(*event) else {
                    return Vec::new();
                };
                registry.set_next(ctx, *event, p.actor, p.current_time, p.extra);
                ctx.population(spec.population)
                    .and_then(|pop| pop.next_event_for(p.actor))
                    .into_iter()
                    .collect()
            }
            Trigger::InteractWithNewcomer { event } => match registry.get(*event) {
                Some(spec) => match &spec.kind {
                    EventKind::Interact(interact) => {
                        interact.introduce(spec, ctx, params.actor, params.current_time)
                    }
                    _ => Vec::new(),
                },
                None => Vec::new(),
            },
            Trigger::Custom(f) => f(ctx, params),
        }
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Handle { event, target } => f
                .debug_struct("Handle")
                .field("event", event)
                .field("target", target)
                .finish(),
            Trigger::Reschedule { event, target } => f
                .debug_struct("Reschedule")
                .field("event", event)
                .field("target", target)
                .finish(),
            Trigger::InteractWithNewcomer { event } => f
                .debug_struct("InteractWithNewcomer")
                .field("event", event)
                .finish(),
            Trigger::Custom(_) => f.debug_tuple("Custom").field(&"<closure>").finish(),
        }
    }
}
