use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::population::{Motion, Status};
use crate::sim::{EventInstance, EventParams, Payload, SimContext};

use super::{attr_name, EventId, EventRegistry, EventSpec};

/// Temporary stop.
///
/// Handling it halts the actor, marks it inactive and queues its own second
/// half `duration` later, carrying the motion to restore. Always secondary:
/// it is started by a trigger or another handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PauseEvent {
    /// Attribute holding the pause length; the event name when unset
    pub duration_attribute: Option<String>,
    /// Primary events cleared while paused and redrawn on resume
    pub suspends: Vec<EventId>,
}

impl PauseEvent {
    /// Pause that suspends `events`.
    pub fn suspending(events: impl IntoIterator<Item = EventId>) -> Self {
        Self {
            suspends: events.into_iter().collect(),
            ..Self::default()
        }
    }

    pub(crate) fn handle(
        &self,
        registry: &EventRegistry,
        spec: &EventSpec,
        ctx: &mut SimContext,
        params: &EventParams,
    ) -> Vec<EventInstance> {
        match params.payload {
            Payload::Resume(motion) => self.resume(registry, spec, ctx, params, motion),
            _ => self.pause(spec, ctx, params),
        }
    }

    fn pause(&self, spec: &EventSpec, ctx: &mut SimContext, params: &EventParams) -> Vec<EventInstance> {
        let now = params.current_time;
        let duration_attr = attr_name(&self.duration_attribute, &spec.name, "");
        let Some(pop) = ctx.population_mut(spec.population) else {
            return Vec::new();
        };
        let Some(e) = pop.get_mut(params.actor) else {
            return Vec::new();
        };
        if !e.is_active() {
            return Vec::new();
        }
        let duration = match e.number(&duration_attr) {
            Some(d) if d > 0.0 => d,
            _ => return Vec::new(),
        };

        let saved = match e.motion.as_mut() {
            Some(m) => m.halt(),
            None => Motion::from_heading(0.0, 0.0),
        };
        e.status = Status::Inactive;
        for event in &self.suspends {
            e.set_pending(*event, None);
        }
        debug!(actor = %params.actor, until = now + duration, "paused");

        let resume = EventParams::new(now + duration, params.actor).with_payload(Payload::Resume(saved));
        let mut out = vec![EventInstance {
            time: now + duration,
            event: spec.id,
            params: resume,
        }];
        out.extend(pop.next_event_for(params.actor));
        out
    }

    fn resume(
        &self,
        registry: &EventRegistry,
        spec: &EventSpec,
        ctx: &mut SimContext,
        params: &EventParams,
        saved: Motion,
    ) -> Vec<EventInstance> {
        let now = params.current_time;
        let Some(e) = ctx
            .population_mut(spec.population)
            .and_then(|p| p.get_mut(params.actor))
        else {
            return Vec::new();
        };
        if let Some(m) = e.motion.as_mut() {
            *m = saved;
        }
        e.status = Status::Active;
        debug!(actor = %params.actor, "resumed");

        for event in &self.suspends {
            registry.set_next(ctx, *event, params.actor, now, None);
        }
        registry.refresh_motion_events(ctx, spec.population, params.actor, now);

        let mut out: Vec<EventInstance> = ctx
            .population(spec.population)
            .and_then(|p| p.next_event_for(params.actor))
            .into_iter()
            .collect();
        out.extend(registry.fire_triggers(spec, ctx, &params.with_payload(Payload::None)));
        out
    }
}
