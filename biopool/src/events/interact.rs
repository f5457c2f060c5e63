use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::collision::{collision_time, earliest_collision, Body, BodyColumns};
use crate::population::{EntityId, Pending, PopulationId};
use crate::sim::{EventInstance, EventParams, SimContext};

use super::{attr_name, EventRegistry, EventSpec};

/// Slack on the contact distance when the pair is checked at fire time.
const CONTACT_EPS: f64 = 1e-5;

/// Contact between an individual and a member of a partner population.
///
/// The next time is the earliest predicted collision between the actor's
/// disc and any partner disc, assuming straight-line motion. Both discs use
/// the same radius attribute, `<event name>_radius` unless set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractEvent {
    /// Population of the partners; the actor's own population when `None`
    pub partner: Option<PopulationId>,
    /// Attribute holding the interaction radius
    pub radius_attribute: Option<String>,
    /// Leave rescheduling to a trigger when it already filled the slot
    pub trigger_sets_next: bool,
}

impl InteractEvent {
    /// Interaction with members of `partner`.
    pub fn with(partner: PopulationId) -> Self {
        Self {
            partner: Some(partner),
            ..Self::default()
        }
    }

    fn partner_population(&self, spec: &EventSpec) -> PopulationId {
        self.partner.unwrap_or(spec.population)
    }

    pub(crate) fn next_time(
        &self,
        spec: &EventSpec,
        ctx: &mut SimContext,
        actor: EntityId,
        now: f64,
        exclude: Option<EntityId>,
    ) -> Option<Pending> {
        let radius = attr_name(&self.radius_attribute, &spec.name, "_radius");
        let partner_pop = self.partner_population(spec);
        let same = partner_pop == spec.population;

        let me = ctx.population(spec.population)?.get(actor)?;
        if !me.is_active() {
            return None;
        }
        let body = Body::of(me, me.number(&radius)?);

        let mut ids = Vec::new();
        let mut others = BodyColumns::default();
        for e in ctx.population(partner_pop)?.store().iter() {
            if (same && e.id == actor) || Some(e.id) == exclude {
                continue;
            }
            let Some(r) = e.number(&radius) else {
                continue;
            };
            ids.push(e.id);
            others.push(Body::of(e, r));
        }

        let (t, partner) = earliest_collision(&body, &ids, &others)?;
        Some(Pending {
            time: now + t,
            extra: Some(partner),
        })
    }

    /// Fire triggers if the pair still touches, then predict the next
    /// contact while ignoring the partner just met.
    pub(crate) fn handle(
        &self,
        registry: &EventRegistry,
        spec: &EventSpec,
        ctx: &mut SimContext,
        params: &EventParams,
    ) -> Vec<EventInstance> {
        let radius = attr_name(&self.radius_attribute, &spec.name, "_radius");
        let mut out = Vec::new();

        let touching = params
            .extra
            .is_some_and(|partner| self.in_contact(spec, ctx, params.actor, partner, &radius));
        if touching {
            out.extend(registry.fire_triggers(spec, ctx, params));
        } else {
            trace!(event = %spec.name, actor = %params.actor, "no contact");
        }

        if spec.is_primary {
            let slot_empty = ctx
                .population(spec.population)
                .and_then(|p| p.get(params.actor))
                .is_some_and(|e| e.pending(spec.id).is_none());
            if !self.trigger_sets_next || slot_empty {
                registry.set_next(ctx, spec.id, params.actor, params.current_time, params.extra);
            }
        }
        out
    }

    fn in_contact(
        &self,
        spec: &EventSpec,
        ctx: &SimContext,
        actor: EntityId,
        partner: EntityId,
        radius: &str,
    ) -> bool {
        let Some(a) = ctx.population(spec.population).and_then(|p| p.get(actor)) else {
            return false;
        };
        let Some(b) = ctx
            .population(self.partner_population(spec))
            .and_then(|p| p.get(partner))
        else {
            return false;
        };
        if !a.is_active() {
            return false;
        }
        match (a.number(radius), b.number(radius)) {
            (Some(ra), Some(rb)) => (a.x - b.x).hypot(a.y - b.y) <= ra + rb + CONTACT_EPS,
            _ => false,
        }
    }

    /// Offer `newcomer`, just added to the partner population, to every
    /// individual of this event. Those that would meet it before their
    /// current pending contact take it as their new partner; entries are
    /// returned for the ones whose earliest pending event changed.
    pub(crate) fn introduce(
        &self,
        spec: &EventSpec,
        ctx: &mut SimContext,
        newcomer: EntityId,
        now: f64,
    ) -> Vec<EventInstance> {
        if !spec.is_primary {
            return Vec::new();
        }
        let radius = attr_name(&self.radius_attribute, &spec.name, "_radius");
        let partner_pop = self.partner_population(spec);
        let same = partner_pop == spec.population;

        let Some(target) = ctx
            .population(partner_pop)
            .and_then(|p| p.get(newcomer))
            .and_then(|e| Some(Body::of(e, e.number(&radius)?)))
        else {
            return Vec::new();
        };
        let Some(pop) = ctx.population_mut(spec.population) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for id in pop.store().ids() {
            if same && id == newcomer {
                continue;
            }
            let Some(e) = pop.get_mut(id) else {
                continue;
            };
            if !e.is_active() {
                continue;
            }
            let Some(r) = e.number(&radius) else {
                continue;
            };
            let Some(t) = collision_time(&Body::of(e, r), &target) else {
                continue;
            };
            let time = now + t;
            if time <= now || e.pending(spec.id).is_some_and(|p| p.time <= time) {
                continue;
            }
            e.set_pending(
                spec.id,
                Some(Pending {
                    time,
                    extra: Some(newcomer),
                }),
            );
            if e.next_pending().is_some_and(|(event, _)| event == spec.id) {
                out.extend(pop.next_event_for(id));
            }
        }
        out
    }
}
