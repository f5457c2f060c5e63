use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::population::{attr, EntityId, PopulationId};
use crate::sim::{EventInstance, EventParams, Payload, SimContext};
use crate::traits::TraitValue;

use super::{attr_name, EventRegistry, EventSpec};

/// Not yet infected.
pub const SUSCEPTIBLE: &str = "susceptible";
/// Infected and contagious.
pub const INFECTED: &str = "infected";
/// Recovered and immune.
pub const RECOVERED: &str = "recovered";

/// SIR transmission between two individuals of the same population.
///
/// Handled with a partner in `extra`, usually from an interaction trigger: a
/// susceptible individual meeting an infected one becomes infected and gets
/// a recovery entry at an exponential time. The recovery entry carries
/// [`Payload::Recover`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfectionEvent {
    /// Categorical attribute holding the SIR status; the event name when unset
    pub status_attribute: Option<String>,
    /// Attribute holding the recovery rate
    pub recovery_rate_attribute: String,
}

impl Default for InfectionEvent {
    fn default() -> Self {
        Self {
            status_attribute: None,
            recovery_rate_attribute: attr::RECOVERY_RATE.to_string(),
        }
    }
}

fn status_of(ctx: &SimContext, pop: PopulationId, id: EntityId, attribute: &str) -> Option<&'static str> {
    match ctx.population(pop)?.get(id)?.attribute(attribute)?.as_category()? {
        SUSCEPTIBLE => Some(SUSCEPTIBLE),
        INFECTED => Some(INFECTED),
        RECOVERED => Some(RECOVERED),
        _ => None,
    }
}

impl InfectionEvent {
    pub(crate) fn handle(
        &self,
        registry: &EventRegistry,
        spec: &EventSpec,
        ctx: &mut SimContext,
        params: &EventParams,
    ) -> Vec<EventInstance> {
        let status = attr_name(&self.status_attribute, &spec.name, "");
        let actor = params.actor;

        if params.payload == Payload::Recover {
            if status_of(ctx, spec.population, actor, &status) == Some(INFECTED) {
                self.set_status(ctx, spec.population, actor, &status, RECOVERED);
                debug!(actor = %actor, time = params.current_time, "recovered");
            }
            return Vec::new();
        }

        let Some(partner) = params.extra else {
            return Vec::new();
        };
        let newly = match (
            status_of(ctx, spec.population, actor, &status),
            status_of(ctx, spec.population, partner, &status),
        ) {
            (Some(SUSCEPTIBLE), Some(INFECTED)) => actor,
            (Some(INFECTED), Some(SUSCEPTIBLE)) => partner,
            _ => return Vec::new(),
        };

        self.set_status(ctx, spec.population, newly, &status, INFECTED);
        let source = if newly == actor { partner } else { actor };
        debug!(infected = %newly, by = %source, "infection");

        let mut out = Vec::new();
        let rate = ctx
            .population(spec.population)
            .and_then(|p| p.get(newly))
            .and_then(|e| e.number(&self.recovery_rate_attribute));
        if let Some(wait) = rate.and_then(|r| ctx.rng.exponential(r)) {
            let time = params.current_time + wait;
            out.push(EventInstance {
                time,
                event: spec.id,
                params: EventParams::new(time, newly).with_payload(Payload::Recover),
            });
        }
        out.extend(registry.fire_triggers(spec, ctx, params));
        out
    }

    fn set_status(
        &self,
        ctx: &mut SimContext,
        pop: PopulationId,
        id: EntityId,
        attribute: &str,
        value: &str,
    ) {
        if let Some(e) = ctx.population_mut(pop).and_then(|p| p.get_mut(id)) {
            e.set_attribute(attribute, TraitValue::from(value));
        }
    }
}
