use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::population::{attr, EntityId, Pending};
use crate::sim::{EventInstance, EventParams, SimContext};

use super::{rate_next, EventRegistry, EventSpec};

/// Removal of an individual.
///
/// As a primary event the individual dies after an exponential wait drawn
/// from `rate_attribute`; as a secondary one it is typically handled by a
/// trigger (prey eaten on contact).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathEvent {
    /// Attribute holding the death rate
    pub rate_attribute: String,
}

impl Default for DeathEvent {
    fn default() -> Self {
        Self {
            rate_attribute: attr::DEATH_RATE.to_string(),
        }
    }
}

impl DeathEvent {
    pub(crate) fn next_time(
        &self,
        spec: &EventSpec,
        ctx: &mut SimContext,
        actor: EntityId,
        now: f64,
    ) -> Option<Pending> {
        rate_next(ctx, spec.population, actor, &self.rate_attribute, now)
    }

    /// Triggers run first, while the individual still exists; then the row,
    /// its index entries and its trait state go.
    pub(crate) fn handle(
        &self,
        registry: &EventRegistry,
        spec: &EventSpec,
        ctx: &mut SimContext,
        params: &EventParams,
    ) -> Vec<EventInstance> {
        let out = registry.fire_triggers(spec, ctx, params);

        let Some(pop) = ctx.population_mut(spec.population) else {
            return out;
        };
        if let Some(dead) = pop.remove(params.actor) {
            debug!(
                population = %pop.name(),
                id = %dead.id,
                time = params.current_time,
                size = pop.size(),
                "death"
            );
            ctx.index_delete(spec.population, dead.id, dead.x, dead.y);
        }
        out
    }
}
