use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::population::{EntityId, Pending};
use crate::sim::{EventInstance, EventParams, SimContext};
use crate::spatial::{BoundingBox, IndexId};

use super::{attr_name, rate_next, EventRegistry, EventSpec};

/// Turn toward the nearest attractor within sensing range.
///
/// Happens at exponential times drawn from `<name>_rate`; the search box has
/// half-width `<name>_radius` and runs on the attractors' spatial index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotateEvent {
    /// Index over the attracting population
    pub attractors: IndexId,
    /// Attribute holding the turning rate
    pub rate_attribute: Option<String>,
    /// Attribute holding the sensing radius
    pub radius_attribute: Option<String>,
}

impl RotateEvent {
    /// Rotation toward members of the population behind `attractors`.
    pub fn new(attractors: IndexId) -> Self {
        Self {
            attractors,
            rate_attribute: None,
            radius_attribute: None,
        }
    }

    pub(crate) fn next_time(
        &self,
        spec: &EventSpec,
        ctx: &mut SimContext,
        actor: EntityId,
        now: f64,
    ) -> Option<Pending> {
        let rate = attr_name(&self.rate_attribute, &spec.name, "_rate");
        rate_next(ctx, spec.population, actor, &rate, now)
    }

    fn nearest_attractor(&self, ctx: &SimContext, x: f64, y: f64, radius: f64) -> Option<(f64, f64)> {
        let index = ctx.index(self.attractors)?;
        let pop = ctx.population(index.population())?;
        index
            .range_query(&BoundingBox::around(x, y, radius))
            .into_iter()
            .filter_map(|id| pop.get(id))
            .map(|a| ((a.x - x).hypot(a.y - y), a.x, a.y))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, ax, ay)| (ax, ay))
    }

    pub(crate) fn handle(
        &self,
        registry: &EventRegistry,
        spec: &EventSpec,
        ctx: &mut SimContext,
        params: &EventParams,
    ) -> Vec<EventInstance> {
        let now = params.current_time;
        let radius_attr = attr_name(&self.radius_attribute, &spec.name, "_radius");
        let mut out = Vec::new();

        let sensed = ctx
            .population(spec.population)
            .and_then(|p| p.get(params.actor))
            .filter(|e| e.is_active())
            .map(|e| (e.x, e.y, e.number(&radius_attr).unwrap_or(0.0)));

        if let Some((x, y, radius)) = sensed {
            if let Some((ax, ay)) = self.nearest_attractor(ctx, x, y, radius) {
                let angle = (ay - y).atan2(ax - x);
                if let Some(m) = ctx
                    .population_mut(spec.population)
                    .and_then(|p| p.get_mut(params.actor))
                    .and_then(|e| e.motion.as_mut())
                {
                    m.set_heading(angle);
                    trace!(actor = %params.actor, angle, "turned");
                }
                registry.refresh_motion_events(ctx, spec.population, params.actor, now);
                out.extend(registry.fire_triggers(spec, ctx, params));
            }
        }

        if spec.is_primary {
            registry.set_next(ctx, spec.id, params.actor, now, None);
        }
        out
    }
}
