use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::population::{attr, Entity, EntityId, Pending, PopulationId};
use crate::sim::{EventInstance, EventParams, SimContext};
use crate::spatial::{find_open_space, scatter_near, BoundingBox, Bounds, Circle, IndexId};

use super::{rate_next, EventRegistry, EventSpec};

/// How a newborn's position is chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Placement {
    /// Anywhere in the domain
    Uniform,
    /// Near the parent, within its `offspring_dist_max`
    Search {
        /// Index over the parent's own population
        index: IndexId,
        /// Accept overlap with neighbors
        allow_overlap: bool,
    },
}

/// Asexual reproduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthEvent {
    /// Attribute holding the birth rate
    pub rate_attribute: String,
    /// Position policy for offspring
    pub placement: Placement,
}

impl Default for BirthEvent {
    fn default() -> Self {
        Self {
            rate_attribute: attr::BIRTH_RATE.to_string(),
            placement: Placement::Uniform,
        }
    }
}

impl BirthEvent {
    /// Birth placing offspring near the parent through `index`.
    pub fn searching(index: IndexId, allow_overlap: bool) -> Self {
        Self {
            placement: Placement::Search {
                index,
                allow_overlap,
            },
            ..Self::default()
        }
    }

    pub(crate) fn next_time(
        &self,
        spec: &EventSpec,
        ctx: &mut SimContext,
        actor: EntityId,
        now: f64,
    ) -> Option<Pending> {
        rate_next(ctx, spec.population, actor, &self.rate_attribute, now)
    }

    /// Produce a litter, then redraw the parent's next birth.
    pub(crate) fn handle(
        &self,
        registry: &EventRegistry,
        spec: &EventSpec,
        ctx: &mut SimContext,
        params: &EventParams,
    ) -> Vec<EventInstance> {
        let mut out = Vec::new();
        let now = params.current_time;
        let parent = params.actor;

        let litter = ctx
            .population(spec.population)
            .and_then(|p| p.get(parent))
            .map(|e| {
                e.number(attr::NUMBER_OFFSPRING)
                    .map_or(1, |n| n.max(0.0) as usize)
            })
            .unwrap_or(0);

        for _ in 0..litter {
            let Some(child) = self.give_birth(spec.population, ctx, parent) else {
                continue;
            };
            registry.init_individual(ctx, spec.population, child, now);
            if let Some(next) = ctx
                .population(spec.population)
                .and_then(|p| p.next_event_for(child))
            {
                out.push(next);
            }
            out.extend(registry.fire_triggers(spec, ctx, &params.for_actor(child)));
        }

        if spec.is_primary {
            registry.set_next(ctx, spec.id, parent, now, None);
        }
        out
    }

    /// One birth attempt. Returns the newborn's id when it was placed.
    fn give_birth(
        &self,
        population: PopulationId,
        ctx: &mut SimContext,
        parent: EntityId,
    ) -> Option<EntityId> {
        let (pop, rng) = ctx.population_and_rng(population)?;
        let (px, py, parent_radius, odm, efficiency) = {
            let e = pop.get(parent)?;
            (
                e.x,
                e.y,
                e.number(attr::RADIUS).unwrap_or(0.0),
                e.number(attr::OFFSPRING_DIST_MAX),
                e.number(attr::CONVERSION_EFFICIENCY),
            )
        };

        if let Some(capacity) = pop.implicit_capacity() {
            let p_birth = 1.0 - pop.size() as f64 / capacity as f64;
            if rng.random_f64() > p_birth {
                trace!(population = %pop.name(), "birth blocked by capacity");
                return None;
            }
        }
        if let Some(ce) = efficiency {
            if rng.random_f64() > ce {
                return None;
            }
        }

        let child = pop.next_id();
        let inherited = pop.inherit_traits(parent, child, rng);
        let new_radius = inherited
            .iter()
            .find(|(name, _)| name == attr::RADIUS)
            .and_then(|(_, v)| v.as_f64())
            .unwrap_or(parent_radius);
        let bounds = Bounds::new(pop.xdim(), pop.ydim());

        let spot = match &self.placement {
            Placement::Uniform => {
                let (x, y) = (rng.random_f64() * bounds.xdim, rng.random_f64() * bounds.ydim);
                Some(bounds.clip(x, y, new_radius))
            }
            Placement::Search {
                index,
                allow_overlap,
            } => {
                let parent_circle = Circle::new(px, py, parent_radius);
                let odm = odm.unwrap_or(0.0);
                if *allow_overlap {
                    Some(scatter_near(parent_circle, odm, new_radius, bounds, rng))
                } else {
                    let neighbors: Vec<Circle> = ctx
                        .index(*index)
                        .map(|idx| idx.range_query(&BoundingBox::around(px, py, 2.0 * odm)))
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|id| {
                            let e = ctx.population(population)?.get(id)?;
                            Some(Circle::new(e.x, e.y, e.number(attr::RADIUS).unwrap_or(0.0)))
                        })
                        .collect();
                    find_open_space(parent_circle, odm, new_radius, &neighbors, bounds, &mut ctx.rng)
                }
            }
        };

        let pop = ctx.population_mut(population)?;
        let Some((x, y)) = spot else {
            trace!(population = %pop.name(), parent = %parent, "no room for offspring");
            pop.discard_child(child);
            return None;
        };

        let mut entity = Entity::new(child, x, y);
        for (name, value) in inherited {
            entity.set_attribute(name, value);
        }
        if let Err(e) = pop.insert(entity) {
            warn!(population = %pop.name(), error = %e, "newborn rejected");
            return None;
        }
        debug!(population = %pop.name(), parent = %parent, id = %child, size = pop.size(), "birth");

        ctx.index_insert(population, child, x, y);
        if let Some((pop, rng)) = ctx.population_and_rng(population) {
            pop.init_motion_for(child, rng);
        }
        Some(child)
    }
}
