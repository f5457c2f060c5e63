//! Run parameters and the builder that assembles a [`SimWorld`].

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{ConfigError, SimulationResult};
use crate::events::{
    attr_name, BirthEvent, EventId, EventKind, EventRegistry, EventSpec, Placement, Trigger,
};
use crate::population::{attr, Population, PopulationConfig, PopulationId};
use crate::rng::SimRng;
use crate::sim::{SimContext, SimWorld};
use crate::spatial::{IndexId, SpatialIndex};
use crate::traits::Trait;

/// Default population size at or below which a run stops.
pub const DEFAULT_CONTINUE_THRESHOLD: usize = 3;

/// Parameters of one call to [`SimWorld::run`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Horizon: entries later than this are left in the queue
    pub runtime: f64,
    /// Stop as soon as any population has at most this many individuals
    pub continue_threshold: usize,
}

impl RunConfig {
    /// Run until `runtime` with the default threshold.
    pub fn new(runtime: f64) -> Self {
        Self {
            runtime,
            continue_threshold: DEFAULT_CONTINUE_THRESHOLD,
        }
    }

    /// Set the extinction threshold.
    pub fn with_continue_threshold(mut self, threshold: usize) -> Self {
        self.continue_threshold = threshold;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(self.runtime.is_finite() && self.runtime > 0.0) {
            return Err(ConfigError::invalid(
                "runtime",
                format!("{} must be positive and finite", self.runtime),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct PopulationPlan {
    config: PopulationConfig,
    traits: Vec<Box<dyn Trait>>,
    moving: bool,
}

/// Collects populations, traits, indices, events and triggers, then builds a
/// validated world.
///
/// ```rust
/// use biopool::{DeathEvent, EventKind, PopulationConfig, RunConfig, SimulationBuilder, StaticTrait};
///
/// let mut builder = SimulationBuilder::new();
/// builder.seed(7);
/// let cells = builder.add_population(PopulationConfig::new("cells", 20, 10.0, 10.0));
/// builder.add_trait(cells, StaticTrait::new("death_rate", 1.0)).unwrap();
/// builder.add_event(cells, "death", EventKind::Death(DeathEvent::default()), true);
///
/// let mut world = builder.build().unwrap();
/// let report = world.run(&RunConfig::new(5.0)).unwrap();
/// assert!(report.metrics.events_processed > 0);
/// ```
#[derive(Debug, Default)]
pub struct SimulationBuilder {
    seed: u64,
    populations: Vec<PopulationPlan>,
    indices: Vec<PopulationId>,
    registry: EventRegistry,
}

impl SimulationBuilder {
    /// Create a new empty builder with seed 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed of the world's random source.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = seed;
        self
    }

    fn plan_mut(&mut self, population: PopulationId) -> Result<&mut PopulationPlan, ConfigError> {
        self.populations
            .get_mut(population.0)
            .ok_or(ConfigError::UnknownPopulation(population.0))
    }

    /// Register a population.
    pub fn add_population(&mut self, config: PopulationConfig) -> PopulationId {
        let id = PopulationId(self.populations.len());
        self.populations.push(PopulationPlan {
            config,
            traits: Vec::new(),
            moving: false,
        });
        id
    }

    /// Attach a trait; traits initialize in the order they were added.
    pub fn add_trait(
        &mut self,
        population: PopulationId,
        t: impl Trait + 'static,
    ) -> Result<(), ConfigError> {
        self.plan_mut(population)?.traits.push(Box::new(t));
        Ok(())
    }

    /// Give a population motion. Its individuals need a `velocity` attribute.
    pub fn enable_motion(&mut self, population: PopulationId) -> Result<(), ConfigError> {
        self.plan_mut(population)?.moving = true;
        Ok(())
    }

    /// Create a spatial index over a stationary population.
    pub fn add_index(&mut self, population: PopulationId) -> IndexId {
        self.indices.push(population);
        IndexId(self.indices.len() - 1)
    }

    /// Register an event. Wall events switch motion on for their population.
    pub fn add_event(
        &mut self,
        population: PopulationId,
        name: impl Into<String>,
        kind: EventKind,
        is_primary: bool,
    ) -> EventId {
        if matches!(kind, EventKind::Wall(_)) {
            if let Some(plan) = self.populations.get_mut(population.0) {
                plan.moving = true;
            }
        }
        self.registry.register(name, population, is_primary, kind)
    }

    /// Attach a trigger to `event`.
    pub fn add_trigger(&mut self, event: EventId, trigger: Trigger) -> Result<(), ConfigError> {
        if self.registry.add_trigger(event, trigger) {
            Ok(())
        } else {
            Err(ConfigError::UnknownEvent(event.0))
        }
    }

    /// Validate the configuration and produce a world at time zero.
    ///
    /// Initial individuals are placed, traits initialized, motion started,
    /// indices filled and the first instance of every primary event drawn.
    #[instrument(skip_all, fields(seed = self.seed))]
    pub fn build(self) -> SimulationResult<SimWorld> {
        let mut rng = SimRng::new(self.seed);

        let mut populations = Vec::with_capacity(self.populations.len());
        for (i, plan) in self.populations.into_iter().enumerate() {
            if populations
                .iter()
                .any(|p: &Population| p.name() == plan.config.name)
            {
                return Err(ConfigError::DuplicateName {
                    kind: "population",
                    name: plan.config.name,
                }
                .into());
            }
            let mut pop = Population::new(PopulationId(i), plan.config, &mut rng)?;
            for t in plan.traits {
                pop.add_trait(t, &mut rng)?;
            }
            if plan.moving {
                pop.enable_motion(&mut rng)?;
            }
            populations.push(pop);
        }

        let mut indices = Vec::with_capacity(self.indices.len());
        for (i, population) in self.indices.iter().enumerate() {
            let pop = populations
                .get(population.0)
                .ok_or(ConfigError::UnknownPopulation(population.0))?;
            if pop.is_moving() {
                return Err(ConfigError::IndexedPopulationMoves {
                    index: i,
                    population: pop.name().to_string(),
                }
                .into());
            }
            indices.push(SpatialIndex::from_store(IndexId(i), *population, pop.store()));
        }

        let mut names: Vec<&str> = Vec::new();
        for spec in self.registry.iter() {
            if names.contains(&spec.name.as_str()) {
                return Err(ConfigError::DuplicateName {
                    kind: "event",
                    name: spec.name.clone(),
                }
                .into());
            }
            names.push(&spec.name);
            validate_event(spec, &self.registry, &populations, &indices)?;
        }

        for spec in self.registry.iter().filter(|e| e.is_primary) {
            if let Some(pop) = populations.get_mut(spec.population.0) {
                pop.register_primary(spec.id);
            }
        }

        let mut ctx = SimContext::new(populations, indices, rng);
        self.registry.initialize(&mut ctx, 0.0);
        debug!(
            populations = ctx.populations.len(),
            events = self.registry.len(),
            "world built"
        );
        Ok(SimWorld::new(ctx, self.registry))
    }
}

fn index_for<'a>(
    indices: &'a [SpatialIndex],
    index: IndexId,
) -> Result<&'a SpatialIndex, ConfigError> {
    indices.get(index.0).ok_or(ConfigError::UnknownIndex(index.0))
}

fn validate_event(
    spec: &EventSpec,
    registry: &EventRegistry,
    populations: &[Population],
    indices: &[SpatialIndex],
) -> Result<(), ConfigError> {
    let pop = populations
        .get(spec.population.0)
        .ok_or(ConfigError::UnknownPopulation(spec.population.0))?;

    match &spec.kind {
        EventKind::Birth(BirthEvent {
            rate_attribute,
            placement,
        }) => {
            if spec.is_primary {
                pop.require_attribute(rate_attribute)?;
            }
            if let Placement::Search { index, .. } = placement {
                let idx = index_for(indices, *index)?;
                if idx.population() != spec.population {
                    return Err(ConfigError::IndexPopulationMismatch {
                        index: index.0,
                        expected: spec.population,
                        actual: idx.population(),
                    });
                }
                pop.require_attribute(attr::OFFSPRING_DIST_MAX)?;
            }
        }
        EventKind::Death(e) => {
            if spec.is_primary {
                pop.require_attribute(&e.rate_attribute)?;
            }
        }
        EventKind::Interact(e) => {
            let radius = attr_name(&e.radius_attribute, &spec.name, "_radius");
            pop.require_attribute(&radius)?;
            if let Some(partner) = e.partner {
                let other = populations
                    .get(partner.0)
                    .ok_or(ConfigError::UnknownPopulation(partner.0))?;
                other.require_attribute(&radius)?;
            }
        }
        EventKind::Wall(_) => pop.require_attribute(attr::RADIUS)?,
        EventKind::Pause(e) => {
            if spec.is_primary {
                return Err(ConfigError::invalid(&spec.name, "pause events are never primary"));
            }
            pop.require_attribute(&attr_name(&e.duration_attribute, &spec.name, ""))?;
            for suspended in &e.suspends {
                let other = registry
                    .get(*suspended)
                    .ok_or(ConfigError::UnknownEvent(suspended.0))?;
                if other.population != spec.population {
                    return Err(ConfigError::invalid(
                        &spec.name,
                        format!("suspended event '{}' belongs to another population", other.name),
                    ));
                }
            }
        }
        EventKind::Rotate(e) => {
            index_for(indices, e.attractors)?;
            if spec.is_primary {
                pop.require_attribute(&attr_name(&e.rate_attribute, &spec.name, "_rate"))?;
            }
            pop.require_attribute(&attr_name(&e.radius_attribute, &spec.name, "_radius"))?;
        }
        EventKind::Infection(e) => {
            if spec.is_primary {
                return Err(ConfigError::invalid(&spec.name, "infection events are never primary"));
            }
            pop.require_category(&attr_name(&e.status_attribute, &spec.name, ""))?;
        }
    }

    for trigger in &spec.triggers {
        let Some(target) = trigger.event() else {
            continue;
        };
        let other = registry
            .get(target)
            .ok_or(ConfigError::UnknownEvent(target.0))?;
        if let Trigger::InteractWithNewcomer { .. } = trigger {
            if !matches!(other.kind, EventKind::Interact(_)) {
                return Err(ConfigError::invalid(
                    &spec.name,
                    format!("newcomer trigger targets non-interaction '{}'", other.name),
                ));
            }
        }
    }
    Ok(())
}
