//! Populations of individuals living in a rectangular 2D domain.

mod entity;
mod store;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, StoreError};
use crate::events::EventId;
use crate::rng::SimRng;
use crate::sim::{EventInstance, EventParams};
use crate::spatial::Bounds;
use crate::traits::{Trait, TraitValue};

pub use entity::{Entity, EntityId, Motion, Pending, Status};
pub use store::EntityStore;

/// Attribute names the built-in events read.
pub mod attr {
    /// Rate of the exponential birth clock
    pub const BIRTH_RATE: &str = "birth_rate";
    /// Rate of the exponential death clock
    pub const DEATH_RATE: &str = "death_rate";
    /// Body radius, used for walls and placement
    pub const RADIUS: &str = "radius";
    /// Speed of moving individuals
    pub const VELOCITY: &str = "velocity";
    /// Maximum parent to offspring distance for searched placement
    pub const OFFSPRING_DIST_MAX: &str = "offspring_dist_max";
    /// Litter size
    pub const NUMBER_OFFSPRING: &str = "number_offspring";
    /// Probability that a birth attempt converts into an offspring
    pub const CONVERSION_EFFICIENCY: &str = "conversion_efficiency";
    /// Rate of the exponential recovery clock
    pub const RECOVERY_RATE: &str = "recovery_rate";
}

/// Index of a population inside a world, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PopulationId(pub usize);

impl fmt::Display for PopulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Construction parameters of a population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Unique name
    pub name: String,
    /// Number of individuals created at build time
    pub init_size: usize,
    /// Width of the domain
    pub xdim: f64,
    /// Height of the domain
    pub ydim: f64,
    /// Soft size limit producing logistic growth; `None` means unbounded
    pub implicit_capacity: Option<usize>,
}

impl PopulationConfig {
    /// Population of `init_size` individuals on an `xdim × ydim` domain.
    pub fn new(name: impl Into<String>, init_size: usize, xdim: f64, ydim: f64) -> Self {
        Self {
            name: name.into(),
            init_size,
            xdim,
            ydim,
            implicit_capacity: None,
        }
    }

    /// Set the implicit capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.implicit_capacity = Some(capacity);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.xdim.is_finite() && self.xdim > 0.0 && self.ydim.is_finite() && self.ydim > 0.0)
        {
            return Err(ConfigError::invalid(
                &self.name,
                format!("domain {}x{} must be positive and finite", self.xdim, self.ydim),
            ));
        }
        if self.implicit_capacity == Some(0) {
            return Err(ConfigError::invalid(&self.name, "implicit capacity must be > 0"));
        }
        Ok(())
    }
}

/// A named set of individuals together with their traits.
///
/// `size()` is the live row count of the store and therefore always matches
/// it. New ids come from `id_count`, which only ever grows.
#[derive(Debug)]
pub struct Population {
    id: PopulationId,
    config: PopulationConfig,
    store: EntityStore,
    traits: Vec<Box<dyn Trait>>,
    id_count: u64,
    moving: bool,
    primary_events: Vec<EventId>,
}

impl Population {
    /// Create the population with ids `0..init_size` at uniform random positions.
    pub fn new(
        id: PopulationId,
        config: PopulationConfig,
        rng: &mut SimRng,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut store = EntityStore::new();
        for i in 0..config.init_size as u64 {
            let x = rng.random_f64() * config.xdim;
            let y = rng.random_f64() * config.ydim;
            store
                .insert(Entity::new(EntityId(i), x, y))
                .map_err(|e| ConfigError::invalid(&config.name, e.to_string()))?;
        }
        Ok(Self {
            id,
            id_count: config.init_size as u64,
            config,
            store,
            traits: Vec::new(),
            moving: false,
            primary_events: Vec::new(),
        })
    }

    /// Registration index.
    pub fn id(&self) -> PopulationId {
        self.id
    }

    /// Unique name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Domain width.
    pub fn xdim(&self) -> f64 {
        self.config.xdim
    }

    /// Domain height.
    pub fn ydim(&self) -> f64 {
        self.config.ydim
    }

    /// Soft size limit.
    pub fn implicit_capacity(&self) -> Option<usize> {
        self.config.implicit_capacity
    }

    /// Number of live individuals.
    pub fn size(&self) -> usize {
        self.store.len()
    }

    /// Id the next newborn will receive.
    pub fn next_id(&self) -> EntityId {
        EntityId(self.id_count)
    }

    /// Whether individuals carry motion.
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// The backing store.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Borrow an individual.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.store.get(id)
    }

    /// Mutably borrow an individual.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.store.get_mut(id)
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: EntityId) -> bool {
        self.store.contains(id)
    }

    /// Add a trait and assign its starting values.
    pub fn add_trait(
        &mut self,
        mut t: Box<dyn Trait>,
        rng: &mut SimRng,
    ) -> Result<(), ConfigError> {
        if self.has_trait(t.name()) {
            return Err(ConfigError::DuplicateName {
                kind: "trait",
                name: t.name().to_string(),
            });
        }
        t.initialize(&mut self.store, rng)?;
        self.traits.push(t);
        Ok(())
    }

    /// Whether a trait named `name` is attached.
    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.iter().any(|t| t.name() == name)
    }

    /// Attached traits in insertion order.
    pub fn traits(&self) -> impl Iterator<Item = &dyn Trait> {
        self.traits.iter().map(|t| t.as_ref())
    }

    /// Values every trait hands from `parent` to the newborn `child`.
    pub fn inherit_traits(
        &mut self,
        parent: EntityId,
        child: EntityId,
        rng: &mut SimRng,
    ) -> Vec<(String, TraitValue)> {
        let mut values = Vec::with_capacity(self.traits.len());
        for t in self.traits.iter_mut() {
            if let Some(v) = t.inherit_value(&self.store, parent, child, rng) {
                values.push((t.name().to_string(), v));
            }
        }
        values
    }

    /// Append an individual, advancing the id counter past its id.
    pub fn insert(&mut self, entity: Entity) -> Result<(), StoreError> {
        let next = entity.id.0 + 1;
        self.store.insert(entity)?;
        self.id_count = self.id_count.max(next);
        Ok(())
    }

    /// Remove an individual and drop trait state held for it.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let removed = self.store.remove(id)?;
        for t in self.traits.iter_mut() {
            t.forget(id);
        }
        Some(removed)
    }

    /// Drop trait state inherited by a newborn that could not be placed.
    pub fn discard_child(&mut self, child: EntityId) {
        if self.store.contains(child) {
            return;
        }
        for t in self.traits.iter_mut() {
            t.forget(child);
        }
    }

    /// Move every moving individual by `dt`.
    pub fn apply_lapse(&mut self, dt: f64) {
        if self.moving {
            self.store.apply_lapse(dt);
        }
    }

    /// Every individual must carry a numeric `attribute`.
    pub fn require_attribute(&self, attribute: &str) -> Result<(), ConfigError> {
        self.require_where(attribute, |v| v.as_f64().is_some())
    }

    /// Every individual must carry a categorical `attribute`.
    pub fn require_category(&self, attribute: &str) -> Result<(), ConfigError> {
        self.require_where(attribute, |v| v.as_category().is_some())
    }

    fn require_where(
        &self,
        attribute: &str,
        accepts: impl Fn(&TraitValue) -> bool,
    ) -> Result<(), ConfigError> {
        let lacking = self
            .store
            .iter()
            .find(|e| !e.attribute(attribute).is_some_and(&accepts));
        match lacking {
            Some(e) => Err(ConfigError::MissingAttribute {
                population: self.config.name.clone(),
                entity: e.id,
                attribute: attribute.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Give every individual a random heading at its `velocity` attribute.
    pub fn enable_motion(&mut self, rng: &mut SimRng) -> Result<(), ConfigError> {
        if self.moving {
            return Ok(());
        }
        self.require_attribute(attr::VELOCITY)?;
        self.moving = true;
        for id in self.store.ids() {
            self.init_motion_for(id, rng);
        }
        debug!(population = %self.config.name, "motion enabled");
        Ok(())
    }

    /// Start an individual moving, if the population moves.
    ///
    /// A mover with a radius is pulled fully inside the domain first.
    pub fn init_motion_for(&mut self, id: EntityId, rng: &mut SimRng) {
        if !self.moving {
            return;
        }
        let bounds = Bounds::new(self.config.xdim, self.config.ydim);
        if let Some(entity) = self.store.get_mut(id) {
            if let Some(r) = entity.number(attr::RADIUS) {
                (entity.x, entity.y) = bounds.clip(entity.x, entity.y, r);
            }
            let speed = entity.number(attr::VELOCITY).unwrap_or(0.0);
            entity.motion = Some(Motion::from_heading(speed, rng.heading()));
        }
    }

    /// Record that `event` keeps a pending slot on this population.
    pub(crate) fn register_primary(&mut self, event: EventId) {
        if !self.primary_events.contains(&event) {
            self.primary_events.push(event);
        }
    }

    /// Primary events in registration order.
    pub fn primary_events(&self) -> &[EventId] {
        &self.primary_events
    }

    /// The queue entry for the earliest pending slot of `id`.
    ///
    /// `None` if the individual is gone or has nothing pending.
    pub fn next_event_for(&self, id: EntityId) -> Option<EventInstance> {
        let (event, pending) = self.store.get(id)?.next_pending()?;
        Some(EventInstance {
            time: pending.time,
            event,
            params: EventParams::new(pending.time, id).with_extra(pending.extra),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MutableHaploidConfig, MutableHaploidTrait, StaticTrait};

    fn population(n: usize) -> (Population, SimRng) {
        let mut rng = SimRng::new(12);
        let pop = Population::new(
            PopulationId(0),
            PopulationConfig::new("cells", n, 10.0, 5.0),
            &mut rng,
        )
        .expect("valid config");
        (pop, rng)
    }

    #[test]
    fn initial_individuals_lie_in_domain() {
        let (pop, _) = population(50);
        assert_eq!(pop.size(), 50);
        assert_eq!(pop.next_id(), EntityId(50));
        for e in pop.store().iter() {
            assert!((0.0..=10.0).contains(&e.x));
            assert!((0.0..=5.0).contains(&e.y));
            assert!(e.is_active());
        }
    }

    #[test]
    fn rejects_degenerate_domain() {
        let mut rng = SimRng::new(0);
        let err = Population::new(
            PopulationId(0),
            PopulationConfig::new("flat", 1, 10.0, 0.0),
            &mut rng,
        );
        assert!(matches!(err, Err(ConfigError::InvalidParameter { .. })));
    }

    #[test]
    fn ids_are_never_reused() {
        let (mut pop, _) = population(3);
        pop.remove(EntityId(2));
        assert_eq!(pop.next_id(), EntityId(3));
        pop.insert(Entity::new(EntityId(3), 1.0, 1.0)).expect("fresh id");
        assert_eq!(pop.next_id(), EntityId(4));
        assert_eq!(pop.size(), 3);
    }

    #[test]
    fn duplicate_trait_is_rejected() {
        let (mut pop, mut rng) = population(3);
        pop.add_trait(Box::new(StaticTrait::new("birth_rate", 1.0)), &mut rng)
            .expect("first add");
        let err = pop.add_trait(Box::new(StaticTrait::new("birth_rate", 2.0)), &mut rng);
        assert!(matches!(err, Err(ConfigError::DuplicateName { .. })));
    }

    #[test]
    fn removal_forgets_gene_arrays() {
        let (mut pop, mut rng) = population(4);
        let t = MutableHaploidTrait::new(MutableHaploidConfig {
            name: "size".into(),
            values: vec![2.0],
            frequencies: vec![1.0],
            min_value: 0.0,
            max_value: 4.0,
            array_size: 4,
            mutate_prob: 0.0,
            track: false,
        });
        pop.add_trait(Box::new(t), &mut rng).expect("valid trait");
        pop.remove(EntityId(1));
        let inherited = pop.inherit_traits(EntityId(1), EntityId(9), &mut rng);
        assert!(inherited.is_empty());
        let inherited = pop.inherit_traits(EntityId(0), EntityId(9), &mut rng);
        assert_eq!(inherited, vec![("size".to_string(), TraitValue::from(2.0))]);
    }

    #[test]
    fn motion_requires_velocity() {
        let (mut pop, mut rng) = population(2);
        assert!(matches!(
            pop.enable_motion(&mut rng),
            Err(ConfigError::MissingAttribute { .. })
        ));
        pop.add_trait(Box::new(StaticTrait::new("velocity", 2.0)), &mut rng)
            .expect("valid trait");
        pop.enable_motion(&mut rng).expect("velocity present");
        for e in pop.store().iter() {
            let m = e.motion.expect("moving");
            assert!((m.vel_x.hypot(m.vel_y) - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn next_event_carries_pending_extra() {
        let (mut pop, _) = population(2);
        if let Some(e) = pop.get_mut(EntityId(0)) {
            e.set_pending(EventId(1), Some(Pending { time: 4.0, extra: Some(EntityId(1)) }));
            e.set_pending(EventId(0), Some(Pending::at(6.0)));
        }
        let next = pop.next_event_for(EntityId(0)).expect("pending slot");
        assert_eq!(next.time, 4.0);
        assert_eq!(next.event, EventId(1));
        assert_eq!(next.params.extra, Some(EntityId(1)));
        assert_eq!(next.params.current_time, 4.0);
        assert_eq!(pop.next_event_for(EntityId(1)), None);
        assert_eq!(pop.next_event_for(EntityId(7)), None);
    }
}
