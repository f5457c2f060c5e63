use crate::population::{EntityId, Population, PopulationId};
use crate::rng::SimRng;
use crate::spatial::{IndexId, SpatialIndex};

/// Mutable state every event handler works on.
///
/// Handlers get the context and return new queue entries; they never see the
/// queue itself.
#[derive(Debug)]
pub struct SimContext {
    /// Populations in registration order
    pub populations: Vec<Population>,
    /// Spatial indices in registration order
    pub indices: Vec<SpatialIndex>,
    /// The world's random source
    pub rng: SimRng,
}

impl SimContext {
    /// Context over the given state.
    pub fn new(populations: Vec<Population>, indices: Vec<SpatialIndex>, rng: SimRng) -> Self {
        Self {
            populations,
            indices,
            rng,
        }
    }

    /// Borrow a population.
    pub fn population(&self, id: PopulationId) -> Option<&Population> {
        self.populations.get(id.0)
    }

    /// Mutably borrow a population.
    pub fn population_mut(&mut self, id: PopulationId) -> Option<&mut Population> {
        self.populations.get_mut(id.0)
    }

    /// Borrow a spatial index.
    pub fn index(&self, id: IndexId) -> Option<&SpatialIndex> {
        self.indices.get(id.0)
    }

    /// Population and random source, borrowed together.
    pub fn population_and_rng(
        &mut self,
        id: PopulationId,
    ) -> Option<(&mut Population, &mut SimRng)> {
        let pop = self.populations.get_mut(id.0)?;
        Some((pop, &mut self.rng))
    }

    /// Record a new individual in every index bound to its population.
    pub fn index_insert(&mut self, population: PopulationId, id: EntityId, x: f64, y: f64) {
        for index in self
            .indices
            .iter_mut()
            .filter(|i| i.population() == population)
        {
            index.insert(id, x, y);
        }
    }

    /// Drop an individual from every index bound to its population.
    pub fn index_delete(&mut self, population: PopulationId, id: EntityId, x: f64, y: f64) {
        for index in self
            .indices
            .iter_mut()
            .filter(|i| i.population() == population)
        {
            index.delete(id, x, y);
        }
    }
}
