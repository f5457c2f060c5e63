use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::population::{EntityId, EntityStore};
use crate::rng::SimRng;

use super::{Trait, TraitValue};

/// Parameters of a [`MutableHaploidTrait`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutableHaploidConfig {
    /// Attribute name
    pub name: String,
    /// Starting values; the first one defines the base gene array
    pub values: Vec<f64>,
    /// Initial share of the population carrying each starting value
    pub frequencies: Vec<f64>,
    /// Value of an all-false gene array
    pub min_value: f64,
    /// Value of an all-true gene array
    pub max_value: f64,
    /// Number of genes
    pub array_size: usize,
    /// Per-gene flip probability on inheritance
    pub mutate_prob: f64,
    /// Record in history
    pub track: bool,
}

/// A trait encoded as a boolean gene array that mutates on inheritance.
///
/// The value is `min_value + (set genes) * gene_value`. Gene arrays are kept
/// per individual, keyed by id, so they survive row reordering in the store.
#[derive(Debug, Clone)]
pub struct MutableHaploidTrait {
    config: MutableHaploidConfig,
    gene_value: f64,
    genes: HashMap<EntityId, Vec<bool>>,
}

impl MutableHaploidTrait {
    /// New trait; arrays are assigned on initialization.
    pub fn new(config: MutableHaploidConfig) -> Self {
        let gene_value = if config.array_size == 0 {
            0.0
        } else {
            (config.max_value - config.min_value) / config.array_size as f64
        };
        Self {
            config,
            gene_value,
            genes: HashMap::new(),
        }
    }

    /// Gene array of an individual.
    pub fn genes(&self, id: EntityId) -> Option<&[bool]> {
        self.genes.get(&id).map(Vec::as_slice)
    }

    /// Convert a gene array to its trait value.
    pub fn decode(&self, genes: &[bool]) -> f64 {
        self.config.min_value + genes.iter().filter(|g| **g).count() as f64 * self.gene_value
    }

    fn set_count(&self, value: f64) -> usize {
        ((value - self.config.min_value) / self.gene_value) as usize
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.config;
        if c.array_size == 0 || c.max_value <= c.min_value {
            return Err(ConfigError::invalid(
                &c.name,
                "need array_size > 0 and max_value > min_value",
            ));
        }
        if c.values.is_empty() || c.values.len() != c.frequencies.len() {
            return Err(ConfigError::invalid(
                &c.name,
                "values and frequencies must be non-empty and equally long",
            ));
        }
        if c.values.iter().any(|v| *v < c.min_value || *v > c.max_value) {
            return Err(ConfigError::invalid(&c.name, "value outside [min_value, max_value]"));
        }
        if !(0.0..=1.0).contains(&c.mutate_prob) {
            return Err(ConfigError::invalid(&c.name, "mutate_prob outside [0, 1]"));
        }
        Ok(())
    }

    /// Derive one starting array per configured value from a shared random base.
    fn starting_arrays(&self, rng: &mut SimRng) -> Vec<Vec<bool>> {
        let size = self.config.array_size;
        let mut order: Vec<usize> = (0..size).collect();
        rng.shuffle(&mut order);

        let base_count = self.set_count(self.config.values[0]).min(size);
        let (on, off) = order.split_at(base_count);
        let mut base = vec![false; size];
        for &i in on {
            base[i] = true;
        }

        let mut arrays = vec![base.clone()];
        for &value in &self.config.values[1..] {
            let count = self.set_count(value).min(size);
            let mut genes = base.clone();
            if count > base_count {
                let mut candidates = off.to_vec();
                rng.shuffle(&mut candidates);
                for &i in candidates.iter().take(count - base_count) {
                    genes[i] = true;
                }
            } else if count < base_count {
                let mut candidates = on.to_vec();
                rng.shuffle(&mut candidates);
                for &i in candidates.iter().take(base_count - count) {
                    genes[i] = false;
                }
            }
            arrays.push(genes);
        }
        arrays
    }
}

impl Trait for MutableHaploidTrait {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_tracked(&self) -> bool {
        self.config.track
    }

    fn initialize(
        &mut self,
        store: &mut EntityStore,
        rng: &mut SimRng,
    ) -> Result<(), ConfigError> {
        self.validate()?;
        let arrays = self.starting_arrays(rng);

        let mut unassigned = store.ids();
        rng.shuffle(&mut unassigned);
        let size = unassigned.len();

        self.genes.clear();
        for (genes, freq) in arrays.iter().zip(&self.config.frequencies) {
            let count = ((freq * size as f64) as usize).min(unassigned.len());
            for id in unassigned.drain(..count) {
                self.genes.insert(id, genes.clone());
            }
        }
        for id in unassigned {
            self.genes.insert(id, arrays[0].clone());
        }

        for entity in store.iter_mut() {
            if let Some(genes) = self.genes.get(&entity.id) {
                let value = self.decode(genes);
                entity.set_attribute(self.config.name.clone(), TraitValue::Number(value));
            }
        }
        Ok(())
    }

    fn get_value(&self, store: &EntityStore, id: EntityId) -> Option<TraitValue> {
        store.get(id)?.attribute(&self.config.name).cloned()
    }

    fn inherit_value(
        &mut self,
        _store: &EntityStore,
        parent: EntityId,
        child: EntityId,
        rng: &mut SimRng,
    ) -> Option<TraitValue> {
        let mut genes = self.genes.get(&parent)?.clone();
        for gene in genes.iter_mut() {
            if rng.chance(self.config.mutate_prob) {
                *gene = !*gene;
            }
        }
        let value = self.decode(&genes);
        self.genes.insert(child, genes);
        Some(TraitValue::Number(value))
    }

    fn forget(&mut self, id: EntityId) {
        self.genes.remove(&id);
    }
}
