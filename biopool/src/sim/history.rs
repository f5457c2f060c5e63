use serde::{Deserialize, Serialize};

use crate::population::Population;
use crate::traits::TraitCounts;

/// Snapshot series of one tracked trait.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitSeries {
    /// Population the trait belongs to
    pub population: String,
    /// Trait name
    pub name: String,
    /// One tally per recorded tick
    pub counts: Vec<TraitCounts>,
}

/// Append-only record of the run.
///
/// Every series has one entry per recorded tick, so `sizes(p)[i]` and
/// `trait_history(p, t)[i]` both belong to `time()[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    time: Vec<f64>,
    sizes: Vec<(String, Vec<usize>)>,
    traits: Vec<TraitSeries>,
}

impl History {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one tick.
    pub fn record(&mut self, time: f64, populations: &[Population]) {
        self.time.push(time);
        for pop in populations {
            let size = pop.size();
            match self.sizes.iter_mut().find(|(name, _)| name == pop.name()) {
                Some((_, series)) => series.push(size),
                None => self.sizes.push((pop.name().to_string(), vec![size])),
            }

            for t in pop.traits().filter(|t| t.is_tracked()) {
                let counts = t.track_values(pop.store());
                match self
                    .traits
                    .iter_mut()
                    .find(|s| s.population == pop.name() && s.name == t.name())
                {
                    Some(series) => series.counts.push(counts),
                    None => self.traits.push(TraitSeries {
                        population: pop.name().to_string(),
                        name: t.name().to_string(),
                        counts: vec![counts],
                    }),
                }
            }
        }
    }

    /// Recorded times, non-decreasing.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Number of recorded ticks.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Size series of a population.
    pub fn sizes(&self, population: &str) -> Option<&[usize]> {
        self.sizes
            .iter()
            .find(|(name, _)| name == population)
            .map(|(_, s)| s.as_slice())
    }

    /// Tally series of a tracked trait.
    pub fn trait_history(&self, population: &str, name: &str) -> Option<&[TraitCounts]> {
        self.traits
            .iter()
            .find(|s| s.population == population && s.name == name)
            .map(|s| s.counts.as_slice())
    }

    /// Every tracked trait series.
    pub fn trait_series(&self) -> &[TraitSeries] {
        &self.traits
    }
}
