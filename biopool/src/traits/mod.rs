//! Heritable per-individual traits.
//!
//! The kernel only relies on the [`Trait`] contract: a value per individual,
//! a way to pass a value from parent to offspring, and an optional summary
//! for history. Trait values are written into each individual's attributes,
//! which is where events read `birth_rate`, `radius` and friends from.

mod categorical;
mod linked;
mod mutable;
mod static_trait;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::population::{EntityId, EntityStore};
use crate::rng::SimRng;

pub use categorical::CategoricalTrait;
pub use linked::{LinkFn, LinkedTrait};
pub use mutable::{MutableHaploidTrait, MutableHaploidConfig};
pub use static_trait::StaticTrait;

/// Value of a trait for one individual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TraitValue {
    /// Numeric value
    Number(f64),
    /// Named category
    Category(String),
}

impl TraitValue {
    /// Numeric view of the value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TraitValue::Number(v) => Some(*v),
            TraitValue::Category(_) => None,
        }
    }

    /// Category view of the value.
    pub fn as_category(&self) -> Option<&str> {
        match self {
            TraitValue::Number(_) => None,
            TraitValue::Category(c) => Some(c),
        }
    }
}

impl From<f64> for TraitValue {
    fn from(value: f64) -> Self {
        TraitValue::Number(value)
    }
}

impl From<&str> for TraitValue {
    fn from(value: &str) -> Self {
        TraitValue::Category(value.to_string())
    }
}

impl From<String> for TraitValue {
    fn from(value: String) -> Self {
        TraitValue::Category(value)
    }
}

impl fmt::Display for TraitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraitValue::Number(v) => write!(f, "{v}"),
            TraitValue::Category(c) => write!(f, "{c}"),
        }
    }
}

// Numbers order before categories; numbers use total ordering so NaN is a
// regular, countable value.
impl Ord for TraitValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TraitValue::Number(a), TraitValue::Number(b)) => a.total_cmp(b),
            (TraitValue::Number(_), TraitValue::Category(_)) => Ordering::Less,
            (TraitValue::Category(_), TraitValue::Number(_)) => Ordering::Greater,
            (TraitValue::Category(a), TraitValue::Category(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for TraitValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TraitValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TraitValue {}

/// Distinct values of a trait with how many individuals carry each.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitCounts(pub Vec<(TraitValue, usize)>);

impl TraitCounts {
    /// Count the `attribute` values over a store.
    pub fn tally(store: &EntityStore, attribute: &str) -> Self {
        let mut counts: BTreeMap<TraitValue, usize> = BTreeMap::new();
        for entity in store.iter() {
            if let Some(v) = entity.attribute(attribute) {
                *counts.entry(v.clone()).or_default() += 1;
            }
        }
        TraitCounts(counts.into_iter().collect())
    }

    /// Count for one value, zero when absent.
    pub fn count(&self, value: &TraitValue) -> usize {
        self.0
            .iter()
            .find(|(v, _)| v == value)
            .map_or(0, |(_, c)| *c)
    }

    /// Total number of individuals counted.
    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, c)| c).sum()
    }
}

/// Contract between the kernel and a heritable trait.
pub trait Trait: fmt::Debug + Send {
    /// Attribute name the trait writes.
    fn name(&self) -> &str;

    /// Whether history should snapshot this trait after every tick.
    fn is_tracked(&self) -> bool {
        false
    }

    /// Assign starting values to every individual already in `store`.
    fn initialize(&mut self, store: &mut EntityStore, rng: &mut SimRng)
        -> Result<(), ConfigError>;

    /// Current value for `id`.
    fn get_value(&self, store: &EntityStore, id: EntityId) -> Option<TraitValue>;

    /// Value handed from `parent` to a newborn `child`.
    ///
    /// Called once per birth attempt. Gene-array traits store the child's
    /// array under `child`; an attempt that fails placement reuses the same
    /// child id next time, overwriting it.
    fn inherit_value(
        &mut self,
        store: &EntityStore,
        parent: EntityId,
        child: EntityId,
        rng: &mut SimRng,
    ) -> Option<TraitValue>;

    /// Drop any per-individual state held for a removed individual.
    fn forget(&mut self, _id: EntityId) {}

    /// Distinct values and their counts.
    fn track_values(&self, store: &EntityStore) -> TraitCounts {
        TraitCounts::tally(store, self.name())
    }
}
