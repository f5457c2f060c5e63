use crate::error::ConfigError;
use crate::population::{EntityId, EntityStore};
use crate::rng::SimRng;

use super::{Trait, TraitValue};

/// A trait with the same value for every individual, forever.
#[derive(Debug, Clone)]
pub struct StaticTrait {
    name: String,
    value: TraitValue,
    track: bool,
}

impl StaticTrait {
    /// Static trait `name` with `value`.
    pub fn new(name: impl Into<String>, value: impl Into<TraitValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            track: false,
        }
    }

    /// Record this trait in history.
    pub fn tracked(mut self) -> Self {
        self.track = true;
        self
    }
}

impl Trait for StaticTrait {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_tracked(&self) -> bool {
        self.track
    }

    fn initialize(
        &mut self,
        store: &mut EntityStore,
        _rng: &mut SimRng,
    ) -> Result<(), ConfigError> {
        for entity in store.iter_mut() {
            entity.set_attribute(self.name.clone(), self.value.clone());
        }
        Ok(())
    }

    fn get_value(&self, _store: &EntityStore, _id: EntityId) -> Option<TraitValue> {
        Some(self.value.clone())
    }

    fn inherit_value(
        &mut self,
        _store: &EntityStore,
        _parent: EntityId,
        _child: EntityId,
        _rng: &mut SimRng,
    ) -> Option<TraitValue> {
        Some(self.value.clone())
    }
}
