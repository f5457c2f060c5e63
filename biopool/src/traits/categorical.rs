use crate::error::ConfigError;
use crate::population::{EntityId, EntityStore};
use crate::rng::SimRng;

use super::{Trait, TraitValue};

/// A trait drawn from a fixed set of categories.
///
/// Initial categories are dealt out by fraction and shuffled; offspring copy
/// their parent's category. Individuals left over by rounding the fractions
/// receive the first category.
#[derive(Debug, Clone)]
pub struct CategoricalTrait {
    name: String,
    categories: Vec<String>,
    fractions: Vec<f64>,
    track: bool,
}

impl CategoricalTrait {
    /// Categorical trait with one initial fraction per category.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        categories: impl IntoIterator<Item = S>,
        fractions: impl IntoIterator<Item = f64>,
    ) -> Self {
        Self {
            name: name.into(),
            categories: categories.into_iter().map(Into::into).collect(),
            fractions: fractions.into_iter().collect(),
            track: false,
        }
    }

    /// Record this trait in history.
    pub fn tracked(mut self) -> Self {
        self.track = true;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::invalid(&self.name, "no categories"));
        }
        if self.categories.len() != self.fractions.len() {
            return Err(ConfigError::invalid(
                &self.name,
                "categories and fractions differ in length",
            ));
        }
        if self.fractions.iter().any(|f| !(0.0..=1.0).contains(f))
            || self.fractions.iter().sum::<f64>() > 1.0 + 1e-9
        {
            return Err(ConfigError::invalid(
                &self.name,
                "fractions must lie in [0, 1] and sum to at most 1",
            ));
        }
        Ok(())
    }
}

impl Trait for CategoricalTrait {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_tracked(&self) -> bool {
        self.track
    }

    fn initialize(
        &mut self,
        store: &mut EntityStore,
        rng: &mut SimRng,
    ) -> Result<(), ConfigError> {
        self.validate()?;
        let size = store.len();
        let mut dealt: Vec<&str> = Vec::with_capacity(size);
        for (category, fraction) in self.categories.iter().zip(&self.fractions) {
            let count = (fraction * size as f64) as usize;
            dealt.extend(std::iter::repeat(category.as_str()).take(count));
        }
        dealt.truncate(size);
        while dealt.len() < size {
            dealt.push(&self.categories[0]);
        }
        rng.shuffle(&mut dealt);

        for (entity, category) in store.iter_mut().zip(dealt) {
            entity.set_attribute(self.name.clone(), TraitValue::from(category));
        }
        Ok(())
    }

    fn get_value(&self, store: &EntityStore, id: EntityId) -> Option<TraitValue> {
        store.get(id)?.attribute(&self.name).cloned()
    }

    fn inherit_value(
        &mut self,
        store: &EntityStore,
        parent: EntityId,
        _child: EntityId,
        _rng: &mut SimRng,
    ) -> Option<TraitValue> {
        self.get_value(store, parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::Entity;

    fn store(n: u64) -> EntityStore {
        let mut store = EntityStore::new();
        for i in 0..n {
            store.insert(Entity::new(EntityId(i), 0.0, 0.0)).expect("fresh id");
        }
        store
    }

    #[test]
    fn deals_categories_by_fraction() {
        let mut store = store(10);
        let mut rng = SimRng::new(1);
        let mut t = CategoricalTrait::new("sir", ["susceptible", "infected"], [0.7, 0.3]);
        t.initialize(&mut store, &mut rng).expect("valid config");

        let counts = t.track_values(&store);
        assert_eq!(counts.count(&TraitValue::from("susceptible")), 7);
        assert_eq!(counts.count(&TraitValue::from("infected")), 3);
    }

    #[test]
    fn rounding_leftovers_take_first_category() {
        let mut store = store(3);
        let mut rng = SimRng::new(1);
        let mut t = CategoricalTrait::new("c", ["a", "b"], [0.5, 0.5]);
        t.initialize(&mut store, &mut rng).expect("valid config");

        let counts = t.track_values(&store);
        assert_eq!(counts.count(&TraitValue::from("a")), 2);
        assert_eq!(counts.count(&TraitValue::from("b")), 1);
    }

    #[test]
    fn offspring_copy_parent_category() {
        let mut store = store(4);
        let mut rng = SimRng::new(2);
        let mut t = CategoricalTrait::new("c", ["a", "b"], [0.5, 0.5]);
        t.initialize(&mut store, &mut rng).expect("valid config");

        let parent_value = t.get_value(&store, EntityId(2));
        let inherited = t.inherit_value(&store, EntityId(2), EntityId(9), &mut rng);
        assert_eq!(inherited, parent_value);
        assert_eq!(t.inherit_value(&store, EntityId(77), EntityId(9), &mut rng), None);
    }

    #[test]
    fn rejects_mismatched_fractions() {
        let mut store = store(4);
        let mut rng = SimRng::new(2);
        let mut t = CategoricalTrait::new("c", ["a", "b"], [1.0]);
        assert!(t.initialize(&mut store, &mut rng).is_err());
    }
}
