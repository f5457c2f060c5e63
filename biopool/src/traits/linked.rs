use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::population::{EntityId, EntityStore};
use crate::rng::SimRng;

use super::{Trait, TraitValue};

/// Function deriving a linked trait from its source attribute.
pub type LinkFn = Arc<dyn Fn(&TraitValue) -> TraitValue + Send + Sync>;

/// A trait computed from another attribute of the same individual.
///
/// Typical use: a radius that follows a mutable size trait. The source trait
/// must be added to the population first.
#[derive(Clone)]
pub struct LinkedTrait {
    name: String,
    link: String,
    func: LinkFn,
    track: bool,
}

impl LinkedTrait {
    /// Linked trait `name = func(link)`.
    pub fn new(
        name: impl Into<String>,
        link: impl Into<String>,
        func: impl Fn(&TraitValue) -> TraitValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
            func: Arc::new(func),
            track: false,
        }
    }

    /// Record this trait in history.
    pub fn tracked(mut self) -> Self {
        self.track = true;
        self
    }
}

impl fmt::Debug for LinkedTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedTrait")
            .field("name", &self.name)
            .field("link", &self.link)
            .field("func", &"<closure>")
            .finish()
    }
}

impl Trait for LinkedTrait {
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
            let source = entity.attribute(&self.link).cloned().ok_or_else(|| {
                ConfigError::invalid(
                    &self.name,
                    format!("linked attribute '{}' missing on entity {}", self.link, entity.id),
                )
            })?;
            entity.set_attribute(self.name.clone(), (self.func)(&source));
        }
        Ok(())
    }

    fn get_value(&self, store: &EntityStore, id: EntityId) -> Option<TraitValue> {
        let source = store.get(id)?.attribute(&self.link)?;
        Some((self.func)(source))
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
