//! Arena of individuals addressed by id.

use std::collections::HashMap;

use crate::error::StoreError;

use super::entity::{Entity, EntityId};

/// Row storage for one population.
///
/// Rows live in a dense `Vec`; an id → row map is maintained on every insert
/// and removal, so lookups never scan the table. Removal swaps the last row
/// into the hole, which means row positions are not stable across removals:
/// anything that must survive churn is keyed by [`EntityId`].
#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    entities: Vec<Entity>,
    rows: HashMap<EntityId, usize>,
}

impl EntityStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live rows.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the store has no rows.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Row index of `id`.
    pub fn lookup(&self, id: EntityId) -> Option<usize> {
        self.rows.get(&id).copied()
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: EntityId) -> bool {
        self.rows.contains_key(&id)
    }

    /// Borrow an individual.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.lookup(id).map(|row| &self.entities[row])
    }

    /// Mutably borrow an individual.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let row = self.lookup(id)?;
        Some(&mut self.entities[row])
    }

    /// Append a row.
    pub fn insert(&mut self, entity: Entity) -> Result<(), StoreError> {
        if self.rows.contains_key(&entity.id) {
            return Err(StoreError::DuplicateId(entity.id));
        }
        self.rows.insert(entity.id, self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    /// Delete a row. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let row = self.rows.remove(&id)?;
        let removed = self.entities.swap_remove(row);
        if let Some(moved) = self.entities.get(row) {
            self.rows.insert(moved.id, row);
        }
        Some(removed)
    }

    /// Advance every moving row by `dt`.
    pub fn apply_lapse(&mut self, dt: f64) {
        if dt == 0.0 {
            return;
        }
        for entity in &mut self.entities {
            if let Some(m) = entity.motion {
                entity.x += m.vel_x * dt;
                entity.y += m.vel_y * dt;
            }
        }
    }

    /// Rows in storage order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    /// Mutable rows in storage order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entity> {
        self.entities.iter_mut()
    }

    /// Live ids in storage order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|e| e.id).collect()
    }
}
