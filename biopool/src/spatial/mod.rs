//! Spatial lookups over stationary populations.
//!
//! A [`SpatialIndex`] is an R-tree of entity coordinates bound to one
//! population. The world keeps it in step with the store: a birth inserts,
//! a death deletes, both inside the handler that changed the store.

mod placement;
mod voronoi;

use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};

use crate::population::{EntityId, EntityStore, PopulationId};

pub use placement::{find_open_space, scatter_near, Bounds, PLACEMENT_EPS};
pub use voronoi::voronoi_vertices;

/// Index of a spatial index inside a world, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexId(pub usize);

/// Axis-aligned query box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Lower x bound
    pub min_x: f64,
    /// Lower y bound
    pub min_y: f64,
    /// Upper x bound
    pub max_x: f64,
    /// Upper y bound
    pub max_y: f64,
}

impl BoundingBox {
    /// Square of half-width `half` centered on `(x, y)`.
    pub fn around(x: f64, y: f64, half: f64) -> Self {
        Self {
            min_x: x - half,
            min_y: y - half,
            max_x: x + half,
            max_y: y + half,
        }
    }

    /// Whether the point lies inside, edges included.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// A disc in the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Center x
    pub x: f64,
    /// Center y
    pub y: f64,
    /// Radius
    pub r: f64,
}

impl Circle {
    /// Disc centered on `(x, y)`.
    pub fn new(x: f64, y: f64, r: f64) -> Self {
        Self { x, y, r }
    }

    /// Distance between centers.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

type IndexedPoint = GeomWithData<[f64; 2], EntityId>;

/// Incremental 2D point index over one population.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    id: IndexId,
    population: PopulationId,
    tree: RTree<IndexedPoint>,
}

impl SpatialIndex {
    /// Empty index bound to `population`.
    pub fn new(id: IndexId, population: PopulationId) -> Self {
        Self {
            id,
            population,
            tree: RTree::new(),
        }
    }

    /// Index holding every individual of `store`.
    pub fn from_store(id: IndexId, population: PopulationId, store: &EntityStore) -> Self {
        let points = store
            .iter()
            .map(|e| GeomWithData::new([e.x, e.y], e.id))
            .collect();
        Self {
            id,
            population,
            tree: RTree::bulk_load(points),
        }
    }

    /// Registration index.
    pub fn id(&self) -> IndexId {
        self.id
    }

    /// Population the index covers.
    pub fn population(&self) -> PopulationId {
        self.population
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Add a point.
    pub fn insert(&mut self, id: EntityId, x: f64, y: f64) {
        self.tree.insert(GeomWithData::new([x, y], id));
    }

    /// Remove a point; returns whether it was present.
    pub fn delete(&mut self, id: EntityId, x: f64, y: f64) -> bool {
        self.tree.remove(&GeomWithData::new([x, y], id)).is_some()
    }

    /// Ids inside `query`, sorted.
    pub fn range_query(&self, query: &BoundingBox) -> Vec<EntityId> {
        let cx = (query.min_x + query.max_x) / 2.0;
        let cy = (query.min_y + query.max_y) / 2.0;
        let hx = (query.max_x - query.min_x) / 2.0;
        let hy = (query.max_y - query.min_y) / 2.0;
        // circumscribed disc, padded so corner points survive rounding
        let reach = (hx * hx + hy * hy) * (1.0 + 1e-9) + 1e-12;
        let mut ids: Vec<EntityId> = self
            .tree
            .locate_within_distance([cx, cy], reach)
            .filter(|p| query.contains(p.geom()[0], p.geom()[1]))
            .map(|p| p.data)
            .collect();
        ids.sort_unstable();
        ids
    }
}
