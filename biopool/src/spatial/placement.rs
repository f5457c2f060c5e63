//! Where to put a newborn.

use crate::rng::SimRng;

use super::voronoi::voronoi_vertices;
use super::Circle;

/// Margin kept between a body and the domain edge.
pub const PLACEMENT_EPS: f64 = 1e-5;

/// Extent of the domain `[0, xdim] × [0, ydim]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Width
    pub xdim: f64,
    /// Height
    pub ydim: f64,
}

impl Bounds {
    /// Domain of the given size.
    pub fn new(xdim: f64, ydim: f64) -> Self {
        Self { xdim, ydim }
    }

    /// Pull a center inside the domain so a body of `radius` fits.
    pub fn clip(&self, x: f64, y: f64, radius: f64) -> (f64, f64) {
        (
            clip_axis(x, radius, self.xdim),
            clip_axis(y, radius, self.ydim),
        )
    }
}

fn clip_axis(v: f64, radius: f64, dim: f64) -> f64 {
    let lo = radius + PLACEMENT_EPS;
    let hi = dim - radius - PLACEMENT_EPS;
    if lo > hi {
        dim / 2.0
    } else {
        v.clamp(lo, hi)
    }
}

/// Uniform spot in the box of half-width `odm` around the parent, clipped
/// to the domain. Overlap with anyone is allowed, so this always succeeds.
pub fn scatter_near(
    parent: Circle,
    odm: f64,
    new_radius: f64,
    bounds: Bounds,
    rng: &mut SimRng,
) -> (f64, f64) {
    let x = parent.x + (rng.random_f64() * 2.0 - 1.0) * odm;
    let y = parent.y + (rng.random_f64() * 2.0 - 1.0) * odm;
    bounds.clip(x, y, new_radius)
}

/// Four candidates on the diagonals around the parent, each axis offset
/// drawn from `[min, max)`.
fn diagonal_candidates(parent: Circle, min: f64, max: f64, rng: &mut SimRng) -> [(f64, f64); 4] {
    let mut r = [0.0; 8];
    for v in r.iter_mut() {
        *v = (max - min) * rng.random_f64() + min;
    }
    [
        (parent.x - r[0], parent.y - r[1]),
        (parent.x - r[2], parent.y + r[3]),
        (parent.x + r[4], parent.y - r[5]),
        (parent.x + r[6], parent.y + r[7]),
    ]
}

/// Find a spot for a newborn of `new_radius` that overlaps nobody.
///
/// `neighbors` are the bodies found in the `2·odm` box around the parent,
/// the parent included. Candidates are jittered diagonals when the parent
/// is alone, otherwise Voronoi vertices of the neighborhood (padded with four
/// synthetic sites when it is sparse). A candidate survives when it lies
/// within `odm` of the parent and farther than `new_radius + r` from every
/// neighbor. Returns `None` when nothing survives.
pub fn find_open_space(
    parent: Circle,
    odm: f64,
    new_radius: f64,
    neighbors: &[Circle],
    bounds: Bounds,
    rng: &mut SimRng,
) -> Option<(f64, f64)> {
    let near = parent.r + new_radius;

    let raw: Vec<(f64, f64)> = if neighbors.len() <= 1 {
        let max_od = (odm * odm / 2.0).sqrt();
        diagonal_candidates(parent, near, max_od, rng).to_vec()
    } else {
        let mut sites: Vec<(f64, f64)> = neighbors.iter().map(|n| (n.x, n.y)).collect();
        if neighbors.len() <= 3 {
            sites.extend(diagonal_candidates(parent, near, 2.0 * odm, rng));
        }
        voronoi_vertices(&sites)
    };

    let open: Vec<(f64, f64)> = raw
        .into_iter()
        .map(|(x, y)| bounds.clip(x, y, new_radius))
        .filter(|&(x, y)| parent.distance_to(x, y) <= odm)
        .filter(|&(x, y)| {
            neighbors
                .iter()
                .all(|n| n.distance_to(x, y) > new_radius + n.r)
        })
        .collect();

    rng.pick(open.len()).map(|i| open[i])
}
