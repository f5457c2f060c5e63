//! Voronoi vertices through a Bowyer-Watson Delaunay triangulation.
//!
//! Every finite Voronoi vertex is the circumcenter of a Delaunay triangle, so
//! the triangulation is all that is needed. Triangles touching the enclosing
//! super-triangle are unbounded cells and are dropped.
//!
//! Hand-written: `rstar`, the crate's only geometry dependency, indexes
//! points but does not triangulate. Placement feeds it a handful of neighbor
//! sites, so the quadratic insertion loop stays cheap.

#[derive(Debug, Clone, Copy)]
struct Triangle {
    v: [usize; 3],
    // circumcenter and squared radius; None for degenerate triangles
    circle: Option<(f64, f64, f64)>,
}

impl Triangle {
    fn new(v: [usize; 3], pts: &[(f64, f64)]) -> Self {
        Self {
            v,
            circle: circumcircle(pts[v[0]], pts[v[1]], pts[v[2]]),
        }
    }

    fn encloses(&self, p: (f64, f64)) -> bool {
        match self.circle {
            Some((cx, cy, r2)) => (p.0 - cx).powi(2) + (p.1 - cy).powi(2) < r2,
            None => true,
        }
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.v;
        [edge(a, b), edge(b, c), edge(c, a)]
    }
}

fn edge(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn circumcircle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Option<(f64, f64, f64)> {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < 1e-12 {
        return None;
    }
    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;
    let ux = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let uy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
    let r2 = (a.0 - ux).powi(2) + (a.1 - uy).powi(2);
    Some((ux, uy, r2))
}

/// Finite Voronoi vertices of a point set.
///
/// Duplicate points are ignored. Fewer than three distinct points have no
/// finite vertex.
pub fn voronoi_vertices(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut pts: Vec<(f64, f64)> = Vec::with_capacity(points.len() + 3);
    for &p in points {
        if !p.0.is_finite() || !p.1.is_finite() {
            continue;
        }
        if !pts.iter().any(|q| q.0 == p.0 && q.1 == p.1) {
            pts.push(p);
        }
    }
    let n = pts.len();
    if n < 3 {
        return Vec::new();
    }

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in &pts {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let delta = (max_x - min_x).max(max_y - min_y).max(1e-9);
    let mid_x = (min_x + max_x) / 2.0;
    let mid_y = (min_y + max_y) / 2.0;
    pts.push((mid_x - 50.0 * delta, mid_y - 50.0 * delta));
    pts.push((mid_x, mid_y + 50.0 * delta));
    pts.push((mid_x + 50.0 * delta, mid_y - 50.0 * delta));

    let mut triangles = vec![Triangle::new([n, n + 1, n + 2], &pts)];

    for i in 0..n {
        let p = pts[i];
        let (bad, good): (Vec<Triangle>, Vec<Triangle>) =
            triangles.into_iter().partition(|t| t.encloses(p));

        let mut edges: Vec<(usize, usize)> = Vec::with_capacity(bad.len() * 3);
        for t in &bad {
            edges.extend(t.edges());
        }
        triangles = good;
        for (k, e) in edges.iter().enumerate() {
            let shared = edges
                .iter()
                .enumerate()
                .any(|(j, other)| j != k && other == e);
            if !shared {
                triangles.push(Triangle::new([e.0, e.1, i], &pts));
            }
        }
    }

    triangles
        .iter()
        .filter(|t| t.v.iter().all(|&v| v < n))
        .filter_map(|t| t.circle.map(|(x, y, _)| (x, y)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SimRng;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn right_triangle_has_one_vertex_at_hypotenuse_midpoint() {
        let v = voronoi_vertices(&[(0.0, 0.0), (2.0, 0.0), (0.0, 2.0)]);
        assert_eq!(v.len(), 1);
        assert!(close(v[0], (1.0, 1.0)));
    }

    #[test]
    fn square_vertices_meet_in_the_center() {
        let v = voronoi_vertices(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]);
        assert!(!v.is_empty());
        assert!(v.iter().all(|&p| close(p, (0.5, 0.5))));
    }

    #[test]
    fn too_few_points_have_no_vertices() {
        assert!(voronoi_vertices(&[]).is_empty());
        assert!(voronoi_vertices(&[(0.0, 0.0), (1.0, 1.0)]).is_empty());
        assert!(voronoi_vertices(&[(0.0, 0.0), (1.0, 1.0), (1.0, 1.0)]).is_empty());
    }

    #[test]
    fn vertices_have_empty_circumcircles() {
        let mut rng = SimRng::new(21);
        let points: Vec<(f64, f64)> = (0..30)
            .map(|_| (rng.random_f64() * 10.0, rng.random_f64() * 10.0))
            .collect();
        let vertices = voronoi_vertices(&points);
        assert!(!vertices.is_empty());

        for v in vertices {
            let mut dists: Vec<f64> = points
                .iter()
                .map(|p| (p.0 - v.0).hypot(p.1 - v.1))
                .collect();
            dists.sort_by(|a, b| a.total_cmp(b));
            // at least three sites are equidistant and none is closer
            let nearest = dists[0];
            assert!((dists[2] - nearest).abs() < 1e-6 * nearest.max(1.0));
        }
    }
}
