//! Closed-form collision times between moving discs.
//!
//! Two discs with positions `p₁, p₂`, velocities `v₁, v₂` and radii `r₁, r₂`
//! touch when `|Δp + Δv·t| = r₁ + r₂`, a quadratic `a·t² + b·t + c = 0` with
//! `a = |Δv|²`, `b = 2·Δp·Δv` and `c = |Δp|² − (r₁+r₂)²`.

use crate::population::{Entity, EntityId};

/// Relative speeds below this are treated as parallel motion.
pub const PARALLEL_EPS: f64 = 1e-8;

/// Kinematic state of one disc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// Center x
    pub x: f64,
    /// Center y
    pub y: f64,
    /// Velocity x
    pub vx: f64,
    /// Velocity y
    pub vy: f64,
    /// Radius
    pub r: f64,
}

impl Body {
    /// Disc of radius `r` for an individual; no motion means velocity zero.
    pub fn of(entity: &Entity, r: f64) -> Self {
        let (vx, vy) = entity.velocity();
        Self {
            x: entity.x,
            y: entity.y,
            vx,
            vy,
            r,
        }
    }
}

#[inline]
fn solve(dpx: f64, dpy: f64, dvx: f64, dvy: f64, rsum: f64) -> Option<f64> {
    let a = dvx * dvx + dvy * dvy;
    if a.abs() <= PARALLEL_EPS {
        return None;
    }
    let b = 2.0 * (dpx * dvx + dpy * dvy);
    let c = dpx * dpx + dpy * dpy - rsum * rsum;
    let disc = b * b - 4.0 * a * c;
    if disc.is_nan() || disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let t1 = (-b + root) / (2.0 * a);
    let t2 = (-b - root) / (2.0 * a);
    if t1 >= 0.0 && t2 >= 0.0 {
        Some(t1.min(t2))
    } else {
        None
    }
}

/// Time until `a` and `b` first touch, relative to now.
///
/// `None` when they never do, move in parallel, or one root lies in the past
/// (they already overlap).
pub fn collision_time(a: &Body, b: &Body) -> Option<f64> {
    solve(b.x - a.x, b.y - a.y, b.vx - a.vx, b.vy - a.vy, a.r + b.r)
}

/// Column layout of many bodies, for evaluating one actor against all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyColumns {
    /// Center x
    pub x: Vec<f64>,
    /// Center y
    pub y: Vec<f64>,
    /// Velocity x
    pub vx: Vec<f64>,
    /// Velocity y
    pub vy: Vec<f64>,
    /// Radius
    pub r: Vec<f64>,
}

impl BodyColumns {
    /// Number of bodies.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether there are no bodies.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Append one body.
    pub fn push(&mut self, body: Body) {
        self.x.push(body.x);
        self.y.push(body.y);
        self.vx.push(body.vx);
        self.vy.push(body.vy);
        self.r.push(body.r);
    }
}

impl FromIterator<Body> for BodyColumns {
    fn from_iter<I: IntoIterator<Item = Body>>(iter: I) -> Self {
        let mut cols = BodyColumns::default();
        for body in iter {
            cols.push(body);
        }
        cols
    }
}

/// Collision time of `actor` against every body in `others`.
pub fn collision_times(actor: &Body, others: &BodyColumns) -> Vec<Option<f64>> {
    (0..others.len())
        .map(|i| {
            solve(
                others.x[i] - actor.x,
                others.y[i] - actor.y,
                others.vx[i] - actor.vx,
                others.vy[i] - actor.vy,
                actor.r + others.r[i],
            )
        })
        .collect()
}

/// Earliest of the collisions of `actor` against `others`, with the id of
/// that partner. `ids[i]` names `others` row `i`; ties go to the earlier row.
pub fn earliest_collision(
    actor: &Body,
    ids: &[EntityId],
    others: &BodyColumns,
) -> Option<(f64, EntityId)> {
    collision_times(actor, others)
        .into_iter()
        .zip(ids)
        .filter_map(|(t, id)| Some((t?, *id)))
        .fold(None, |best, (t, id)| match best {
            Some((b, _)) if b <= t => best,
            _ => Some((t, id)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn body(x: f64, y: f64, vx: f64, vy: f64, r: f64) -> Body {
        Body { x, y, vx, vy, r }
    }

    #[test]
    fn head_on_approach() {
        let a = body(0.0, 0.0, 0.0, 0.0, 1.0);
        let b = body(3.0, 0.0, -1.0, 0.0, 1.0);
        assert_eq!(collision_time(&a, &b), Some(1.0));
    }

    #[test]
    fn identical_velocity_never_collides() {
        let a = body(0.0, 0.0, 1.0, 2.0, 1.0);
        let b = body(1.0, 0.0, 1.0, 2.0, 1.0);
        assert_eq!(collision_time(&a, &b), None);
    }

    #[test]
    fn stationary_overlap_is_not_a_collision() {
        let a = body(0.0, 0.0, 0.0, 0.0, 1.0);
        let b = body(0.5, 0.0, 0.0, 0.0, 1.0);
        assert_eq!(collision_time(&a, &b), None);
    }

    #[test]
    fn moving_overlap_is_not_a_collision() {
        let a = body(0.0, 0.0, 0.0, 0.0, 1.0);
        let b = body(0.5, 0.0, 1.0, 0.0, 1.0);
        assert_eq!(collision_time(&a, &b), None);
    }

    #[test]
    fn receding_and_missing_pairs() {
        let a = body(0.0, 0.0, 0.0, 0.0, 1.0);
        assert_eq!(collision_time(&a, &body(3.0, 0.0, 1.0, 0.0, 1.0)), None);
        assert_eq!(collision_time(&a, &body(3.0, 5.0, -1.0, 0.0, 1.0)), None);
    }

    #[test]
    fn earliest_picks_the_first_contact() {
        let actor = body(0.0, 0.0, 1.0, 0.0, 0.5);
        let ids = [EntityId(7), EntityId(1), EntityId(2)];
        let others: BodyColumns = [
            body(0.0, 5.0, 0.0, 0.0, 0.5),
            body(4.0, 0.0, 0.0, 0.0, 0.5),
            body(2.0, 0.0, 0.0, 0.0, 0.5),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            earliest_collision(&actor, &ids, &others),
            Some((1.0, EntityId(2)))
        );
        assert_eq!(
            earliest_collision(&actor, &ids[..2], &others),
            Some((3.0, EntityId(1)))
        );
        assert_eq!(earliest_collision(&actor, &[], &BodyColumns::default()), None);
    }

    #[test]
    fn earliest_breaks_ties_by_row() {
        let actor = body(0.0, 0.0, 0.0, 0.0, 0.5);
        let ids = [EntityId(4), EntityId(3)];
        let others: BodyColumns = [
            body(3.0, 0.0, -1.0, 0.0, 0.5),
            body(-3.0, 0.0, 1.0, 0.0, 0.5),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            earliest_collision(&actor, &ids, &others),
            Some((2.0, EntityId(4)))
        );
    }

    fn arb_body() -> impl Strategy<Value = Body> {
        (
            -50.0..50.0f64,
            -50.0..50.0f64,
            -5.0..5.0f64,
            -5.0..5.0f64,
            0.1..3.0f64,
        )
            .prop_map(|(x, y, vx, vy, r)| body(x, y, vx, vy, r))
    }

    proptest! {
        #[test]
        fn column_evaluation_matches_pairwise(
            actor in arb_body(),
            others in proptest::collection::vec(arb_body(), 0..20),
        ) {
            let cols: BodyColumns = others.iter().copied().collect();
            let batch = collision_times(&actor, &cols);
            prop_assert_eq!(batch.len(), others.len());
            for (i, other) in others.iter().enumerate() {
                prop_assert_eq!(batch[i], collision_time(&actor, other));
            }
        }

        #[test]
        fn reported_time_is_first_contact(a in arb_body(), b in arb_body()) {
            if let Some(t) = collision_time(&a, &b) {
                prop_assert!(t >= 0.0);
                let dx = (b.x + b.vx * t) - (a.x + a.vx * t);
                let dy = (b.y + b.vy * t) - (a.y + a.vy * t);
                let gap = dx.hypot(dy) - (a.r + b.r);
                prop_assert!(gap.abs() < 1e-4 * (1.0 + t));
            }
        }
    }
}
