use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::population::{attr, EntityId, Pending};
use crate::sim::{EventInstance, EventParams, SimContext};

use super::{EventRegistry, EventSpec};

/// New heading after hitting the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bounce {
    /// Mirror the heading off the nearest wall
    #[default]
    Reflective,
    /// Pick a uniformly random heading
    Random,
}

/// Contact of a moving disc with the domain boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WallEvent {
    /// Bounce rule
    pub bounce: Bounce,
}

/// Time until a disc at `(x, y)` with radius `r` reaches a wall.
fn time_to_wall(x: f64, y: f64, vx: f64, vy: f64, r: f64, xdim: f64, ydim: f64) -> Option<f64> {
    [
        (r - x) / vx,
        (xdim - r - x) / vx,
        (r - y) / vy,
        (ydim - r - y) / vy,
    ]
    .into_iter()
    .filter(|t| t.is_finite() && *t > 0.0)
    .min_by(f64::total_cmp)
}

/// Mirror `angle` off whichever wall is closest; vertical walls win ties.
fn reflect(x: f64, y: f64, angle: f64, xdim: f64, ydim: f64) -> f64 {
    let dx = x.abs().min((x - xdim).abs());
    let dy = y.abs().min((y - ydim).abs());
    if dx <= dy {
        PI - angle
    } else {
        -angle
    }
}

/// Push a coordinate that sits on a wall back inside by one radius.
fn nudge(v: f64, r: f64, dim: f64) -> f64 {
    if v <= 1.1 * r {
        2.0 * r
    } else if v >= dim - 1.1 * r {
        dim - 2.0 * r
    } else {
        v
    }
}

impl WallEvent {
    pub(crate) fn next_time(
        &self,
        spec: &EventSpec,
        ctx: &mut SimContext,
        actor: EntityId,
        now: f64,
    ) -> Option<Pending> {
        let pop = ctx.population(spec.population)?;
        let e = pop.get(actor)?;
        if !e.is_active() {
            return None;
        }
        let m = e.motion?;
        let r = e.number(attr::RADIUS)?;
        let t = time_to_wall(e.x, e.y, m.vel_x, m.vel_y, r, pop.xdim(), pop.ydim())?;
        Some(Pending::at(now + t))
    }

    /// Turn, step back inside, and recompute everything that depends on the
    /// new velocity.
    pub(crate) fn handle(
        &self,
        registry: &EventRegistry,
        spec: &EventSpec,
        ctx: &mut SimContext,
        params: &EventParams,
    ) -> Vec<EventInstance> {
        let now = params.current_time;
        let Some((pop, rng)) = ctx.population_and_rng(spec.population) else {
            return Vec::new();
        };
        let (xdim, ydim) = (pop.xdim(), pop.ydim());
        let Some(e) = pop.get_mut(params.actor) else {
            return Vec::new();
        };
        if !e.is_active() {
            return Vec::new();
        }
        let r = e.number(attr::RADIUS).unwrap_or(0.0);
        let (x, y) = (e.x, e.y);
        let Some(m) = e.motion.as_mut() else {
            return Vec::new();
        };
        let angle = match self.bounce {
            Bounce::Reflective => reflect(x, y, m.angle, xdim, ydim),
            Bounce::Random => rng.heading(),
        };
        m.set_heading(angle);
        e.x = nudge(x, r, xdim);
        e.y = nudge(y, r, ydim);
        trace!(actor = %params.actor, x = e.x, y = e.y, angle, "wall bounce");

        let out = registry.fire_triggers(spec, ctx, params);
        registry.refresh_motion_events(ctx, spec.population, params.actor, now);
        out
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::super::test_support::context;
    use super::super::{EventId, EventKind};
    use super::*;
    use crate::population::{Motion, PopulationId};

    fn setup(bounce: Bounce) -> (SimContext, EventRegistry, EventId) {
        let mut ctx = context(1, 10.0, 10.0, &[("velocity", 1.0), ("radius", 0.5)]);
        let mut reg = EventRegistry::new();
        let wall = reg.register(
            "wall",
            PopulationId(0),
            true,
            EventKind::Wall(WallEvent { bounce }),
        );
        let SimContext {
            populations, rng, ..
        } = &mut ctx;
        populations[0].enable_motion(rng).expect("velocity present");
        populations[0].register_primary(wall);
        (ctx, reg, wall)
    }

    fn put(ctx: &mut SimContext, x: f64, y: f64, angle: f64) {
        if let Some(e) = ctx.populations[0].get_mut(EntityId(0)) {
            e.x = x;
            e.y = y;
            e.motion = Some(Motion::from_heading(1.0, angle));
        }
    }

    #[test]
    fn predicts_the_first_wall() {
        let (mut ctx, reg, wall) = setup(Bounce::Reflective);
        put(&mut ctx, 8.5, 5.0, 0.0);
        let next = reg
            .next_time(&mut ctx, wall, EntityId(0), 2.0, None)
            .expect("wall ahead");
        assert!((next.time - 3.0).abs() < 1e-9);
    }

    #[test]
    fn reflects_off_a_vertical_wall() {
        let (mut ctx, reg, wall) = setup(Bounce::Reflective);
        put(&mut ctx, 9.5, 5.0, 0.0);
        reg.handle(&mut ctx, wall, EventParams::new(1.0, EntityId(0)));

        let e = ctx.populations[0].get(EntityId(0)).expect("alive");
        let m = e.motion.expect("moving");
        assert!((m.vel_x + 1.0).abs() < 1e-9);
        assert!((e.x - 9.0).abs() < 1e-12);
        let slot = e.pending(wall).expect("next wall scheduled");
        assert!((slot.time - 9.5).abs() < 1e-9);
    }

    #[test]
    fn reflects_off_a_horizontal_wall() {
        let (mut ctx, reg, wall) = setup(Bounce::Reflective);
        put(&mut ctx, 5.0, 9.5, FRAC_PI_2);
        reg.handle(&mut ctx, wall, EventParams::new(1.0, EntityId(0)));

        let e = ctx.populations[0].get(EntityId(0)).expect("alive");
        let m = e.motion.expect("moving");
        assert!((m.vel_y + 1.0).abs() < 1e-9);
        assert!((e.y - 9.0).abs() < 1e-12);
        assert_eq!(e.x, 5.0);
    }

    #[test]
    fn sitting_on_the_origin_walls_turns_inward() {
        let (mut ctx, reg, wall) = setup(Bounce::Reflective);
        put(&mut ctx, 0.0, 5.0, PI);
        reg.handle(&mut ctx, wall, EventParams::new(1.0, EntityId(0)));

        let e = ctx.populations[0].get(EntityId(0)).expect("alive");
        let m = e.motion.expect("moving");
        assert!((m.vel_x - 1.0).abs() < 1e-9);
        assert!(m.vel_y.abs() < 1e-9);
        assert_eq!((e.x, e.y), (1.0, 5.0));
        let slot = e.pending(wall).expect("next wall scheduled");
        assert!((slot.time - 9.5).abs() < 1e-9);

        put(&mut ctx, 5.0, 0.0, -FRAC_PI_2);
        reg.handle(&mut ctx, wall, EventParams::new(2.0, EntityId(0)));
        let e = ctx.populations[0].get(EntityId(0)).expect("alive");
        let m = e.motion.expect("moving");
        assert!((m.vel_y - 1.0).abs() < 1e-9);
        assert_eq!((e.x, e.y), (5.0, 1.0));
    }

    #[test]
    fn random_bounce_keeps_speed_and_stays_inside() {
        let (mut ctx, reg, wall) = setup(Bounce::Random);
        for t in 1..20 {
            put(&mut ctx, 0.5, 5.0, PI);
            reg.handle(&mut ctx, wall, EventParams::new(t as f64, EntityId(0)));
            let e = ctx.populations[0].get(EntityId(0)).expect("alive");
            let m = e.motion.expect("moving");
            assert!((m.vel_x.hypot(m.vel_y) - 1.0).abs() < 1e-9);
            assert_eq!(e.x, 1.0);
        }
    }

    #[test]
    fn paused_individuals_do_not_hit_walls() {
        let (mut ctx, reg, wall) = setup(Bounce::Reflective);
        put(&mut ctx, 8.5, 5.0, 0.0);
        if let Some(e) = ctx.populations[0].get_mut(EntityId(0)) {
            e.status = crate::population::Status::Inactive;
        }
        assert_eq!(reg.next_time(&mut ctx, wall, EntityId(0), 0.0, None), None);
    }
}
