//! Body-peg collision response and the pluggable physics model
//!
//! Collisions are resolved instantaneously: the radial part of the body's
//! velocity is scaled by the peg's restitution, the tangential part passes
//! through, and the body is snapped back onto the contact circle.

use glam::DVec2;

use super::integrator::{Kinematics, RungeKutta4};
use super::state::Particle;
use crate::config::Displacement;

/// Force and collision model driven by the engine
///
/// Shared across sweep tiles, hence `Sync`.
pub trait PhysicsModel: Send + Sync {
    /// Advance a body's position and velocity over `[t, t + dt]`
    fn advance_body(&self, body: &mut Particle, t: f64, dt: f64);

    /// Move a peg along its oscillation trajectory
    fn advance_peg(&self, peg: &mut Particle, t: f64, dt: f64, displacement: &Displacement);

    /// Respond to a body overlapping a peg
    fn resolve_collision(&self, body: &mut Particle, peg: &Particle);
}

/// RK4 integration with sine/cosine contact response
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModel {
    integrator: RungeKutta4,
}

impl DefaultModel {
    pub fn new(integrator: RungeKutta4) -> Self {
        Self { integrator }
    }
}

impl PhysicsModel for DefaultModel {
    fn advance_body(&self, body: &mut Particle, t: f64, dt: f64) {
        let state = Kinematics {
            pos: body.pos,
            vel: body.vel,
            acc: body.acc,
        };
        (body.pos, body.vel) = self.integrator.step(t, dt, state);
    }

    fn advance_peg(&self, peg: &mut Particle, t: f64, _dt: f64, displacement: &Displacement) {
        if !displacement.enabled {
            return;
        }
        let offset = displacement.offset_at(t);
        peg.pos += offset - peg.prev_offset;
        peg.prev_offset = offset;
    }

    fn resolve_collision(&self, body: &mut Particle, peg: &Particle) {
        let (sin, cos) = contact_angle(body.pos - peg.pos);
        let v = body.vel;

        let tangential = -v.x * sin + v.y * cos;
        let radial = -peg.damping * (v.x * cos + v.y * sin);

        body.vel = DVec2::new(radial * cos - tangential * sin, radial * sin + tangential * cos);
        body.pos = peg.pos + (body.radius + peg.radius) * DVec2::new(cos, sin);
    }
}

/// Sine and cosine of the contact normal from peg to body
///
/// Coincident centres have no defined normal; the body is pushed straight up,
/// against gravity.
pub fn contact_angle(offset: DVec2) -> (f64, f64) {
    let hip = offset.length();
    if hip > 0.0 {
        (offset.y / hip, offset.x / hip)
    } else {
        log::warn!("Body centred on a peg, using the vertical contact normal");
        (1.0, 0.0)
    }
}
