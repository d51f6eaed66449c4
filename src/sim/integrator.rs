//! Classical 4th-order Runge-Kutta for the coupled system
//! `dx/dt = v`, `dv/dt = a`.
//!
//! The derivative functions are pluggable so a velocity- or position-dependent
//! force field can replace constant gravity without touching the stepper.

use glam::DVec2;

/// Kinematic state seen by a derivative function
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub pos: DVec2,
    pub vel: DVec2,
    pub acc: DVec2,
}

/// Time derivative of one state component
pub type Derivative = fn(t: f64, state: &Kinematics) -> DVec2;

/// `dx/dt = v`
pub fn velocity(_t: f64, state: &Kinematics) -> DVec2 {
    state.vel
}

/// `dv/dt = a`, constant over the step
pub fn acceleration(_t: f64, state: &Kinematics) -> DVec2 {
    state.acc
}

#[derive(Debug, Clone, Copy)]
pub struct RungeKutta4 {
    d_pos: Derivative,
    d_vel: Derivative,
}

impl Default for RungeKutta4 {
    fn default() -> Self {
        Self::new(velocity, acceleration)
    }
}

impl RungeKutta4 {
    pub fn new(d_pos: Derivative, d_vel: Derivative) -> Self {
        Self { d_pos, d_vel }
    }

    /// Advance `(pos, vel)` from `t` to `t + dt`
    pub fn step(&self, t: f64, dt: f64, state: Kinematics) -> (DVec2, DVec2) {
        let stage = |t: f64, pos: DVec2, vel: DVec2| {
            let s = Kinematics { pos, vel, acc: state.acc };
            ((self.d_pos)(t, &s) * dt, (self.d_vel)(t, &s) * dt)
        };
        let half = dt / 2.0;

        let (k1x, k1v) = stage(t, state.pos, state.vel);
        let (k2x, k2v) = stage(t + half, state.pos + k1x * 0.5, state.vel + k1v * 0.5);
        let (k3x, k3v) = stage(t + half, state.pos + k2x * 0.5, state.vel + k2v * 0.5);
        let (k4x, k4v) = stage(t + dt, state.pos + k3x, state.vel + k3v);

        let pos = state.pos + (k1x + k2x * 2.0 + (k3x * 2.0 + k4x)) * (1.0 / 6.0);
        let vel = state.vel + (k1v + k2v * 2.0 + (k3v * 2.0 + k4v)) * (1.0 / 6.0);
        (pos, vel)
    }
}
